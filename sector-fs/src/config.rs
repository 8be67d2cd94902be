//! Constants used in sector-fs

use crate::layout::DirEntry;

/// 扇区大小（字节）
pub const SECTOR_SIZE: usize = 128;
pub const SECTORS_PER_TRACK: usize = 32;
pub const NUM_TRACKS: usize = 32;
/// 磁盘的总扇区数
pub const NUM_SECTORS: usize = SECTORS_PER_TRACK * NUM_TRACKS;
/// 磁盘镜像的字节数
pub const DISK_SIZE: usize = NUM_SECTORS * SECTOR_SIZE;

/// 位图文件头所在扇区
pub const FREE_MAP_SECTOR: u32 = 0;
/// 根目录文件头所在扇区
pub const DIRECTORY_SECTOR: u32 = 1;

/// 每扇区一比特
pub const FREE_MAP_FILE_SIZE: usize = NUM_SECTORS / 8;

/// 每个目录最多容纳的目录项数
pub const NUM_DIR_ENTRIES: usize = 10;
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DirEntry::SIZE;

/// 路径分量的最大字节数
pub const FILE_NAME_MAX_LEN: usize = 26;

/// 0、1、2 留给标准输入输出
pub const FIRST_DESCRIPTOR: usize = 3;
/// 描述符编号的上界（不含）
pub const MAX_OPEN_FILES: usize = 64;
