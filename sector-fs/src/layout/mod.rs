//! # 磁盘数据结构层
//!
//! sector-fs 的磁盘布局：
//! 位图文件头 | 根目录文件头 | 其余扇区（数据、文件头、子目录）
//!
//! 位图与目录都是普通文件，只是它们的文件头位于固定扇区。

mod bitmap;
pub use bitmap::Bitmap;

mod header;
pub use header::{FileHeader, MAX_FILE_SIZE, NUM_DIRECT};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{DirEntry, EntryFlag};
