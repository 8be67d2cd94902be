//! 文件头：记录一个文件的字节数与它占据的数据扇区。
//!
//! 文件头恰好占据一个扇区，所有数据扇区都直接索引，
//! 因此文件大小的上限是 [`MAX_FILE_SIZE`]，且创建后不能再增长。

use alloc::sync::Arc;
use core::{fmt, mem};

use block_dev::BlockDevice;

use crate::config::{NUM_SECTORS, SECTOR_SIZE};
use crate::sector::SectorBuf;
use crate::Bitmap;

/// 直接索引的扇区数
pub const NUM_DIRECT: usize = (SECTOR_SIZE - 2 * mem::size_of::<u32>()) / mem::size_of::<u32>();
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = NUM_DIRECT * SECTOR_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct FileHeader {
    // 不用usize是为了严控布局
    num_bytes: u32,
    num_sectors: u32,
    data_sectors: [u32; NUM_DIRECT],
}

const _: () = assert!(mem::size_of::<FileHeader>() == SECTOR_SIZE);

impl FileHeader {
    #[inline]
    pub fn new() -> Self {
        Self {
            num_bytes: 0,
            num_sectors: 0,
            data_sectors: [0; NUM_DIRECT],
        }
    }

    /// 在位图中为 `file_size` 字节的数据分配扇区。
    ///
    /// 空间不足时返回 `false`，且不会标记位图中的任何扇区。
    pub fn allocate(&mut self, free_map: &mut Bitmap, file_size: usize) -> bool {
        if file_size > MAX_FILE_SIZE {
            return false;
        }

        let num_sectors = file_size.div_ceil(SECTOR_SIZE);
        if free_map.num_clear() < num_sectors {
            return false;
        }

        for slot in &mut self.data_sectors[..num_sectors] {
            match free_map.find_and_set() {
                Some(sector) => *slot = sector,
                None => return false,
            }
        }
        self.num_bytes = file_size as u32;
        self.num_sectors = num_sectors as u32;

        true
    }

    /// 在位图中释放全部数据扇区
    pub fn deallocate(&self, free_map: &mut Bitmap) {
        for &sector in self.data_sectors() {
            debug_assert!(free_map.test(sector), "sector {sector} is not allocated");
            free_map.clear(sector);
        }
    }

    pub fn fetch_from(sector: u32, block_device: &Arc<dyn BlockDevice>) -> Self {
        SectorBuf::fetch(sector, block_device).map(0, |header: &FileHeader| header.clone())
    }

    pub fn write_back(&self, sector: u32, block_device: &Arc<dyn BlockDevice>) {
        let mut buf = SectorBuf::zeroed(sector);
        buf.map_mut(0, |header: &mut FileHeader| header.clone_from(self));
        buf.write_back(block_device);
    }

    /// 文件内的字节偏移所在的扇区号
    #[inline]
    pub fn byte_to_sector(&self, offset: usize) -> u32 {
        self.data_sectors[offset / SECTOR_SIZE]
    }

    #[inline]
    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    #[inline]
    pub fn data_sectors(&self) -> &[u32] {
        &self.data_sectors[..self.num_sectors as usize]
    }

    /// 文件头内容自洽：长度与扇区数相符，且扇区号都在磁盘范围内。
    ///
    /// 被删除文件的文件头扇区可能已被他人重用，恢复前需要检查。
    pub fn is_consistent(&self) -> bool {
        let num_bytes = self.num_bytes as usize;
        let num_sectors = self.num_sectors as usize;

        num_bytes <= MAX_FILE_SIZE
            && num_sectors == num_bytes.div_ceil(SECTOR_SIZE)
            && self
                .data_sectors()
                .iter()
                .all(|&sector| (sector as usize) < NUM_SECTORS)
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHeader contents. File size: {}. File blocks:", self.num_bytes)?;
        for sector in self.data_sectors() {
            write!(f, " {sector}")?;
        }
        writeln!(f)
    }
}
