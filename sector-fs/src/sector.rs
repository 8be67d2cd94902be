//! # 扇区缓冲层
//!
//! 把一个扇区复制到内存中，再以某种类型解读它。
//!
//! 与块缓存不同，缓冲区**不会**在析构时写回：
//! 修改只有经过 [`SectorBuf::write_back`] 才会落盘，丢弃缓冲区即丢弃修改。

use alloc::sync::Arc;
use core::mem;

use block_dev::BlockDevice;

use crate::config::SECTOR_SIZE;

#[repr(C, align(8))]
struct Aligned([u8; SECTOR_SIZE]);

/// 内存中的扇区
pub struct SectorBuf {
    /// 扇区数据
    data: Aligned,
    /// 对应的扇区号
    sector: u32,
}

impl SectorBuf {
    #[inline]
    pub fn zeroed(sector: u32) -> Self {
        Self {
            data: Aligned([0; SECTOR_SIZE]),
            sector,
        }
    }

    pub fn fetch(sector: u32, block_device: &Arc<dyn BlockDevice>) -> Self {
        let mut buf = Self::zeroed(sector);
        block_device.read_block(sector as usize, &mut buf.data.0);
        buf
    }

    #[inline]
    pub fn write_back(&self, block_device: &Arc<dyn BlockDevice>) {
        block_device.write_block(self.sector as usize, &self.data.0);
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data.0
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data.0
    }

    /// `T` 必须是任意比特模式都合法的纯数据类型
    pub fn get<T: Sized>(&self, offset: usize) -> &T {
        assert!(mem::size_of::<T>() + offset <= SECTOR_SIZE);
        assert_eq!(offset % mem::align_of::<T>(), 0);
        let addr = self.data.0[offset..].as_ptr().cast::<T>();
        unsafe { &*addr }
    }

    pub fn get_mut<T: Sized>(&mut self, offset: usize) -> &mut T {
        assert!(mem::size_of::<T>() + offset <= SECTOR_SIZE);
        assert_eq!(offset % mem::align_of::<T>(), 0);
        let addr = self.data.0[offset..].as_mut_ptr().cast::<T>();
        unsafe { &mut *addr }
    }

    #[inline]
    pub fn map<T: Sized, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T: Sized, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }
}
