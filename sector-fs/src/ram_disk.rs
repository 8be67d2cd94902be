use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::config::SECTOR_SIZE;

/// 位于内存的块设备
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; sectors * SECTOR_SIZE]),
        }
    }

    /// 整个磁盘的拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let data = self.data.lock();
        let start = block_id * SECTOR_SIZE;
        buf.copy_from_slice(&data[start..start + SECTOR_SIZE]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut data = self.data.lock();
        let start = block_id * SECTOR_SIZE;
        data[start..start + SECTOR_SIZE].copy_from_slice(buf);
    }
}
