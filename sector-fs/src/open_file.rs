//! # 打开文件层
//!
//! [`OpenFile`] 由文件头所在扇区构造，在文件的固定长度内按字节读写。
//! 文件不会增长：越过末尾的部分被截掉。

use alloc::sync::Arc;
use core::fmt;

use block_dev::BlockDevice;

use crate::config::SECTOR_SIZE;
use crate::sector::SectorBuf;
use crate::FileHeader;

pub struct OpenFile {
    /// 文件头所在扇区
    sector: u32,
    header: FileHeader,
    /// 读写游标
    seek_position: usize,
    block_device: Arc<dyn BlockDevice>,
}

impl OpenFile {
    pub fn new(sector: u32, block_device: Arc<dyn BlockDevice>) -> Self {
        Self {
            sector,
            header: FileHeader::fetch_from(sector, &block_device),
            seek_position: 0,
            block_device,
        }
    }

    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.header.file_length()
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        &self.block_device
    }

    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.seek_position = position;
    }

    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let read_size = self.read_at(buf, self.seek_position);
        self.seek_position += read_size;
        read_size
    }

    pub fn write(&mut self, buf: &[u8]) -> usize {
        let written_size = self.write_at(buf, self.seek_position);
        self.seek_position += written_size;
        written_size
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`
    pub fn read_at(&self, buf: &mut [u8], position: usize) -> usize {
        let mut start = position;
        let end = (start + buf.len()).min(self.length());

        if start >= end {
            return 0;
        }

        // 已读取多少字节
        let mut read_size = 0;
        loop {
            // 当前扇区的末地址(字节)
            let current_sector_end = ((start / SECTOR_SIZE + 1) * SECTOR_SIZE).min(end);
            let sector_read_size = current_sector_end - start;
            let dest = &mut buf[read_size..read_size + sector_read_size];

            let data = SectorBuf::fetch(self.header.byte_to_sector(start), &self.block_device);
            // 绝对地址 % 扇区大小 = 扇区内偏移
            let offset = start % SECTOR_SIZE;
            dest.copy_from_slice(&data.as_bytes()[offset..offset + sector_read_size]);

            read_size += sector_read_size;

            if current_sector_end == end {
                break;
            }

            start = current_sector_end;
        }

        read_size
    }

    /// 向指定位置(字节偏移)写入`buf`，不足一个扇区的部分先读后写
    pub fn write_at(&self, buf: &[u8], position: usize) -> usize {
        let mut start = position;
        let end = (start + buf.len()).min(self.length());

        if start >= end {
            return 0;
        }

        let mut written_size = 0;
        loop {
            let current_sector_end = ((start / SECTOR_SIZE + 1) * SECTOR_SIZE).min(end);
            let sector_write_size = current_sector_end - start;
            let sector = self.header.byte_to_sector(start);

            let mut data = if sector_write_size == SECTOR_SIZE {
                SectorBuf::zeroed(sector)
            } else {
                SectorBuf::fetch(sector, &self.block_device)
            };
            let offset = start % SECTOR_SIZE;
            data.as_bytes_mut()[offset..offset + sector_write_size]
                .copy_from_slice(&buf[written_size..written_size + sector_write_size]);
            data.write_back(&self.block_device);

            written_size += sector_write_size;

            if current_sector_end == end {
                break;
            }

            start = current_sector_end;
        }

        written_size
    }
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("sector", &self.sector)
            .field("length", &self.length())
            .field("seek_position", &self.seek_position)
            .finish()
    }
}
