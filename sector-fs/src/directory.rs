//! # 目录表
//!
//! 目录是内容为定长目录项数组的文件。
//! [`Directory`] 是这个数组在内存中的副本，
//! 整体读入、整体写回，不存在部分写。

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{DIRECTORY_FILE_SIZE, NUM_DIR_ENTRIES};
use crate::{DirEntry, Error, OpenFile, Result};

#[derive(Debug, Clone)]
pub struct Directory {
    table: Vec<DirEntry>,
}

impl Directory {
    /// 空目录
    #[inline]
    pub fn new() -> Self {
        Self {
            table: vec![DirEntry::default(); NUM_DIR_ENTRIES],
        }
    }

    pub fn fetch_from(file: &OpenFile) -> Self {
        let mut bytes = vec![0; DIRECTORY_FILE_SIZE];
        file.read_at(&mut bytes, 0);

        let mut directory = Self::new();
        for (entry, chunk) in directory
            .table
            .iter_mut()
            .zip(bytes.chunks_exact(DirEntry::SIZE))
        {
            entry.as_bytes_mut().copy_from_slice(chunk);
        }
        directory
    }

    pub fn write_back(&self, file: &OpenFile) {
        let bytes: Vec<u8> = self
            .table
            .iter()
            .flat_map(|entry| entry.as_bytes())
            .copied()
            .collect();
        file.write_at(&bytes, 0);
    }

    /// 按名字查找目录项，返回其文件头所在扇区。
    ///
    /// `recoverable` 为真时也匹配已删除的目录项；
    /// 同名项有多个时取表中第一个。
    #[inline]
    pub fn find(&self, name: &str, recoverable: bool) -> Option<u32> {
        self.find_entry(name, recoverable).map(DirEntry::sector)
    }

    pub fn find_entry(&self, name: &str, recoverable: bool) -> Option<&DirEntry> {
        self.table
            .iter()
            .find(|entry| (recoverable || entry.in_use()) && entry.name() == name)
    }

    /// 把新目录项放进第一个空槽位
    pub fn add(&mut self, name: &str, sector: u32, is_dir: bool) -> Result<()> {
        if self.find(name, false).is_some() {
            return Err(Error::AlreadyExists);
        }

        let slot = self
            .table
            .iter_mut()
            .find(|entry| !entry.in_use())
            .ok_or(Error::DirectoryFull)?;
        *slot = DirEntry::new(name, sector, is_dir);

        Ok(())
    }

    /// 把目录项标记为未使用，名字与扇区号保留
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let entry = self
            .table
            .iter_mut()
            .find(|entry| entry.in_use() && entry.name() == name)
            .ok_or(Error::NotFound)?;
        entry.release();

        Ok(())
    }

    /// 正在使用的目录项
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.table.iter().filter(|entry| entry.in_use())
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directory contents:")?;
        for entry in self.entries() {
            let kind = if entry.is_dir() { "D" } else { "F" };
            writeln!(f, "{kind} {:<26} sector {}", entry.name(), entry.sector())?;
        }
        Ok(())
    }
}
