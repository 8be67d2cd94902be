//! # 文件描述符表
//!
//! 描述符编号到 [`OpenFile`] 的映射。新文件总是拿到
//! [`FIRST_DESCRIPTOR`] 起最小的空闲编号。

use alloc::collections::BTreeMap;

use crate::config::{FIRST_DESCRIPTOR, MAX_OPEN_FILES};
use crate::{Error, OpenFile, Result};

#[derive(Debug, Default)]
pub struct FdTable {
    files: BTreeMap<usize, OpenFile>,
}

impl FdTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: OpenFile) -> Result<usize> {
        let fd = (FIRST_DESCRIPTOR..MAX_OPEN_FILES)
            .find(|fd| !self.files.contains_key(fd))
            .ok_or(Error::TooManyOpenFiles)?;
        self.files.insert(fd, file);
        Ok(fd)
    }

    #[inline]
    pub fn get_mut(&mut self, fd: usize) -> Result<&mut OpenFile> {
        self.files.get_mut(&fd).ok_or(Error::NotOpen)
    }

    #[inline]
    pub fn remove(&mut self, fd: usize) -> Result<OpenFile> {
        self.files.remove(&fd).ok_or(Error::NotOpen)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 关闭全部描述符
    pub fn clear(&mut self) {
        self.files.clear();
    }
}
