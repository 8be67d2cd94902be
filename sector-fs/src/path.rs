//! # 路径解析层
//!
//! 从起始目录出发，自左向右逐级打开中间目录，
//! 最终停在末级分量的父目录上。没有 `.`、`..`，也没有符号链接。

use alloc::vec::Vec;
use core::ops::Deref;

use crate::config::FILE_NAME_MAX_LEN;
use crate::{Directory, Error, OpenFile, Result};

pub trait Path {
    /// 以`/`分隔的各级分量；连续的`/`视作一个，首尾的`/`被忽略。
    /// 分量中不能含有 `\0`。
    fn components(&self) -> Result<Vec<&str>>;

    /// 返回路径的`(中间目录, 末级分量)`
    fn split_leaf(&self) -> Result<(Vec<&str>, &str)> {
        let mut cmps = self.components()?;
        let leaf = cmps.pop().ok_or(Error::InvalidPath)?;
        Ok((cmps, leaf))
    }
}

impl Path for str {
    fn components(&self) -> Result<Vec<&str>> {
        let cmps: Vec<&str> = self.split('/').filter(|cmp| !cmp.is_empty()).collect();
        // 目录项中的名字以 \0 结尾
        if cmps.is_empty() || cmps.iter().any(|cmp| cmp.contains('\0')) {
            return Err(Error::InvalidPath);
        }
        if cmps.iter().any(|cmp| cmp.len() > FILE_NAME_MAX_LEN) {
            return Err(Error::NameTooLong);
        }
        Ok(cmps)
    }
}

/// 目录的底层文件：常开的起始目录，或者解析途中打开的子目录
pub enum DirFile<'a> {
    Start(&'a OpenFile),
    Opened(OpenFile),
}

impl Deref for DirFile<'_> {
    type Target = OpenFile;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Start(file) => *file,
            Self::Opened(file) => file,
        }
    }
}

/// 解析结果：末级分量，以及它的父目录
pub struct Resolved<'a, 'p> {
    pub leaf: &'p str,
    pub dir_file: DirFile<'a>,
    pub directory: Directory,
}

/// 从 `start` 目录出发解析 `path`。
///
/// 中间分量用不可恢复查找：不存在或不是目录时立即返回
/// [`Error::PathNotFound`]。途中打开的子目录文件随返回值一起释放，不写回。
pub fn resolve<'a, 'p>(start: &'a OpenFile, path: &'p str) -> Result<Resolved<'a, 'p>> {
    let (dirs, leaf) = path.split_leaf()?;

    let mut dir_file = DirFile::Start(start);
    let mut directory = Directory::fetch_from(&dir_file);

    for cmp in dirs {
        let entry = directory.find_entry(cmp, false).ok_or_else(|| {
            log::debug!("{cmp:?} not found while resolving {path:?}");
            Error::PathNotFound
        })?;
        if !entry.is_dir() {
            log::debug!("{cmp:?} is not a directory while resolving {path:?}");
            return Err(Error::PathNotFound);
        }

        let sub = OpenFile::new(entry.sector(), start.block_device().clone());
        directory = Directory::fetch_from(&sub);
        dir_file = DirFile::Opened(sub);
    }

    Ok(Resolved {
        leaf,
        dir_file,
        directory,
    })
}
