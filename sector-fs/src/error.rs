use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

/// 文件系统操作失败的原因。
///
/// 任何一种失败都不会在磁盘上留下部分修改。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 中间分量不存在，或者不是目录
    #[display(fmt = "no such directory on the path")]
    PathNotFound,
    #[display(fmt = "file already exists")]
    AlreadyExists,
    /// 没有空闲扇区存放文件头
    #[display(fmt = "no free sector for the file header")]
    NoFreeSectors,
    /// 没有足够的空闲扇区存放数据
    #[display(fmt = "not enough free sectors for the file data")]
    InsufficientSpace,
    #[display(fmt = "directory is full")]
    DirectoryFull,
    #[display(fmt = "file descriptor is not open")]
    NotOpen,
    #[display(fmt = "no such file")]
    NotFound,
    #[display(fmt = "too many open files")]
    TooManyOpenFiles,
    /// 路径中没有任何分量
    #[display(fmt = "invalid path")]
    InvalidPath,
    #[display(fmt = "file name too long")]
    NameTooLong,
    /// 磁盘上没有格式化过的文件系统
    #[display(fmt = "disk is not formatted")]
    Unformatted,
}

impl core::error::Error for Error {}
