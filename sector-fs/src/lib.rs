#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* sector-fs 的整体架构，自上而下 */

// 控制层：创建、打开、删除、恢复等对外操作
mod fs;

// 路径解析层：逐级打开中间目录
mod path;

// 目录表：一个目录文件的内容
mod directory;

// 打开文件层：带游标的字节流，以及描述符表
mod fd_table;
mod open_file;

// 磁盘数据结构层
mod layout;

// 扇区缓冲层
mod sector;

mod error;
mod ram_disk;

pub mod config;

pub use self::{
    directory::Directory,
    error::{Error, Result},
    fs::{Dump, FileSystem, TreeNode},
    layout::{Bitmap, DirEntry, EntryFlag, FileHeader, MAX_FILE_SIZE, NUM_DIRECT},
    open_file::OpenFile,
    ram_disk::RamDisk,
};
