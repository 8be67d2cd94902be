use core::{mem, ptr, slice};

use enumflags2::{bitflags, BitFlags};

use crate::config::FILE_NAME_MAX_LEN;

/// 目录项：名字、文件头所在扇区以及状态标志。
///
/// 删除目录项只清掉 [`EntryFlag::InUse`]，名字与扇区号留在原处，
/// 可恢复查找正是依赖于此。
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct DirEntry {
    // 最后一字节留给 \0
    name: [u8; FILE_NAME_MAX_LEN + 1],
    flags: u8,
    sector: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum EntryFlag {
    InUse = 0b0000_0001,
    Directory = 0b0000_0010,
}

impl DirEntry {
    /// 目录项大小恒为32字节
    pub const SIZE: usize = 32;

    pub fn new(name: &str, sector: u32, is_dir: bool) -> Self {
        let bytes = name.as_bytes();
        debug_assert!(bytes.len() <= FILE_NAME_MAX_LEN);
        let mut name = [0; FILE_NAME_MAX_LEN + 1];
        name[..bytes.len()].copy_from_slice(bytes);

        let mut flags = BitFlags::from_flag(EntryFlag::InUse);
        if is_dir {
            flags |= EntryFlag::Directory;
        }

        Self {
            name,
            flags: flags.bits(),
            sector,
        }
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(FILE_NAME_MAX_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn sector(&self) -> u32 {
        self.sector
    }

    #[inline]
    pub fn flags(&self) -> BitFlags<EntryFlag> {
        BitFlags::from_bits_truncate(self.flags)
    }

    #[inline]
    pub fn in_use(&self) -> bool {
        self.flags().contains(EntryFlag::InUse)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags().contains(EntryFlag::Directory)
    }

    /// 只清除使用标志
    #[inline]
    pub fn release(&mut self) {
        let mut flags = self.flags();
        flags.remove(EntryFlag::InUse);
        self.flags = flags.bits();
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}

const _: () = assert!(mem::size_of::<DirEntry>() == DirEntry::SIZE);
