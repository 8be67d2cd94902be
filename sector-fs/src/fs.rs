//! # 控制层
//!
//! 位图文件与根目录文件在 [`FileSystem`] 存活期间一直打开。
//!
//! 修改磁盘的操作都在位图与目录表的内存副本上进行，
//! 全部成功后才按 文件头 → 目录 → 位图 的顺序写回；
//! 任何一步失败都直接丢弃副本，磁盘保持原样。
//! 写回的几步之间没有日志保护，中途断电可能让三者互相矛盾。

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;

use crate::config::*;
use crate::fd_table::FdTable;
use crate::path::{self, Path, Resolved};
use crate::{Bitmap, DirEntry, Directory, Error, FileHeader, OpenFile, Result};

pub struct FileSystem {
    block_device: Arc<dyn BlockDevice>,
    /// 位图文件，常开
    free_map_file: OpenFile,
    /// 根目录文件，常开
    directory_file: OpenFile,
    open_files: FdTable,
}

/// 目录树中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// 以`/`开头的完整路径
    pub path: String,
    pub is_dir: bool,
    /// 文件头记录的字节数
    pub size: usize,
}

/// 文件系统全貌：两个常开文件的文件头、位图与根目录
#[derive(Debug, Clone)]
pub struct Dump {
    pub free_map_header: FileHeader,
    pub directory_header: FileHeader,
    pub free_map: Bitmap,
    pub directory: Directory,
}

impl FileSystem {
    /// 在空磁盘上建立只有根目录的文件系统
    pub fn format(block_device: Arc<dyn BlockDevice>) -> Self {
        log::info!("formatting the file system");

        let mut free_map = Bitmap::new();
        let mut free_map_header = FileHeader::new();
        let mut directory_header = FileHeader::new();

        // 先占住两个固定扇区，再为两个文件的内容分配空间
        free_map.mark(FREE_MAP_SECTOR);
        free_map.mark(DIRECTORY_SECTOR);
        assert!(free_map_header.allocate(&mut free_map, FREE_MAP_FILE_SIZE));
        assert!(directory_header.allocate(&mut free_map, DIRECTORY_FILE_SIZE));

        // 打开文件时会读取文件头，因此文件头要先落盘
        free_map_header.write_back(FREE_MAP_SECTOR, &block_device);
        directory_header.write_back(DIRECTORY_SECTOR, &block_device);

        let fs = Self::open_roots(block_device);
        free_map.write_back(&fs.free_map_file);
        Directory::new().write_back(&fs.directory_file);

        fs
    }

    /// 打开已格式化的磁盘。
    ///
    /// 两个常开文件的长度与格式化时不符，说明磁盘未经格式化。
    pub fn mount(block_device: Arc<dyn BlockDevice>) -> Result<Self> {
        log::debug!("mounting the file system");

        let fs = Self::open_roots(block_device);
        if fs.free_map_file.length() != FREE_MAP_FILE_SIZE
            || fs.directory_file.length() != DIRECTORY_FILE_SIZE
        {
            log::warn!("disk does not hold a formatted file system");
            return Err(Error::Unformatted);
        }

        Ok(fs)
    }

    /// 创建 `initial_size` 字节的文件，文件大小此后不再改变
    pub fn create(&mut self, path: &str, initial_size: usize) -> Result<()> {
        log::debug!("creating file {path:?} size {initial_size}");
        self.create_entry(path, initial_size, false)
            .inspect_err(|err| log::warn!("failed to create {path:?}: {err}"))
    }

    /// 创建空目录
    pub fn create_folder(&mut self, path: &str) -> Result<()> {
        log::debug!("creating folder {path:?}");
        self.create_entry(path, DIRECTORY_FILE_SIZE, true)
            .inspect_err(|err| log::warn!("failed to create folder {path:?}: {err}"))
    }

    /// 打开文件并返回描述符
    pub fn open(&mut self, path: &str) -> Result<usize> {
        log::debug!("opening file {path:?}");

        let Resolved {
            leaf, directory, ..
        } = path::resolve(&self.directory_file, path)?;
        let sector = directory.find(leaf, false).ok_or(Error::NotFound)?;

        let file = OpenFile::new(sector, self.block_device.clone());
        self.open_files.insert(file)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        log::debug!("closing fd {fd}");
        self.open_files.remove(fd).map(drop)
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        Ok(self.open_files.get_mut(fd)?.read(buf))
    }

    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        Ok(self.open_files.get_mut(fd)?.write(buf))
    }

    /// 删除文件或目录。
    ///
    /// 目录的子项不会被递归删除：它们的扇区仍然被占用，但再也无法访问。
    pub fn remove(&mut self, path: &str) -> Result<()> {
        log::debug!("removing {path:?}");
        self.remove_entry(path)
            .inspect_err(|err| log::warn!("failed to remove {path:?}: {err}"))
    }

    /// 读出一个文件的全部内容，即使它已经被删除。
    ///
    /// 删除操作不会抹掉目录项与数据扇区，所以只要这些扇区
    /// 还没有被后来的创建操作重用，内容就原样可得；重用之后得到的是别人的数据。
    pub fn recover(&self, path: &str) -> Result<Vec<u8>> {
        log::debug!("recovering {path:?}");

        let Resolved {
            leaf, directory, ..
        } = path::resolve(&self.directory_file, path)?;
        let sector = directory.find(leaf, true).ok_or(Error::NotFound)?;

        let mut file = OpenFile::new(sector, self.block_device.clone());
        if !file.header().is_consistent() {
            log::warn!("header of {path:?} at sector {sector} has been overwritten");
            return Err(Error::NotFound);
        }

        let mut buf = vec![0; file.length()];
        let len = file.read(&mut buf);
        buf.truncate(len);
        Ok(buf)
    }

    /// 根目录下的全部目录项
    pub fn list(&self) -> Vec<DirEntry> {
        Directory::fetch_from(&self.directory_file)
            .entries()
            .cloned()
            .collect()
    }

    /// 任一目录下的全部目录项，`/` 表示根目录
    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        if path.trim_matches('/').is_empty() {
            return Ok(self.list());
        }

        let Resolved {
            leaf, directory, ..
        } = path::resolve(&self.directory_file, path)?;
        let entry = directory.find_entry(leaf, false).ok_or(Error::NotFound)?;
        if !entry.is_dir() {
            return Err(Error::PathNotFound);
        }

        let dir_file = OpenFile::new(entry.sector(), self.block_device.clone());
        Ok(Directory::fetch_from(&dir_file).entries().cloned().collect())
    }

    /// 深度优先遍历整棵目录树，结果按路径排序
    pub fn walk(&self) -> Vec<TreeNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![(String::new(), DIRECTORY_SECTOR)];

        while let Some((prefix, sector)) = stack.pop() {
            let dir_file = OpenFile::new(sector, self.block_device.clone());
            for entry in Directory::fetch_from(&dir_file).entries() {
                let path = format!("{prefix}/{}", entry.name());
                let header = FileHeader::fetch_from(entry.sector(), &self.block_device);
                if entry.is_dir() {
                    stack.push((path.clone(), entry.sector()));
                }
                nodes.push(TreeNode {
                    path,
                    is_dir: entry.is_dir(),
                    size: header.file_length(),
                });
            }
        }

        nodes.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        nodes
    }

    pub fn print(&self) -> Dump {
        Dump {
            free_map_header: FileHeader::fetch_from(FREE_MAP_SECTOR, &self.block_device),
            directory_header: FileHeader::fetch_from(DIRECTORY_SECTOR, &self.block_device),
            free_map: self.free_map(),
            directory: Directory::fetch_from(&self.directory_file),
        }
    }

    /// 磁盘上位图的副本
    #[inline]
    pub fn free_map(&self) -> Bitmap {
        Bitmap::fetch_from(&self.free_map_file)
    }

    /// 已打开的描述符个数
    #[inline]
    pub fn open_files(&self) -> usize {
        self.open_files.len()
    }
}

impl FileSystem {
    fn open_roots(block_device: Arc<dyn BlockDevice>) -> Self {
        Self {
            free_map_file: OpenFile::new(FREE_MAP_SECTOR, block_device.clone()),
            directory_file: OpenFile::new(DIRECTORY_SECTOR, block_device.clone()),
            block_device,
            open_files: FdTable::new(),
        }
    }

    fn create_entry(&self, path: &str, initial_size: usize, is_dir: bool) -> Result<()> {
        let Resolved {
            leaf,
            dir_file,
            mut directory,
        } = path::resolve(&self.directory_file, path)?;

        if directory.find(leaf, false).is_some() {
            return Err(Error::AlreadyExists);
        }

        let mut free_map = Bitmap::fetch_from(&self.free_map_file);
        let sector = free_map.find_and_set().ok_or(Error::NoFreeSectors)?;
        directory.add(leaf, sector, is_dir)?;

        let mut header = FileHeader::new();
        if !header.allocate(&mut free_map, initial_size) {
            return Err(Error::InsufficientSpace);
        }

        // 全部分配成功，依次写回
        header.write_back(sector, &self.block_device);
        if is_dir {
            // 目录项可见之前，新目录必须已经是合法的空目录
            let new_dir_file = OpenFile::new(sector, self.block_device.clone());
            Directory::new().write_back(&new_dir_file);
        }
        directory.write_back(&dir_file);
        free_map.write_back(&self.free_map_file);

        Ok(())
    }

    fn remove_entry(&self, path: &str) -> Result<()> {
        let Resolved {
            leaf,
            dir_file,
            mut directory,
        } = path::resolve(&self.directory_file, path)?;

        let sector = directory.find(leaf, false).ok_or(Error::NotFound)?;
        let header = FileHeader::fetch_from(sector, &self.block_device);

        let mut free_map = Bitmap::fetch_from(&self.free_map_file);
        header.deallocate(&mut free_map);
        free_map.clear(sector);
        directory.remove(leaf)?;

        free_map.write_back(&self.free_map_file);
        directory.write_back(&dir_file);

        Ok(())
    }
}

impl Drop for FileSystem {
    fn drop(&mut self) {
        if !self.open_files.is_empty() {
            log::debug!("closing {} open files", self.open_files.len());
        }
        self.open_files.clear();
    }
}

impl fmt::Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bit map file header:\n{}", self.free_map_header)?;
        write!(f, "Directory file header:\n{}", self.directory_header)?;
        write!(f, "{}", self.free_map)?;
        write!(f, "{}", self.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_FILE_SIZE, NUM_DIRECT, RamDisk};

    fn new_fs() -> (Arc<RamDisk>, FileSystem) {
        let disk = Arc::new(RamDisk::new(NUM_SECTORS));
        let fs = FileSystem::format(disk.clone());
        (disk, fs)
    }

    fn write_file(fs: &mut FileSystem, path: &str, data: &[u8]) {
        fs.create(path, data.len()).unwrap();
        let fd = fs.open(path).unwrap();
        assert_eq!(fs.write(fd, data).unwrap(), data.len());
        fs.close(fd).unwrap();
    }

    fn read_file(fs: &mut FileSystem, path: &str) -> Vec<u8> {
        let fd = fs.open(path).unwrap();
        let mut data = Vec::new();
        let mut buf = [0; SECTOR_SIZE];
        loop {
            let len = fs.read(fd, &mut buf).unwrap();
            if len == 0 {
                break;
            }
            data.extend_from_slice(&buf[..len]);
        }
        fs.close(fd).unwrap();
        data
    }

    fn pattern(len: usize, seed: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + seed) as u8).collect()
    }

    #[test]
    fn format_reserves_well_known_sectors() {
        let (_disk, fs) = new_fs();
        let free_map = fs.free_map();

        assert!(free_map.test(FREE_MAP_SECTOR));
        assert!(free_map.test(DIRECTORY_SECTOR));
        // 位图占1个扇区，根目录占3个扇区
        assert_eq!(free_map.allocated().collect::<Vec<_>>(), [0, 1, 2, 3, 4, 5]);
        assert!(fs.list().is_empty());

        let dump = fs.print();
        assert_eq!(dump.free_map_header.file_length(), FREE_MAP_FILE_SIZE);
        assert_eq!(dump.directory_header.file_length(), DIRECTORY_FILE_SIZE);
    }

    #[test]
    fn tree_survives_remount() {
        let (disk, mut fs) = new_fs();
        fs.create_folder("a").unwrap();
        fs.create_folder("a/b").unwrap();
        write_file(&mut fs, "a/b/c.txt", b"deep");
        fs.create("top", 300).unwrap();
        fs.create("a/gone", 10).unwrap();
        fs.remove("a/gone").unwrap();

        let tree = fs.walk();
        let free_map = fs.free_map();
        drop(fs);

        let mut fs = FileSystem::mount(disk).unwrap();
        assert_eq!(fs.walk(), tree);
        assert_eq!(fs.free_map(), free_map);
        assert_eq!(read_file(&mut fs, "a/b/c.txt"), b"deep");

        let paths: Vec<_> = tree.iter().map(|node| node.path.as_str()).collect();
        assert_eq!(paths, ["/a", "/a/b", "/a/b/c.txt", "/top"]);
        assert!(tree[1].is_dir);
        assert_eq!(tree[3].size, 300);
    }

    #[test]
    fn failed_create_leaves_disk_untouched() {
        let (disk, mut fs) = new_fs();
        fs.create_folder("dir").unwrap();
        let before = disk.snapshot();

        assert_eq!(
            fs.create("dir/huge", MAX_FILE_SIZE + 1),
            Err(Error::InsufficientSpace)
        );
        assert_eq!(disk.snapshot(), before);

        for i in 0..NUM_DIR_ENTRIES {
            fs.create(&format!("dir/{i}"), 0).unwrap();
        }
        let before = disk.snapshot();
        assert_eq!(fs.create("dir/more", 0), Err(Error::DirectoryFull));
        assert_eq!(fs.create_folder("dir/more"), Err(Error::DirectoryFull));
        assert_eq!(disk.snapshot(), before);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (disk, mut fs) = new_fs();
        fs.create("x", 10).unwrap();
        fs.create_folder("d").unwrap();
        let before = disk.snapshot();

        assert_eq!(fs.create("x", 10), Err(Error::AlreadyExists));
        assert_eq!(fs.create_folder("x"), Err(Error::AlreadyExists));
        assert_eq!(fs.create("/d/", 10), Err(Error::AlreadyExists));
        assert_eq!(disk.snapshot(), before);

        // 同名文件可以存在于不同目录
        fs.create("d/x", 10).unwrap();
    }

    #[test]
    fn removed_file_is_recoverable() {
        let (_disk, mut fs) = new_fs();
        let data = pattern(1000, 3);
        fs.create_folder("a").unwrap();
        write_file(&mut fs, "a/b.txt", &data);

        fs.remove("a/b.txt").unwrap();
        assert_eq!(fs.open("a/b.txt"), Err(Error::NotFound));
        assert_eq!(fs.recover("a/b.txt").unwrap(), data);

        // 仍在使用的文件同样可以读出
        write_file(&mut fs, "a/live", b"live");
        assert_eq!(fs.recover("a/live").unwrap(), b"live");
    }

    #[test]
    fn recover_failures() {
        let (_disk, mut fs) = new_fs();
        fs.create_folder("a").unwrap();

        assert_eq!(fs.recover("a/never"), Err(Error::NotFound));
        assert_eq!(fs.recover("missing/file"), Err(Error::PathNotFound));
    }

    #[test]
    fn missing_intermediate_touches_nothing() {
        let (disk, mut fs) = new_fs();
        fs.create_folder("x").unwrap();
        fs.create("x/file", 10).unwrap();
        let before = disk.snapshot();

        assert_eq!(fs.open("x/y/z"), Err(Error::PathNotFound));
        assert_eq!(fs.create("x/y/z", 10), Err(Error::PathNotFound));
        assert_eq!(fs.create_folder("x/y/z"), Err(Error::PathNotFound));
        assert_eq!(fs.remove("x/y/z"), Err(Error::PathNotFound));
        // 普通文件不能作为中间目录
        assert_eq!(fs.create("x/file/z", 10), Err(Error::PathNotFound));
        assert_eq!(fs.list_dir("x/file").err(), Some(Error::PathNotFound));

        assert_eq!(fs.remove("x/nothing"), Err(Error::NotFound));
        assert_eq!(fs.open(""), Err(Error::InvalidPath));
        assert_eq!(disk.snapshot(), before);
        assert_eq!(fs.open_files(), 0);
    }

    #[test]
    fn exhaustion_keeps_existing_files() {
        let (disk, mut fs) = new_fs();
        let dirs = NUM_DIR_ENTRIES - 1;
        for d in 0..dirs {
            fs.create_folder(&format!("d{d}")).unwrap();
        }

        let mut created = Vec::new();
        'fill: for d in 0..dirs {
            for f in 0..NUM_DIR_ENTRIES {
                let path = format!("d{d}/f{f}");
                match fs.create(&path, MAX_FILE_SIZE) {
                    Ok(()) => {
                        let fd = fs.open(&path).unwrap();
                        fs.write(fd, &pattern(MAX_FILE_SIZE, created.len())).unwrap();
                        fs.close(fd).unwrap();
                        created.push(path);
                    }
                    Err(err) => {
                        assert_eq!(err, Error::InsufficientSpace);
                        break 'fill;
                    }
                }
            }
        }
        assert!(fs.free_map().num_clear() <= NUM_DIRECT);

        // 剩下的扇区只够放文件头
        let mut empty = 0;
        let err = loop {
            let dir = dirs - 1 - empty / NUM_DIR_ENTRIES;
            let path = format!("d{dir}/e{}", empty % NUM_DIR_ENTRIES);
            match fs.create(&path, 0) {
                Ok(()) => empty += 1,
                Err(err) => break err,
            }
        };
        assert_eq!(err, Error::NoFreeSectors);
        assert_eq!(fs.free_map().num_clear(), 0);

        let before = disk.snapshot();
        // 文件头扇区先于目录槽位分配
        assert_eq!(fs.create("d0/late", 0), Err(Error::NoFreeSectors));
        assert_eq!(fs.create_folder("late"), Err(Error::NoFreeSectors));
        assert_eq!(disk.snapshot(), before);

        for (seed, path) in created.iter().enumerate() {
            assert_eq!(read_file(&mut fs, path), pattern(MAX_FILE_SIZE, seed));
        }
    }

    #[test]
    fn descriptor_lifecycle() {
        let (_disk, mut fs) = new_fs();
        fs.create("f", 16).unwrap();

        assert_eq!(fs.close(3), Err(Error::NotOpen));

        let fds: Vec<_> = (0..3).map(|_| fs.open("f").unwrap()).collect();
        assert_eq!(fds, [3, 4, 5]);
        fs.close(4).unwrap();
        assert_eq!(fs.open("f"), Ok(4));

        fs.close(5).unwrap();
        assert_eq!(fs.close(5), Err(Error::NotOpen));
        assert_eq!(fs.write(5, b"data"), Err(Error::NotOpen));
        assert_eq!(fs.read(5, &mut [0; 4]), Err(Error::NotOpen));
        assert_eq!(fs.open_files(), 2);
    }

    #[test]
    fn descriptors_have_independent_cursors() {
        let (_disk, mut fs) = new_fs();
        write_file(&mut fs, "f", b"abcdef");

        let first = fs.open("f").unwrap();
        let second = fs.open("f").unwrap();
        let mut buf = [0; 3];
        fs.read(first, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        fs.read(second, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        fs.read(first, &mut buf).unwrap();
        assert_eq!(&buf, b"def");
    }

    #[test]
    fn new_folder_is_empty_and_usable() {
        let (_disk, mut fs) = new_fs();
        fs.create_folder("docs").unwrap();
        assert!(fs.list_dir("docs").unwrap().is_empty());

        fs.create("docs/readme", 5).unwrap();
        let entries = fs.list_dir("/docs/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "readme");
        assert!(!entries[0].is_dir());

        let root = fs.list_dir("/").unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].is_dir());
    }

    #[test]
    fn removing_folder_orphans_children() {
        let (_disk, mut fs) = new_fs();
        fs.create_folder("d").unwrap();
        fs.create("d/child", 2 * SECTOR_SIZE).unwrap();
        let allocated_before = fs.free_map().allocated().count();

        fs.remove("d").unwrap();
        assert_eq!(fs.open("d/child"), Err(Error::PathNotFound));
        assert!(fs.list().is_empty());
        // 只释放了目录自身的文件头与三个数据扇区
        assert_eq!(fs.free_map().allocated().count(), allocated_before - 4);
    }

    #[test]
    fn freed_sectors_are_reused() {
        let (_disk, mut fs) = new_fs();
        fs.create("a", SECTOR_SIZE).unwrap();
        let allocated = fs.free_map();
        fs.remove("a").unwrap();

        fs.create("b", SECTOR_SIZE).unwrap();
        assert_eq!(fs.free_map(), allocated);
        assert_eq!(fs.list().len(), 1);
        assert_eq!(fs.list()[0].name(), "b");
    }

    #[test]
    fn dump_lists_root() {
        let (_disk, mut fs) = new_fs();
        fs.create_folder("d").unwrap();
        fs.create("f", 1).unwrap();

        let text = format!("{}", fs.print());
        assert!(text.starts_with("Bit map file header:\n"));
        assert!(text.contains("Bitmap set: 0 1 2 3 4 5"));
        assert!(text.contains("D d"));
        assert!(text.contains("F f"));
    }

    #[test]
    fn mount_rejects_blank_disk() {
        let disk = Arc::new(RamDisk::new(NUM_SECTORS));
        let before = disk.snapshot();
        assert_eq!(FileSystem::mount(disk.clone()).err(), Some(Error::Unformatted));
        assert_eq!(disk.snapshot(), before);
    }

    #[test]
    fn names_with_nul_are_rejected() {
        let (disk, mut fs) = new_fs();
        fs.create("a", 10).unwrap();
        let before = disk.snapshot();

        assert_eq!(fs.create("a\0x", 10), Err(Error::InvalidPath));
        assert_eq!(fs.create_folder("d\0"), Err(Error::InvalidPath));
        assert_eq!(fs.open("a\0x"), Err(Error::InvalidPath));
        assert_eq!(fs.remove("a\0"), Err(Error::InvalidPath));
        assert_eq!(fs.list_dir("a\0").err(), Some(Error::InvalidPath));
        assert_eq!(disk.snapshot(), before);

        let entries = fs.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "a");
    }

    #[test]
    fn recover_after_sectors_are_reused() {
        let (_disk, mut fs) = new_fs();
        fs.create_folder("a").unwrap();
        write_file(&mut fs, "a/old", &pattern(200, 1));
        fs.remove("a/old").unwrap();

        // 新文件拿到了同一个文件头扇区与数据扇区，a 中的旧目录项不受影响
        let new = pattern(200, 9);
        write_file(&mut fs, "new", &new);
        assert_eq!(fs.recover("a/old").unwrap(), new);
    }

    #[test]
    fn recover_with_overwritten_header() {
        let (_disk, mut fs) = new_fs();
        fs.create("first", 0).unwrap();
        fs.create("victim", 0).unwrap();
        fs.remove("first").unwrap();
        fs.remove("victim").unwrap();

        // 新文件的数据扇区正是 victim 的文件头扇区
        write_file(&mut fs, "filler", &[0xFF; SECTOR_SIZE]);
        assert_eq!(fs.recover("victim"), Err(Error::NotFound));
    }
}
