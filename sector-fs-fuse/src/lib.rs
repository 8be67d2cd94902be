
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use block_dev::BlockDevice;
use sector_fs::config::{DISK_SIZE, SECTOR_SIZE};
use sector_fs::FileSystem;

/// 以宿主机上的文件模拟磁盘
#[derive(Debug)]
pub struct BlockFile(pub Mutex<File>);

impl BlockFile {
    /// 创建（或截断）镜像文件，大小为整块磁盘
    pub fn create(path: &Path) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len(DISK_SIZE as u64)?;

        Ok(Self(Mutex::new(fd)))
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;
        if fd.metadata()?.len() < DISK_SIZE as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is smaller than a disk", path.display()),
            ));
        }

        Ok(Self(Mutex::new(fd)))
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(&mut buf[..SECTOR_SIZE])
            .expect("not a complete sector!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        file.write_all(&buf[..SECTOR_SIZE])
            .expect("not a complete sector!");
    }
}

/// 格式化新镜像
pub fn format_image(path: &Path) -> io::Result<FileSystem> {
    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(path)?);
    Ok(FileSystem::format(block_file))
}

/// 打开已有镜像
pub fn mount_image(path: &Path) -> io::Result<FileSystem> {
    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(path)?);
    FileSystem::mount(block_file).map_err(io::Error::other)
}

/// 把宿主机文件原样复制到文件系统中
pub fn copy_in(fs: &mut FileSystem, host: &Path, path: &str) -> io::Result<()> {
    let data = fs::read(host)?;
    log::info!("copying {} ({} bytes) to {path:?}", host.display(), data.len());

    fs.create(path, data.len()).map_err(io::Error::other)?;
    let fd = fs.open(path).map_err(io::Error::other)?;
    let written = fs.write(fd, &data).map_err(io::Error::other);
    fs.close(fd).map_err(io::Error::other)?;

    if written? != data.len() {
        return Err(io::Error::new(io::ErrorKind::WriteZero, "short write"));
    }
    Ok(())
}

/// 读出文件的全部内容
pub fn read_all(fs: &mut FileSystem, path: &str) -> io::Result<Vec<u8>> {
    let fd = fs.open(path).map_err(io::Error::other)?;
    let mut buffer = [0u8; SECTOR_SIZE];

    let mut bytes = Vec::new();
    loop {
        let len = fs.read(fd, &mut buffer).map_err(io::Error::other)?;
        if len == 0 {
            break;
        }
        bytes.extend_from_slice(&buffer[..len]);
    }
    fs.close(fd).map_err(io::Error::other)?;

    Ok(bytes)
}

/// 恢复文件（包括已删除的）到宿主机上的 `dst`
pub fn recover_to(fs: &FileSystem, src: &str, dst: &Path) -> io::Result<()> {
    let bytes = fs.recover(src).map_err(io::Error::other)?;
    log::info!("recovered {} bytes from {src:?}", bytes.len());
    fs::write(dst, bytes)
}
