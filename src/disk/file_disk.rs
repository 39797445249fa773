use std::{
    fs::{File, OpenOptions},
    io::{Read, Result, Seek, SeekFrom, Write},
    path::Path,
    sync::Mutex,
};

use log::debug;

use crate::disk::{
    block_device::{check_request, BlockDevice},
    types::SectorId,
};

/// 以宿主机上的镜像文件模拟的磁盘
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    num_sectors: u32,
    sector_size: usize,
}

impl FileDisk {
    /// 打开（不存在则创建）镜像文件，并把长度扩展到 `num_sectors * sector_size`。
    /// 返回值的第二项表示镜像是否是新建的（需要格式化）。
    pub fn open<P: AsRef<Path>>(
        path: P,
        num_sectors: u32,
        sector_size: usize,
    ) -> Result<(Self, bool)> {
        let path = path.as_ref();
        let existed = path.exists();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let disk_size = num_sectors as u64 * sector_size as u64;
        let fresh = !existed || file.metadata()?.len() < disk_size;
        if fresh {
            debug!("allocating {} bytes for {}", disk_size, path.display());
            file.set_len(disk_size)?;
        }

        Ok((
            Self {
                file: Mutex::new(file),
                num_sectors,
                sector_size,
            },
            fresh,
        ))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "disk lock poisoned"))
    }
}

impl BlockDevice for FileDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn read_sector(&self, sector: SectorId, buf: &mut [u8]) -> Result<()> {
        check_request(self, sector, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(sector as u64 * self.sector_size as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_sector(&self, sector: SectorId, buf: &[u8]) -> Result<()> {
        check_request(self, sector, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(sector as u64 * self.sector_size as u64))?;
        file.write_all(buf)?;
        Ok(())
    }
}
