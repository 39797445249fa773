use std::{
    io::Result,
    sync::{Mutex, MutexGuard},
};

use crate::disk::{
    block_device::{check_request, BlockDevice},
    types::SectorId,
};

/// 内存中的磁盘，测试和临时卷使用
#[derive(Debug)]
pub struct MemDisk {
    data: Mutex<Vec<u8>>,
    num_sectors: u32,
    sector_size: usize,
}

impl MemDisk {
    pub fn new(num_sectors: u32, sector_size: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; num_sectors as usize * sector_size]),
            num_sectors,
            sector_size,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<u8>>> {
        self.data
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "disk lock poisoned"))
    }
}

impl BlockDevice for MemDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn read_sector(&self, sector: SectorId, buf: &mut [u8]) -> Result<()> {
        check_request(self, sector, buf.len())?;
        let start = sector as usize * self.sector_size;
        let data = self.lock()?;
        buf.copy_from_slice(&data[start..start + self.sector_size]);
        Ok(())
    }

    fn write_sector(&self, sector: SectorId, buf: &[u8]) -> Result<()> {
        check_request(self, sector, buf.len())?;
        let start = sector as usize * self.sector_size;
        let mut data = self.lock()?;
        data[start..start + self.sector_size].copy_from_slice(buf);
        Ok(())
    }
}
