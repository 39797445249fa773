//! Common utilities for tests
#![allow(dead_code)]

use std::{
    io::Result,
    sync::{Arc, Mutex},
};

use chainfs::{BlockDevice, FileSystem, MemDisk, SectorId};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// e.g. log!("{}", x) -> println!("[test] ...");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// 扇区大小 = 数据区大小 + 8 字节链接头
pub fn sector_size_for(block_data_size: usize) -> usize {
    block_data_size + chainfs::fs::config::BLOCK_LINK_SIZE
}

pub fn mem_device(num_sectors: u32, block_data_size: usize) -> Arc<dyn BlockDevice> {
    Arc::new(MemDisk::new(num_sectors, sector_size_for(block_data_size)))
}

/// 记录每个扇区被读了多少次的内存盘
pub struct CountingDisk {
    inner: MemDisk,
    reads: Mutex<Vec<usize>>,
}

impl CountingDisk {
    pub fn new(num_sectors: u32, block_data_size: usize) -> Self {
        Self {
            inner: MemDisk::new(num_sectors, sector_size_for(block_data_size)),
            reads: Mutex::new(vec![0; num_sectors as usize]),
        }
    }

    pub fn reads_of(&self, sector: SectorId) -> usize {
        self.reads.lock().unwrap()[sector as usize]
    }

    pub fn reset(&self) {
        self.reads.lock().unwrap().fill(0);
    }
}

impl BlockDevice for CountingDisk {
    fn sector_size(&self) -> usize {
        self.inner.sector_size()
    }

    fn num_sectors(&self) -> u32 {
        self.inner.num_sectors()
    }

    fn read_sector(&self, sector: SectorId, buf: &mut [u8]) -> Result<()> {
        if let Some(count) = self.reads.lock().unwrap().get_mut(sector as usize) {
            *count += 1;
        }
        self.inner.read_sector(sector, buf)
    }

    fn write_sector(&self, sector: SectorId, buf: &[u8]) -> Result<()> {
        self.inner.write_sector(sector, buf)
    }
}

/// 新格式化的内存卷
pub fn fresh_volume(num_sectors: u32, block_data_size: usize) -> FileSystem {
    FileSystem::format(mem_device(num_sectors, block_data_size)).unwrap()
}
