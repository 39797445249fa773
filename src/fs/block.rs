use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, SectorId},
    fs::{
        config::{block_data_size, BLOCK_LINK_SIZE, END_OF_CHAIN},
        error::{FileSystemError, Result},
    },
};

/// 每个扇区开头的链接头，磁盘上固定 8 字节（bincode 定长小端编码）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BlockLink {
    sector: i32,
    next_sector: i32,
}

/// 扇区链中的一个节点：链接头 + `sector_size - 8` 字节数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    sector: SectorId,
    next_sector: Option<SectorId>,
    data: Vec<u8>,
}

pub(crate) fn encode_sector(sector: Option<SectorId>) -> i32 {
    sector.map_or(END_OF_CHAIN, |s| s as i32)
}

pub(crate) fn decode_sector(raw: i32) -> Option<SectorId> {
    if raw < 0 {
        None
    } else {
        Some(raw as SectorId)
    }
}

impl Block {
    /// 新建一个数据全零的块
    pub fn new(sector: SectorId, next_sector: Option<SectorId>, data_size: usize) -> Self {
        Self {
            sector,
            next_sector,
            data: vec![0u8; data_size],
        }
    }

    /// 从扇区读出一个块。链接头中记录的扇区号必须与读取位置一致。
    pub fn fetch_from(device: &dyn BlockDevice, sector: SectorId) -> Result<Self> {
        let sector_size = device.sector_size();
        let mut buf = vec![0u8; sector_size];
        device.read_sector(sector, &mut buf)?;

        let link: BlockLink = bincode::deserialize(&buf[..BLOCK_LINK_SIZE])?;
        if decode_sector(link.sector) != Some(sector) {
            return Err(FileSystemError::CorruptChain(format!(
                "sector {} carries the link header of sector {}",
                sector, link.sector
            )));
        }

        Ok(Self {
            sector,
            next_sector: decode_sector(link.next_sector),
            data: buf[BLOCK_LINK_SIZE..].to_vec(),
        })
    }

    /// 写回自己所在的扇区
    pub fn write_back(&self, device: &dyn BlockDevice) -> Result<()> {
        let sector_size = device.sector_size();
        debug_assert_eq!(self.data.len(), block_data_size(sector_size));

        let link = BlockLink {
            sector: self.sector as i32,
            next_sector: encode_sector(self.next_sector),
        };
        let mut buf = bincode::serialize(&link)?;
        buf.extend_from_slice(&self.data);
        buf.resize(sector_size, 0);

        debug!("write block {} (next {:?})", self.sector, self.next_sector);
        device.write_sector(self.sector, &buf)?;
        Ok(())
    }

    pub fn sector(&self) -> SectorId {
        self.sector
    }

    pub fn next_sector(&self) -> Option<SectorId> {
        self.next_sector
    }

    pub fn set_next_sector(&mut self, next: Option<SectorId>) {
        self.next_sector = next;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
