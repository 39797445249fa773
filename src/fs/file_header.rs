use std::fmt::Write as _;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, SectorId},
    fs::{
        bitmap::PersistentBitmap,
        block::{decode_sector, encode_sector, Block},
        config::block_data_size,
        error::{FileSystemError, Result},
    },
};

/// 磁盘上的文件头（inode）：文件长度 + 扇区链的首扇区。
///
/// 数据按链式分配：每个数据扇区开头记录下一个扇区号，
/// 链上第 i 个块保存文件的 `[i * BlockDataSize, (i + 1) * BlockDataSize)` 字节。
/// 整个结构序列化后放在一个扇区里，剩余部分补零。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    num_bytes: i32,          // 文件大小（字节）
    num_sectors: i32,        // 链上的块数
    first_block_sector: i32, // 链首扇区，-1 表示空链
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            num_bytes: 0,
            num_sectors: 0,
            first_block_sector: encode_sector(None),
        }
    }

    /// 为新文件分配 `file_size` 字节所需的扇区，并把它们按分配顺序串成链。
    ///
    /// 空闲扇区不足时返回 `OutOfSpace`，此时位图和磁盘都不会被修改。
    pub fn allocate(
        &mut self,
        device: &dyn BlockDevice,
        bitmap: &mut PersistentBitmap,
        file_size: usize,
    ) -> Result<()> {
        let data_size = block_data_size(device.sector_size());
        let needed = file_size.div_ceil(data_size);
        // 文件头里的长度和块数都是 i32
        let (Ok(num_bytes), Ok(num_sectors)) = (i32::try_from(file_size), i32::try_from(needed))
        else {
            return Err(FileSystemError::OutOfSpace);
        };
        if bitmap.num_clear() < needed {
            return Err(FileSystemError::OutOfSpace);
        }

        let mut first = None;
        let mut prev: Option<Block> = None;
        for _ in 0..needed {
            let sector = bitmap.find_and_set().ok_or_else(|| {
                FileSystemError::CorruptChain(
                    "bitmap reported free sectors but none could be claimed".to_string(),
                )
            })?;

            match prev.as_mut() {
                None => first = Some(sector),
                Some(block) => {
                    block.set_next_sector(Some(sector));
                    block.write_back(device)?;
                }
            }

            let block = Block::new(sector, None, data_size);
            block.write_back(device)?;
            prev = Some(block);
        }

        self.num_bytes = num_bytes;
        self.num_sectors = num_sectors;
        self.first_block_sector = encode_sector(first);
        debug!(
            "allocated {} bytes in {} blocks starting at {:?}",
            file_size, needed, first
        );
        Ok(())
    }

    /// 把链上所有扇区还给位图。
    ///
    /// 先完整走一遍链并检查每个扇区确实被标记为已用，全部通过后才清除，
    /// 所以出错时位图保持原样。
    pub fn deallocate(
        &self,
        device: &dyn BlockDevice,
        bitmap: &mut PersistentBitmap,
    ) -> Result<()> {
        let chain = self.chain(device)?;
        if let Some(&sector) = chain.iter().find(|&&s| !bitmap.test(s)) {
            return Err(FileSystemError::CorruptChain(format!(
                "sector {} belongs to a chain but is not marked in use",
                sector
            )));
        }
        for &sector in &chain {
            bitmap.clear(sector);
        }
        debug!("released {} blocks: {:?}", chain.len(), chain);
        Ok(())
    }

    /// 沿链走到第 `offset / BlockDataSize` 个块，返回它所在的扇区和下一个扇区。
    /// 代价与 offset 成正比，不支持随机访问。
    pub fn byte_to_sector_and_next_sector(
        &self,
        device: &dyn BlockDevice,
        offset: usize,
    ) -> Result<(SectorId, Option<SectorId>)> {
        let block = self.block_at(device, offset)?;
        Ok((block.sector(), block.next_sector()))
    }

    /// 从链首走到 `offset` 所在的块并把它读出来。
    /// 途经的每个扇区（包括目标块）恰好读一次。
    pub fn block_at(&self, device: &dyn BlockDevice, offset: usize) -> Result<Block> {
        let index = offset / block_data_size(device.sector_size());
        if index >= self.num_blocks() {
            return Err(FileSystemError::CorruptChain(format!(
                "offset {} lies beyond a chain of {} blocks",
                offset,
                self.num_blocks()
            )));
        }

        let mut block = Block::fetch_from(device, self.head()?)?;
        for hop in 0..index {
            let next = block.next_sector().ok_or_else(|| {
                FileSystemError::CorruptChain(format!(
                    "chain ends after {} of {} blocks",
                    hop + 1,
                    self.num_blocks()
                ))
            })?;
            block = Block::fetch_from(device, next)?;
        }
        Ok(block)
    }

    /// 链上的全部扇区（按链的顺序）。
    /// 链的长度必须恰好等于 `num_sectors`，否则视为损坏。
    pub fn chain(&self, device: &dyn BlockDevice) -> Result<Vec<SectorId>> {
        let expected = self.num_blocks();
        let mut sectors = Vec::with_capacity(expected);
        let mut current = decode_sector(self.first_block_sector);

        while let Some(sector) = current {
            if sectors.len() == expected {
                return Err(FileSystemError::CorruptChain(format!(
                    "chain longer than the expected {} blocks",
                    expected
                )));
            }
            let block = Block::fetch_from(device, sector)?;
            sectors.push(sector);
            current = block.next_sector();
        }

        if sectors.len() != expected {
            return Err(FileSystemError::CorruptChain(format!(
                "chain ends after {} of {} blocks",
                sectors.len(),
                expected
            )));
        }
        Ok(sectors)
    }

    pub fn fetch_from(device: &dyn BlockDevice, sector: SectorId) -> Result<Self> {
        let mut buf = vec![0u8; device.sector_size()];
        device.read_sector(sector, &mut buf)?;
        let header: FileHeader = bincode::deserialize(&buf)?;
        if header.num_bytes < 0 || header.num_sectors < 0 {
            return Err(FileSystemError::CorruptChain(format!(
                "sector {} does not hold a file header",
                sector
            )));
        }
        Ok(header)
    }

    pub fn write_back(&self, device: &dyn BlockDevice, sector: SectorId) -> Result<()> {
        let mut buf = bincode::serialize(self)?;
        buf.resize(device.sector_size(), 0);
        device.write_sector(sector, &buf)?;
        Ok(())
    }

    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    pub fn num_blocks(&self) -> usize {
        self.num_sectors as usize
    }

    pub fn first_block_sector(&self) -> Option<SectorId> {
        decode_sector(self.first_block_sector)
    }

    fn head(&self) -> Result<SectorId> {
        self.first_block_sector().ok_or_else(|| {
            FileSystemError::CorruptChain(format!(
                "header of {} bytes has no first block",
                self.num_bytes
            ))
        })
    }

    /// 文件头、扇区链以及可打印的文件内容（不可打印字节以 `\xx` 表示）
    pub fn describe(&self, device: &dyn BlockDevice) -> Result<String> {
        let mut out = String::new();
        let chain = self.chain(device)?;

        let _ = writeln!(
            out,
            "FileHeader contents.  File size: {}.  File blocks:",
            self.num_bytes
        );
        let sectors: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
        let _ = writeln!(out, "{}", sectors.join(" "));

        let _ = writeln!(out, "File contents:");
        let mut remaining = self.file_length();
        for &sector in &chain {
            let block = Block::fetch_from(device, sector)?;
            let take = remaining.min(block.data().len());
            for &byte in &block.data()[..take] {
                if (0x20..=0x7e).contains(&byte) {
                    out.push(byte as char);
                } else {
                    let _ = write!(out, "\\{:x}", byte);
                }
            }
            out.push('\n');
            remaining -= take;
        }
        Ok(out)
    }
}
