use std::sync::Arc;

use log::debug;

use crate::{
    disk::{BlockDevice, SectorId},
    fs::{block::Block, config::block_data_size, error::Result, file_header::FileHeader},
};

/// 打开的文件。文件头在打开时读入内存，整个句柄生命周期内不再重读。
#[derive(Debug)]
pub struct OpenFile {
    device: Arc<dyn BlockDevice>,
    header: FileHeader,
    header_sector: SectorId,
    seek_position: usize,
}

impl OpenFile {
    pub fn open(device: Arc<dyn BlockDevice>, header_sector: SectorId) -> Result<Self> {
        let header = FileHeader::fetch_from(device.as_ref(), header_sector)?;
        Ok(Self {
            device,
            header,
            header_sector,
            seek_position: 0,
        })
    }

    /// 设置下一次 read/write 的起点，不做检查；越过文件末尾后读到 0 字节
    pub fn seek(&mut self, position: usize) {
        self.seek_position = position;
    }

    pub fn position(&self) -> usize {
        self.seek_position
    }

    pub fn read(&mut self, into: &mut [u8]) -> Result<usize> {
        let result = self.read_at(into, self.seek_position)?;
        self.seek_position += result;
        Ok(result)
    }

    pub fn write(&mut self, from: &[u8]) -> Result<usize> {
        let result = self.write_at(from, self.seek_position)?;
        self.seek_position += result;
        Ok(result)
    }

    /// 从 `position` 开始读，最多读到文件末尾，返回实际读到的字节数。
    pub fn read_at(&self, into: &mut [u8], position: usize) -> Result<usize> {
        let file_length = self.header.file_length();
        let Some(num_bytes) = clamp_request(into.len(), position, file_length) else {
            return Ok(0);
        };
        debug!(
            "reading {} bytes at {} from file of length {}",
            num_bytes, position, file_length
        );

        let data_size = block_data_size(self.device.sector_size());
        let first = position / data_size;
        let last = (position + num_bytes - 1) / data_size;

        let mut buf = vec![0u8; (last - first + 1) * data_size];
        for i in first..=last {
            let chunk = &mut buf[(i - first) * data_size..(i - first + 1) * data_size];
            chunk.copy_from_slice(self.fetch_block(i * data_size)?.data());
        }

        let start = position - first * data_size;
        into[..num_bytes].copy_from_slice(&buf[start..start + num_bytes]);
        Ok(num_bytes)
    }

    /// 从 `position` 开始写，不会扩展文件，返回实际写入的字节数。
    ///
    /// 每个涉及的块都要沿链查找一次才能拿到它的链接头。只被部分覆盖的首/尾块
    /// 直接在查找读出的内容上修改，不再额外读盘；完整覆盖的块整体替换。
    pub fn write_at(&self, from: &[u8], position: usize) -> Result<usize> {
        let file_length = self.header.file_length();
        let Some(num_bytes) = clamp_request(from.len(), position, file_length) else {
            return Ok(0);
        };
        debug!(
            "writing {} bytes at {} to file of length {}",
            num_bytes, position, file_length
        );

        let data_size = block_data_size(self.device.sector_size());
        let end = position + num_bytes;
        let first = position / data_size;
        let last = (end - 1) / data_size;

        for i in first..=last {
            let block_start = i * data_size;
            let lo = position.max(block_start);
            let hi = end.min(block_start + data_size);

            let mut block = self.fetch_block(block_start)?;
            block.data_mut()[lo - block_start..hi - block_start]
                .copy_from_slice(&from[lo - position..hi - position]);
            block.write_back(self.device.as_ref())?;
        }
        Ok(num_bytes)
    }

    pub fn length(&self) -> usize {
        self.header.file_length()
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn header_sector(&self) -> SectorId {
        self.header_sector
    }

    fn fetch_block(&self, offset: usize) -> Result<Block> {
        self.header.block_at(self.device.as_ref(), offset)
    }
}

/// 把请求截断到文件末尾；请求为空或起点不在文件内时返回 `None`
fn clamp_request(requested: usize, position: usize, file_length: usize) -> Option<usize> {
    if requested == 0 || position >= file_length {
        return None;
    }
    Some(requested.min(file_length - position))
}
