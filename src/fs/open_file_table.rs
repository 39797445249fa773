use log::warn;

use crate::fs::{
    config::MAX_OPEN_FILES,
    error::{FileSystemError, Result},
    open_file::OpenFile,
};

/// 按 id 访问的打开文件编号
pub type OpenFileId = usize;

/// 容量固定的打开文件表，id 即槽位下标
#[derive(Debug)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new(MAX_OPEN_FILES)
    }
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// 放进第一个空槽，返回其 id
    pub fn insert(&mut self, file: OpenFile) -> Result<OpenFileId> {
        let (id, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(FileSystemError::TooManyOpenFiles)?;
        *slot = Some(file);
        Ok(id)
    }

    pub fn get_mut(&mut self, id: OpenFileId) -> Result<&mut OpenFile> {
        match self.slots.get_mut(id) {
            Some(Some(file)) => Ok(file),
            _ => {
                warn!("file id {} is not open", id);
                Err(FileSystemError::BadFileId(id))
            }
        }
    }

    pub fn close(&mut self, id: OpenFileId) -> Result<()> {
        match self.slots.get_mut(id) {
            Some(slot) if slot.is_some() => {
                slot.take();
                Ok(())
            }
            _ => {
                warn!("closing file id {} which is not open", id);
                Err(FileSystemError::BadFileId(id))
            }
        }
    }

    /// 是否有 id 打开了文件头在 `header_sector` 的文件
    pub fn holds(&self, header_sector: u32) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|f| f.header_sector() == header_sector)
    }

    /// 正在使用的 id 及对应文件头扇区
    pub fn open_ids(&self) -> Vec<(OpenFileId, u32)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|f| (id, f.header_sector())))
            .collect()
    }
}
