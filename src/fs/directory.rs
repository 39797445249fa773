use std::{fmt::Write as _, sync::Arc};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, SectorId},
    fs::{
        block::{decode_sector, encode_sector},
        config::{FILE_NAME_MAX_LEN, NUM_DIR_ENTRIES, ROOT_DIRECTORY_SECTOR},
        error::{FileSystemError, Result},
        file_header::FileHeader,
        open_file::OpenFile,
        path::{path_head, path_rest},
    },
};

/// 每条目录项在磁盘上的字节数（bincode 定长编码：1 + 4 + 10 + 4）
pub const DIR_ENTRY_SIZE: usize = 19;

/// 目录文件的字节数
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DIR_ENTRY_SIZE;

// 目录项类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirEntryType {
    #[default]
    File,
    Directory,
}

impl DirEntryType {
    pub fn tag(&self) -> &'static str {
        match self {
            DirEntryType::File => "[F]",
            DirEntryType::Directory => "[D]",
        }
    }
}

// 一个目录项
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DirEntry {
    pub in_use: bool,
    pub entry_type: DirEntryType,
    name: [u8; FILE_NAME_MAX_LEN + 1], // 以 0 结尾
    sector: i32,                       // 子文件 FileHeader 所在扇区
}

impl DirEntry {
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILE_NAME_MAX_LEN);
        std::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    pub fn sector(&self) -> Option<SectorId> {
        decode_sector(self.sector)
    }

    fn matches(&self, name: &str) -> bool {
        self.in_use && self.name() == name
    }

    fn fill(&mut self, name: &str, sector: SectorId, entry_type: DirEntryType) {
        self.in_use = true;
        self.entry_type = entry_type;
        self.sector = encode_sector(Some(sector));
        self.name = [0; FILE_NAME_MAX_LEN + 1];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
    }

    pub(crate) fn child_sector(&self, path: &str) -> Result<SectorId> {
        self.sector().ok_or_else(|| {
            FileSystemError::CorruptChain(format!("entry for {} has no header sector", path))
        })
    }
}

/// 固定容量的目录表，本身作为一个普通文件的内容存放在磁盘上。
///
/// 目录对象是临时的：每次操作都从磁盘读出、修改、写回，然后丢弃。
/// 子目录的递归查找/添加/删除也遵循同样的读-改-写流程。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    table: Vec<DirEntry>,
}

impl Directory {
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![DirEntry::default(); size],
        }
    }

    pub fn fetch_from(file: &OpenFile) -> Result<Self> {
        let mut bytes = vec![0u8; NUM_DIR_ENTRIES * DIR_ENTRY_SIZE];
        file.read_at(&mut bytes, 0)?;
        let table = bytes
            .chunks_exact(DIR_ENTRY_SIZE)
            .map(|chunk| bincode::deserialize::<DirEntry>(chunk))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { table })
    }

    pub fn write_back(&self, file: &OpenFile) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.table.len() * DIR_ENTRY_SIZE);
        for entry in &self.table {
            bincode::serialize_into(&mut bytes, entry)?;
        }
        file.write_at(&bytes, 0)?;
        Ok(())
    }

    /// 本层目录中名为 `name` 的表项下标
    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.table.iter().position(|e| e.matches(name))
    }

    /// 本层目录中正在使用的表项（按表项顺序）
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.table.iter().filter(|e| e.in_use)
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// 按绝对路径查找，返回目标 FileHeader 所在扇区。"/" 直接对应根目录的保留扇区。
    pub fn find(&self, device: &Arc<dyn BlockDevice>, path: &str) -> Result<SectorId> {
        if path == "/" {
            return Ok(ROOT_DIRECTORY_SECTOR);
        }
        self.find_entry(device, path)?.child_sector(path)
    }

    /// 按绝对路径查找目录项本身（根目录没有目录项）
    pub fn find_entry(&self, device: &Arc<dyn BlockDevice>, path: &str) -> Result<DirEntry> {
        self.find_recursive(device, path, path)
    }

    fn find_recursive(
        &self,
        device: &Arc<dyn BlockDevice>,
        path: &str,
        full: &str,
    ) -> Result<DirEntry> {
        let head = path_head(path)?;
        let index = self
            .find_index(head)
            .ok_or_else(|| FileSystemError::NotFound(full.to_string()))?;
        let entry = &self.table[index];

        match path_rest(path, head) {
            None => Ok(entry.clone()),
            Some(rest) => {
                let (_, dir) = open_subdirectory(device, entry, full)?;
                dir.find_recursive(device, rest, full)
            }
        }
    }

    /// 在 `path` 对应的位置添加目录项，中间各段必须是已存在的目录。
    /// 最后一层按表项顺序找第一个空位。
    pub fn add(
        &mut self,
        device: &Arc<dyn BlockDevice>,
        path: &str,
        sector: SectorId,
        entry_type: DirEntryType,
    ) -> Result<()> {
        self.add_recursive(device, path, sector, entry_type, path)
    }

    fn add_recursive(
        &mut self,
        device: &Arc<dyn BlockDevice>,
        path: &str,
        sector: SectorId,
        entry_type: DirEntryType,
        full: &str,
    ) -> Result<()> {
        let head = path_head(path)?;

        let Some(rest) = path_rest(path, head) else {
            if self.find_index(head).is_some() {
                return Err(FileSystemError::AlreadyExists(full.to_string()));
            }
            let slot = self
                .table
                .iter_mut()
                .find(|e| !e.in_use)
                .ok_or_else(|| FileSystemError::DirectoryFull(full.to_string()))?;
            slot.fill(head, sector, entry_type);
            debug!("added {} {} -> sector {}", entry_type.tag(), full, sector);
            return Ok(());
        };

        let index = self
            .find_index(head)
            .ok_or_else(|| FileSystemError::NotFound(full.to_string()))?;
        let (file, mut dir) = open_subdirectory(device, &self.table[index], full)?;
        dir.add_recursive(device, rest, sector, entry_type, full)?;
        dir.write_back(&file)
    }

    /// 把 `path` 对应的目录项标记为未使用。不回收目标占用的扇区。
    pub fn remove(&mut self, device: &Arc<dyn BlockDevice>, path: &str) -> Result<()> {
        self.remove_recursive(device, path, path)
    }

    fn remove_recursive(
        &mut self,
        device: &Arc<dyn BlockDevice>,
        path: &str,
        full: &str,
    ) -> Result<()> {
        let head = path_head(path)?;
        let index = self
            .find_index(head)
            .ok_or_else(|| FileSystemError::NotFound(full.to_string()))?;

        match path_rest(path, head) {
            None => {
                self.table[index].in_use = false;
                debug!("removed entry {}", full);
                Ok(())
            }
            Some(rest) => {
                let (file, mut dir) = open_subdirectory(device, &self.table[index], full)?;
                dir.remove_recursive(device, rest, full)?;
                dir.write_back(&file)
            }
        }
    }

    /// 列出目录内容。非递归时只有本层名字；递归时深度优先，
    /// 每层缩进 4 个空格并带 `[F]`/`[D]` 标记。
    pub fn list(&self, device: &Arc<dyn BlockDevice>, recursive: bool) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        if recursive {
            self.list_recursive(device, 0, &mut lines)?;
        } else {
            lines.extend(self.entries().map(|e| e.name().to_string()));
        }
        Ok(lines)
    }

    fn list_recursive(
        &self,
        device: &Arc<dyn BlockDevice>,
        level: usize,
        lines: &mut Vec<String>,
    ) -> Result<()> {
        for entry in self.entries() {
            lines.push(format!(
                "{}{} {}",
                "    ".repeat(level),
                entry.entry_type.tag(),
                entry.name()
            ));
            if entry.entry_type == DirEntryType::Directory {
                let (_, dir) = open_subdirectory(device, entry, entry.name())?;
                dir.list_recursive(device, level + 1, lines)?;
            }
        }
        Ok(())
    }

    /// 目录项、对应的 FileHeader 以及文件内容，调试用
    pub fn print(&self, device: &Arc<dyn BlockDevice>) -> Result<String> {
        let mut out = String::from("Directory contents:\n");
        for entry in self.entries() {
            let sector = entry.child_sector(entry.name())?;
            let _ = writeln!(out, "Name: {}, Sector: {}", entry.name(), sector);
            let header = FileHeader::fetch_from(device.as_ref(), sector)?;
            out.push_str(&header.describe(device.as_ref())?);
        }
        out.push('\n');
        Ok(out)
    }
}

/// 打开目录项指向的子目录文件并读出目录表
pub(crate) fn open_subdirectory(
    device: &Arc<dyn BlockDevice>,
    entry: &DirEntry,
    full: &str,
) -> Result<(OpenFile, Directory)> {
    if entry.entry_type != DirEntryType::Directory {
        return Err(FileSystemError::NotADirectory(full.to_string()));
    }
    let file = OpenFile::open(Arc::clone(device), entry.child_sector(full)?)?;
    let dir = Directory::fetch_from(&file)?;
    Ok((file, dir))
}
