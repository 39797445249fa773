use std::{fmt::Write as _, sync::Arc};

use log::{info, warn};

use crate::{
    disk::{BlockDevice, SectorId},
    fs::{
        bitmap::PersistentBitmap,
        config::{
            free_map_file_size, BLOCK_LINK_SIZE, FREE_MAP_SECTOR, NUM_DIR_ENTRIES,
            ROOT_DIRECTORY_SECTOR,
        },
        directory::{open_subdirectory, DirEntryType, Directory, DIRECTORY_FILE_SIZE},
        error::{FileSystemError, Result},
        file_header::FileHeader,
        open_file::OpenFile,
        open_file_table::{OpenFileId, OpenFileTable},
    },
};

pub mod bitmap;
pub mod block;
pub mod config;
pub mod directory;
pub mod error;
pub mod file_header;
pub mod open_file;
pub mod open_file_table;
pub mod path;

/// `stat` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub header_sector: SectorId,
    pub entry_type: DirEntryType,
    pub length: usize,
    pub blocks: Vec<SectorId>,
}

/// 文件系统：持有磁盘、位图文件、根目录文件以及按 id 访问的打开文件表。
///
/// 所有修改操作都需要 `&mut self`，同一时刻只有一个修改序列
/// （分配 → 写文件头 → 加目录项 → 写回位图）在进行。
#[derive(Debug)]
pub struct FileSystem {
    device: Arc<dyn BlockDevice>,  // 底层磁盘
    free_map_file: OpenFile,       // 空闲扇区位图，作为文件存放
    directory_file: OpenFile,      // 根目录，作为文件存放
    open_files: OpenFileTable,     // id -> 打开的文件
}

impl FileSystem {
    /// 在空白磁盘上建立文件系统：位图文件放在 0 号扇区，根目录放在 1 号扇区。
    pub fn format(device: Arc<dyn BlockDevice>) -> Result<Self> {
        check_geometry(device.as_ref())?;
        let num_sectors = device.num_sectors();
        info!(
            "formatting {} sectors of {} bytes",
            num_sectors,
            device.sector_size()
        );

        let mut bitmap = PersistentBitmap::new(num_sectors);
        let directory = Directory::new(NUM_DIR_ENTRIES);

        // 两个文件头所在的扇区先占上
        bitmap.mark(FREE_MAP_SECTOR);
        bitmap.mark(ROOT_DIRECTORY_SECTOR);

        let mut map_header = FileHeader::new();
        map_header.allocate(device.as_ref(), &mut bitmap, free_map_file_size(num_sectors))?;
        let mut dir_header = FileHeader::new();
        dir_header.allocate(device.as_ref(), &mut bitmap, DIRECTORY_FILE_SIZE)?;

        map_header.write_back(device.as_ref(), FREE_MAP_SECTOR)?;
        dir_header.write_back(device.as_ref(), ROOT_DIRECTORY_SECTOR)?;

        let free_map_file = OpenFile::open(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(Arc::clone(&device), ROOT_DIRECTORY_SECTOR)?;

        bitmap.write_back(&free_map_file)?;
        directory.write_back(&directory_file)?;

        Ok(Self {
            device,
            free_map_file,
            directory_file,
            open_files: OpenFileTable::default(),
        })
    }

    /// 挂载已格式化的磁盘
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        check_geometry(device.as_ref())?;
        let free_map_file = OpenFile::open(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(Arc::clone(&device), ROOT_DIRECTORY_SECTOR)?;

        if free_map_file.length() != free_map_file_size(device.num_sectors()) {
            return Err(FileSystemError::CorruptChain(format!(
                "bitmap file holds {} bytes, disk needs {}",
                free_map_file.length(),
                free_map_file_size(device.num_sectors())
            )));
        }
        info!("mounted volume of {} sectors", device.num_sectors());

        Ok(Self {
            device,
            free_map_file,
            directory_file,
            open_files: OpenFileTable::default(),
        })
    }

    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        &self.device
    }

    /// 从位图文件读出当前的空闲扇区位图
    pub fn load_bitmap(&self) -> Result<PersistentBitmap> {
        PersistentBitmap::fetch_from(&self.free_map_file, self.device.num_sectors())
    }

    pub fn root_directory(&self) -> Result<Directory> {
        Directory::fetch_from(&self.directory_file)
    }

    pub fn free_sectors(&self) -> Result<usize> {
        Ok(self.load_bitmap()?.num_clear())
    }

    /// 创建一个 `size` 字节的文件，内容全零。父目录必须已存在。
    pub fn create(&mut self, path: &str, size: usize) -> Result<()> {
        self.create_entry(path, size, DirEntryType::File)
    }

    /// 创建一个空目录
    pub fn make_directory(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, DIRECTORY_FILE_SIZE, DirEntryType::Directory)
    }

    // 分配 → 写文件头 → 加目录项 → 写回位图。
    // 加目录项失败时位图没有写回，已分配的扇区在磁盘上仍是空闲的。
    fn create_entry(&mut self, path: &str, size: usize, entry_type: DirEntryType) -> Result<()> {
        path::validate(path)?;
        if path == "/" {
            return Err(FileSystemError::AlreadyExists(path.to_string()));
        }

        let mut bitmap = self.load_bitmap()?;
        let mut directory = self.root_directory()?;
        if directory.find_entry(&self.device, path).is_ok() {
            return Err(FileSystemError::AlreadyExists(path.to_string()));
        }

        let header_sector = bitmap.find_and_set().ok_or(FileSystemError::OutOfSpace)?;
        let mut header = FileHeader::new();
        header.allocate(self.device.as_ref(), &mut bitmap, size)?;
        header.write_back(self.device.as_ref(), header_sector)?;

        if entry_type == DirEntryType::Directory {
            let file = OpenFile::open(Arc::clone(&self.device), header_sector)?;
            Directory::new(NUM_DIR_ENTRIES).write_back(&file)?;
        }

        if let Err(e) = directory.add(&self.device, path, header_sector, entry_type) {
            warn!("rolling back allocation for {}: {}", path, e);
            return Err(e);
        }
        directory.write_back(&self.directory_file)?;
        bitmap.write_back(&self.free_map_file)?;

        info!(
            "created {} {} ({} bytes, header at sector {})",
            entry_type.tag(),
            path,
            size,
            header_sector
        );
        Ok(())
    }

    pub fn open(&self, path: &str) -> Result<OpenFile> {
        let sector = self.root_directory()?.find(&self.device, path)?;
        OpenFile::open(Arc::clone(&self.device), sector)
    }

    /// 删除文件或目录：释放文件头及其扇区链，再清掉目录项。
    /// 非空目录只有在 `recursive` 时才会连同子项一起删除。
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        path::validate(path)?;
        if path == "/" {
            return Err(FileSystemError::InvalidPath(path.to_string()));
        }

        let mut bitmap = self.load_bitmap()?;
        let mut directory = self.root_directory()?;
        let entry = directory.find_entry(&self.device, path)?;
        let sector = entry.child_sector(path)?;

        if entry.entry_type == DirEntryType::Directory && !recursive {
            let (_, dir) = open_subdirectory(&self.device, &entry, path)?;
            if !dir.is_empty() {
                return Err(FileSystemError::DirectoryNotEmpty(path.to_string()));
            }
        }

        self.release_tree(&mut bitmap, sector, entry.entry_type, path)?;
        directory.remove(&self.device, path)?;
        directory.write_back(&self.directory_file)?;
        bitmap.write_back(&self.free_map_file)?;

        info!("removed {} {}", entry.entry_type.tag(), path);
        Ok(())
    }

    // 深度优先释放一棵子树的全部扇区（只改内存中的位图）。
    // 子树中有文件仍被某个 id 打开时整个删除失败，位图不会写回。
    fn release_tree(
        &self,
        bitmap: &mut PersistentBitmap,
        sector: SectorId,
        entry_type: DirEntryType,
        path: &str,
    ) -> Result<()> {
        if self.open_files.holds(sector) {
            warn!("refusing to remove {}: still open", path);
            return Err(FileSystemError::FileInUse(path.to_string()));
        }

        if entry_type == DirEntryType::Directory {
            let file = OpenFile::open(Arc::clone(&self.device), sector)?;
            let dir = Directory::fetch_from(&file)?;
            for child in dir.entries() {
                let child_path = path::join(path, child.name());
                let child_sector = child.child_sector(&child_path)?;
                self.release_tree(bitmap, child_sector, child.entry_type, &child_path)?;
            }
        }

        let header = FileHeader::fetch_from(self.device.as_ref(), sector)?;
        header.deallocate(self.device.as_ref(), bitmap)?;
        if !bitmap.test(sector) {
            return Err(FileSystemError::CorruptChain(format!(
                "header sector {} of {} is not marked in use",
                sector, path
            )));
        }
        bitmap.clear(sector);
        Ok(())
    }

    /// 列出目录内容，见 [`Directory::list`]
    pub fn list(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let root = self.root_directory()?;
        if path == "/" {
            return root.list(&self.device, recursive);
        }
        let entry = root.find_entry(&self.device, path)?;
        let (_, dir) = open_subdirectory(&self.device, &entry, path)?;
        dir.list(&self.device, recursive)
    }

    pub fn stat(&self, path: &str) -> Result<FileStat> {
        let root = self.root_directory()?;
        let (header_sector, entry_type) = if path == "/" {
            (ROOT_DIRECTORY_SECTOR, DirEntryType::Directory)
        } else {
            let entry = root.find_entry(&self.device, path)?;
            (entry.child_sector(path)?, entry.entry_type)
        };
        let header = FileHeader::fetch_from(self.device.as_ref(), header_sector)?;
        Ok(FileStat {
            header_sector,
            entry_type,
            length: header.file_length(),
            blocks: header.chain(self.device.as_ref())?,
        })
    }

    /// 位图、根目录以及所有文件的内容，调试用
    pub fn print(&self) -> Result<String> {
        let mut out = String::new();
        let bitmap = self.load_bitmap()?;

        let _ = writeln!(out, "Bit map file header:");
        out.push_str(&self.free_map_file.header().describe(self.device.as_ref())?);
        let _ = writeln!(out, "Directory file header:");
        out.push_str(&self.directory_file.header().describe(self.device.as_ref())?);

        let used: Vec<String> = bitmap
            .used_sectors()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let _ = writeln!(out, "Bitmap set:\n{}", used.join(", "));

        out.push_str(&self.root_directory()?.print(&self.device)?);
        Ok(out)
    }

    /// 打开文件并登记到打开文件表，返回 id
    pub fn open_file_id(&mut self, path: &str) -> Result<OpenFileId> {
        let file = self.open(path)?;
        let id = self.open_files.insert(file)?;
        info!("opened {} as file id {}", path, id);
        Ok(id)
    }

    pub fn read_file(&mut self, id: OpenFileId, into: &mut [u8]) -> Result<usize> {
        self.open_files.get_mut(id)?.read(into)
    }

    pub fn write_file(&mut self, id: OpenFileId, from: &[u8]) -> Result<usize> {
        self.open_files.get_mut(id)?.write(from)
    }

    pub fn seek_file(&mut self, id: OpenFileId, position: usize) -> Result<()> {
        self.open_files.get_mut(id)?.seek(position);
        Ok(())
    }

    /// 从当前位置到文件末尾还剩多少字节
    pub fn remaining_bytes(&mut self, id: OpenFileId) -> Result<usize> {
        let file = self.open_files.get_mut(id)?;
        Ok(file.length().saturating_sub(file.position()))
    }

    pub fn close_file(&mut self, id: OpenFileId) -> Result<()> {
        self.open_files.close(id)
    }

    pub fn open_file_ids(&self) -> Vec<(OpenFileId, SectorId)> {
        self.open_files.open_ids()
    }
}

fn check_geometry(device: &dyn BlockDevice) -> Result<()> {
    let header_size = bincode::serialized_size(&FileHeader::new())? as usize;
    if device.sector_size() <= BLOCK_LINK_SIZE || device.sector_size() < header_size {
        return Err(FileSystemError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("sector size {} is too small", device.sector_size()),
        )));
    }
    Ok(())
}
