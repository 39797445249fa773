//! chainfs：在模拟块设备上实现的教学文件系统。
//!
//! 磁盘布局：
//! - 0 号扇区：空闲扇区位图文件的文件头
//! - 1 号扇区：根目录文件的文件头
//! - 其余扇区：按需分配，每个文件的数据是一条单向扇区链
//!
//! 目录本身也是普通文件，内容是固定容量的目录表，子目录可以任意嵌套。

pub mod disk;
pub mod fs;
pub mod shell;
pub mod utils;

pub use disk::{BlockDevice, FileDisk, MemDisk, SectorId};
pub use fs::{
    directory::DirEntryType,
    error::{FileSystemError, Result},
    open_file::OpenFile,
    open_file_table::OpenFileId,
    FileStat, FileSystem,
};
