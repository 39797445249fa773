use std::fmt;

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    Io(std::io::Error),              // 底层 I/O 错误
    Codec(bincode::Error),           // 磁盘结构编解码失败
    OutOfSpace,                      // 空闲扇区不足
    NotFound(String),                // 路径中某一段不存在
    AlreadyExists(String),           // 同名目录项已存在
    DirectoryFull(String),           // 目录没有空闲表项
    NotADirectory(String),           // 路径中间段是文件
    DirectoryNotEmpty(String),       // 非递归删除非空目录
    InvalidPath(String),             // 路径非法（缺少前导 '/'、段过长等）
    CorruptChain(String),            // 扇区链或位图不一致
    BadFileId(usize),                // 未使用或越界的文件 id
    TooManyOpenFiles,                // 打开文件表已满
    FileInUse(String),               // 仍有打开的文件 id 指向它
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::Io(e)
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::Codec(e)
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::Codec(e) => write!(f, "Malformed on-disk record: {}", e),
            Self::OutOfSpace => write!(f, "Not enough free sectors"),
            Self::NotFound(path) => write!(f, "File or directory not found: {}", path),
            Self::AlreadyExists(path) => write!(f, "File or directory already exists: {}", path),
            Self::DirectoryFull(path) => write!(f, "Directory is full: {}", path),
            Self::NotADirectory(path) => write!(f, "Expected a directory, found a file: {}", path),
            Self::DirectoryNotEmpty(path) => write!(f, "Directory is not empty: {}", path),
            Self::InvalidPath(path) => write!(f, "Invalid path: {}", path),
            Self::CorruptChain(desc) => write!(f, "Corrupt sector chain: {}", desc),
            Self::BadFileId(id) => write!(f, "No open file with id {}", id),
            Self::TooManyOpenFiles => write!(f, "Too many open files"),
            Self::FileInUse(path) => write!(f, "File is still open: {}", path),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
