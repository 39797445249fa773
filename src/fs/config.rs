use crate::disk::SectorId;

/// 空闲扇区位图文件的 FileHeader 所在扇区
pub const FREE_MAP_SECTOR: SectorId = 0;
/// 根目录文件的 FileHeader 所在扇区
pub const ROOT_DIRECTORY_SECTOR: SectorId = 1;

/// 每个 Block 开头的链接头：当前扇区号 + 下一个扇区号，各 4 字节
pub const BLOCK_LINK_SIZE: usize = 8;

/// 链尾标记
pub const END_OF_CHAIN: i32 = -1;

/// 路径中每一段名字的最大长度
pub const FILE_NAME_MAX_LEN: usize = 9;

/// 每个目录能容纳的目录项数量（不可扩展）
pub const NUM_DIR_ENTRIES: usize = 64;

/// 同时打开的文件数上限（按 id 访问的接口）
pub const MAX_OPEN_FILES: usize = 20;

/// 每个 Block 中可存放的数据字节数
pub fn block_data_size(sector_size: usize) -> usize {
    sector_size - BLOCK_LINK_SIZE
}

/// 位图文件的字节数：每个扇区 1 bit
pub fn free_map_file_size(num_sectors: u32) -> usize {
    (num_sectors as usize + 7) / 8
}
