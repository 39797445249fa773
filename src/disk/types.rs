/// 扇区编号
pub type SectorId = u32;

/// 默认扇区大小（字节）
/// 文件系统以“扇区”为最小读写与分配单位。
pub const SECTOR_SIZE: usize = 128;

/// 默认扇区总数：32 道 × 32 扇区
pub const NUM_SECTORS: u32 = 32 * 32;
