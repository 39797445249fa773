use std::io::Result;

use crate::disk::types::SectorId;

/// 同步的整扇区读写接口，所有调用都在 I/O 完成后才返回。
pub trait BlockDevice: Send + Sync {
    /// 每个扇区的字节数
    fn sector_size(&self) -> usize;

    /// 设备上的扇区总数
    fn num_sectors(&self) -> u32;

    /// `buf.len()` 必须等于 `sector_size()`
    fn read_sector(&self, sector: SectorId, buf: &mut [u8]) -> Result<()>;

    /// `buf.len()` 必须等于 `sector_size()`
    fn write_sector(&self, sector: SectorId, buf: &[u8]) -> Result<()>;
}

impl std::fmt::Debug for dyn BlockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockDevice({} x {} bytes)",
            self.num_sectors(),
            self.sector_size()
        )
    }
}

/// 检查扇区号与缓冲区长度，越界时返回 `InvalidInput`
pub(crate) fn check_request(
    device: &dyn BlockDevice,
    sector: SectorId,
    len: usize,
) -> Result<()> {
    if sector >= device.num_sectors() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "sector {} out of range (device has {})",
                sector,
                device.num_sectors()
            ),
        ));
    }
    if len != device.sector_size() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "buffer of {} bytes, expected a whole sector of {}",
                len,
                device.sector_size()
            ),
        ));
    }
    Ok(())
}
