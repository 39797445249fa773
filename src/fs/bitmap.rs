use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::SectorId,
    fs::{error::Result, open_file::OpenFile},
};

/// 扇区占用位图，每个 bit 表示一个扇区是否已分配。
/// 持久化为位图文件的全部字节。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentBitmap {
    pub bits: Vec<u8>, // 位图数据
    pub num_bits: u32, // 扇区总数
}

impl PersistentBitmap {
    // 创建一个新的位图（所有位清零 = 空闲）
    pub fn new(num_bits: u32) -> Self {
        let byte_len = ((num_bits + 7) / 8) as usize;
        Self {
            bits: vec![0; byte_len],
            num_bits,
        }
    }

    /// 找到编号最小的空闲扇区，标记为已用并返回
    pub fn find_and_set(&mut self) -> Option<SectorId> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte != 0xFF {
                for bit in 0..8 {
                    let index = (byte_index * 8 + bit) as u32;
                    if index >= self.num_bits {
                        return None;
                    }
                    if *byte & (1 << bit) == 0 {
                        *byte |= 1 << bit;
                        return Some(index);
                    }
                }
            }
        }
        None
    }

    pub fn mark(&mut self, sector: SectorId) {
        if sector >= self.num_bits {
            return; // 防止越界
        }
        self.bits[(sector / 8) as usize] |= 1 << (sector % 8);
    }

    pub fn clear(&mut self, sector: SectorId) {
        if sector >= self.num_bits {
            return;
        }
        self.bits[(sector / 8) as usize] &= !(1 << (sector % 8));
    }

    pub fn test(&self, sector: SectorId) -> bool {
        if sector >= self.num_bits {
            return false;
        }
        self.bits[(sector / 8) as usize] & (1 << (sector % 8)) != 0
    }

    pub fn num_clear(&self) -> usize {
        (0..self.num_bits).filter(|&s| !self.test(s)).count()
    }

    /// 从位图文件加载
    pub fn fetch_from(file: &OpenFile, num_bits: u32) -> Result<Self> {
        let mut bitmap = Self::new(num_bits);
        let read = file.read_at(&mut bitmap.bits, 0)?;
        debug!("loaded bitmap ({} bytes), {} sectors free", read, bitmap.num_clear());
        Ok(bitmap)
    }

    /// 写回位图文件
    pub fn write_back(&self, file: &OpenFile) -> Result<()> {
        file.write_at(&self.bits, 0)?;
        Ok(())
    }

    /// 已用扇区列表，调试输出用
    pub fn used_sectors(&self) -> Vec<SectorId> {
        (0..self.num_bits).filter(|&s| self.test(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_and_set_is_lowest_first() {
        let mut bitmap = PersistentBitmap::new(10);
        bitmap.mark(0);
        bitmap.mark(2);
        assert_eq!(bitmap.find_and_set(), Some(1));
        assert_eq!(bitmap.find_and_set(), Some(3));
        assert_eq!(bitmap.num_clear(), 6);
    }

    #[test]
    fn never_hands_out_bits_past_the_end() {
        let mut bitmap = PersistentBitmap::new(3);
        assert_eq!(bitmap.find_and_set(), Some(0));
        assert_eq!(bitmap.find_and_set(), Some(1));
        assert_eq!(bitmap.find_and_set(), Some(2));
        assert_eq!(bitmap.find_and_set(), None);
        assert_eq!(bitmap.num_clear(), 0);

        bitmap.clear(1);
        assert!(!bitmap.test(1));
        assert_eq!(bitmap.find_and_set(), Some(1));
    }
}
