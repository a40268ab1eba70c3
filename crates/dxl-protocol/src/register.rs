//! 寄存器描述
//!
//! 每个寄存器由地址、宽度（1 或 2 字节）、访问模式以及是否位于 EEPROM 决定。
//! 双字节寄存器使用小端序：低字节在 `address`，高字节在 `address + 1`。

use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;

/// 寄存器原始字节（最多 2 字节，栈上分配）
pub type RegisterBytes = SmallVec<[u8; 2]>;

/// 访问模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub const fn is_readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// 寄存器宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Width {
    Byte = 1,
    Word = 2,
}

impl Width {
    /// 字节数
    pub const fn len(self) -> usize {
        self as usize
    }

    /// 可表示的最大值
    pub const fn max_value(self) -> u16 {
        match self {
            Width::Byte => u8::MAX as u16,
            Width::Word => u16::MAX,
        }
    }
}

/// 寄存器描述（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub address: u8,
    pub width: Width,
    pub access: Access,
    /// 是否位于 EEPROM（掉电保持，写入有磨损）
    pub persistent: bool,
}

impl Register {
    /// 单字节 RAM 寄存器
    pub const fn byte(address: u8, access: Access) -> Self {
        Self {
            address,
            width: Width::Byte,
            access,
            persistent: false,
        }
    }

    /// 双字节 RAM 寄存器
    pub const fn word(address: u8, access: Access) -> Self {
        Self {
            address,
            width: Width::Word,
            access,
            persistent: false,
        }
    }

    /// 标记为 EEPROM 寄存器
    pub const fn eeprom(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub const fn len(&self) -> usize {
        self.width.len()
    }

    /// 占用的地址区间 `[address, end)`
    pub fn end_address(&self) -> u16 {
        self.address as u16 + self.width.len() as u16
    }

    /// 两个寄存器的地址区间是否重叠
    pub fn overlaps(&self, other: &Register) -> bool {
        (self.address as u16) < other.end_address() && (other.address as u16) < self.end_address()
    }

    /// 编码为线上字节
    ///
    /// 值超出宽度时返回 `None`，不做截断。
    pub fn encode(&self, value: u16) -> Option<RegisterBytes> {
        if value > self.width.max_value() {
            return None;
        }
        let bytes = value.to_le_bytes();
        Some(SmallVec::from_slice(&bytes[..self.width.len()]))
    }

    /// 从线上字节解码
    ///
    /// 字节数与宽度不符时返回 `None`。
    pub fn decode(&self, bytes: &[u8]) -> Option<u16> {
        match (self.width, bytes) {
            (Width::Byte, [lo]) => Some(*lo as u16),
            (Width::Word, [lo, hi]) => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_modes() {
        assert!(Access::Read.is_readable());
        assert!(!Access::Read.is_writable());
        assert!(!Access::Write.is_readable());
        assert!(Access::Write.is_writable());
        assert!(Access::ReadWrite.is_readable());
        assert!(Access::ReadWrite.is_writable());
    }

    #[test]
    fn test_word_little_endian() {
        let reg = Register::word(0x1E, Access::ReadWrite);
        assert_eq!(reg.encode(512).unwrap().as_slice(), &[0x00, 0x02]);
        assert_eq!(reg.encode(0x1234).unwrap().as_slice(), &[0x34, 0x12]);
        assert_eq!(reg.decode(&[0x05, 0x03]), Some(773));
    }

    #[test]
    fn test_byte_encoding() {
        let reg = Register::byte(0x19, Access::ReadWrite);
        assert_eq!(reg.encode(0xAB).unwrap().as_slice(), &[0xAB]);
        assert_eq!(reg.decode(&[0x7F]), Some(0x7F));
    }

    #[test]
    fn test_encode_out_of_range() {
        let reg = Register::byte(0x19, Access::ReadWrite);
        assert!(reg.encode(256).is_none());
        assert!(reg.encode(255).is_some());
    }

    #[test]
    fn test_decode_wrong_size() {
        let byte = Register::byte(0x19, Access::Read);
        let word = Register::word(0x24, Access::Read);
        assert!(byte.decode(&[]).is_none());
        assert!(byte.decode(&[1, 2]).is_none());
        assert!(word.decode(&[1]).is_none());
        assert!(word.decode(&[1, 2, 3]).is_none());
    }

    #[test]
    fn test_overlap() {
        let a = Register::word(0x06, Access::ReadWrite);
        let b = Register::word(0x08, Access::ReadWrite);
        let c = Register::byte(0x07, Access::ReadWrite);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_eeprom_flag() {
        let reg = Register::byte(0x03, Access::ReadWrite).eeprom();
        assert!(reg.persistent);
        assert!(!Register::byte(0x18, Access::ReadWrite).persistent);
    }
}
