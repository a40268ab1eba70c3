//! 帧编解码
//!
//! 请求帧：`FF FF id len payload.. chk`，其中 `len = payload + 1`。
//! 状态帧：`FF FF id len err payload.. chk`，其中 `len = payload + 2`。
//!
//! 校验和为 `id` 起到校验和字节之前所有字节之和取反，截断为一个字节。

use crate::constants::{HEADER, MAX_PAYLOAD_LEN, STATUS_HEADER_LEN};
use crate::error::PacketError;
use smallvec::SmallVec;
use std::fmt;

/// 帧缓冲区类型
///
/// 栈上预留 16 字节，覆盖 PING / READ_DATA / 单寄存器 WRITE_DATA。
pub type PacketBuffer = SmallVec<[u8; 16]>;

/// 计算协议校验和：`(~sum(bytes)) & 0xFF`
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    !wrapping_sum(bytes)
}

#[inline]
fn wrapping_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// 构建请求帧
///
/// # 错误
/// - `PacketError::PayloadTooLong`: 参数超过 [`MAX_PAYLOAD_LEN`]
pub fn build_request(id: u8, payload: &[u8]) -> Result<PacketBuffer, PacketError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PacketError::PayloadTooLong { len: payload.len() });
    }

    let mut frame = PacketBuffer::new();
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.push(payload.len() as u8 + 1);
    frame.extend_from_slice(payload);
    let chk = checksum(&frame[2..]);
    frame.push(chk);
    Ok(frame)
}

/// 构建状态帧（设备侧），用于模拟总线和测试
pub fn build_status(
    id: u8,
    error: ErrorFlags,
    payload: &[u8],
) -> Result<PacketBuffer, PacketError> {
    if payload.len() + 1 > MAX_PAYLOAD_LEN {
        return Err(PacketError::PayloadTooLong { len: payload.len() });
    }

    let mut frame = PacketBuffer::new();
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.push(payload.len() as u8 + 2);
    frame.push(error.bits());
    frame.extend_from_slice(payload);
    let chk = checksum(&frame[2..]);
    frame.push(chk);
    Ok(frame)
}

/// 设备错误字节
///
/// 状态帧中的错误字节，每一位对应一种故障。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    pub const INPUT_VOLTAGE: u8 = 1 << 0;
    pub const ANGLE_LIMIT: u8 = 1 << 1;
    pub const OVERHEATING: u8 = 1 << 2;
    pub const RANGE: u8 = 1 << 3;
    pub const CHECKSUM: u8 = 1 << 4;
    pub const OVERLOAD: u8 = 1 << 5;
    pub const INSTRUCTION: u8 = 1 << 6;

    const NAMES: [(u8, &'static str); 7] = [
        (Self::INPUT_VOLTAGE, "input voltage"),
        (Self::ANGLE_LIMIT, "angle limit"),
        (Self::OVERHEATING, "overheating"),
        (Self::RANGE, "range"),
        (Self::CHECKSUM, "checksum"),
        (Self::OVERLOAD, "overload"),
        (Self::INSTRUCTION, "instruction"),
    ];

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// 已置位故障的名称
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(bit, _)| self.contains(*bit))
            .map(|(_, name)| name)
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)?;
        if self.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = self.names().collect();
        if names.is_empty() {
            // bit 7 未定义
            write!(f, " (reserved)")
        } else {
            write!(f, " ({})", names.join(", "))
        }
    }
}

/// 状态包头：`FF FF id len`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHeader {
    pub id: u8,
    /// 后续字节数（错误字节 + 参数 + 校验和）
    pub length: u8,
}

impl StatusHeader {
    /// 解析包头
    ///
    /// 同步字节不做校验，只取 ID 与长度字段。
    ///
    /// # 错误
    /// - `PacketError::MalformedLength`: 长度小于 2，放不下错误字节和校验和
    pub fn parse(bytes: &[u8; STATUS_HEADER_LEN]) -> Result<Self, PacketError> {
        let id = bytes[2];
        let length = bytes[3];
        if length < 2 {
            return Err(PacketError::MalformedLength { id, length });
        }
        Ok(Self { id, length })
    }

    /// 包体长度
    pub fn body_len(&self) -> usize {
        self.length as usize
    }
}

/// 已校验的状态包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub payload: SmallVec<[u8; 8]>,
}

impl StatusPacket {
    /// 校验包体并提取参数
    ///
    /// 先检查设备错误字节，再检查校验和。
    pub fn parse(header: StatusHeader, body: &[u8]) -> Result<Self, PacketError> {
        let id = header.id;
        if body.len() != header.body_len() {
            return Err(PacketError::BodyLengthMismatch {
                id,
                expected: header.body_len(),
                actual: body.len(),
            });
        }
        if body.len() < 2 {
            return Err(PacketError::MalformedLength {
                id,
                length: header.length,
            });
        }

        let error = body[0];
        if error != 0 {
            return Err(PacketError::Device {
                id,
                flags: ErrorFlags::from_bits(error),
            });
        }

        let (content, received) = body.split_at(body.len() - 1);
        let expected = !(id
            .wrapping_add(header.length)
            .wrapping_add(wrapping_sum(content)));
        if expected != received[0] {
            return Err(PacketError::ChecksumMismatch {
                id,
                expected,
                actual: received[0],
            });
        }

        Ok(Self {
            id,
            payload: SmallVec::from_slice(&content[1..]),
        })
    }
}

/// 已校验的请求帧（设备侧解析）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    pub id: u8,
    pub instruction: u8,
    pub params: Vec<u8>,
}

impl RequestPacket {
    /// 从完整请求帧解析
    pub fn parse(frame: &[u8]) -> Result<Self, PacketError> {
        const MIN_LEN: usize = 6;
        if frame.len() < MIN_LEN {
            return Err(PacketError::Truncated {
                expected: MIN_LEN,
                actual: frame.len(),
            });
        }
        if frame[..2] != HEADER {
            return Err(PacketError::InvalidHeader {
                found: [frame[0], frame[1]],
            });
        }

        let id = frame[2];
        let length = frame[3];
        if length < 2 {
            return Err(PacketError::MalformedLength { id, length });
        }
        let total = 4 + length as usize;
        if frame.len() < total {
            return Err(PacketError::Truncated {
                expected: total,
                actual: frame.len(),
            });
        }

        let expected = checksum(&frame[2..total - 1]);
        let actual = frame[total - 1];
        if expected != actual {
            return Err(PacketError::ChecksumMismatch {
                id,
                expected,
                actual,
            });
        }

        Ok(Self {
            id,
            instruction: frame[4],
            params: frame[5..total - 1].to_vec(),
        })
    }
}
