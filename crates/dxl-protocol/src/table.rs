//! 寄存器表
//!
//! 每个型号一张表：名称 → [`Register`]，按地址升序排列，构建后不再修改。
//! 表通过组合构建：公共基础表 + 型号扩展（例如同一段地址在 AX 系列是柔顺参数，
//! 在 MX 系列是 PID 增益）。

use crate::constants::Instruction;
use crate::error::ConfigurationError;
use crate::register::{Register, RegisterBytes};
use smallvec::SmallVec;

/// 寄存器定义条目
pub type RegisterDef = (&'static str, Register);

/// 寄存器指令
///
/// 由寄存器表生成，交给总线发送。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCommand {
    /// 期望的应答参数长度（读：寄存器宽度；写：0）
    pub response_len: usize,
    /// 请求参数（指令码 + 地址 + ...）
    pub payload: SmallVec<[u8; 4]>,
}

/// 型号寄存器表（冻结、按地址排序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTable {
    model: &'static str,
    entries: Vec<RegisterDef>,
}

impl RegisterTable {
    /// 组合基础表与扩展，返回按地址排序的新表
    ///
    /// 扩展中与基础表同名的条目会覆盖基础条目。
    pub fn compose(model: &'static str, base: &[RegisterDef], extensions: &[RegisterDef]) -> Self {
        let mut entries: Vec<RegisterDef> = Vec::with_capacity(base.len() + extensions.len());
        for &(name, register) in base.iter().chain(extensions) {
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = register,
                None => entries.push((name, register)),
            }
        }
        entries.sort_by_key(|(_, register)| register.address);

        let table = Self { model, entries };
        debug_assert!(
            table.find_overlap().is_none(),
            "overlapping registers in table {}",
            model
        );
        table
    }

    /// 型号名称
    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, register)| register)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 按地址顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Register)> + '_ {
        self.entries.iter().map(|(name, register)| (*name, register))
    }

    /// 按地址顺序的寄存器名称
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// 查找地址区间重叠的一对寄存器
    pub fn find_overlap(&self) -> Option<(&'static str, &'static str)> {
        // 已按地址排序，只需检查相邻条目
        self.entries
            .windows(2)
            .find(|pair| pair[0].1.overlaps(&pair[1].1))
            .map(|pair| (pair[0].0, pair[1].0))
    }

    /// 查找寄存器，未知名称返回配置错误
    pub fn lookup(&self, name: &str) -> Result<&Register, ConfigurationError> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::UnknownRegister {
                model: self.model,
                register: name.to_string(),
            })
    }

    /// 构建读寄存器指令：`[READ_DATA, address, width]`
    pub fn read_command(&self, name: &str) -> Result<RegisterCommand, ConfigurationError> {
        let register = self.lookup(name)?;
        if !register.access.is_readable() {
            return Err(ConfigurationError::NotReadable {
                model: self.model,
                register: name.to_string(),
            });
        }

        let width = register.len();
        let mut payload = SmallVec::new();
        payload.extend_from_slice(&[Instruction::ReadData.code(), register.address, width as u8]);
        Ok(RegisterCommand {
            response_len: width,
            payload,
        })
    }

    /// 构建写寄存器指令：`[WRITE_DATA, address, bytes..]`
    ///
    /// `encoded` 的长度必须等于寄存器宽度。
    pub fn write_command(
        &self,
        name: &str,
        encoded: &[u8],
    ) -> Result<RegisterCommand, ConfigurationError> {
        let register = self.lookup(name)?;
        if !register.access.is_writable() {
            return Err(ConfigurationError::NotWritable {
                model: self.model,
                register: name.to_string(),
            });
        }
        if encoded.len() != register.len() {
            return Err(ConfigurationError::SizeMismatch {
                model: self.model,
                register: name.to_string(),
                expected: register.len(),
                actual: encoded.len(),
            });
        }

        let mut payload = SmallVec::new();
        payload.push(Instruction::WriteData.code());
        payload.push(register.address);
        payload.extend_from_slice(encoded);
        Ok(RegisterCommand {
            response_len: 0,
            payload,
        })
    }

    /// 将逻辑值编码为寄存器字节
    pub fn encode(&self, name: &str, value: u16) -> Result<RegisterBytes, ConfigurationError> {
        let register = self.lookup(name)?;
        register
            .encode(value)
            .ok_or_else(|| ConfigurationError::ValueOutOfRange {
                register: name.to_string(),
                value: value as u32,
                max: register.width.max_value(),
            })
    }

    /// 将寄存器字节解码为逻辑值
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<u16, ConfigurationError> {
        let register = self.lookup(name)?;
        register
            .decode(bytes)
            .ok_or_else(|| ConfigurationError::SizeMismatch {
                model: self.model,
                register: name.to_string(),
                expected: register.len(),
                actual: bytes.len(),
            })
    }
}
