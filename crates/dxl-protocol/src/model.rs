//! 舵机型号注册表
//!
//! 支持的型号是一个封闭集合，每个型号对应一个型号编号和一张寄存器表。
//! 寄存器表是共享的只读数据，首次访问时构建。

use crate::error::ConfigurationError;
use crate::register::{Access, Register};
use crate::table::{RegisterDef, RegisterTable};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use Access::{Read as R, ReadWrite as RW};

/// AX / MX 系列公共寄存器
const BASE_REGISTERS: &[RegisterDef] = &[
    // EEPROM 区
    ("model_number", Register::word(0x00, R).eeprom()),
    ("firmware", Register::byte(0x02, R).eeprom()),
    ("id", Register::byte(0x03, RW).eeprom()),
    ("baud_rate", Register::byte(0x04, RW).eeprom()),
    ("return_delay", Register::byte(0x05, RW).eeprom()),
    ("cw_angle_limit", Register::word(0x06, RW).eeprom()),
    ("ccw_angle_limit", Register::word(0x08, RW).eeprom()),
    ("high_temp_limit", Register::byte(0x0B, RW).eeprom()),
    ("low_voltage_limit", Register::byte(0x0C, RW).eeprom()),
    ("high_voltage_limit", Register::byte(0x0D, RW).eeprom()),
    ("max_torque", Register::word(0x0E, RW).eeprom()),
    ("status_return_level", Register::byte(0x10, RW).eeprom()),
    ("alarm_led", Register::byte(0x11, RW).eeprom()),
    ("alarm_shutdown", Register::byte(0x12, RW).eeprom()),
    // RAM 区
    ("torque_enable", Register::byte(0x18, RW)),
    ("led", Register::byte(0x19, RW)),
    // 0x1A..0x1D 由型号扩展定义
    ("goal_pos", Register::word(0x1E, RW)),
    ("moving_speed", Register::word(0x20, RW)),
    ("torque_limit", Register::word(0x22, RW)),
    ("present_position", Register::word(0x24, R)),
    ("present_speed", Register::word(0x26, R)),
    ("present_load", Register::word(0x28, R)),
    ("present_voltage", Register::byte(0x2A, R)),
    ("present_temp", Register::byte(0x2B, R)),
    ("registered", Register::byte(0x2C, R)),
    ("moving", Register::byte(0x2E, R)),
    ("lock", Register::byte(0x2F, RW)),
    ("punch", Register::word(0x30, RW)),
];

/// AX-12：柔顺边界与斜率
const COMPLIANCE_REGISTERS: &[RegisterDef] = &[
    ("cw_compliance_margin", Register::byte(0x1A, RW)),
    ("ccw_compliance_margin", Register::byte(0x1B, RW)),
    ("cw_compliance_slope", Register::byte(0x1C, RW)),
    ("ccw_compliance_slope", Register::byte(0x1D, RW)),
];

/// MX 系列：PID 增益
const GAIN_REGISTERS: &[RegisterDef] = &[
    ("d_gain", Register::byte(0x1A, RW)),
    ("i_gain", Register::byte(0x1B, RW)),
    ("p_gain", Register::byte(0x1C, RW)),
];

static AX12_TABLE: LazyLock<RegisterTable> =
    LazyLock::new(|| RegisterTable::compose("AX12", BASE_REGISTERS, COMPLIANCE_REGISTERS));
static MX28_TABLE: LazyLock<RegisterTable> =
    LazyLock::new(|| RegisterTable::compose("MX28", BASE_REGISTERS, GAIN_REGISTERS));
static MX64_TABLE: LazyLock<RegisterTable> =
    LazyLock::new(|| RegisterTable::compose("MX64", BASE_REGISTERS, GAIN_REGISTERS));

/// 舵机型号
///
/// 判别值即型号寄存器（地址 0）中的型号编号。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ActuatorModel {
    Ax12 = 12,
    Mx28 = 29,
    Mx64 = 310,
}

impl ActuatorModel {
    pub const ALL: [ActuatorModel; 3] = [Self::Ax12, Self::Mx28, Self::Mx64];

    pub fn model_number(self) -> u16 {
        self.into()
    }

    /// 型号名称（如 "MX28"）
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ax12 => "AX12",
            Self::Mx28 => "MX28",
            Self::Mx64 => "MX64",
        }
    }

    /// 该型号的寄存器表
    pub fn table(self) -> &'static RegisterTable {
        match self {
            Self::Ax12 => &AX12_TABLE,
            Self::Mx28 => &MX28_TABLE,
            Self::Mx64 => &MX64_TABLE,
        }
    }

    /// 根据型号编号创建型号
    ///
    /// # 错误
    /// - `ConfigurationError::UnknownModel`: 不支持的型号编号
    pub fn from_model_number(model_number: u16) -> Result<Self, ConfigurationError> {
        Self::try_from(model_number).map_err(|_| ConfigurationError::UnknownModel { model_number })
    }

    /// 根据名称查找型号
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.name() == name)
    }

    /// 型号编号对应的名称，未知时返回 `None`
    pub fn name_for(model_number: u16) -> Option<&'static str> {
        Self::try_from(model_number).ok().map(Self::name)
    }
}

impl fmt::Display for ActuatorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActuatorModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown actuator model: {}", s))
    }
}
