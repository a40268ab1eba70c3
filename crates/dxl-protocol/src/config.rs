//! 配置快照结构体定义
//!
//! 交换格式：`{ "<id>": { "<register>": <value>, ... }, ... }`
//!
//! - 快照（读取结果）覆盖所有已发现舵机的所有寄存器，按寄存器地址排序
//! - 期望配置（调用方输入）可以只包含部分舵机、部分寄存器

use std::collections::BTreeMap;

/// 单个舵机的寄存器取值（保持插入顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterValues {
    entries: Vec<(String, u16)>,
}

impl RegisterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置寄存器值；已存在时覆盖原值并保持原位置
    pub fn insert(&mut self, name: impl Into<String>, value: u16) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u16)> for RegisterValues {
    fn from_iter<I: IntoIterator<Item = (S, u16)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

impl IntoIterator for RegisterValues {
    type Item = (String, u16);
    type IntoIter = std::vec::IntoIter<(String, u16)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// 舵机配置集合：ID → 寄存器取值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Configuration {
    actuators: BTreeMap<u8, RegisterValues>,
}

/// 从总线读取的完整配置
pub type ConfigurationSnapshot = Configuration;

/// 调用方期望的（部分）配置
pub type DesiredConfiguration = Configuration;

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置某个舵机的全部寄存器取值（覆盖已有条目）
    pub fn insert_actuator(&mut self, id: u8, values: RegisterValues) {
        self.actuators.insert(id, values);
    }

    /// 设置单个寄存器取值
    pub fn set(&mut self, id: u8, register: impl Into<String>, value: u16) {
        self.actuators.entry(id).or_default().insert(register, value);
    }

    pub fn get(&self, id: u8, register: &str) -> Option<u16> {
        self.actuators.get(&id).and_then(|values| values.get(register))
    }

    pub fn actuator(&self, id: u8) -> Option<&RegisterValues> {
        self.actuators.get(&id)
    }

    /// 按 ID 升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u8, &RegisterValues)> {
        self.actuators.iter().map(|(id, values)| (*id, values))
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.actuators.keys().copied()
    }

    /// 舵机数量
    pub fn len(&self) -> usize {
        self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuators.is_empty()
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::RegisterValues;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for RegisterValues {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (name, value) in self.iter() {
                map.serialize_entry(name, &value)?;
            }
            map.end()
        }
    }

    struct RegisterValuesVisitor;

    impl<'de> Visitor<'de> for RegisterValuesVisitor {
        type Value = RegisterValues;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from register name to an unsigned 16-bit value")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut values = RegisterValues::new();
            while let Some((name, value)) = access.next_entry::<String, u16>()? {
                values.insert(name, value);
            }
            Ok(values)
        }
    }

    impl<'de> Deserialize<'de> for RegisterValues {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(RegisterValuesVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_values_preserve_order() {
        let mut values = RegisterValues::new();
        values.insert("model_number", 12);
        values.insert("id", 2);
        values.insert("goal_pos", 200);
        values.insert("id", 3);

        let names: Vec<_> = values.names().collect();
        assert_eq!(names, vec!["model_number", "id", "goal_pos"]);
        assert_eq!(values.get("id"), Some(3));
        assert_eq!(values.get("led"), None);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_configuration_set_get() {
        let mut config = Configuration::new();
        config.set(5, "p_gain", 32);
        config.set(2, "goal_pos", 512);
        config.set(5, "led", 1);

        assert_eq!(config.len(), 2);
        assert_eq!(config.get(5, "p_gain"), Some(32));
        assert_eq!(config.get(2, "goal_pos"), Some(512));
        assert_eq!(config.get(7, "goal_pos"), None);
        assert_eq!(config.ids().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_roundtrip_keeps_register_order() {
        let mut config = Configuration::new();
        config.insert_actuator(
            2,
            [("model_number", 12u16), ("id", 2), ("goal_pos", 200)]
                .into_iter()
                .collect(),
        );

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"2":{"model_number":12,"id":2,"goal_pos":200}}"#);

        let parsed: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_partial_input() {
        let json = r#"{ "2": { "goal_pos": 100 }, "7": {} }"#;
        let config: Configuration = serde_json::from_str(json).unwrap();
        assert_eq!(config.get(2, "goal_pos"), Some(100));
        assert!(config.actuator(7).unwrap().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_rejects_out_of_range() {
        let json = r#"{ "2": { "goal_pos": 70000 } }"#;
        assert!(serde_json::from_str::<Configuration>(json).is_err());
        let json = r#"{ "2": { "goal_pos": -1 } }"#;
        assert!(serde_json::from_str::<Configuration>(json).is_err());
    }
}
