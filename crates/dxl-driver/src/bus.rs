//! 舵机总线
//!
//! [`ActuatorBus`] 独占传输层，维护已发现的舵机集合（ID → 型号），
//! 提供发现、寄存器读写、快照与配置对齐。
//!
//! # 并发
//!
//! 传输层位于一把互斥锁之后，每次发送 / 接收 / 发送后接收都在持锁期间完成，
//! 不同调用方的帧不会交错。跨多次交换的操作（发现、对齐中的先读后写）默认不是原子的，
//! 需要整体原子性时使用 [`ActuatorBus::reconcile_exclusive`]。

use crate::error::{CommunicationError, DriverError};
use crate::report::{ReconcileReport, RegisterChange};
use dxl_protocol::{
    ActuatorModel, BROADCAST_ID, ConfigurationError, ConfigurationSnapshot, DEFAULT_TIMEOUT_MS,
    DesiredConfiguration, Instruction, MODEL_NUMBER_ADDRESS, MODEL_NUMBER_WIDTH, RegisterValues,
    STATUS_HEADER_LEN, StatusHeader, StatusPacket, build_request, is_unicast_id,
};
use dxl_transport::{Transport, TransportError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 需要应答的请求只能发往单播 ID
fn unicast(id: u8) -> Result<u8, ConfigurationError> {
    if is_unicast_id(id) {
        Ok(id)
    } else {
        Err(ConfigurationError::NotUnicast { id })
    }
}

/// 发送请求帧
fn send_frame<T: Transport + ?Sized>(
    transport: &mut T,
    id: u8,
    payload: &[u8],
) -> Result<(), DriverError> {
    let frame = build_request(id, payload)?;
    trace!("TX {:02X?}", frame.as_slice());
    transport.write_all(&frame)?;
    Ok(())
}

/// 接收并校验一个状态帧
fn receive_frame<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<StatusPacket, CommunicationError> {
    let bytes = transport
        .read_exact(STATUS_HEADER_LEN, timeout)
        .map_err(|e| match e {
            TransportError::ShortRead { received, .. } => {
                CommunicationError::ShortHeader { received }
            },
            other => other.into(),
        })?;
    let raw: [u8; STATUS_HEADER_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CommunicationError::ShortHeader {
            received: bytes.len(),
        })?;
    let header = StatusHeader::parse(&raw)?;

    let body = transport
        .read_exact(header.body_len(), timeout)
        .map_err(|e| match e {
            TransportError::ShortRead { expected, received } => CommunicationError::ShortBody {
                id: header.id,
                expected,
                received,
            },
            other => other.into(),
        })?;
    trace!("RX {:02X?} {:02X?}", raw, body);

    Ok(StatusPacket::parse(header, &body)?)
}

/// 帧收发通道
///
/// 两种实现：每次交换单独加锁，或在整个操作期间持有锁。
trait Channel {
    fn send(&mut self, id: u8, payload: &[u8]) -> Result<(), DriverError>;

    fn receive(&mut self) -> Result<StatusPacket, CommunicationError>;

    /// 发送后接收，中间不释放传输层
    fn exchange(&mut self, id: u8, payload: &[u8]) -> Result<StatusPacket, DriverError>;

    fn discard_input(&mut self) -> Result<(), DriverError>;
}

struct PerExchange<'a, T> {
    transport: &'a Mutex<T>,
    timeout: Duration,
}

impl<T: Transport> Channel for PerExchange<'_, T> {
    fn send(&mut self, id: u8, payload: &[u8]) -> Result<(), DriverError> {
        send_frame(&mut *self.transport.lock(), id, payload)
    }

    fn receive(&mut self) -> Result<StatusPacket, CommunicationError> {
        receive_frame(&mut *self.transport.lock(), self.timeout)
    }

    fn exchange(&mut self, id: u8, payload: &[u8]) -> Result<StatusPacket, DriverError> {
        let mut transport = self.transport.lock();
        send_frame(&mut *transport, id, payload)?;
        Ok(receive_frame(&mut *transport, self.timeout)?)
    }

    fn discard_input(&mut self) -> Result<(), DriverError> {
        self.transport.lock().discard_input()?;
        Ok(())
    }
}

struct Held<'a, T> {
    transport: &'a mut T,
    timeout: Duration,
}

impl<T: Transport> Channel for Held<'_, T> {
    fn send(&mut self, id: u8, payload: &[u8]) -> Result<(), DriverError> {
        send_frame(&mut *self.transport, id, payload)
    }

    fn receive(&mut self) -> Result<StatusPacket, CommunicationError> {
        receive_frame(&mut *self.transport, self.timeout)
    }

    fn exchange(&mut self, id: u8, payload: &[u8]) -> Result<StatusPacket, DriverError> {
        send_frame(&mut *self.transport, id, payload)?;
        Ok(receive_frame(&mut *self.transport, self.timeout)?)
    }

    fn discard_input(&mut self) -> Result<(), DriverError> {
        self.transport.discard_input()?;
        Ok(())
    }
}

fn expect_payload(
    packet: &StatusPacket,
    register: &str,
    expected: usize,
) -> Result<(), CommunicationError> {
    if packet.payload.len() != expected {
        return Err(CommunicationError::UnexpectedPayload {
            id: packet.id,
            register: register.to_string(),
            expected,
            actual: packet.payload.len(),
        });
    }
    Ok(())
}

/// 半双工舵机总线
///
/// `T: Send` 时 `ActuatorBus<T>` 为 `Send + Sync`，可以放进 `Arc` 在多个线程间共享。
///
/// # Example
///
/// ```no_run
/// use dxl_driver::BusBuilder;
///
/// let bus = BusBuilder::new().port("/dev/ttyUSB0").build().unwrap();
/// for (id, model) in bus.discover_all().unwrap() {
///     println!("ID {}: {}", id, model);
/// }
/// bus.write_register(2, "goal_pos", 512).unwrap();
/// ```
pub struct ActuatorBus<T: Transport> {
    transport: Mutex<T>,
    timeout: Duration,
    actuators: RwLock<BTreeMap<u8, ActuatorModel>>,
}

impl<T: Transport> ActuatorBus<T> {
    /// 使用默认读超时（40ms）创建
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(transport),
            timeout,
            actuators: RwLock::new(BTreeMap::new()),
        }
    }

    /// 每次读操作的超时
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn channel(&self) -> PerExchange<'_, T> {
        PerExchange {
            transport: &self.transport,
            timeout: self.timeout,
        }
    }

    // ==================== 低层收发 ====================

    /// 发送一个请求帧，不等待应答
    pub fn send(&self, id: u8, payload: &[u8]) -> Result<(), DriverError> {
        self.channel().send(id, payload)
    }

    /// 接收一个状态帧
    pub fn receive(&self) -> Result<StatusPacket, DriverError> {
        Ok(self.channel().receive()?)
    }

    /// 发送请求并接收应答
    pub fn exchange(&self, id: u8, payload: &[u8]) -> Result<StatusPacket, DriverError> {
        self.channel().exchange(id, payload)
    }

    /// 按地址读取原始字节
    pub fn read_raw(&self, id: u8, address: u8, len: u8) -> Result<Vec<u8>, DriverError> {
        let id = unicast(id)?;
        let label = format!("address 0x{:02X}", address);
        Self::read_raw_with(&mut self.channel(), id, address, len, &label)
    }

    /// 按地址写入原始字节
    pub fn write_raw(&self, id: u8, address: u8, data: &[u8]) -> Result<(), DriverError> {
        let id = unicast(id)?;
        let mut payload = Vec::with_capacity(data.len() + 2);
        payload.push(Instruction::WriteData.code());
        payload.push(address);
        payload.extend_from_slice(data);

        let packet = self.exchange(id, &payload)?;
        expect_payload(&packet, &format!("address 0x{:02X}", address), 0)?;
        Ok(())
    }

    /// 读取型号编号（地址 0，2 字节）
    pub fn model_number(&self, id: u8) -> Result<u16, DriverError> {
        Self::model_number_with(&mut self.channel(), unicast(id)?)
    }

    /// 重新打开传输层，并丢弃接收缓冲区中残留的字节
    pub fn reopen(&self) -> Result<(), DriverError> {
        let mut transport = self.transport.lock();
        transport.reopen()?;
        transport.discard_input()?;
        info!("Reopened transport {}", transport.name());
        Ok(())
    }

    /// 关闭传输层
    pub fn close(&self) -> Result<(), DriverError> {
        self.transport.lock().close()?;
        Ok(())
    }

    fn read_raw_with<C: Channel>(
        ch: &mut C,
        id: u8,
        address: u8,
        len: u8,
        label: &str,
    ) -> Result<Vec<u8>, DriverError> {
        let packet = ch.exchange(id, &[Instruction::ReadData.code(), address, len])?;
        expect_payload(&packet, label, len as usize)?;
        Ok(packet.payload.to_vec())
    }

    fn model_number_with<C: Channel>(ch: &mut C, id: u8) -> Result<u16, DriverError> {
        let bytes = Self::read_raw_with(
            ch,
            id,
            MODEL_NUMBER_ADDRESS,
            MODEL_NUMBER_WIDTH,
            "model_number",
        )?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    // ==================== 舵机集合 ====================

    /// PING 单个舵机
    pub fn ping(&self, id: u8) -> Result<(), DriverError> {
        self.exchange(unicast(id)?, &[Instruction::Ping.code()])?;
        debug!("Actuator ID {} answered ping", id);
        Ok(())
    }

    /// 广播 PING 发现总线上的全部舵机
    ///
    /// 收集应答直到出现通信错误（通常是超时），丢弃接收缓冲区中的残留字节，
    /// 然后读取每个应答者的型号编号。
    /// 已发现集合先被清空，成功后整体替换。
    ///
    /// # 错误
    /// - `ConfigurationError::UnknownModel`: 有舵机的型号编号不受支持
    /// - 读取型号编号时的通信错误
    pub fn discover_all(&self) -> Result<BTreeMap<u8, ActuatorModel>, DriverError> {
        self.discover_with(&mut self.channel())
    }

    /// 已发现的舵机（ID 升序）
    pub fn actuators(&self) -> BTreeMap<u8, ActuatorModel> {
        self.actuators.read().clone()
    }

    pub fn model_of(&self, id: u8) -> Option<ActuatorModel> {
        self.actuators.read().get(&id).copied()
    }

    fn resolve(&self, id: u8) -> Result<ActuatorModel, ConfigurationError> {
        self.model_of(id)
            .ok_or(ConfigurationError::UnknownActuator { id })
    }

    fn discover_with<C: Channel>(
        &self,
        ch: &mut C,
    ) -> Result<BTreeMap<u8, ActuatorModel>, DriverError> {
        self.actuators.write().clear();

        ch.send(BROADCAST_ID, &[Instruction::Ping.code()])?;
        let mut responders = BTreeSet::new();
        loop {
            match ch.receive() {
                Ok(packet) => {
                    if !responders.insert(packet.id) {
                        debug!("Duplicate ping response from ID {}", packet.id);
                    }
                },
                Err(err) => {
                    debug!("Broadcast ping finished: {}", err);
                    break;
                },
            }
        }
        // 损坏的应答之后可能还有其他舵机的残留字节
        ch.discard_input()?;

        let mut found = BTreeMap::new();
        for id in responders {
            let model_number = Self::model_number_with(ch, id)?;
            match ActuatorModel::name_for(model_number) {
                Some(name) => info!("Found actuator ID {} model {} ({})", id, name, model_number),
                None => warn!("Found actuator ID {} model unknown ({})", id, model_number),
            }
            found.insert(id, ActuatorModel::from_model_number(model_number)?);
        }

        *self.actuators.write() = found.clone();
        Ok(found)
    }

    // ==================== 寄存器读写 ====================

    /// 按名称读取寄存器
    ///
    /// # 错误
    /// - `ConfigurationError::UnknownActuator`: ID 未被发现
    /// - `ConfigurationError::UnknownRegister` / `NotReadable`
    /// - `CommunicationError::UnexpectedPayload`: 应答长度不等于寄存器宽度
    pub fn read_register(&self, id: u8, register: &str) -> Result<u16, DriverError> {
        self.read_register_with(&mut self.channel(), id, register)
    }

    /// 按名称写入寄存器
    ///
    /// # 错误
    /// - `ConfigurationError::UnknownActuator`: ID 未被发现
    /// - `ConfigurationError::UnknownRegister` / `NotWritable` / `ValueOutOfRange`
    /// - `CommunicationError::UnexpectedPayload`: 应答不是空确认
    pub fn write_register(&self, id: u8, register: &str, value: u16) -> Result<(), DriverError> {
        self.write_register_with(&mut self.channel(), id, register, value)
    }

    fn read_register_with<C: Channel>(
        &self,
        ch: &mut C,
        id: u8,
        register: &str,
    ) -> Result<u16, DriverError> {
        let table = self.resolve(id)?.table();
        let command = table.read_command(register)?;
        let packet = ch.exchange(id, &command.payload)?;
        expect_payload(&packet, register, command.response_len)?;
        let value = table.decode(register, &packet.payload)?;
        debug!("Read {} = {} from actuator ID {}", register, value, id);
        Ok(value)
    }

    fn write_register_with<C: Channel>(
        &self,
        ch: &mut C,
        id: u8,
        register: &str,
        value: u16,
    ) -> Result<(), DriverError> {
        let table = self.resolve(id)?.table();
        let encoded = table.encode(register, value)?;
        let command = table.write_command(register, &encoded)?;
        let packet = ch.exchange(id, &command.payload)?;
        expect_payload(&packet, register, command.response_len)?;
        debug!("Wrote {} = {} to actuator ID {}", register, value, id);
        Ok(())
    }

    // ==================== 快照与对齐 ====================

    /// 发现全部舵机并读取每个舵机的全部寄存器（按地址顺序）
    pub fn snapshot(&self) -> Result<ConfigurationSnapshot, DriverError> {
        let mut ch = self.channel();
        let actuators = self.discover_with(&mut ch)?;

        let mut snapshot = ConfigurationSnapshot::new();
        for (id, model) in actuators {
            let mut values = RegisterValues::new();
            for (name, register) in model.table().iter() {
                if register.access.is_readable() {
                    values.insert(name, self.read_register_with(&mut ch, id, name)?);
                }
            }
            snapshot.insert_actuator(id, values);
        }
        Ok(snapshot)
    }

    /// 使总线状态与期望配置一致
    ///
    /// 重新发现舵机，逐个读取期望配置中的寄存器：
    /// - 已一致：跳过
    /// - 不一致且可写：写入（EEPROM 寄存器额外记录一条 info 日志）
    /// - 不一致且只读：易失寄存器忽略；EEPROM 寄存器返回 `PersistentDrift`，不做写入
    ///
    /// 未知舵机 ID、未知寄存器名和可写寄存器上超出宽度的取值在任何读写之前报错。
    /// 每次交换单独加锁，整体不是原子的。
    pub fn reconcile(
        &self,
        desired: &DesiredConfiguration,
    ) -> Result<ReconcileReport, DriverError> {
        self.reconcile_with(&mut self.channel(), desired)
    }

    /// 与 [`reconcile`](Self::reconcile) 相同，但在整个过程中（包括发现）持有传输层锁
    pub fn reconcile_exclusive(
        &self,
        desired: &DesiredConfiguration,
    ) -> Result<ReconcileReport, DriverError> {
        let mut transport = self.transport.lock();
        let mut ch = Held {
            transport: &mut *transport,
            timeout: self.timeout,
        };
        self.reconcile_with(&mut ch, desired)
    }

    fn reconcile_with<C: Channel>(
        &self,
        ch: &mut C,
        desired: &DesiredConfiguration,
    ) -> Result<ReconcileReport, DriverError> {
        let actuators = self.discover_with(ch)?;

        let mut plan = Vec::with_capacity(desired.len());
        for (id, values) in desired.iter() {
            let model = *actuators
                .get(&id)
                .ok_or(ConfigurationError::UnknownActuator { id })?;
            let table = model.table();

            let mut entries = Vec::with_capacity(values.len());
            for (name, value) in values.iter() {
                let register = table.lookup(name)?;
                if register.access.is_writable() {
                    table.encode(name, value)?;
                }
                entries.push((register, name, value));
            }
            entries.sort_by_key(|(register, _, _)| register.address);
            plan.push((id, entries));
        }

        let mut report = ReconcileReport::default();
        for (id, entries) in plan {
            for (register, name, value) in entries {
                let current = self.read_register_with(ch, id, name)?;
                if current == value {
                    report.unchanged += 1;
                    continue;
                }

                let change = RegisterChange {
                    id,
                    register: name.to_string(),
                    current,
                    desired: value,
                };

                if !register.access.is_writable() {
                    if register.persistent {
                        return Err(ConfigurationError::PersistentDrift {
                            id,
                            register: name.to_string(),
                            current,
                            desired: value,
                        }
                        .into());
                    }
                    warn!(
                        "Ignoring read-only register {} on actuator ID {}: current {}, desired {}",
                        name, id, current, value
                    );
                    report.tolerated.push(change);
                    continue;
                }

                if register.persistent {
                    info!(
                        "Writing EEPROM register {} on actuator ID {}: {} -> {} (slow, limited write cycles)",
                        name, id, current, value
                    );
                }
                self.write_register_with(ch, id, name, value)?;
                report.written.push(change);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxl_protocol::PacketError;
    use dxl_transport::mock::raw_status;
    use dxl_transport::{Fault, SimulatedActuator, SimulatedBus};
    use std::sync::Arc;

    fn three_actuators() -> SimulatedBus {
        SimulatedBus::new()
            .with_actuator(2, 12)
            .with_actuator(5, 29)
            .with_actuator(7, 310)
    }

    fn discovered(sim: &SimulatedBus) -> ActuatorBus<SimulatedBus> {
        let bus = ActuatorBus::new(sim.clone());
        bus.discover_all().unwrap();
        sim.clear_requests();
        bus
    }

    #[test]
    fn test_bus_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ActuatorBus<SimulatedBus>>();
    }

    #[test]
    fn test_discover_all() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());
        let found = bus.discover_all().unwrap();

        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![
                (2, ActuatorModel::Ax12),
                (5, ActuatorModel::Mx28),
                (7, ActuatorModel::Mx64),
            ]
        );
        assert_eq!(bus.model_of(5), Some(ActuatorModel::Mx28));
        assert_eq!(bus.model_of(3), None);
    }

    #[test]
    fn test_discover_replaces_previous_set() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.remove_actuator(5);

        let found = bus.discover_all().unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(bus.actuators(), found);
    }

    #[test]
    fn test_discover_unknown_model_clears_set() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.add_actuator(9, SimulatedActuator::new(1020));

        let err = bus.discover_all().unwrap_err();
        assert!(matches!(
            err,
            DriverError::Configuration(ConfigurationError::UnknownModel { model_number: 1020 })
        ));
        assert!(bus.actuators().is_empty());
    }

    #[test]
    fn test_discover_empty_bus() {
        let bus = ActuatorBus::new(SimulatedBus::new());
        assert!(bus.discover_all().unwrap().is_empty());
    }

    #[test]
    fn test_ping() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());
        bus.ping(7).unwrap();

        let err = bus.ping(8).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Communication(CommunicationError::ShortHeader { received: 0 })
        ));
    }

    #[test]
    fn test_broadcast_id_rejected_for_replies() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        for err in [
            bus.ping(BROADCAST_ID).unwrap_err(),
            bus.read_raw(BROADCAST_ID, 0x24, 2).unwrap_err(),
            bus.write_raw(BROADCAST_ID, 0x19, &[1]).unwrap_err(),
            bus.model_number(0xFF).unwrap_err(),
        ] {
            assert!(err.is_configuration());
        }
        assert!(matches!(
            bus.ping(BROADCAST_ID).unwrap_err(),
            DriverError::Configuration(ConfigurationError::NotUnicast { id: 0xFE })
        ));
        // 没有任何帧发出
        assert!(sim.requests().is_empty());
    }

    #[test]
    fn test_read_write_register() {
        let sim = three_actuators();
        let bus = discovered(&sim);

        bus.write_register(2, "goal_pos", 512).unwrap();
        assert_eq!(sim.peek_word(2, 0x1E), Some(512));
        assert_eq!(bus.read_register(2, "goal_pos").unwrap(), 512);
        assert_eq!(bus.read_register(5, "p_gain").unwrap(), 32);
        assert_eq!(bus.read_register(7, "model_number").unwrap(), 310);
    }

    #[test]
    fn test_register_errors_are_configuration_errors() {
        let sim = three_actuators();
        let bus = discovered(&sim);

        let cases: Vec<(DriverError, &str)> = vec![
            (bus.read_register(3, "goal_pos").unwrap_err(), "UnknownActuator"),
            (bus.read_register(2, "p_gain").unwrap_err(), "UnknownRegister"),
            (
                bus.write_register(5, "present_position", 10).unwrap_err(),
                "NotWritable",
            ),
            (bus.write_register(5, "led", 256).unwrap_err(), "ValueOutOfRange"),
        ];
        for (err, label) in cases {
            assert!(err.is_configuration(), "{}: {:?}", label, err);
        }
        // 配置错误不产生任何总线流量
        assert!(sim.requests().is_empty());
    }

    #[test]
    fn test_unexpected_payload() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.inject_fault(2, Fault::Silent);
        sim.push_rx(&raw_status(2, 0, &[0x01]));

        let err = bus.read_register(2, "goal_pos").unwrap_err();
        match err {
            DriverError::Communication(CommunicationError::UnexpectedPayload {
                id,
                register,
                expected,
                actual,
            }) => {
                assert_eq!((id, register.as_str(), expected, actual), (2, "goal_pos", 2, 1));
            },
            other => panic!("Expected UnexpectedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_device_error() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.inject_fault(5, Fault::DeviceError(0x20));

        let err = bus.read_register(5, "present_load").unwrap_err();
        match err {
            DriverError::Communication(inner) => {
                assert_eq!(inner.device_flags().map(|f| f.bits()), Some(0x20));
            },
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_body() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.inject_fault(7, Fault::Truncate(6));

        let err = bus.read_register(7, "goal_pos").unwrap_err();
        assert!(matches!(
            err,
            DriverError::Communication(CommunicationError::ShortBody {
                id: 7,
                expected: 4,
                received: 2
            })
        ));
    }

    #[test]
    fn test_malformed_length() {
        let sim = three_actuators();
        let bus = discovered(&sim);
        sim.push_rx(&[0xFF, 0xFF, 0x02, 0x01, 0x00]);

        let err = bus.receive().unwrap_err();
        assert!(matches!(
            err,
            DriverError::Communication(CommunicationError::Packet(
                PacketError::MalformedLength { id: 2, length: 1 }
            ))
        ));
        // 长度非法时不再读取包体
        assert_eq!(sim.pending_rx(), 1);
    }

    #[test]
    fn test_raw_access() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        assert_eq!(bus.model_number(5).unwrap(), 29);
        bus.write_raw(5, 0x19, &[1]).unwrap();
        assert_eq!(bus.read_raw(5, 0x19, 1).unwrap(), vec![1]);
        assert_eq!(bus.read_raw(5, 0x1E, 2).unwrap(), vec![0, 0]);

        bus.send(5, &[Instruction::Ping.code()]).unwrap();
        let packet = bus.receive().unwrap();
        assert_eq!(packet.id, 5);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_snapshot_covers_every_register() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());
        let snapshot = bus.snapshot().unwrap();

        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec![2, 5, 7]);
        for (id, model) in bus.actuators() {
            let values = snapshot.actuator(id).unwrap();
            let names: Vec<&str> = values.names().collect();
            let expected: Vec<&str> = model.table().names().collect();
            assert_eq!(names, expected);
            assert_eq!(values.get("model_number"), Some(model.model_number()));
            assert_eq!(values.get("id"), Some(id as u16));
        }
        assert_eq!(snapshot.get(2, "baud_rate"), Some(34));
    }

    #[test]
    fn test_reconcile_writes_only_differences() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(5, "goal_pos", 1024);
        desired.set(5, "p_gain", 32);
        desired.set(2, "led", 1);

        let report = bus.reconcile(&desired).unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(
            report
                .written
                .iter()
                .map(|c| (c.id, c.register.as_str()))
                .collect::<Vec<_>>(),
            vec![(2, "led"), (5, "goal_pos")]
        );
        assert_eq!(sim.peek_word(5, 0x1E), Some(1024));
        assert_eq!(sim.peek(2, 0x19, 1), Some(vec![1]));
        assert_eq!(sim.write_count(), 2);
    }

    #[test]
    fn test_reconcile_visits_registers_in_address_order() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(7, "torque_limit", 500);
        desired.set(7, "led", 1);
        desired.set(7, "goal_pos", 100);

        let report = bus.reconcile(&desired).unwrap();
        let order: Vec<&str> = report.written.iter().map(|c| c.register.as_str()).collect();
        assert_eq!(order, vec!["led", "goal_pos", "torque_limit"]);
    }

    #[test]
    fn test_reconcile_volatile_read_only_drift_tolerated() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(2, "present_temp", 99);

        let report = bus.reconcile(&desired).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.tolerated.len(), 1);
        assert_eq!(report.tolerated[0].current, 32);
        assert_eq!(sim.write_count(), 0);
    }

    #[test]
    fn test_reconcile_read_only_value_out_of_width_tolerated() {
        let sim = SimulatedBus::new().with_actuator(2, 12);
        let bus = ActuatorBus::new(sim.clone());

        // present_temp 只有 1 字节，但只读寄存器不会被编码写入
        let mut desired = DesiredConfiguration::new();
        desired.set(2, "present_temp", 300);

        let report = bus.reconcile(&desired).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.tolerated.len(), 1);
        assert_eq!(report.tolerated[0].current, 32);
        assert_eq!(report.tolerated[0].desired, 300);
        assert_eq!(sim.write_count(), 0);
    }

    #[test]
    fn test_reconcile_writable_value_out_of_width_rejected() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(2, "goal_pos", 100);
        desired.set(2, "led", 300);

        let err = bus.reconcile(&desired).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Configuration(ConfigurationError::ValueOutOfRange { value: 300, .. })
        ));
        assert_eq!(sim.write_count(), 0);
    }

    #[test]
    fn test_reconcile_validates_before_io() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(2, "led", 1);
        desired.set(5, "cw_compliance_margin", 3);

        let err = bus.reconcile(&desired).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Configuration(ConfigurationError::UnknownRegister { model: "MX28", .. })
        ));
        assert_eq!(sim.write_count(), 0);

        let mut desired = DesiredConfiguration::new();
        desired.set(4, "led", 1);
        let err = bus.reconcile(&desired).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Configuration(ConfigurationError::UnknownActuator { id: 4 })
        ));
    }

    #[test]
    fn test_reconcile_exclusive_matches_reconcile() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());

        let mut desired = DesiredConfiguration::new();
        desired.set(7, "goal_pos", 2048);
        desired.set(7, "return_delay", 0);

        let report = bus.reconcile_exclusive(&desired).unwrap();
        assert_eq!(report.write_count(), 2);
        assert!(bus.reconcile_exclusive(&desired).unwrap().is_noop());
        assert!(bus.reconcile(&desired).unwrap().is_noop());
    }

    #[test]
    fn test_concurrent_reads_do_not_interleave() {
        let sim = three_actuators();
        let bus = Arc::new(discovered(&sim));

        let handles: Vec<_> = [2u8, 5, 7]
            .into_iter()
            .map(|id| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        assert_eq!(bus.read_register(id, "id").unwrap(), id as u16);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_reopen_discards_pending_input() {
        let sim = three_actuators();
        let bus = ActuatorBus::new(sim.clone());
        sim.push_rx(&[0xFF, 0xFF, 0x02]);

        bus.reopen().unwrap();
        assert_eq!(sim.pending_rx(), 0);
        assert_eq!(sim.reopen_count(), 1);
        bus.ping(2).unwrap();
    }
}
