//! 模拟总线
//!
//! 内存中的 Dynamixel 1.0 总线，挂载若干虚拟舵机，按协议应答 PING / READ_DATA / WRITE_DATA。
//! 用于没有硬件时测试总线驱动。
//!
//! `SimulatedBus` 是可克隆的句柄，所有克隆共享同一份状态：测试可以把一个克隆交给驱动，
//! 用另一个克隆检查收到的请求帧和舵机内存。

use crate::{Transport, TransportError};
use dxl_protocol::{
    BROADCAST_ID, ErrorFlags, HEADER, Instruction, RequestPacket, build_status, checksum,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 虚拟舵机内存大小（控制表地址空间）
const MEMORY_SIZE: usize = 0x50;

const ADDR_FIRMWARE: usize = 0x02;
const ADDR_ID: usize = 0x03;

/// 一次性故障，作用于目标舵机的下一次应答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 翻转校验和字节
    CorruptChecksum,
    /// 应答中携带设备错误字节
    DeviceError(u8),
    /// 不应答
    Silent,
    /// 只发送前 N 个字节
    Truncate(usize),
}

/// 虚拟舵机
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    memory: [u8; MEMORY_SIZE],
}

impl SimulatedActuator {
    /// 以型号编号创建，控制表填入出厂默认值
    pub fn new(model_number: u16) -> Self {
        let mut memory = [0u8; MEMORY_SIZE];
        let [lo, hi] = model_number.to_le_bytes();
        memory[0x00] = lo;
        memory[0x01] = hi;
        memory[ADDR_FIRMWARE] = 0x18;
        memory[0x04] = 34; // 2_000_000 / (34 + 1) ≈ 57142 baud
        memory[0x05] = 250;

        let max_position: u16 = if model_number == 12 { 1023 } else { 4095 };
        let defaults: &[(usize, u16, usize)] = &[
            (0x06, 0, 2),
            (0x08, max_position, 2),
            (0x0B, 70, 1),
            (0x0C, 60, 1),
            (0x0D, 140, 1),
            (0x0E, 1023, 2),
            (0x10, 2, 1),
            (0x11, 36, 1),
            (0x12, 36, 1),
            (0x22, 1023, 2),
            (0x2A, 120, 1),
            (0x2B, 32, 1),
            (0x30, 32, 2),
        ];
        for &(address, value, width) in defaults {
            memory[address..address + width].copy_from_slice(&value.to_le_bytes()[..width]);
        }

        if model_number == 12 {
            // 柔顺边界 / 斜率
            memory[0x1A..0x1E].copy_from_slice(&[1, 1, 32, 32]);
        } else {
            // p_gain
            memory[0x1C] = 32;
        }

        Self { memory }
    }

    /// 设置单字节寄存器
    pub fn with_byte(mut self, address: u8, value: u8) -> Self {
        self.memory[address as usize] = value;
        self
    }

    /// 设置双字节寄存器（小端）
    pub fn with_word(mut self, address: u8, value: u16) -> Self {
        let address = address as usize;
        self.memory[address..address + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn read(&self, address: usize, len: usize) -> Option<&[u8]> {
        self.memory.get(address..address.checked_add(len)?)
    }

    fn write(&mut self, address: usize, data: &[u8]) -> bool {
        match self.memory.get_mut(address..address + data.len()) {
            Some(slot) => {
                slot.copy_from_slice(data);
                true
            },
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    actuators: BTreeMap<u8, SimulatedActuator>,
    faults: HashMap<u8, VecDeque<Fault>>,
    rx: VecDeque<u8>,
    requests: Vec<Vec<u8>>,
    reopen_count: usize,
    closed: bool,
}

impl BusState {
    fn handle_frame(&mut self, frame: &[u8]) {
        self.requests.push(frame.to_vec());

        // 真实舵机会忽略无法解析的帧
        let Ok(request) = RequestPacket::parse(frame) else {
            trace!("SimulatedBus: ignoring unparsable frame {:02X?}", frame);
            return;
        };

        match Instruction::try_from(request.instruction) {
            Ok(Instruction::Ping) => {
                if request.id == BROADCAST_ID {
                    let ids: Vec<u8> = self.actuators.keys().copied().collect();
                    for id in ids {
                        self.respond(id, ErrorFlags::default(), &[]);
                    }
                } else if self.actuators.contains_key(&request.id) {
                    self.respond(request.id, ErrorFlags::default(), &[]);
                }
            },
            Ok(Instruction::ReadData) => self.handle_read(&request),
            Ok(Instruction::WriteData) => self.handle_write(&request),
            _ => {
                if self.actuators.contains_key(&request.id) {
                    self.respond(
                        request.id,
                        ErrorFlags::from_bits(ErrorFlags::INSTRUCTION),
                        &[],
                    );
                }
            },
        }
    }

    fn handle_read(&mut self, request: &RequestPacket) {
        let Some(actuator) = self.actuators.get(&request.id) else {
            return;
        };
        let &[address, len] = request.params.as_slice() else {
            self.respond(request.id, ErrorFlags::from_bits(ErrorFlags::INSTRUCTION), &[]);
            return;
        };
        match actuator.read(address as usize, len as usize) {
            Some(data) => {
                let data = data.to_vec();
                self.respond(request.id, ErrorFlags::default(), &data);
            },
            None => self.respond(request.id, ErrorFlags::from_bits(ErrorFlags::RANGE), &[]),
        }
    }

    fn handle_write(&mut self, request: &RequestPacket) {
        let Some((&address, data)) = request.params.split_first() else {
            return;
        };
        let targets: Vec<u8> = if request.id == BROADCAST_ID {
            self.actuators.keys().copied().collect()
        } else if self.actuators.contains_key(&request.id) {
            vec![request.id]
        } else {
            return;
        };

        for id in targets {
            let Some(actuator) = self.actuators.get_mut(&id) else {
                continue;
            };
            if !actuator.write(address as usize, data) {
                if request.id != BROADCAST_ID {
                    self.respond(id, ErrorFlags::from_bits(ErrorFlags::RANGE), &[]);
                }
                continue;
            }

            // 写 ID 寄存器后舵机换到新地址
            let mut current = id;
            let id_range = address as usize..address as usize + data.len();
            if id_range.contains(&ADDR_ID) {
                let new_id = data[ADDR_ID - address as usize];
                if new_id != id {
                    if let Some(moved) = self.actuators.remove(&id) {
                        self.actuators.insert(new_id, moved);
                        current = new_id;
                    }
                }
            }

            // 广播写不应答
            if request.id != BROADCAST_ID {
                self.respond(current, ErrorFlags::default(), &[]);
            }
        }
    }

    fn respond(&mut self, id: u8, error: ErrorFlags, payload: &[u8]) {
        let fault = self.faults.get_mut(&id).and_then(VecDeque::pop_front);
        let error = match fault {
            Some(Fault::Silent) => return,
            Some(Fault::DeviceError(bits)) => ErrorFlags::from_bits(bits),
            _ => error,
        };
        let Ok(mut frame) = build_status(id, error, payload) else {
            return;
        };
        match fault {
            Some(Fault::CorruptChecksum) => {
                let last = frame.len() - 1;
                frame[last] ^= 0xFF;
            },
            Some(Fault::Truncate(len)) => frame.truncate(len),
            _ => {},
        }
        self.rx.extend(frame);
    }
}

/// 模拟总线句柄
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载一个出厂默认配置的舵机（构建器风格）
    pub fn with_actuator(self, id: u8, model_number: u16) -> Self {
        self.add_actuator(id, SimulatedActuator::new(model_number));
        self
    }

    /// 挂载舵机；ID 已存在时替换
    pub fn add_actuator(&self, id: u8, mut actuator: SimulatedActuator) {
        actuator.memory[ADDR_ID] = id;
        self.state.lock().actuators.insert(id, actuator);
    }

    pub fn remove_actuator(&self, id: u8) -> Option<SimulatedActuator> {
        self.state.lock().actuators.remove(&id)
    }

    /// 已挂载的舵机 ID（升序）
    pub fn actuator_ids(&self) -> Vec<u8> {
        self.state.lock().actuators.keys().copied().collect()
    }

    /// 为舵机的下一次应答注入故障（多次调用按顺序排队）
    pub fn inject_fault(&self, id: u8, fault: Fault) {
        self.state.lock().faults.entry(id).or_default().push_back(fault);
    }

    /// 直接修改舵机内存，不经过总线
    pub fn poke(&self, id: u8, address: u8, data: &[u8]) -> bool {
        self.state
            .lock()
            .actuators
            .get_mut(&id)
            .is_some_and(|actuator| actuator.write(address as usize, data))
    }

    /// 直接读取舵机内存，不经过总线
    pub fn peek(&self, id: u8, address: u8, len: usize) -> Option<Vec<u8>> {
        self.state
            .lock()
            .actuators
            .get(&id)
            .and_then(|actuator| actuator.read(address as usize, len).map(<[u8]>::to_vec))
    }

    /// 读取双字节寄存器（小端）
    pub fn peek_word(&self, id: u8, address: u8) -> Option<u16> {
        self.peek(id, address, 2)
            .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// 在接收缓冲区末尾追加原始字节
    pub fn push_rx(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes);
    }

    /// 收到的全部请求帧（按顺序）
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.lock().requests.clone()
    }

    /// 收到的 WRITE_DATA 请求数量
    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|frame| frame.get(4) == Some(&Instruction::WriteData.code()))
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    pub fn reopen_count(&self) -> usize {
        self.state.lock().reopen_count
    }

    /// 接收缓冲区中尚未读取的字节数
    pub fn pending_rx(&self) -> usize {
        self.state.lock().rx.len()
    }
}

impl Transport for SimulatedBus {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::NotOpen);
        }

        // 一次写入可能包含多帧，按长度字段切分
        let mut rest = bytes;
        while rest.len() >= 4 && rest[..2] == HEADER {
            let total = (4 + rest[3] as usize).min(rest.len());
            let (frame, tail) = rest.split_at(total);
            state.handle_frame(frame);
            rest = tail;
        }
        if !rest.is_empty() {
            state.requests.push(rest.to_vec());
        }
        Ok(())
    }

    fn read_exact(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::NotOpen);
        }
        if state.rx.len() < len {
            // 超时：已到达的字节被消耗
            let received = state.rx.len();
            state.rx.clear();
            return Err(TransportError::ShortRead {
                expected: len,
                received,
            });
        }
        Ok(state.rx.drain(..len).collect())
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        self.state.lock().rx.clear();
        Ok(())
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.rx.clear();
        state.closed = false;
        state.reopen_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// 构建一个带正确校验和的原始状态帧（测试辅助）
pub fn raw_status(id: u8, error: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = HEADER.to_vec();
    frame.push(id);
    frame.push(payload.len() as u8 + 2);
    frame.push(error);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[2..]));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxl_protocol::build_request;

    const TIMEOUT: Duration = Duration::from_millis(40);

    fn ping(id: u8) -> Vec<u8> {
        build_request(id, &[Instruction::Ping.code()]).unwrap().to_vec()
    }

    #[test]
    fn test_unicast_ping() {
        let mut bus = SimulatedBus::new().with_actuator(2, 12);
        bus.write_all(&ping(2)).unwrap();
        let reply = bus.read_exact(6, TIMEOUT).unwrap();
        assert_eq!(reply, raw_status(2, 0, &[]));

        // 不存在的 ID 不应答
        bus.write_all(&ping(9)).unwrap();
        assert_eq!(bus.pending_rx(), 0);
    }

    #[test]
    fn test_broadcast_ping_in_id_order() {
        let mut bus = SimulatedBus::new()
            .with_actuator(7, 310)
            .with_actuator(2, 12)
            .with_actuator(5, 29);
        bus.write_all(&ping(BROADCAST_ID)).unwrap();
        let ids: Vec<u8> = (0..3)
            .map(|_| bus.read_exact(6, TIMEOUT).unwrap()[2])
            .collect();
        assert_eq!(ids, vec![2, 5, 7]);
        assert!(bus.read_exact(4, TIMEOUT).unwrap_err().is_short_read());
    }

    #[test]
    fn test_read_model_number() {
        let mut bus = SimulatedBus::new().with_actuator(7, 310);
        bus.write_all(&build_request(7, &[0x02, 0x00, 0x02]).unwrap())
            .unwrap();
        let reply = bus.read_exact(8, TIMEOUT).unwrap();
        assert_eq!(reply, raw_status(7, 0, &310u16.to_le_bytes()));
    }

    #[test]
    fn test_write_updates_memory() {
        let mut bus = SimulatedBus::new().with_actuator(2, 12);
        let handle = bus.clone();
        bus.write_all(&build_request(2, &[0x03, 0x1E, 0x00, 0x02]).unwrap())
            .unwrap();
        assert_eq!(bus.read_exact(6, TIMEOUT).unwrap(), raw_status(2, 0, &[]));
        assert_eq!(handle.peek_word(2, 0x1E), Some(512));
        assert_eq!(handle.write_count(), 1);
        assert_eq!(handle.requests().len(), 1);
    }

    #[test]
    fn test_write_id_moves_actuator() {
        let mut bus = SimulatedBus::new().with_actuator(2, 29);
        bus.write_all(&build_request(2, &[0x03, 0x03, 0x09]).unwrap())
            .unwrap();
        assert_eq!(bus.read_exact(6, TIMEOUT).unwrap()[2], 9);
        assert_eq!(bus.actuator_ids(), vec![9]);
    }

    #[test]
    fn test_faults_apply_once() {
        let mut bus = SimulatedBus::new().with_actuator(3, 12);
        bus.inject_fault(3, Fault::CorruptChecksum);
        bus.inject_fault(3, Fault::DeviceError(ErrorFlags::OVERLOAD));
        bus.inject_fault(3, Fault::Silent);
        bus.inject_fault(3, Fault::Truncate(3));

        let good = raw_status(3, 0, &[]);

        bus.write_all(&ping(3)).unwrap();
        let reply = bus.read_exact(6, TIMEOUT).unwrap();
        assert_eq!(reply[..5], good[..5]);
        assert_ne!(reply[5], good[5]);

        bus.write_all(&ping(3)).unwrap();
        assert_eq!(bus.read_exact(6, TIMEOUT).unwrap()[4], ErrorFlags::OVERLOAD);

        bus.write_all(&ping(3)).unwrap();
        assert_eq!(bus.pending_rx(), 0);

        bus.write_all(&ping(3)).unwrap();
        assert_eq!(bus.pending_rx(), 3);
        let err = bus.read_exact(4, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortRead {
                expected: 4,
                received: 3
            }
        ));

        bus.write_all(&ping(3)).unwrap();
        assert_eq!(bus.read_exact(6, TIMEOUT).unwrap(), good);
    }

    #[test]
    fn test_read_out_of_range() {
        let mut bus = SimulatedBus::new().with_actuator(1, 12);
        bus.write_all(&build_request(1, &[0x02, 0xF0, 0x02]).unwrap())
            .unwrap();
        let reply = bus.read_exact(6, TIMEOUT).unwrap();
        assert_eq!(reply[4], ErrorFlags::RANGE);
    }

    #[test]
    fn test_close_and_reopen() {
        let mut bus = SimulatedBus::new().with_actuator(1, 12);
        bus.push_rx(&[0xAA, 0xBB]);
        bus.close().unwrap();
        assert!(matches!(bus.write_all(&ping(1)), Err(TransportError::NotOpen)));

        bus.reopen().unwrap();
        assert_eq!(bus.reopen_count(), 1);
        assert_eq!(bus.pending_rx(), 0);
        bus.write_all(&ping(1)).unwrap();
        assert_eq!(bus.read_exact(6, TIMEOUT).unwrap(), raw_status(1, 0, &[]));
    }
}
