use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use log::info;

use crate::io::bus::{BusError, BusOp, RegisterBus};
use crate::io::dummy::{read_all, DummyIO};
use crate::mcp23017::Register;

pub enum ModifyState {
    SetRegister(u8, Register, u8),
    /// Fail the n-th read from now on, counting from 0.
    FailRead(usize),
    /// Fail the n-th write from now on, counting from 0.
    FailWrite(usize),
}

/// An in-memory MCP23017 register file that records every operation issued against it.
pub struct Dummy {
    receiver: Receiver<ModifyState>,
    log_writes: bool,
    devices: HashMap<u8, [u8; Register::COUNT]>,
    ops: Vec<BusOp>,
    fail_read_in: Option<usize>,
    fail_write_in: Option<usize>,
}

impl Dummy {
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn register(&self, address: u8, register: Register) -> u8 {
        self.devices
            .get(&address)
            .map(|regs| regs[register.addr() as usize])
            .unwrap_or_else(|| power_on_value(register))
    }

    /// Values written to the given register, in order.
    pub fn writes_to(&self, register: Register) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Write { register: r, value, .. } if *r == register => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn update(&mut self) {
        let mut pending = Vec::new();
        read_all(&self.receiver, |msg| pending.push(msg));
        for msg in pending {
            match msg {
                ModifyState::SetRegister(address, register, value) => {
                    self.device(address)[register.addr() as usize] = value;
                }
                ModifyState::FailRead(n) => self.fail_read_in = Some(n),
                ModifyState::FailWrite(n) => self.fail_write_in = Some(n),
            }
        }
    }

    fn device(&mut self, address: u8) -> &mut [u8; Register::COUNT] {
        self.devices.entry(address).or_insert_with(power_on_registers)
    }
}

fn power_on_value(register: Register) -> u8 {
    match register {
        Register::IODIRA | Register::IODIRB => 0xFF,
        _ => 0x00,
    }
}

fn power_on_registers() -> [u8; Register::COUNT] {
    let mut regs = [0x00; Register::COUNT];
    regs[Register::IODIRA.addr() as usize] = power_on_value(Register::IODIRA);
    regs[Register::IODIRB.addr() as usize] = power_on_value(Register::IODIRB);
    regs
}

/// Counts down an injected failure, returning true when it is due.
fn due(countdown: &mut Option<usize>) -> bool {
    match countdown {
        Some(0) => {
            *countdown = None;
            true
        }
        Some(n) => {
            *n -= 1;
            false
        }
        None => false,
    }
}

impl DummyIO for Dummy {
    type MessageType = ModifyState;
    type Config = bool;

    /// The config is whether to log each write at info level, as `--dummy` runs do.
    fn new(receiver: Receiver<Self::MessageType>, config: &Self::Config) -> Self {
        Self {
            receiver,
            log_writes: *config,
            devices: HashMap::new(),
            ops: Vec::new(),
            fail_read_in: None,
            fail_write_in: None,
        }
    }
}

impl RegisterBus for Dummy {
    fn read_register(&mut self, address: u8, register: Register) -> Result<u8, BusError> {
        self.update();
        self.ops.push(BusOp::Read { address, register });
        if due(&mut self.fail_read_in) {
            return Err(BusError::Injected(format!("Injected read failure of {}", register)));
        }
        Ok(self.register(address, register))
    }

    fn write_register(&mut self, address: u8, register: Register, value: u8) -> Result<(), BusError> {
        self.update();
        self.ops.push(BusOp::Write { address, register, value });
        if due(&mut self.fail_write_in) {
            return Err(BusError::Injected(format!("Injected write failure of {}", register)));
        }
        if self.log_writes {
            info!("{:#04x}: {} <- {:#010b}", address, register, value);
        }
        self.device(address)[register.addr() as usize] = value;
        Ok(())
    }
}
