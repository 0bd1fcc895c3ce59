//! Register-file simulation of two BQ2589x parts behind one adapter.

use std::cell::RefCell;
use std::rc::Rc;

use bq2589x_dual::registers::{addr, MiscCtrlBits, PRIMARY_I2C_ADDRESS, SECONDARY_I2C_ADDRESS};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

pub const REG_COUNT: usize = addr::LAST as usize + 1;

/// VBUS_STAT codes.
pub const SRC_SDP: u8 = 1;
pub const SRC_DCP: u8 = 3;
pub const SRC_MAXCHARGE: u8 = 4;

#[derive(Clone, Copy, Debug)]
pub struct Adapter {
    pub vbus_mv: u16,
    /// VBUS change per pump command.
    pub step_mv: u16,
    /// Adapter follows pump commands.
    pub responds: bool,
    /// IC clears the pump bit once the command has been signalled.
    pub completes: bool,
}

impl Adapter {
    pub fn fixed(vbus_mv: u16) -> Self {
        Self {
            vbus_mv,
            step_mv: 0,
            responds: false,
            completes: true,
        }
    }

    pub fn pump_express(vbus_mv: u16, step_mv: u16) -> Self {
        Self {
            vbus_mv,
            step_mv,
            responds: true,
            completes: true,
        }
    }

    pub fn stuck(vbus_mv: u16) -> Self {
        Self {
            vbus_mv,
            step_mv: 0,
            responds: false,
            completes: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug)]
pub struct World {
    regs: [[u8; REG_COUNT]; 2],
    present: [bool; 2],
    adapter: Option<Adapter>,
    failures: Vec<(Access, u8, u8, u32)>,
    /// Every successful register write as (address, register, value).
    pub writes: Vec<(u8, u8, u8)>,
    pub pump_commands: u32,
    pub ico_runs: u32,
    pub dpdm_forced: u32,
    pub watchdog_kicks: u32,
    /// Input current limit the ICO sweep settles on.
    pub ico_result_ma: u16,
}

fn slot(address: u8) -> Option<usize> {
    match address {
        PRIMARY_I2C_ADDRESS => Some(0),
        SECONDARY_I2C_ADDRESS => Some(1),
        _ => None,
    }
}

impl World {
    pub fn new(secondary_present: bool) -> Self {
        let mut regs = [[0u8; REG_COUNT]; 2];
        // PN 011 / rev 1 and PN 000 / rev 1
        regs[0][addr::DEVICE as usize] = 0x19;
        regs[1][addr::DEVICE as usize] = 0x01;
        Self {
            regs,
            present: [true, secondary_present],
            adapter: None,
            failures: Vec::new(),
            writes: Vec::new(),
            pump_commands: 0,
            ico_runs: 0,
            dpdm_forced: 0,
            watchdog_kicks: 0,
            ico_result_ma: 2_000,
        }
    }

    pub fn reg(&self, address: u8, reg: u8) -> u8 {
        self.regs[slot(address).unwrap()][reg as usize]
    }

    pub fn set_reg(&mut self, address: u8, reg: u8, value: u8) {
        self.regs[slot(address).unwrap()][reg as usize] = value;
    }

    /// Values written to one register, oldest first.
    pub fn writes_to(&self, address: u8, reg: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, r, _)| *a == address && *r == reg)
            .map(|(_, _, v)| *v)
            .collect()
    }

    pub fn vbus_mv(&self) -> u16 {
        self.adapter.map_or(0, |a| a.vbus_mv)
    }

    pub fn plug(&mut self, source_code: u8, adapter: Adapter) {
        self.adapter = Some(adapter);
        for regs in &mut self.regs {
            regs[addr::STATUS as usize] = (source_code << 5) | 0x04;
        }
    }

    pub fn unplug(&mut self) {
        self.adapter = None;
        for regs in &mut self.regs {
            regs[addr::STATUS as usize] = 0;
        }
    }

    pub fn set_battery_mv(&mut self, mv: u16) {
        let code = (mv.saturating_sub(2_304) / 20) as u8;
        for regs in &mut self.regs {
            regs[addr::BATV as usize] = code;
        }
    }

    pub fn set_charge_status(&mut self, code: u8) {
        for regs in &mut self.regs {
            regs[addr::STATUS as usize] = (regs[addr::STATUS as usize] & !0x18) | ((code & 0x03) << 3);
        }
    }

    /// Fail the next `times` writes to `reg` at `address`.
    pub fn fail_write(&mut self, address: u8, reg: u8, times: u32) {
        self.failures.push((Access::Write, address, reg, times));
    }

    /// Fail the next `times` reads of `reg` at `address`.
    pub fn fail_read(&mut self, address: u8, reg: u8, times: u32) {
        self.failures.push((Access::Read, address, reg, times));
    }

    fn take_failure(&mut self, access: Access, address: u8, reg: u8) -> bool {
        for entry in &mut self.failures {
            if entry.0 == access && entry.1 == address && entry.2 == reg && entry.3 > 0 {
                entry.3 -= 1;
                return true;
            }
        }
        false
    }

    fn read(&mut self, address: u8, reg: u8) -> Result<u8, ErrorKind> {
        if self.take_failure(Access::Read, address, reg) {
            return Err(ErrorKind::Other);
        }
        let i = slot(address).ok_or(ErrorKind::Other)?;
        let value = match reg {
            addr::VBUSV => match self.adapter {
                Some(a) => 0x80 | ((a.vbus_mv.saturating_sub(2_600) / 100).min(0x7F) as u8),
                None => 0,
            },
            _ => *self.regs[i].get(reg as usize).ok_or(ErrorKind::Other)?,
        };
        Ok(value)
    }

    fn write(&mut self, address: u8, reg: u8, value: u8) -> Result<(), ErrorKind> {
        if self.take_failure(Access::Write, address, reg) {
            return Err(ErrorKind::Other);
        }
        let i = slot(address).ok_or(ErrorKind::Other)?;
        let old = *self.regs[i].get(reg as usize).ok_or(ErrorKind::Other)?;
        self.writes.push((address, reg, value));

        let mut stored = value;
        match reg {
            addr::ADC_CTRL if value & 0x02 != 0 => {
                self.dpdm_forced += 1;
                stored &= !0x02;
            }
            addr::SYS_CTRL if value & 0x40 != 0 => {
                self.watchdog_kicks += 1;
                stored &= !0x40;
            }
            addr::MISC_CTRL => {
                let bits = MiscCtrlBits::from_bits_retain(value);
                let before = MiscCtrlBits::from_bits_retain(old);
                if bits.contains(MiscCtrlBits::FORCE_ICO) {
                    self.ico_runs += 1;
                    self.regs[i][addr::IDPM as usize] = ((self.ico_result_ma.saturating_sub(100)) / 50).min(0x3F) as u8;
                    self.regs[i][addr::DEVICE as usize] |= 0x40;
                    stored &= !MiscCtrlBits::FORCE_ICO.bits();
                }
                for (bit, up) in [(MiscCtrlBits::PUMPX_UP, true), (MiscCtrlBits::PUMPX_DN, false)] {
                    if bits.contains(bit) && !before.contains(bit) {
                        self.pump(up);
                        if self.adapter.is_some_and(|a| a.completes) {
                            stored &= !bit.bits();
                        }
                    }
                }
            }
            _ => {}
        }
        self.regs[i][reg as usize] = stored;
        Ok(())
    }

    fn pump(&mut self, up: bool) {
        self.pump_commands += 1;
        if let Some(a) = self.adapter.as_mut() {
            if a.responds {
                a.vbus_mv = if up {
                    a.vbus_mv.saturating_add(a.step_mv)
                } else {
                    a.vbus_mv.saturating_sub(a.step_mv).max(5_000)
                };
            }
        }
    }
}

/// One bus handle onto the shared [`World`].
#[derive(Clone, Debug)]
pub struct SimBus(pub Rc<RefCell<World>>);

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut world = self.0.borrow_mut();
        let present = slot(address).is_some_and(|i| world.present[i]);
        if !present {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer = 0u8;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = reg;
                    for (n, &value) in data.iter().enumerate() {
                        world.write(address, reg + n as u8, value)?;
                    }
                }
                Operation::Read(buf) => {
                    for (n, byte) in buf.iter_mut().enumerate() {
                        *byte = world.read(address, pointer + n as u8)?;
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
