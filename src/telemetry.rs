//! Read-only views for a host power-management surface and a register dump.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::coordinator::{DualCharger, StateOfCharge};
use crate::data_types::{ChargeType, SourceType};
use crate::device::Charger;
use crate::registers::addr;

/// What a host sees for one charger.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PowerSupplyStatus {
    pub source: SourceType,
    /// SDP or DCP attached.
    pub usb_online: bool,
    /// MaxCharge, unknown or non-standard adapter attached.
    pub wall_online: bool,
    pub charge_type: ChargeType,
}

impl PowerSupplyStatus {
    pub fn online(&self) -> bool {
        self.usb_online || self.wall_online
    }
}

impl<I2C> Charger<I2C>
where
    I2C: I2c,
{
    /// Live status; a failed read reports no source and an unknown charge type.
    pub fn power_supply_status(&mut self) -> PowerSupplyStatus {
        let source = self.driver().source_type().unwrap_or(SourceType::None);
        let charge_type = self
            .driver()
            .charge_status()
            .map(ChargeType::from)
            .unwrap_or(ChargeType::Unknown);
        PowerSupplyStatus {
            source,
            usb_online: source.is_usb(),
            wall_online: source.is_wall(),
            charge_type,
        }
    }

    /// One `Reg[0xNN] = 0xNN` line per readable register.
    pub fn dump_registers<W: Write>(&mut self, out: &mut W) -> core::fmt::Result {
        for reg in 0..=addr::LAST {
            if let Ok(val) = self.driver().read_reg(reg) {
                writeln!(out, "Reg[0x{:02x}] = 0x{:02x}", reg, val)?;
            }
        }
        Ok(())
    }
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    /// Register listing of both chargers.
    pub fn dump_registers<W: Write>(&mut self, out: &mut W) -> core::fmt::Result {
        writeln!(out, "Charger 1:")?;
        self.primary.dump_registers(out)?;
        if let Some(secondary) = self.secondary.as_mut() {
            writeln!(out, "Charger 2:")?;
            secondary.dump_registers(out)?;
        }
        Ok(())
    }
}
