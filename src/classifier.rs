//! Adapter classification and plug/unplug edge detection.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::coordinator::{DualCharger, StateOfCharge};
use crate::data_types::{SourceType, StatusFlags};
use crate::device::Charger;
use crate::error::Error;
use crate::registers::{FaultBits, StatusBits};
use crate::scheduler::Task;

/// Settle time between the interrupt and the status read.
pub const IRQ_SETTLE_MS: u32 = 5;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdapterEvent {
    Inserted,
    Removed,
}

/// Compare the stored plugged-in flag with a fresh classification.
/// Only a transition yields an event.
pub fn detect_edge(was_plugged: bool, source: SourceType) -> Option<AdapterEvent> {
    match (was_plugged, source.is_attached()) {
        (false, true) => Some(AdapterEvent::Inserted),
        (true, false) => Some(AdapterEvent::Removed),
        _ => None,
    }
}

/// Level flags (power-good, fault) derived from one status snapshot.
pub fn level_flags(status: StatusBits, fault: FaultBits) -> StatusFlags {
    let mut flags = StatusFlags::empty();
    flags.set(StatusFlags::POWER_GOOD, status.contains(StatusBits::PG_STAT));
    flags.set(StatusFlags::FAULT, !fault.is_empty());
    flags
}

impl<I2C> Charger<I2C>
where
    I2C: I2c,
{
    /// Source type, forcing legacy D+/D- detection first when the IC will not
    /// run it on its own and no source is known yet. A failed forced detection
    /// assumes a DCP.
    fn detect_source<D: DelayNs>(&mut self, delay: &mut D) -> Result<SourceType, Error<I2C::Error>> {
        let plugged = self.status().contains(StatusFlags::PLUGGED_IN);
        if !plugged && !self.config().enable_auto_dpdm && self.driver().force_dpdm(delay).is_err() {
            error!("{:?} charger: forced D+/D- detection failed, assuming DCP", self.role());
            return Ok(SourceType::UsbDcp);
        }
        self.driver().source_type()
    }

    fn apply_levels(&mut self, status: StatusBits, fault: FaultBits) {
        let levels = level_flags(status, fault);
        let flags = self.status_mut();
        flags.remove(StatusFlags::POWER_GOOD | StatusFlags::FAULT);
        flags.insert(levels);
    }

    /// Full classification for the charger that owns the interrupt line.
    pub(crate) fn classify<D: DelayNs>(&mut self, delay: &mut D) -> Result<Option<AdapterEvent>, Error<I2C::Error>> {
        delay.delay_ms(IRQ_SETTLE_MS);

        let source = self.detect_source(delay)?;
        let status = self.driver().read_status_raw()?;
        let fault = self.driver().read_fault_raw()?;

        self.set_source(source);
        let event = detect_edge(self.status().contains(StatusFlags::PLUGGED_IN), source);
        match event {
            Some(AdapterEvent::Inserted) => self.status_mut().insert(StatusFlags::PLUGGED_IN),
            Some(AdapterEvent::Removed) => self.status_mut().remove(StatusFlags::PLUGGED_IN),
            None => {}
        }
        self.apply_levels(status, fault);
        Ok(event)
    }

    /// Level-only refresh for a charger without its own interrupt handling.
    pub(crate) fn refresh_status(&mut self) -> Result<(), Error<I2C::Error>> {
        let status = self.driver().read_status_raw()?;
        let fault = self.driver().read_fault_raw()?;
        let source = SourceType::from_code(crate::registers::field::VBUS_STAT.decode(status.bits()));

        self.set_source(source);
        self.status_mut().set(StatusFlags::PLUGGED_IN, source.is_attached());
        self.apply_levels(status, fault);
        Ok(())
    }
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    pub(crate) fn run_classify(&mut self) {
        match self.primary.classify(&mut self.delay) {
            Ok(Some(AdapterEvent::Inserted)) => {
                info!("adapter plugged in: {:?}", self.primary.source());
                self.tasks.cancel(Task::AdapterOut);
                self.tasks.schedule(Task::AdapterIn, 0);
            }
            Ok(Some(AdapterEvent::Removed)) => {
                info!("adapter removed");
                self.tasks.cancel(Task::AdapterIn);
                self.tasks.schedule(Task::AdapterOut, 0);
            }
            Ok(None) => trace!("classify: no plug transition"),
            Err(_) => warn!("classify: status read failed"),
        }

        if let Some(secondary) = self.secondary.as_mut() {
            if secondary.refresh_status().is_err() {
                warn!("classify: secondary status read failed");
            }
        }
    }
}
