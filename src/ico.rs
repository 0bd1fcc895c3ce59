//! Input current optimization.
//!
//! The primary charger runs its autonomous ICO sweep; the resulting input
//! current limit is halved and programmed into the secondary charger so the
//! pair never pulls more than the adapter can deliver.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::coordinator::{DualCharger, StateOfCharge};
use crate::error::Error;
use crate::scheduler::{Millis, Task};

/// Backoff after a failed FORCE_ICO write or limit read.
pub const ICO_RETRY_MS: Millis = 1_000;
/// Longer than the IC's worst-case sweep.
pub const ICO_SETTLE_MS: Millis = 3_000;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IcoPhase {
    #[default]
    Idle,
    /// FORCE_ICO not yet accepted.
    Issuing,
    /// Sweep running; the next step reads and applies the result.
    Waiting,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IcoState {
    phase: IcoPhase,
    measured_ma: Option<u16>,
    applied_ma: Option<u16>,
}

impl IcoState {
    pub fn phase(&self) -> IcoPhase {
        self.phase
    }

    /// Limit found by the last completed sweep.
    pub fn measured_ma(&self) -> Option<u16> {
        self.measured_ma
    }

    /// Limit last programmed into the secondary charger.
    pub fn applied_ma(&self) -> Option<u16> {
        self.applied_ma
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Share of the measured limit handed to the secondary charger.
pub fn secondary_limit_ma(measured_ma: u16) -> u16 {
    measured_ma / 2
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    /// Restart the optimizer from the issuing phase.
    pub(crate) fn start_ico(&mut self) {
        self.ico.phase = IcoPhase::Issuing;
        self.tasks.schedule(Task::Ico, 0);
    }

    pub(crate) fn run_ico(&mut self) {
        match self.ico.phase {
            IcoPhase::Idle => debug!("ico: stale step ignored"),
            IcoPhase::Issuing => match self.primary.driver().force_ico() {
                Ok(()) => {
                    info!("ico: command issued");
                    self.ico.phase = IcoPhase::Waiting;
                    self.tasks.schedule(Task::Ico, ICO_SETTLE_MS);
                }
                Err(_) => {
                    warn!("ico: command not issued, retrying");
                    self.tasks.schedule(Task::Ico, ICO_RETRY_MS);
                }
            },
            IcoPhase::Waiting => match self.apply_ico() {
                Ok(()) => {
                    self.ico.phase = IcoPhase::Idle;
                    self.tasks.schedule(Task::SecondaryEnable, 0);
                }
                Err(_) => {
                    // The secondary stays parked until a limit is known.
                    warn!("ico: failed to read input current limit, retrying");
                    self.tasks.schedule(Task::Ico, ICO_RETRY_MS);
                }
            },
        }
    }

    fn apply_ico(&mut self) -> Result<(), Error<I2C::Error>> {
        if let Ok(false) = self.primary.driver().ico_optimized() {
            debug!("ico: sweep not flagged complete, using present limit");
        }
        let measured = self.primary.driver().read_idpm_limit_ma()?;
        self.ico.measured_ma = Some(measured);
        self.program_secondary_limit(measured);
        Ok(())
    }

    /// Retry a secondary limit that could not be programmed after the last sweep.
    pub(crate) fn reapply_ico_limit(&mut self) {
        if self.secondary.is_none() {
            return;
        }
        if self.ico.phase != IcoPhase::Idle || self.ico.applied_ma.is_some() {
            return;
        }
        if let Some(measured) = self.ico.measured_ma {
            self.program_secondary_limit(measured);
        }
    }

    fn program_secondary_limit(&mut self, measured: u16) {
        let limit = secondary_limit_ma(measured);
        let Some(secondary) = self.secondary.as_mut() else {
            info!("ico: {} mA measured, no secondary charger", measured);
            return;
        };
        match secondary.driver().set_input_current_limit_ma(limit) {
            Ok(()) => {
                info!("ico: {} mA measured, secondary limited to {} mA", measured, limit);
                self.ico.applied_ma = Some(limit);
            }
            Err(_) => error!("ico: failed to set secondary input limit {} mA", limit),
        }
    }
}
