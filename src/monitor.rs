//! Periodic monitor: watchdog kick, telemetry and charge-ceiling enforcement.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::coordinator::{DualCharger, StateOfCharge, SOC_CEILING};
use crate::data_types::{SourceType, TuneDirection};
use crate::scheduler::{Millis, Task};

pub const MONITOR_PERIOD_MS: Millis = 10_000;

/// The secondary charger has to stop once the battery is this full.
pub fn secondary_over_ceiling(secondary_active: bool, soc: u8) -> bool {
    secondary_active && soc >= SOC_CEILING
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    pub(crate) fn run_monitor(&mut self) {
        if self.primary.driver().reset_watchdog().is_err() {
            warn!("monitor: watchdog kick failed");
        }

        let soc = self.state_of_charge();
        let t1 = self.primary.sample();
        info!(
            "monitor: charger 1 vbus {} mV, vbat {} mV, ichg {} mA, soc {}",
            t1.vbus_mv,
            t1.vbat_mv,
            t1.charge_current_ma,
            soc
        );
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.set_soc(soc);
            let t2 = secondary.sample();
            info!(
                "monitor: charger 2 vbus {} mV, vbat {} mV, ichg {} mA",
                t2.vbus_mv,
                t2.vbat_mv,
                t2.charge_current_ma
            );
        }

        self.reapply_ico_limit();
        self.reevaluate(soc);
        self.tasks.schedule(Task::Monitor, MONITOR_PERIOD_MS);
    }

    /// Park the secondary charger at the charge ceiling and bring a tuned-up
    /// DCP back down to its default output.
    fn reevaluate(&mut self, soc: u8) {
        let active = self.secondary.as_ref().is_some_and(|s| s.input_enabled());
        if !secondary_over_ceiling(active, soc) {
            return;
        }

        info!("monitor: soc {} reached ceiling, parking secondary charger", soc);
        self.set_secondary_input(false);

        if self.tune.enabled()
            && self.primary.source() == SourceType::UsbDcp
            && self.tune.direction() != TuneDirection::Down
        {
            self.begin_tune(TuneDirection::Down);
        }
    }
}
