//! Dual-charger coordinator.
//!
//! Owns both charger instances, the shared tuning state and the task queue.
//! Every task runs to completion inside [`DualCharger::poll`], so charger and
//! tuning state are only ever touched by one task at a time.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::data_types::{SourceType, TuneDirection};
use crate::device::Charger;
use crate::ico::IcoState;
use crate::scheduler::{Millis, Scheduler, Task};
use crate::tune::TuneState;

/// Above this state of charge the secondary charger stays parked.
pub const SOC_CEILING: u8 = 95;
/// Assumed state of charge when no gauge answers.
pub const DEFAULT_SOC: u8 = 50;
/// Input voltage limit restored on both chargers when the adapter leaves.
pub const CONSERVATIVE_VINDPM_MV: u16 = 4_400;
/// Re-check delay while the battery is too low to tune up.
pub const TUNE_RECHECK_MS: Millis = 2_000;

/// Battery state-of-charge source, usually a fuel gauge.
pub trait StateOfCharge {
    /// Percent, or `None` when the gauge is unavailable.
    fn state_of_charge(&mut self) -> Option<u8>;
}

impl<F> StateOfCharge for F
where
    F: FnMut() -> Option<u8>,
{
    fn state_of_charge(&mut self) -> Option<u8> {
        self()
    }
}

/// First step after an insertion, by source type.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertRoute {
    /// Optimize input current right away.
    Ico,
    /// Try pump-express first.
    TuneCheck,
}

pub fn insert_route(source: SourceType) -> InsertRoute {
    match source {
        SourceType::UsbDcp => InsertRoute::TuneCheck,
        _ => InsertRoute::Ico,
    }
}

/// The secondary charger may draw input only from a high-voltage source
/// (native or tuned up) and only below the charge ceiling.
pub fn secondary_allowed(source: SourceType, tune: &TuneState, soc: u8) -> bool {
    let high_voltage = match source {
        SourceType::MaxCharge => true,
        SourceType::UsbDcp => tune.enabled() && tune.tuned_up(),
        _ => false,
    };
    high_voltage && soc < SOC_CEILING
}

pub struct DualCharger<I2C, D, G> {
    pub(crate) primary: Charger<I2C>,
    pub(crate) secondary: Option<Charger<I2C>>,
    pub(crate) tune: TuneState,
    pub(crate) ico: IcoState,
    pub(crate) tasks: Scheduler,
    pub(crate) delay: D,
    pub(crate) gauge: G,
}

impl<I2C, D, G> DualCharger<I2C, D, G> {
    pub fn primary(&self) -> &Charger<I2C> {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut Charger<I2C> {
        &mut self.primary
    }

    /// `None` when the secondary charger failed to attach.
    pub fn secondary(&self) -> Option<&Charger<I2C>> {
        self.secondary.as_ref()
    }

    pub fn secondary_mut(&mut self) -> Option<&mut Charger<I2C>> {
        self.secondary.as_mut()
    }

    pub fn tune(&self) -> &TuneState {
        &self.tune
    }

    pub fn ico(&self) -> &IcoState {
        &self.ico
    }

    pub fn tasks(&self) -> &Scheduler {
        &self.tasks
    }

    /// Earliest time [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.tasks.next_deadline()
    }

    /// Cancel all work and hand back the bus handles.
    pub fn shutdown(mut self) -> (I2C, Option<I2C>) {
        self.tasks.cancel_all();
        info!("shutdown");
        (self.primary.free(), self.secondary.map(Charger::free))
    }
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    /// Take over attached chargers. A classification runs on the first poll in
    /// case the adapter was already present.
    pub fn new(primary: Charger<I2C>, secondary: Option<Charger<I2C>>, delay: D, gauge: G) -> Self {
        if secondary.is_none() {
            warn!("no secondary charger, running single-charger");
        }
        let tune = TuneState::new(primary.config().tune);
        let mut tasks = Scheduler::new();
        tasks.schedule(Task::Classify, 0);
        Self {
            primary,
            secondary,
            tune,
            ico: IcoState::default(),
            tasks,
            delay,
            gauge,
        }
    }

    /// Interrupt line asserted: re-examine status on the next poll.
    pub fn on_interrupt(&mut self) {
        self.tasks.schedule(Task::Classify, 0);
    }

    /// Run every task due at `now`, including zero-delay follow-ups. Returns the number of tasks run.
    pub fn poll(&mut self, now: Millis) -> usize {
        self.tasks.advance(now);
        let mut ran = 0;
        while let Some(task) = self.tasks.pop_due() {
            trace!("run {:?}", task);
            self.dispatch(task);
            ran += 1;
        }
        ran
    }

    fn dispatch(&mut self, task: Task) {
        match task {
            Task::Classify => self.run_classify(),
            Task::AdapterIn => self.adapter_in(),
            Task::AdapterOut => self.adapter_out(),
            Task::Ico => self.run_ico(),
            Task::TuneCheck => self.tune_check(),
            Task::Tune => self.run_tune(),
            Task::SecondaryEnable => self.secondary_enable(),
            Task::Monitor => self.run_monitor(),
        }
    }

    /// Battery state of charge, falling back to [`DEFAULT_SOC`].
    pub(crate) fn state_of_charge(&mut self) -> u8 {
        let soc = self.gauge.state_of_charge().unwrap_or(DEFAULT_SOC);
        self.primary.set_soc(soc);
        soc
    }

    /// Recompute the absolute input voltage margin on both chargers.
    pub(crate) fn adjust_margins(&mut self) {
        // Failures are logged by the charger; the next step retries.
        let _ = self.primary.adjust_absolute_vindpm();
        if let Some(secondary) = self.secondary.as_mut() {
            let _ = secondary.adjust_absolute_vindpm();
        }
    }

    /// Move the secondary charger in or out of high impedance. Returns whether the write succeeded.
    pub(crate) fn set_secondary_input(&mut self, enable: bool) -> bool {
        let Some(secondary) = self.secondary.as_mut() else {
            return false;
        };
        match secondary.set_input_enabled(enable) {
            Ok(()) => {
                info!("secondary charger {}", if enable { "enabled" } else { "parked in high impedance" });
                true
            }
            Err(_) => {
                error!("secondary charger: high impedance write failed");
                false
            }
        }
    }

    fn adapter_in(&mut self) {
        self.set_secondary_input(false);

        let source = self.primary.source();
        match insert_route(source) {
            InsertRoute::Ico => {
                info!("{:?} source, optimizing input current", source);
                self.start_ico();
            }
            InsertRoute::TuneCheck => {
                info!("DCP source, checking for pump-express");
                self.tasks.schedule(Task::TuneCheck, 0);
            }
        }

        if self.primary.config().enable_absolute_vindpm {
            self.adjust_margins();
        }
        self.tasks.schedule(Task::Monitor, 0);
    }

    fn adapter_out(&mut self) {
        self.set_secondary_input(false);

        if self.primary.driver().set_input_voltage_limit_mv(CONSERVATIVE_VINDPM_MV).is_err() {
            error!("primary charger: failed to restore input voltage limit");
        }
        if let Some(secondary) = self.secondary.as_mut() {
            if secondary.driver().set_input_voltage_limit_mv(CONSERVATIVE_VINDPM_MV).is_err() {
                error!("secondary charger: failed to restore input voltage limit");
            }
        }

        for task in [Task::Monitor, Task::Ico, Task::TuneCheck, Task::Tune, Task::SecondaryEnable] {
            self.tasks.cancel(task);
        }
        self.tune.retire();
        self.ico.reset();
    }

    fn tune_check(&mut self) {
        if !self.tune.enabled() {
            self.start_ico();
            return;
        }

        let vbat = self.primary.sample_battery().unwrap_or_else(|_| {
            warn!("tune check: battery voltage read failed");
            self.primary.telemetry().vbat_mv
        });
        let soc = self.state_of_charge();

        if vbat > self.tune.vbat_min_mv() && soc < SOC_CEILING {
            info!("tune check: vbat {} mV, soc {}, tuning up", vbat, soc);
            self.begin_tune(TuneDirection::Up);
        } else if soc >= SOC_CEILING {
            info!("tune check: soc {} at ceiling, skipping tune", soc);
            self.start_ico();
        } else {
            debug!("tune check: vbat {} mV too low, waiting", vbat);
            self.tasks.schedule(Task::TuneCheck, TUNE_RECHECK_MS);
        }
    }

    fn secondary_enable(&mut self) {
        let soc = self.state_of_charge();
        if secondary_allowed(self.primary.source(), &self.tune, soc) {
            self.set_secondary_input(true);
        } else {
            debug!("secondary charger stays parked (soc {})", soc);
        }
    }
}
