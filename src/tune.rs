//! Pump-express voltage tuning.
//!
//! An episode asks the adapter to step VBUS toward a target one command at a
//! time: issue a step, wait for the IC to finish signalling it, re-measure.
//! The episode ends `done` once VBUS crosses the target and `failed` once
//! [`MAX_TUNE_ATTEMPTS`] steps have been issued without getting there.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::TuneConfig;
use crate::coordinator::{DualCharger, StateOfCharge};
use crate::data_types::TuneDirection;
use crate::scheduler::{Millis, Task};

/// Pump commands issued per episode before giving up.
pub const MAX_TUNE_ATTEMPTS: u8 = 10;
/// Busy polls tolerated for one command before it is treated as lost.
pub const MAX_BUSY_POLLS: u8 = 10;
/// Delay before retrying a step whose command could not be issued.
pub const TUNE_RETRY_MS: Millis = 1_000;
/// Delay after issuing a command, sized for the adapter to respond.
pub const TUNE_AWAIT_MS: Millis = 3_000;
/// Cadence of busy polling and re-measurement.
pub const TUNE_POLL_MS: Millis = 1_000;

/// Shared tuning state; one adapter, one episode at a time.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TuneState {
    enabled: bool,
    direction: TuneDirection,
    target_mv: u16,
    attempts: u8,
    done: bool,
    failed: bool,
    command_pending: bool,
    busy_polls: u8,
    episodes: u32,
    high_level_mv: u16,
    low_level_mv: u16,
    vbat_min_mv: u16,
}

impl TuneState {
    /// Tuning is enabled only when thresholds are configured.
    pub fn new(config: Option<TuneConfig>) -> Self {
        match config {
            Some(cfg) => Self {
                enabled: true,
                high_level_mv: cfg.high_level_mv,
                low_level_mv: cfg.low_level_mv,
                vbat_min_mv: cfg.vbat_min_mv,
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn direction(&self) -> TuneDirection {
        self.direction
    }

    pub fn target_mv(&self) -> u16 {
        self.target_mv
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn command_pending(&self) -> bool {
        self.command_pending
    }

    /// Episodes started since attach.
    pub fn episodes(&self) -> u32 {
        self.episodes
    }

    /// Battery voltage floor for an upward tune.
    pub fn vbat_min_mv(&self) -> u16 {
        self.vbat_min_mv
    }

    /// An episode is running: a direction is set and it has not terminated.
    pub fn is_active(&self) -> bool {
        self.direction != TuneDirection::None && !self.done && !self.failed
    }

    /// Upward episode that reached its target.
    pub fn tuned_up(&self) -> bool {
        self.direction == TuneDirection::Up && self.done
    }

    /// Start a new episode in `direction`, discarding whatever was in flight.
    pub fn begin(&mut self, direction: TuneDirection) {
        self.direction = direction;
        self.target_mv = match direction {
            TuneDirection::Up => self.high_level_mv,
            TuneDirection::Down => self.low_level_mv,
            TuneDirection::None => 0,
        };
        self.attempts = 0;
        self.done = false;
        self.failed = false;
        self.command_pending = false;
        self.busy_polls = 0;
        self.episodes = self.episodes.wrapping_add(1);
    }

    /// Forget the episode record; the adapter is gone.
    pub fn retire(&mut self) {
        self.direction = TuneDirection::None;
        self.target_mv = 0;
        self.attempts = 0;
        self.done = false;
        self.failed = false;
        self.command_pending = false;
        self.busy_polls = 0;
    }

    /// Success predicate for the running direction.
    pub fn reached(&self, measured_mv: u16) -> bool {
        match self.direction {
            TuneDirection::Up => measured_mv > self.target_mv,
            TuneDirection::Down => measured_mv < self.target_mv,
            TuneDirection::None => false,
        }
    }

    /// Retry budget spent.
    pub fn exhausted(&self) -> bool {
        self.attempts >= MAX_TUNE_ATTEMPTS
    }

    fn command_issued(&mut self) {
        self.command_pending = true;
        self.attempts += 1;
        self.busy_polls = 0;
    }

    fn command_finished(&mut self) {
        self.command_pending = false;
        self.busy_polls = 0;
    }

    /// Count one busy poll; returns true when the command should be written off.
    fn still_busy(&mut self) -> bool {
        self.busy_polls = self.busy_polls.saturating_add(1);
        self.busy_polls >= MAX_BUSY_POLLS
    }
}

impl<I2C, D, G> DualCharger<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: StateOfCharge,
{
    /// Start an episode and run its first step immediately.
    pub(crate) fn begin_tune(&mut self, direction: TuneDirection) {
        self.tune.begin(direction);
        info!(
            "tune: {:?} episode {} toward {} mV",
            direction,
            self.tune.episodes(),
            self.tune.target_mv()
        );
        self.tasks.schedule(Task::Tune, 0);
    }

    /// One tuning step.
    pub(crate) fn run_tune(&mut self) {
        if !self.tune.is_active() {
            debug!("tune: stale step ignored");
            return;
        }
        let direction = self.tune.direction();

        let vbus = match self.primary.sample_vbus() {
            Ok(mv) => mv,
            Err(_) => {
                warn!("tune: vbus read failed");
                self.tasks.schedule(Task::Tune, TUNE_RETRY_MS);
                return;
            }
        };
        info!("tune: vbus {} mV, target {} mV", vbus, self.tune.target_mv());

        if self.tune.reached(vbus) {
            info!("tune: {:?} succeeded after {} attempts", direction, self.tune.attempts());
            self.tune.done = true;
            self.finish_tune(direction);
            return;
        }

        if self.tune.exhausted() {
            warn!("tune: {:?} failed, {} attempts spent", direction, self.tune.attempts());
            self.tune.failed = true;
            self.finish_tune(direction);
            return;
        }

        if !self.tune.command_pending() {
            match self.primary.driver().pump_step(direction) {
                Ok(()) => {
                    self.tune.command_issued();
                    info!("tune: pump command {} issued", self.tune.attempts());
                    self.tasks.schedule(Task::Tune, TUNE_AWAIT_MS);
                }
                Err(_) => {
                    warn!("tune: pump command not issued, retrying");
                    self.tasks.schedule(Task::Tune, TUNE_RETRY_MS);
                }
            }
            return;
        }

        match self.primary.driver().pump_busy(direction) {
            Ok(false) => {
                info!("tune: pump command finished");
                self.tune.command_finished();
                self.adjust_margins();
            }
            Ok(true) => {
                if self.tune.still_busy() {
                    warn!("tune: pump command never finished, dropping it");
                    self.tune.command_finished();
                }
            }
            Err(_) => warn!("tune: pump status read failed"),
        }
        self.tasks.schedule(Task::Tune, TUNE_POLL_MS);
    }

    fn finish_tune(&mut self, direction: TuneDirection) {
        self.tune.command_pending = false;
        self.adjust_margins();
        if direction == TuneDirection::Up {
            self.start_ico();
        }
    }
}
