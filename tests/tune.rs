mod common;

use bq2589x_dual::config::TuneConfig;
use bq2589x_dual::data_types::TuneDirection;
use bq2589x_dual::ico::IcoPhase;
use bq2589x_dual::registers::MiscCtrlBits;
use bq2589x_dual::scheduler::Task;
use bq2589x_dual::tune::{TuneState, MAX_TUNE_ATTEMPTS, TUNE_AWAIT_MS, TUNE_RETRY_MS};
use common::sim::{Adapter, SRC_DCP};
use common::{tuning_config, Rig, PRIMARY};

fn thresholds() -> TuneConfig {
    TuneConfig {
        high_level_mv: 8_000,
        low_level_mv: 5_500,
        vbat_min_mv: 3_500,
    }
}

#[test]
fn state_without_thresholds_is_disabled() {
    let state = TuneState::new(None);
    assert!(!state.enabled());
    assert!(!state.is_active());
}

#[test]
fn begin_resets_episode() {
    let mut state = TuneState::new(Some(thresholds()));
    state.begin(TuneDirection::Up);
    assert_eq!(state.target_mv(), 8_000);
    assert!(state.is_active());
    assert!(state.reached(8_100));
    assert!(!state.reached(8_000));

    state.begin(TuneDirection::Down);
    assert_eq!(state.direction(), TuneDirection::Down);
    assert_eq!(state.target_mv(), 5_500);
    assert_eq!(state.attempts(), 0);
    assert!(state.reached(5_000));
    assert!(!state.reached(5_500));
    assert_eq!(state.episodes(), 2);

    state.retire();
    assert_eq!(state.direction(), TuneDirection::None);
    assert!(!state.is_active());
    assert!(state.enabled());
}

#[test]
fn fast_adapter_reaches_target_in_two_rounds() {
    let mut rig = Rig::new(tuning_config());
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 4_000));

    assert_eq!(rig.core.tune().direction(), TuneDirection::Up);
    assert_eq!(rig.core.tune().attempts(), 1);

    rig.run_for(TUNE_AWAIT_MS);
    assert!(rig.core.tune().done());
    assert!(!rig.core.tune().failed());
    assert_eq!(rig.core.tune().attempts(), 1);
    assert!(rig.core.tune().tuned_up());
    // Upward success hands over to ICO.
    assert_eq!(rig.core.ico().phase(), IcoPhase::Waiting);
}

#[test]
fn stepwise_adapter_walks_up_to_target() {
    let mut rig = Rig::new(tuning_config());
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 1_000));

    rig.run_for(20_000);
    assert!(rig.core.tune().done());
    assert_eq!(rig.core.tune().attempts(), 4);
    assert_eq!(rig.world.borrow().vbus_mv(), 9_000);
    assert_eq!(rig.world.borrow().pump_commands, 4);
    // Absolute VINDPM follows the new VBUS: 9000 - 1200 mV
    assert_eq!(rig.world.borrow().reg(PRIMARY, 0x0D) & 0x7F, 52);
}

#[test]
fn stuck_adapter_fails_after_exactly_ten_attempts() {
    let mut rig = Rig::new(tuning_config());
    rig.plug(SRC_DCP, Adapter::stuck(5_000));

    rig.run_for(300_000);
    let tune = rig.core.tune();
    assert!(tune.failed());
    assert!(!tune.done());
    assert_eq!(tune.attempts(), MAX_TUNE_ATTEMPTS);
    assert!(!rig.core.tasks().is_pending(Task::Tune));

    // The IC never clears the pump bit, so count issued commands, not edges.
    let issued = rig
        .world
        .borrow()
        .writes_to(PRIMARY, 0x09)
        .into_iter()
        .map(MiscCtrlBits::from_bits_retain)
        .filter(|bits| {
            bits.contains(MiscCtrlBits::PUMPX_UP) && !bits.contains(MiscCtrlBits::FORCE_ICO)
        })
        .count();
    assert_eq!(issued, MAX_TUNE_ATTEMPTS as usize);
    // Failure still hands over to ICO; the secondary stays parked.
    assert_eq!(rig.world.borrow().ico_runs, 1);
    assert!(rig.secondary_hiz());
}

#[test]
fn issue_failure_does_not_consume_an_attempt() {
    let mut rig = Rig::new(tuning_config());
    rig.world.borrow_mut().fail_write(PRIMARY, 0x09, 2);
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 4_000));

    assert_eq!(rig.core.tune().attempts(), 0);
    assert!(rig.core.tune().is_active());
    rig.run_for(TUNE_RETRY_MS);
    assert_eq!(rig.core.tune().attempts(), 0);
    rig.run_for(TUNE_RETRY_MS);
    assert_eq!(rig.core.tune().attempts(), 1);

    rig.run_for(TUNE_AWAIT_MS);
    assert!(rig.core.tune().done());
}

#[test]
fn low_battery_defers_tuning() {
    let mut rig = Rig::new(tuning_config());
    rig.world.borrow_mut().set_battery_mv(3_400);
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 4_000));

    assert_eq!(rig.core.tune().direction(), TuneDirection::None);
    assert!(rig.core.tasks().is_pending(Task::TuneCheck));
    assert_eq!(rig.world.borrow().pump_commands, 0);

    rig.world.borrow_mut().set_battery_mv(3_700);
    rig.run_for(2_000);
    assert_eq!(rig.core.tune().direction(), TuneDirection::Up);
}

#[test]
fn full_battery_skips_tuning() {
    let mut rig = Rig::new(tuning_config());
    rig.set_soc(96);
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 4_000));

    assert_eq!(rig.core.tune().episodes(), 0);
    assert_eq!(rig.core.ico().phase(), IcoPhase::Waiting);
}

#[test]
fn vbus_read_failure_retries_step() {
    let mut rig = Rig::new(tuning_config());
    rig.plug(SRC_DCP, Adapter::pump_express(5_000, 4_000));
    rig.world.borrow_mut().fail_read(PRIMARY, 0x11, 1);

    rig.run_for(TUNE_AWAIT_MS);
    assert!(rig.core.tune().is_active());
    assert_eq!(rig.core.tasks().due_at(Task::Tune), Some(TUNE_AWAIT_MS + TUNE_RETRY_MS));
    rig.run_for(TUNE_RETRY_MS);
    assert!(rig.core.tune().done());
}
