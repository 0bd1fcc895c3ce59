#![allow(dead_code)]

pub mod sim;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bq2589x_dual::config::{ChargerConfig, TuneConfig};
use bq2589x_dual::data_types::Role;
use bq2589x_dual::device::Charger;
use bq2589x_dual::scheduler::Millis;
use bq2589x_dual::DualCharger;

use sim::{Adapter, NoDelay, SimBus, World};

pub const PRIMARY: u8 = bq2589x_dual::PRIMARY_I2C_ADDRESS;
pub const SECONDARY: u8 = bq2589x_dual::SECONDARY_I2C_ADDRESS;

pub type Gauge = Box<dyn FnMut() -> Option<u8>>;

pub fn tune_config() -> TuneConfig {
    TuneConfig::builder()
        .high_level_mv(8_000)
        .low_level_mv(5_500)
        .vbat_min_mv(3_500)
        .build()
        .unwrap()
}

pub fn base_config() -> ChargerConfig {
    ChargerConfig::builder()
        .charge_voltage_mv(4_208)
        .charge_current_ma(2_048)
        .term_current_ma(256)
        .auto_dpdm(true)
        .termination(true)
        .ico(true)
        .absolute_vindpm(true)
        .build()
        .unwrap()
}

pub fn tuning_config() -> ChargerConfig {
    ChargerConfig {
        tune: Some(tune_config()),
        ..base_config()
    }
}

/// Both chargers on a simulated bus with a fake clock and gauge.
pub struct Rig {
    pub world: Rc<RefCell<World>>,
    /// `None` makes the gauge unavailable.
    pub soc: Rc<Cell<Option<u8>>>,
    pub core: DualCharger<SimBus, NoDelay, Gauge>,
    pub now: Millis,
}

impl Rig {
    pub fn new(config: ChargerConfig) -> Self {
        Self::build(config, true)
    }

    pub fn single(config: ChargerConfig) -> Self {
        Self::build(config, false)
    }

    fn build(config: ChargerConfig, secondary_present: bool) -> Self {
        let mut world = World::new(secondary_present);
        world.set_battery_mv(3_800);
        let world = Rc::new(RefCell::new(world));

        let primary = Charger::attach(SimBus(world.clone()), Role::Primary, config).unwrap();
        let secondary = Charger::attach(SimBus(world.clone()), Role::Secondary, config).ok();

        let soc = Rc::new(Cell::new(Some(50)));
        let gauge: Gauge = {
            let soc = soc.clone();
            Box::new(move || soc.get())
        };
        let mut core = DualCharger::new(primary, secondary, NoDelay, gauge);
        core.poll(0);

        Self {
            world,
            soc,
            core,
            now: 0,
        }
    }

    pub fn set_soc(&self, soc: u8) {
        self.soc.set(Some(soc));
    }

    /// Interrupt line asserted; run whatever that triggers right away.
    pub fn irq(&mut self) {
        self.core.on_interrupt();
        self.core.poll(self.now);
    }

    pub fn plug(&mut self, source_code: u8, adapter: Adapter) {
        self.world.borrow_mut().plug(source_code, adapter);
        self.irq();
    }

    pub fn unplug(&mut self) {
        self.world.borrow_mut().unplug();
        self.irq();
    }

    /// Advance the clock by `ms`, running every deadline on the way.
    pub fn run_for(&mut self, ms: Millis) {
        let end = self.now + ms;
        while let Some(due) = self.core.next_deadline() {
            if due > end {
                break;
            }
            self.now = self.now.max(due);
            self.core.poll(self.now);
        }
        self.now = end;
        self.core.poll(end);
    }

    pub fn secondary_hiz(&self) -> bool {
        self.world.borrow().reg(SECONDARY, 0x00) & 0x80 != 0
    }

    pub fn clear_writes(&self) {
        self.world.borrow_mut().writes.clear();
    }
}
