//! Dual BQ2589x charger control core.
//!
//! A BQ25890 (primary) and a BQ25892 (secondary) share one input. The primary
//! classifies the adapter, negotiates a higher VBUS with pump-express adapters
//! and runs input current optimization; the secondary is kept in high
//! impedance until the source can feed both chargers.
//!
//! All deferred work runs on a serialized task queue owned by
//! [`DualCharger`]: feed it interrupts with [`DualCharger::on_interrupt`] and
//! drive it with [`DualCharger::poll`] from any monotonic millisecond clock.
//!
//! no-std, blocking `embedded-hal` 1.0 I2C, optional `defmt` or `log` output.

#![no_std]

mod fmt;

pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod data_types;
pub mod device;
pub mod driver;
pub mod error;
pub mod ico;
pub mod monitor;
pub mod registers;
pub mod scheduler;
pub mod telemetry;
pub mod tune;

pub use config::{ChargerConfig, ConfigError, TuneConfig};
pub use coordinator::{DualCharger, StateOfCharge};
pub use device::Charger;
pub use driver::Bq2589x;
pub use error::Error;
pub use registers::{PRIMARY_I2C_ADDRESS, SECONDARY_I2C_ADDRESS};
pub use scheduler::{Millis, Task};
