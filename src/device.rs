//! One charger instance: identity, configuration, status flags and telemetry.

use crate::config::ChargerConfig;
use crate::data_types::{PartNumber, Role, SourceType, StatusFlags, Telemetry, WatchdogTimeout};
use crate::driver::Bq2589x;
use crate::error::Error;

/// VINDPM offset programmed at init.
pub const VINDPM_OFFSET_MV: u16 = 600;
/// VINDPM margin below VBUS for low-voltage sources.
pub const VINDPM_MARGIN_LOW_MV: u16 = 600;
/// VINDPM margin below VBUS once the source is above [`VINDPM_MARGIN_SPLIT_MV`].
pub const VINDPM_MARGIN_HIGH_MV: u16 = 1_200;
pub const VINDPM_MARGIN_SPLIT_MV: u16 = 6_000;

/// Absolute VINDPM threshold for a measured VBUS.
pub fn absolute_vindpm_mv(vbus_mv: u16) -> u16 {
    if vbus_mv < VINDPM_MARGIN_SPLIT_MV {
        vbus_mv.saturating_sub(VINDPM_MARGIN_LOW_MV)
    } else {
        vbus_mv.saturating_sub(VINDPM_MARGIN_HIGH_MV)
    }
}

/// A detected and initialised charger.
pub struct Charger<I2C> {
    dev: Bq2589x<I2C>,
    role: Role,
    part: PartNumber,
    revision: u8,
    status: StatusFlags,
    source: SourceType,
    input_enabled: bool,
    telemetry: Telemetry,
    config: ChargerConfig,
}

impl<I2C> Charger<I2C> {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn part(&self) -> PartNumber {
        self.part
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn status(&self) -> StatusFlags {
        self.status
    }

    pub fn source(&self) -> SourceType {
        self.source
    }

    /// False while the input is held in high impedance.
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    pub fn driver(&mut self) -> &mut Bq2589x<I2C> {
        &mut self.dev
    }

    pub(crate) fn set_source(&mut self, source: SourceType) {
        self.source = source;
    }

    pub(crate) fn status_mut(&mut self) -> &mut StatusFlags {
        &mut self.status
    }

    pub(crate) fn set_soc(&mut self, soc: u8) {
        self.telemetry.soc = soc;
    }

    /// Release the bus handle.
    pub fn free(self) -> I2C {
        self.dev.free()
    }
}

impl<I2C> Charger<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Detect and initialise a charger at the role's default address.
    pub fn attach(i2c: I2C, role: Role, config: ChargerConfig) -> Result<Self, Error<I2C::Error>> {
        Self::attach_at(i2c, role.address(), role, config)
    }

    /// Detect and initialise a charger at `address`.
    pub fn attach_at(i2c: I2C, address: u8, role: Role, config: ChargerConfig) -> Result<Self, Error<I2C::Error>> {
        let mut dev = Bq2589x::new(i2c, address);
        let expected = role.expected_part();
        let revision = match dev.detect(expected) {
            Ok(rev) => rev,
            Err(e) => {
                warn!("{:?} charger: no {:?} found at {:#x}", role, expected, address);
                return Err(e);
            }
        };
        info!("{:?} charger: {:?} detected, revision {}", role, expected, revision);

        let mut charger = Self {
            dev,
            role,
            part: expected,
            revision,
            status: StatusFlags::PRESENT,
            source: SourceType::NotDetermined,
            input_enabled: true,
            telemetry: Telemetry::default(),
            config,
        };
        charger.init_device()?;
        Ok(charger)
    }

    fn init_device(&mut self) -> Result<(), Error<I2C::Error>> {
        let cfg = self.config;

        // Feature toggles are best effort; the limits below are not.
        let toggles = [
            self.dev.set_watchdog(WatchdogTimeout::Disabled),
            self.dev.set_auto_dpdm(cfg.enable_auto_dpdm),
            self.dev.set_termination(cfg.enable_termination),
            self.dev.set_ico(cfg.enable_ico),
            self.dev.set_absolute_vindpm(cfg.enable_absolute_vindpm),
        ];
        if toggles.iter().any(Result::is_err) {
            warn!("{:?} charger: failed to apply feature toggles", self.role);
        }

        self.dev.set_vindpm_offset_mv(VINDPM_OFFSET_MV).inspect_err(|_| {
            error!("{:?} charger: failed to set vindpm offset", self.role);
        })?;
        self.dev.set_term_current_ma(cfg.term_current_ma).inspect_err(|_| {
            error!("{:?} charger: failed to set termination current", self.role);
        })?;
        self.dev.set_charge_voltage_mv(cfg.charge_voltage_mv).inspect_err(|_| {
            error!("{:?} charger: failed to set charge voltage", self.role);
        })?;
        self.dev.set_charge_current_ma(cfg.charge_current_ma).inspect_err(|_| {
            error!("{:?} charger: failed to set charge current", self.role);
        })?;
        self.set_charge_enabled(true)?;

        let ilim = self.dev.set_ilim_pin(false);
        let adc = self.dev.adc_start(false);
        if ilim.is_err() || adc.is_err() {
            warn!("{:?} charger: failed to configure ILIM pin or ADC", self.role);
        }

        match self.role {
            Role::Primary => {
                self.dev.set_pumpx(true).inspect_err(|_| {
                    error!("primary charger: failed to enable pump-express");
                })?;
                if self.dev.set_watchdog(WatchdogTimeout::S160).is_err() {
                    warn!("primary charger: failed to arm watchdog");
                }
            }
            Role::Secondary => {
                self.set_input_enabled(false).inspect_err(|_| {
                    error!("secondary charger: failed to enter high impedance");
                })?;
            }
        }
        Ok(())
    }

    /// Enable or disable charging. The CHARGE_ENABLE flag follows the last successful write only.
    pub fn set_charge_enabled(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.dev.set_charge_enable(enable)?;
        self.status.set(StatusFlags::CHARGE_ENABLE, enable);
        Ok(())
    }

    /// Leave (`true`) or enter (`false`) high impedance. Tracks the last successful write only.
    pub fn set_input_enabled(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.dev.set_hiz(!enable)?;
        self.input_enabled = enable;
        Ok(())
    }

    /// Sample VBUS; the stored value is refreshed on success.
    pub fn sample_vbus(&mut self) -> Result<u16, Error<I2C::Error>> {
        let mv = self.dev.read_vbus_mv()?;
        self.telemetry.vbus_mv = mv;
        Ok(mv)
    }

    /// Sample battery voltage; the stored value is refreshed on success.
    pub fn sample_battery(&mut self) -> Result<u16, Error<I2C::Error>> {
        let mv = self.dev.read_battery_mv()?;
        self.telemetry.vbat_mv = mv;
        Ok(mv)
    }

    /// Refresh VBUS, battery voltage and charge current. Failed reads keep the previous value.
    pub fn sample(&mut self) -> Telemetry {
        if self.sample_vbus().is_err() {
            warn!("{:?} charger: vbus read failed", self.role);
        }
        if self.sample_battery().is_err() {
            warn!("{:?} charger: battery voltage read failed", self.role);
        }
        match self.dev.read_charge_current_ma() {
            Ok(ma) => self.telemetry.charge_current_ma = ma,
            Err(_) => warn!("{:?} charger: charge current read failed", self.role),
        }
        self.telemetry
    }

    /// Re-derive the absolute VINDPM threshold from the present VBUS.
    pub fn adjust_absolute_vindpm(&mut self) -> Result<u16, Error<I2C::Error>> {
        let vbus = self.sample_vbus().inspect_err(|_| {
            warn!("{:?} charger: vbus read failed, absolute vindpm unchanged", self.role);
        })?;
        let vindpm = absolute_vindpm_mv(vbus);
        match self.dev.set_input_voltage_limit_mv(vindpm) {
            Ok(()) => {
                info!("{:?} charger: absolute vindpm set to {} mV", self.role, vindpm);
                Ok(vindpm)
            }
            Err(e) => {
                error!("{:?} charger: failed to set absolute vindpm {} mV", self.role, vindpm);
                Err(e)
            }
        }
    }
}
