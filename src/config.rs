//! Static per-charger configuration, validated once at attach time.

use crate::error::Error;
use crate::registers::{
    linear_max, ICHG_BASE_MA, ICHG_LSB_MA, ICHG_MAX_CODE, ITERM_BASE_MA, ITERM_LSB_MA, ITERM_MAX_CODE, VBUSV_BASE_MV,
    VBUSV_LSB_MV, VREG_BASE_MV, VREG_LSB_MV, VREG_MAX_CODE,
};

/// Validation failure while building a configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Required item not supplied.
    Missing(&'static str),
    /// Item outside what the register can encode.
    OutOfRange(&'static str),
}

impl<E> From<ConfigError> for Error<E> {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Missing(name) => Error::MissingConfig(name),
            ConfigError::OutOfRange(_) => Error::OutOfRange,
        }
    }
}

/// Pump-express tuning thresholds.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TuneConfig {
    /// VBUS above this level means an upward tune succeeded.
    pub high_level_mv: u16,
    /// VBUS below this level means a downward tune succeeded.
    pub low_level_mv: u16,
    /// Only tune up while the battery is above this voltage.
    pub vbat_min_mv: u16,
}

impl TuneConfig {
    pub fn builder() -> TuneConfigBuilder {
        TuneConfigBuilder::default()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TuneConfigBuilder {
    high_level_mv: Option<u16>,
    low_level_mv: Option<u16>,
    vbat_min_mv: Option<u16>,
}

impl TuneConfigBuilder {
    pub fn high_level_mv(mut self, mv: u16) -> Self {
        self.high_level_mv = Some(mv);
        self
    }

    pub fn low_level_mv(mut self, mv: u16) -> Self {
        self.low_level_mv = Some(mv);
        self
    }

    pub fn vbat_min_mv(mut self, mv: u16) -> Self {
        self.vbat_min_mv = Some(mv);
        self
    }

    pub fn build(self) -> Result<TuneConfig, ConfigError> {
        let high_level_mv = self.high_level_mv.ok_or(ConfigError::Missing("vbus-volt-high-level"))?;
        let low_level_mv = self.low_level_mv.ok_or(ConfigError::Missing("vbus-volt-low-level"))?;
        let vbat_min_mv = self.vbat_min_mv.ok_or(ConfigError::Missing("vbat-min-volt-to-tuneup"))?;

        let vbus_max = linear_max(VBUSV_BASE_MV, VBUSV_LSB_MV, 0x7F);
        if !(VBUSV_BASE_MV..=vbus_max).contains(&high_level_mv) {
            return Err(ConfigError::OutOfRange("vbus-volt-high-level"));
        }
        if !(VBUSV_BASE_MV..=vbus_max).contains(&low_level_mv) {
            return Err(ConfigError::OutOfRange("vbus-volt-low-level"));
        }
        Ok(TuneConfig {
            high_level_mv,
            low_level_mv,
            vbat_min_mv,
        })
    }
}

/// Per-charger configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChargerConfig {
    pub charge_voltage_mv: u16,
    pub charge_current_ma: u16,
    pub term_current_ma: u16,
    /// Let the IC run D+/D- detection on its own.
    pub enable_auto_dpdm: bool,
    pub enable_termination: bool,
    /// Input current optimizer.
    pub enable_ico: bool,
    /// Use an absolute VINDPM threshold tracking the measured VBUS.
    pub enable_absolute_vindpm: bool,
    /// Pump-express thresholds; `None` disables voltage tuning.
    pub tune: Option<TuneConfig>,
}

impl ChargerConfig {
    pub fn builder() -> ChargerConfigBuilder {
        ChargerConfigBuilder::default()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChargerConfigBuilder {
    charge_voltage_mv: Option<u16>,
    charge_current_ma: Option<u16>,
    term_current_ma: Option<u16>,
    enable_auto_dpdm: bool,
    enable_termination: bool,
    enable_ico: bool,
    enable_absolute_vindpm: bool,
    tune: Option<TuneConfig>,
}

impl ChargerConfigBuilder {
    pub fn charge_voltage_mv(mut self, mv: u16) -> Self {
        self.charge_voltage_mv = Some(mv);
        self
    }

    pub fn charge_current_ma(mut self, ma: u16) -> Self {
        self.charge_current_ma = Some(ma);
        self
    }

    pub fn term_current_ma(mut self, ma: u16) -> Self {
        self.term_current_ma = Some(ma);
        self
    }

    pub fn auto_dpdm(mut self, enable: bool) -> Self {
        self.enable_auto_dpdm = enable;
        self
    }

    pub fn termination(mut self, enable: bool) -> Self {
        self.enable_termination = enable;
        self
    }

    pub fn ico(mut self, enable: bool) -> Self {
        self.enable_ico = enable;
        self
    }

    pub fn absolute_vindpm(mut self, enable: bool) -> Self {
        self.enable_absolute_vindpm = enable;
        self
    }

    pub fn tune(mut self, tune: TuneConfig) -> Self {
        self.tune = Some(tune);
        self
    }

    pub fn build(self) -> Result<ChargerConfig, ConfigError> {
        let charge_voltage_mv = self.charge_voltage_mv.ok_or(ConfigError::Missing("charge-voltage"))?;
        let charge_current_ma = self.charge_current_ma.ok_or(ConfigError::Missing("charge-current"))?;
        let term_current_ma = self.term_current_ma.ok_or(ConfigError::Missing("term-current"))?;

        if !(VREG_BASE_MV..=linear_max(VREG_BASE_MV, VREG_LSB_MV, VREG_MAX_CODE)).contains(&charge_voltage_mv) {
            return Err(ConfigError::OutOfRange("charge-voltage"));
        }
        if charge_current_ma > linear_max(ICHG_BASE_MA, ICHG_LSB_MA, ICHG_MAX_CODE) {
            return Err(ConfigError::OutOfRange("charge-current"));
        }
        if !(ITERM_BASE_MA..=linear_max(ITERM_BASE_MA, ITERM_LSB_MA, ITERM_MAX_CODE)).contains(&term_current_ma) {
            return Err(ConfigError::OutOfRange("term-current"));
        }

        Ok(ChargerConfig {
            charge_voltage_mv,
            charge_current_ma,
            term_current_ma,
            enable_auto_dpdm: self.enable_auto_dpdm,
            enable_termination: self.enable_termination,
            enable_ico: self.enable_ico,
            enable_absolute_vindpm: self.enable_absolute_vindpm,
            tune: self.tune,
        })
    }
}
