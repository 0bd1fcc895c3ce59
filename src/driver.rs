//! Register-level driver for one BQ2589x.
//! Blocking I2C helpers plus named-field operations; bus sharing is left to the `I2C` implementation.

use embedded_hal::delay::DelayNs;

use crate::data_types::{BoostCurrentLimit, ChargeStatus, PartNumber, SourceType, TuneDirection, WatchdogTimeout};
use crate::error::Error;
use crate::registers::{
    addr, boostv_mv_to_code, code_to_batv_mv, code_to_ichgr_ma, code_to_idpm_ma, code_to_sysv_mv, code_to_tspct_milli,
    code_to_vbus_mv, field, ichg_ma_to_code, iinlim_ma_to_code, iprechg_ma_to_code, iterm_ma_to_code,
    vindpm_mv_to_code, vindpm_offset_mv_to_code, vreg_mv_to_code, FaultBits, Field, StatusBits,
};

/// Settle time after forcing D+/D- detection.
pub const FORCE_DPDM_SETTLE_MS: u32 = 10;

/// BQ2589x register interface.
pub struct Bq2589x<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> Bq2589x<I2C> {
    /// Create a driver instance at `address`.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Return the 7-bit I2C address configured for this instance.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the bus handle.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bq2589x<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Write a single register.
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Error::I2c)
    }

    /// Read a single register.
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Update masked bits in a register (read-modify-write).
    pub fn update_reg(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        let cur = self.read_reg(reg)?;
        let new = (cur & !mask) | (value & mask);
        self.write_reg(reg, new)
    }

    /// Read a named field.
    pub fn read_field(&mut self, field: Field) -> Result<u8, Error<I2C::Error>> {
        let raw = self.read_reg(field.reg)?;
        Ok(field.decode(raw))
    }

    /// Write a named field, leaving the rest of the register untouched.
    pub fn write_field(&mut self, field: Field, value: u8) -> Result<(), Error<I2C::Error>> {
        self.update_reg(field.reg, field.mask, field.encode(value))
    }

    fn write_flag(&mut self, field: Field, on: bool) -> Result<(), Error<I2C::Error>> {
        self.write_field(field, on as u8)
    }

    /// Read part number code and revision from REG14.
    pub fn read_part_info(&mut self) -> Result<(u8, u8), Error<I2C::Error>> {
        let raw = self.read_reg(addr::DEVICE)?;
        Ok((field::PN.decode(raw), field::DEV_REV.decode(raw)))
    }

    /// Detect the part and check it against `expected`. Returns the revision.
    pub fn detect(&mut self, expected: PartNumber) -> Result<u8, Error<I2C::Error>> {
        let (pn, rev) = self.read_part_info()?;
        if pn != expected.code() {
            return Err(Error::UnexpectedPart(pn));
        }
        Ok(rev)
    }

    // ------------------ Status ------------------

    /// Read STATUS register raw bits.
    pub fn read_status_raw(&mut self) -> Result<StatusBits, Error<I2C::Error>> {
        let val = self.read_reg(addr::STATUS)?;
        Ok(StatusBits::from_bits_truncate(val))
    }

    /// Read FAULT register raw bits.
    pub fn read_fault_raw(&mut self) -> Result<FaultBits, Error<I2C::Error>> {
        let val = self.read_reg(addr::FAULT)?;
        Ok(FaultBits::from_bits_truncate(val))
    }

    /// Classified input source.
    pub fn source_type(&mut self) -> Result<SourceType, Error<I2C::Error>> {
        let code = self.read_field(field::VBUS_STAT)?;
        Ok(SourceType::from_code(code))
    }

    pub fn charge_status(&mut self) -> Result<ChargeStatus, Error<I2C::Error>> {
        let code = self.read_field(field::CHRG_STAT)?;
        Ok(ChargeStatus::from_code(code))
    }

    pub fn is_charge_done(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.charge_status()? == ChargeStatus::Done)
    }

    /// Force a D+/D- detection and wait for it to settle.
    pub fn force_dpdm<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::FORCE_DPDM, true)?;
        delay.delay_ms(FORCE_DPDM_SETTLE_MS);
        Ok(())
    }

    // ------------------ Charge control ------------------

    /// CHG_CONFIG.
    pub fn set_charge_enable(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::CHG_CONFIG, enable)
    }

    /// High-impedance input: the charger stops drawing from VBUS.
    pub fn set_hiz(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::EN_HIZ, enable)
    }

    pub fn is_hiz(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_field(field::EN_HIZ)? != 0)
    }

    pub fn set_ilim_pin(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::EN_ILIM, enable)
    }

    pub fn set_charge_current_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::ICHG, ichg_ma_to_code(ma))
    }

    pub fn set_term_current_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::ITERM, iterm_ma_to_code(ma))
    }

    pub fn set_prechg_current_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::IPRECHG, iprechg_ma_to_code(ma))
    }

    pub fn set_charge_voltage_mv(&mut self, mv: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::VREG, vreg_mv_to_code(mv))
    }

    /// Absolute input voltage limit (VINDPM).
    pub fn set_input_voltage_limit_mv(&mut self, mv: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::VINDPM, vindpm_mv_to_code(mv))
    }

    /// Input current limit (IINLIM).
    pub fn set_input_current_limit_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::IINLIM, iinlim_ma_to_code(ma))
    }

    pub fn set_vindpm_offset_mv(&mut self, mv: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::VINDPM_OS, vindpm_offset_mv_to_code(mv))
    }

    pub fn set_termination(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::EN_TERM, enable)
    }

    pub fn set_auto_dpdm(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::AUTO_DPDM_EN, enable)
    }

    pub fn set_absolute_vindpm(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::FORCE_VINDPM, enable)
    }

    pub fn set_ico(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::ICO_EN, enable)
    }

    // ------------------ OTG ------------------

    pub fn set_otg(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::OTG_CONFIG, enable)
    }

    pub fn set_otg_voltage_mv(&mut self, mv: u16) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::BOOSTV, boostv_mv_to_code(mv))
    }

    pub fn set_otg_current(&mut self, limit: BoostCurrentLimit) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::BOOST_LIM, limit.code())
    }

    // ------------------ Watchdog / reset ------------------

    pub fn set_watchdog(&mut self, timeout: WatchdogTimeout) -> Result<(), Error<I2C::Error>> {
        self.write_field(field::WATCHDOG, timeout.code())
    }

    /// Kick the watchdog so the IC does not fall back to default settings.
    pub fn reset_watchdog(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::WD_RST, true)
    }

    pub fn reset_chip(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::REG_RST, true)
    }

    /// Turn BATFET off (ship mode).
    pub fn enter_ship_mode(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::BATFET_DIS, true)
    }

    // ------------------ ADC ------------------

    /// Start conversions. A no-op while continuous conversion is already running.
    pub fn adc_start(&mut self, oneshot: bool) -> Result<(), Error<I2C::Error>> {
        if self.read_field(field::CONV_RATE)? != 0 {
            return Ok(());
        }
        if oneshot {
            self.write_flag(field::CONV_START, true)
        } else {
            self.write_flag(field::CONV_RATE, true)
        }
    }

    pub fn adc_stop(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::CONV_RATE, false)
    }

    pub fn read_battery_mv(&mut self) -> Result<u16, Error<I2C::Error>> {
        Ok(code_to_batv_mv(self.read_field(field::BATV)?))
    }

    pub fn read_sys_mv(&mut self) -> Result<u16, Error<I2C::Error>> {
        Ok(code_to_sysv_mv(self.read_field(field::SYSV)?))
    }

    pub fn read_vbus_mv(&mut self) -> Result<u16, Error<I2C::Error>> {
        Ok(code_to_vbus_mv(self.read_field(field::VBUSV)?))
    }

    /// TS pin voltage in thousandths of a percent of REGN.
    pub fn read_ts_milli_pct(&mut self) -> Result<u32, Error<I2C::Error>> {
        Ok(code_to_tspct_milli(self.read_field(field::TSPCT)?))
    }

    pub fn read_charge_current_ma(&mut self) -> Result<u16, Error<I2C::Error>> {
        Ok(code_to_ichgr_ma(self.read_field(field::ICHGR)?))
    }

    // ------------------ Pump-express ------------------

    pub fn set_pumpx(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::EN_PUMPX, enable)
    }

    fn pump_field(direction: TuneDirection) -> Result<Field, Error<I2C::Error>> {
        match direction {
            TuneDirection::Up => Ok(field::PUMPX_UP),
            TuneDirection::Down => Ok(field::PUMPX_DN),
            TuneDirection::None => Err(Error::InvalidConfig),
        }
    }

    /// Ask the adapter for one voltage step in `direction`.
    pub fn pump_step(&mut self, direction: TuneDirection) -> Result<(), Error<I2C::Error>> {
        let field = Self::pump_field(direction)?;
        self.write_flag(field, true)
    }

    /// True while the last step in `direction` is still being signalled to the adapter.
    pub fn pump_busy(&mut self, direction: TuneDirection) -> Result<bool, Error<I2C::Error>> {
        let field = Self::pump_field(direction)?;
        Ok(self.read_field(field)? != 0)
    }

    // ------------------ ICO ------------------

    pub fn force_ico(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_flag(field::FORCE_ICO, true)
    }

    pub fn ico_optimized(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_field(field::ICO_OPTIMIZED)? != 0)
    }

    /// Input current limit in effect (ICO result when ICO is enabled).
    pub fn read_idpm_limit_ma(&mut self) -> Result<u16, Error<I2C::Error>> {
        Ok(code_to_idpm_ma(self.read_field(field::IDPM_LIM)?))
    }
}
