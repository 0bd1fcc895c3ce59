//! Register map and constants for BQ25890/BQ25892.
//! Values and limits are copied from the datasheet.

/// I2C address of the primary charger (BQ25890).
pub const PRIMARY_I2C_ADDRESS: u8 = 0x6A;
/// I2C address of the secondary charger (BQ25892).
pub const SECONDARY_I2C_ADDRESS: u8 = 0x6B;

/// Register addresses (7-bit).
pub mod addr {
    /// Input control: HIZ, ILIM pin, input current limit.
    pub const INPUT_CTRL: u8 = 0x00;
    /// Thermal thresholds and VINDPM offset.
    pub const VINDPM_OFFSET: u8 = 0x01;
    /// ADC control, ICO enable, D+/D- detection.
    pub const ADC_CTRL: u8 = 0x02;
    /// Watchdog reset, OTG, charge enable, SYS_MIN.
    pub const SYS_CTRL: u8 = 0x03;
    /// Pump-express enable and fast-charge current.
    pub const CHARGE_CURRENT: u8 = 0x04;
    /// Pre-charge and termination current.
    pub const PRECHG_TERM: u8 = 0x05;
    /// Charge voltage limit.
    pub const CHARGE_VOLTAGE: u8 = 0x06;
    /// Termination enable, watchdog timer, safety timer.
    pub const TIMER_CTRL: u8 = 0x07;
    /// IR compensation and thermal regulation.
    pub const IR_COMP: u8 = 0x08;
    /// Force ICO, BATFET control, pump-express up/down.
    pub const MISC_CTRL: u8 = 0x09;
    /// Boost (OTG) voltage and current limit.
    pub const BOOST_CTRL: u8 = 0x0A;
    /// VBUS/charge/power-good status.
    pub const STATUS: u8 = 0x0B;
    /// Fault latch (cleared on read).
    pub const FAULT: u8 = 0x0C;
    /// Absolute VINDPM threshold.
    pub const VINDPM: u8 = 0x0D;
    /// ADC: battery voltage.
    pub const BATV: u8 = 0x0E;
    /// ADC: system voltage.
    pub const SYSV: u8 = 0x0F;
    /// ADC: TS pin percentage of REGN.
    pub const TSPCT: u8 = 0x10;
    /// ADC: VBUS voltage.
    pub const VBUSV: u8 = 0x11;
    /// ADC: charge current.
    pub const ICHGR: u8 = 0x12;
    /// DPM status and ICO result.
    pub const IDPM: u8 = 0x13;
    /// Reset, ICO status, part number, revision.
    pub const DEVICE: u8 = 0x14;
    /// Last register of the map.
    pub const LAST: u8 = DEVICE;
}

/// A named bit-field inside one 8-bit register.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub reg: u8,
    pub mask: u8,
    pub shift: u8,
}

impl Field {
    pub const fn new(reg: u8, mask: u8, shift: u8) -> Self {
        Self { reg, mask, shift }
    }

    /// Place `value` into the field position.
    pub const fn encode(&self, value: u8) -> u8 {
        (value << self.shift) & self.mask
    }

    /// Extract the field from a raw register value.
    pub const fn decode(&self, raw: u8) -> u8 {
        (raw & self.mask) >> self.shift
    }
}

/// Every field the control core touches, by name.
pub mod field {
    use super::{addr, Field, MiscCtrlBits};

    pub const EN_HIZ: Field = Field::new(addr::INPUT_CTRL, 0x80, 7);
    pub const EN_ILIM: Field = Field::new(addr::INPUT_CTRL, 0x40, 6);
    pub const IINLIM: Field = Field::new(addr::INPUT_CTRL, 0x3F, 0);

    pub const VINDPM_OS: Field = Field::new(addr::VINDPM_OFFSET, 0x1F, 0);

    pub const CONV_START: Field = Field::new(addr::ADC_CTRL, 0x80, 7);
    pub const CONV_RATE: Field = Field::new(addr::ADC_CTRL, 0x40, 6);
    pub const ICO_EN: Field = Field::new(addr::ADC_CTRL, 0x10, 4);
    pub const FORCE_DPDM: Field = Field::new(addr::ADC_CTRL, 0x02, 1);
    pub const AUTO_DPDM_EN: Field = Field::new(addr::ADC_CTRL, 0x01, 0);

    pub const WD_RST: Field = Field::new(addr::SYS_CTRL, 0x40, 6);
    pub const OTG_CONFIG: Field = Field::new(addr::SYS_CTRL, 0x20, 5);
    pub const CHG_CONFIG: Field = Field::new(addr::SYS_CTRL, 0x10, 4);

    pub const EN_PUMPX: Field = Field::new(addr::CHARGE_CURRENT, 0x80, 7);
    pub const ICHG: Field = Field::new(addr::CHARGE_CURRENT, 0x7F, 0);

    pub const IPRECHG: Field = Field::new(addr::PRECHG_TERM, 0xF0, 4);
    pub const ITERM: Field = Field::new(addr::PRECHG_TERM, 0x0F, 0);

    pub const VREG: Field = Field::new(addr::CHARGE_VOLTAGE, 0xFC, 2);

    pub const EN_TERM: Field = Field::new(addr::TIMER_CTRL, 0x80, 7);
    pub const WATCHDOG: Field = Field::new(addr::TIMER_CTRL, 0x30, 4);

    pub const FORCE_ICO: Field = Field::new(addr::MISC_CTRL, MiscCtrlBits::FORCE_ICO.bits(), 7);
    pub const BATFET_DIS: Field = Field::new(addr::MISC_CTRL, MiscCtrlBits::BATFET_DIS.bits(), 5);
    pub const PUMPX_UP: Field = Field::new(addr::MISC_CTRL, MiscCtrlBits::PUMPX_UP.bits(), 1);
    pub const PUMPX_DN: Field = Field::new(addr::MISC_CTRL, MiscCtrlBits::PUMPX_DN.bits(), 0);

    pub const BOOSTV: Field = Field::new(addr::BOOST_CTRL, 0xF0, 4);
    pub const BOOST_LIM: Field = Field::new(addr::BOOST_CTRL, 0x07, 0);

    pub const VBUS_STAT: Field = Field::new(addr::STATUS, 0xE0, 5);
    pub const CHRG_STAT: Field = Field::new(addr::STATUS, 0x18, 3);
    pub const PG_STAT: Field = Field::new(addr::STATUS, 0x04, 2);

    pub const FORCE_VINDPM: Field = Field::new(addr::VINDPM, 0x80, 7);
    pub const VINDPM: Field = Field::new(addr::VINDPM, 0x7F, 0);

    pub const BATV: Field = Field::new(addr::BATV, 0x7F, 0);
    pub const SYSV: Field = Field::new(addr::SYSV, 0x7F, 0);
    pub const TSPCT: Field = Field::new(addr::TSPCT, 0x7F, 0);
    pub const VBUSV: Field = Field::new(addr::VBUSV, 0x7F, 0);
    pub const ICHGR: Field = Field::new(addr::ICHGR, 0x7F, 0);

    pub const IDPM_LIM: Field = Field::new(addr::IDPM, 0x3F, 0);

    pub const REG_RST: Field = Field::new(addr::DEVICE, 0x80, 7);
    pub const ICO_OPTIMIZED: Field = Field::new(addr::DEVICE, 0x40, 6);
    pub const PN: Field = Field::new(addr::DEVICE, 0x38, 3);
    pub const DEV_REV: Field = Field::new(addr::DEVICE, 0x03, 0);
}

bitflags::bitflags! {
    /// STATUS register bits (0x0B). Bits 7-5 hold VBUS_STAT, bits 4-3 CHRG_STAT.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct StatusBits: u8 {
        const VBUS_STAT2 = 1 << 7;
        const VBUS_STAT1 = 1 << 6;
        const VBUS_STAT0 = 1 << 5;
        const CHRG_STAT1 = 1 << 4;
        const CHRG_STAT0 = 1 << 3;
        /// Input power good.
        const PG_STAT    = 1 << 2;
        /// USB input current setting (0 = 100 mA, 1 = 500 mA).
        const SDP_STAT   = 1 << 1;
        /// In VSYSMIN regulation.
        const VSYS_STAT  = 1 << 0;
    }

    /// FAULT register bits (0x0C).
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct FaultBits: u8 {
        const WATCHDOG = 1 << 7;
        const BOOST    = 1 << 6;
        const CHRG1    = 1 << 5;
        const CHRG0    = 1 << 4;
        const BAT      = 1 << 3;
        const NTC2     = 1 << 2;
        const NTC1     = 1 << 1;
        const NTC0     = 1 << 0;
    }

    /// MISC_CTRL register bits (0x09).
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct MiscCtrlBits: u8 {
        const FORCE_ICO     = 1 << 7;
        const TMR2X_EN      = 1 << 6;
        const BATFET_DIS    = 1 << 5;
        const JEITA_VSET    = 1 << 4;
        const BATFET_DLY    = 1 << 3;
        const BATFET_RST_EN = 1 << 2;
        const PUMPX_UP      = 1 << 1;
        const PUMPX_DN      = 1 << 0;
    }
}

/// Input current limit DAC (IINLIM).
pub const IINLIM_BASE_MA: u16 = 100;
pub const IINLIM_LSB_MA: u16 = 50;
pub const IINLIM_MAX_CODE: u8 = 0x3F;

/// VINDPM offset (relative mode).
pub const VINDPM_OS_BASE_MV: u16 = 0;
pub const VINDPM_OS_LSB_MV: u16 = 100;
pub const VINDPM_OS_MAX_CODE: u8 = 0x1F;

/// Fast charge current.
pub const ICHG_BASE_MA: u16 = 0;
pub const ICHG_LSB_MA: u16 = 64;
pub const ICHG_MAX_CODE: u8 = 0x4F;

/// Pre-charge current.
pub const IPRECHG_BASE_MA: u16 = 64;
pub const IPRECHG_LSB_MA: u16 = 64;
pub const IPRECHG_MAX_CODE: u8 = 0x0F;

/// Termination current.
pub const ITERM_BASE_MA: u16 = 64;
pub const ITERM_LSB_MA: u16 = 64;
pub const ITERM_MAX_CODE: u8 = 0x0F;

/// Charge voltage limit.
pub const VREG_BASE_MV: u16 = 3_840;
pub const VREG_LSB_MV: u16 = 16;
pub const VREG_MAX_CODE: u8 = 0x30;

/// Boost (OTG) regulation voltage.
pub const BOOSTV_BASE_MV: u16 = 4_550;
pub const BOOSTV_LSB_MV: u16 = 64;
pub const BOOSTV_MAX_CODE: u8 = 0x0F;

/// Absolute VINDPM threshold.
pub const VINDPM_BASE_MV: u16 = 2_600;
pub const VINDPM_LSB_MV: u16 = 100;
pub const VINDPM_MAX_CODE: u8 = 0x7F;

/// ADC: battery and system voltage.
pub const BATV_BASE_MV: u16 = 2_304;
pub const BATV_LSB_MV: u16 = 20;
pub const SYSV_BASE_MV: u16 = 2_304;
pub const SYSV_LSB_MV: u16 = 20;

/// ADC: VBUS voltage.
pub const VBUSV_BASE_MV: u16 = 2_600;
pub const VBUSV_LSB_MV: u16 = 100;

/// ADC: charge current.
pub const ICHGR_BASE_MA: u16 = 0;
pub const ICHGR_LSB_MA: u16 = 50;

/// ICO result (IDPM_LIM).
pub const IDPM_LIM_BASE_MA: u16 = 100;
pub const IDPM_LIM_LSB_MA: u16 = 50;

/// ADC: TS as thousandths of a percent of REGN.
pub const TSPCT_BASE_MILLI_PCT: u32 = 21_000;
pub const TSPCT_LSB_MILLI_PCT: u32 = 465;

/// Convert a physical value to a field code with `code = (value - base) / lsb`. Clamps to `[0, max_code]`.
pub fn linear_to_code(value: u16, base: u16, lsb: u16, max_code: u8) -> u8 {
    let steps = value.saturating_sub(base) / lsb;
    steps.min(max_code as u16) as u8
}

/// Convert a field code back to its physical value (`base + code * lsb`).
pub fn code_to_linear(code: u8, base: u16, lsb: u16) -> u16 {
    base.saturating_add((code as u16).saturating_mul(lsb))
}

/// Highest encodable value for a linear field.
pub const fn linear_max(base: u16, lsb: u16, max_code: u8) -> u16 {
    base + max_code as u16 * lsb
}

pub fn iinlim_ma_to_code(ma: u16) -> u8 {
    linear_to_code(ma, IINLIM_BASE_MA, IINLIM_LSB_MA, IINLIM_MAX_CODE)
}

pub fn code_to_iinlim_ma(code: u8) -> u16 {
    code_to_linear(code.min(IINLIM_MAX_CODE), IINLIM_BASE_MA, IINLIM_LSB_MA)
}

pub fn vindpm_mv_to_code(mv: u16) -> u8 {
    linear_to_code(mv, VINDPM_BASE_MV, VINDPM_LSB_MV, VINDPM_MAX_CODE)
}

pub fn code_to_vindpm_mv(code: u8) -> u16 {
    code_to_linear(code.min(VINDPM_MAX_CODE), VINDPM_BASE_MV, VINDPM_LSB_MV)
}

pub fn vindpm_offset_mv_to_code(mv: u16) -> u8 {
    linear_to_code(mv, VINDPM_OS_BASE_MV, VINDPM_OS_LSB_MV, VINDPM_OS_MAX_CODE)
}

pub fn ichg_ma_to_code(ma: u16) -> u8 {
    linear_to_code(ma, ICHG_BASE_MA, ICHG_LSB_MA, ICHG_MAX_CODE)
}

pub fn iprechg_ma_to_code(ma: u16) -> u8 {
    linear_to_code(ma, IPRECHG_BASE_MA, IPRECHG_LSB_MA, IPRECHG_MAX_CODE)
}

pub fn iterm_ma_to_code(ma: u16) -> u8 {
    linear_to_code(ma, ITERM_BASE_MA, ITERM_LSB_MA, ITERM_MAX_CODE)
}

pub fn vreg_mv_to_code(mv: u16) -> u8 {
    linear_to_code(mv, VREG_BASE_MV, VREG_LSB_MV, VREG_MAX_CODE)
}

pub fn boostv_mv_to_code(mv: u16) -> u8 {
    linear_to_code(mv, BOOSTV_BASE_MV, BOOSTV_LSB_MV, BOOSTV_MAX_CODE)
}

pub fn code_to_batv_mv(code: u8) -> u16 {
    code_to_linear(code & 0x7F, BATV_BASE_MV, BATV_LSB_MV)
}

pub fn code_to_sysv_mv(code: u8) -> u16 {
    code_to_linear(code & 0x7F, SYSV_BASE_MV, SYSV_LSB_MV)
}

pub fn code_to_vbus_mv(code: u8) -> u16 {
    code_to_linear(code & 0x7F, VBUSV_BASE_MV, VBUSV_LSB_MV)
}

pub fn code_to_ichgr_ma(code: u8) -> u16 {
    code_to_linear(code & 0x7F, ICHGR_BASE_MA, ICHGR_LSB_MA)
}

pub fn code_to_idpm_ma(code: u8) -> u16 {
    code_to_linear(code & 0x3F, IDPM_LIM_BASE_MA, IDPM_LIM_LSB_MA)
}

pub fn code_to_tspct_milli(code: u8) -> u32 {
    TSPCT_BASE_MILLI_PCT + (code & 0x7F) as u32 * TSPCT_LSB_MILLI_PCT
}
