//! Data types shared by the driver and the control core.

/// Position of a charger in the dual-charger pair.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// BQ25890: owns the interrupt line, pump-express and ICO.
    Primary,
    /// BQ25892: parked in high impedance until the source can feed both.
    Secondary,
}

impl Role {
    /// Default bus address for the role.
    pub fn address(self) -> u8 {
        match self {
            Role::Primary => crate::registers::PRIMARY_I2C_ADDRESS,
            Role::Secondary => crate::registers::SECONDARY_I2C_ADDRESS,
        }
    }

    /// Part number the role must be populated with.
    pub fn expected_part(self) -> PartNumber {
        match self {
            Role::Primary => PartNumber::Bq25890,
            Role::Secondary => PartNumber::Bq25892,
        }
    }
}

/// Part number reported in REG14 PN[2:0].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartNumber {
    Bq25890,
    Bq25892,
    Bq25895,
}

impl PartNumber {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x03 => Some(PartNumber::Bq25890),
            0x00 => Some(PartNumber::Bq25892),
            0x07 => Some(PartNumber::Bq25895),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PartNumber::Bq25890 => 0x03,
            PartNumber::Bq25892 => 0x00,
            PartNumber::Bq25895 => 0x07,
        }
    }
}

/// Input source classification (REG0B VBUS_STAT).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SourceType {
    /// No input.
    None,
    /// USB standard downstream port.
    UsbSdp,
    /// USB charging downstream port.
    UsbCdp,
    /// USB dedicated charging port; may support pump-express.
    UsbDcp,
    /// HVDCP / MaxCharge high-voltage adapter.
    MaxCharge,
    /// Unknown adapter.
    Unknown,
    /// Non-standard adapter.
    NonStandard,
    /// Charger is in reverse boost (OTG).
    Otg,
    /// Not classified since attach.
    #[default]
    NotDetermined,
}

impl SourceType {
    /// Decode the 3-bit VBUS_STAT field.
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => SourceType::None,
            1 => SourceType::UsbSdp,
            2 => SourceType::UsbCdp,
            3 => SourceType::UsbDcp,
            4 => SourceType::MaxCharge,
            5 => SourceType::Unknown,
            6 => SourceType::NonStandard,
            _ => SourceType::Otg,
        }
    }

    /// True when an external source feeds the input.
    pub fn is_attached(self) -> bool {
        !matches!(self, SourceType::None | SourceType::Otg | SourceType::NotDetermined)
    }

    /// Sources exposed as a USB supply.
    pub fn is_usb(self) -> bool {
        matches!(self, SourceType::UsbSdp | SourceType::UsbDcp)
    }

    /// Sources exposed as a wall (mains) supply.
    pub fn is_wall(self) -> bool {
        matches!(self, SourceType::MaxCharge | SourceType::Unknown | SourceType::NonStandard)
    }
}

/// Charging state (REG0B CHRG_STAT).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChargeStatus {
    NotCharging,
    PreCharge,
    FastCharging,
    Done,
}

impl ChargeStatus {
    pub fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => ChargeStatus::NotCharging,
            1 => ChargeStatus::PreCharge,
            2 => ChargeStatus::FastCharging,
            _ => ChargeStatus::Done,
        }
    }
}

/// Charge type reported to the host power-management surface.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChargeType {
    None,
    Trickle,
    Fast,
    Unknown,
}

impl From<ChargeStatus> for ChargeType {
    fn from(status: ChargeStatus) -> Self {
        match status {
            ChargeStatus::FastCharging => ChargeType::Fast,
            ChargeStatus::PreCharge => ChargeType::Trickle,
            ChargeStatus::Done | ChargeStatus::NotCharging => ChargeType::None,
        }
    }
}

bitflags::bitflags! {
    /// Per-instance status bitset kept by the control core.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct StatusFlags: u16 {
        const PLUGGED_IN    = 0x0001;
        const POWER_GOOD    = 0x0002;
        const FAULT         = 0x0008;
        const PRESENT       = 0x0100;
        const CHARGE_ENABLE = 0x0200;
    }
}

/// Direction of a voltage tuning episode.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TuneDirection {
    #[default]
    None,
    Up,
    Down,
}

/// Watchdog timer setting (REG07 WATCHDOG).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchdogTimeout {
    Disabled,
    S40,
    S80,
    S160,
}

impl WatchdogTimeout {
    pub fn code(self) -> u8 {
        match self {
            WatchdogTimeout::Disabled => 0b00,
            WatchdogTimeout::S40 => 0b01,
            WatchdogTimeout::S80 => 0b10,
            WatchdogTimeout::S160 => 0b11,
        }
    }
}

/// Boost (OTG) current limit (REG0A BOOST_LIM).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BoostCurrentLimit {
    Ma500,
    Ma700,
    Ma1100,
    #[default]
    Ma1300,
    Ma1600,
    Ma1800,
    Ma2100,
    Ma2400,
}

impl BoostCurrentLimit {
    /// Setting matching `ma` exactly; anything unlisted falls back to 1.3 A.
    pub fn from_ma(ma: u16) -> Self {
        match ma {
            500 => BoostCurrentLimit::Ma500,
            700 => BoostCurrentLimit::Ma700,
            1100 => BoostCurrentLimit::Ma1100,
            1600 => BoostCurrentLimit::Ma1600,
            1800 => BoostCurrentLimit::Ma1800,
            2100 => BoostCurrentLimit::Ma2100,
            2400 => BoostCurrentLimit::Ma2400,
            _ => BoostCurrentLimit::Ma1300,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BoostCurrentLimit::Ma500 => 0,
            BoostCurrentLimit::Ma700 => 1,
            BoostCurrentLimit::Ma1100 => 2,
            BoostCurrentLimit::Ma1300 => 3,
            BoostCurrentLimit::Ma1600 => 4,
            BoostCurrentLimit::Ma1800 => 5,
            BoostCurrentLimit::Ma2100 => 6,
            BoostCurrentLimit::Ma2400 => 7,
        }
    }
}

/// Last sampled telemetry of one charger.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Telemetry {
    pub vbus_mv: u16,
    pub vbat_mv: u16,
    pub charge_current_ma: u16,
    /// Battery state of charge, percent.
    pub soc: u8,
}
