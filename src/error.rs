//! Error definitions for the BQ2589x control core.

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<I2cError> {
    /// Underlying I2C transaction failed.
    I2c(I2cError),
    /// Provided parameter was outside datasheet limits.
    OutOfRange,
    /// Unsupported/invalid configuration for current mode.
    InvalidConfig,
    /// Device answered but its part number does not match the requested role.
    UnexpectedPart(u8),
    /// A required configuration item was not supplied at attach time.
    MissingConfig(&'static str),
}

impl<I2cError: core::fmt::Debug> core::fmt::Display for Error<I2cError> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::OutOfRange => write!(f, "parameter out of range"),
            Error::InvalidConfig => write!(f, "invalid configuration for current mode"),
            Error::UnexpectedPart(pn) => write!(f, "unexpected part number 0x{:02x}", pn),
            Error::MissingConfig(name) => write!(f, "missing required configuration `{}`", name),
        }
    }
}
