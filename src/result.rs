use core::fmt::Debug;

/// Step of [`Ds18b20::new`](crate::ds18b20::Ds18b20::new) that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStage {
    /// The scheduler had no room for the driver tasks
    TaskRegistration,
    /// The power supply query got no answer
    ParasiteDetection,
    /// The configuration byte could not be read or decoded
    ResolutionRead,
}

/// Error type
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: Sized + Debug> {
    /// Wire not high
    WireFault,
    /// No presence on wire
    NoPresence,
    /// Channel index not served by the bus driver
    InvalidChannel(usize),
    /// Scratchpad could not be read back
    ScratchpadRead,
    /// Decoded sample at or below [`Temperature::FLOOR`](crate::ds18b20::Temperature::FLOOR)
    InvalidSample(i16),
    /// Configuration byte does not encode a known resolution
    UnknownResolution(u8),
    Initialization(InitStage),
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}
