use crate::{scheduler::Tick, Error, OpCode};
use core::fmt::Debug;

/// Function commands of the DS18B20
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    WriteScratchpad = 0x4E,
    ReadScratchpad = 0xBE,
    CopyScratchpad = 0x48,
    ReadPowerSupply = 0xB4,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// ADC resolution, persisted in the configuration byte of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resolution {
    Bits9 = 0b0001_1111,
    Bits10 = 0b0011_1111,
    Bits11 = 0b0101_1111,
    Bits12 = 0b0111_1111,
}

impl Resolution {
    /// Worst-case wait when the resolution is not known
    pub const FALLBACK_CONVERSION_TIME: Tick = 750;

    /// Resolution for a bit count; anything but 9, 10 or 11 means 12
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            9 => Resolution::Bits9,
            10 => Resolution::Bits10,
            11 => Resolution::Bits11,
            _ => Resolution::Bits12,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Resolution::Bits9 => 9,
            Resolution::Bits10 => 10,
            Resolution::Bits11 => 11,
            Resolution::Bits12 => 12,
        }
    }

    pub fn from_config<E: Debug>(config: u8) -> Result<Self, Error<E>> {
        match config {
            0b0001_1111 => Ok(Resolution::Bits9),
            0b0011_1111 => Ok(Resolution::Bits10),
            0b0101_1111 => Ok(Resolution::Bits11),
            0b0111_1111 => Ok(Resolution::Bits12),
            other => Err(Error::UnknownResolution(other)),
        }
    }

    pub fn config(&self) -> u8 {
        *self as _
    }

    /// Maximum conversion time, in ticks
    pub fn conversion_time(&self) -> Tick {
        match self {
            Resolution::Bits9 => 94,
            Resolution::Bits10 => 188,
            Resolution::Bits11 => 375,
            Resolution::Bits12 => 750,
        }
    }
}

/// Conversion wait for a possibly unknown resolution
pub fn conversion_time(resolution: Option<Resolution>) -> Tick {
    resolution.map_or(Resolution::FALLBACK_CONVERSION_TIME, |r| r.conversion_time())
}

/// The nine bytes returned by the read scratchpad command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scratchpad([u8; Scratchpad::SIZE]);

impl Scratchpad {
    pub const SIZE: usize = 9;

    const TEMPERATURE_LSB: usize = 0;
    const TEMPERATURE_MSB: usize = 1;
    const CONFIGURATION: usize = 4;

    pub fn new(raw: [u8; Self::SIZE]) -> Self {
        Scratchpad(raw)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn temperature(&self) -> Temperature {
        Temperature::decode(self.0[Self::TEMPERATURE_LSB], self.0[Self::TEMPERATURE_MSB])
    }

    pub fn config(&self) -> u8 {
        self.0[Self::CONFIGURATION]
    }

    pub fn set_config(&mut self, config: u8) {
        self.0[Self::CONFIGURATION] = config;
    }

    /// Alarm high, alarm low and configuration: what write scratchpad expects
    pub fn writable(&self) -> [u8; 3] {
        [self.0[2], self.0[3], self.0[4]]
    }
}

impl From<Scratchpad> for [u8; Scratchpad::SIZE] {
    fn from(scratchpad: Scratchpad) -> Self {
        scratchpad.0
    }
}

/// Temperature sample in units of 1/128 degC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(i16);

impl Temperature {
    /// Samples at or below -55 degC are what a missing or unpowered device reads back
    pub const FLOOR: i16 = -7040;

    const SCALE: f32 = 1.0 / 128.0;

    /// High byte lands on bits 11..=15, low byte on bits 3..=10
    pub fn decode(lsb: u8, msb: u8) -> Self {
        Temperature(((u16::from(msb) << 11) | (u16::from(lsb) << 3)) as i16)
    }

    pub fn from_raw(raw: i16) -> Self {
        Temperature(raw)
    }

    pub fn raw(&self) -> i16 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 > Self::FLOOR
    }

    pub fn celsius(&self) -> f32 {
        f32::from(self.0) * Self::SCALE
    }

    /// Split into integer degrees and the fraction in 1/10000 degC
    ///
    /// The value may be recovered as: integer + fraction/10000
    pub fn split(&self) -> (i16, i16) {
        let abs = self.0.unsigned_abs();
        let integer = (abs >> 7) as i16;
        let fraction = (u32::from(abs & 0x7F) * 10_000 / 128) as i16;
        if self.0 < 0 {
            (-integer, -fraction)
        } else {
            (integer, fraction)
        }
    }
}
