pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM level commands understood by every device on the bus
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    MatchRom = 0x55,
    SkipRom = 0xCC,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}
