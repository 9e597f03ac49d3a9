use crate::{Address, Command, Error, OpCode};
use core::fmt::Debug;

/// Byte level access to one or more shared OneWire lines
///
/// Implementors provide reset and single byte transfers; addressing and the
/// usual reset/select/transfer sequences come for free.
pub trait OneWire {
    /// Port error of the underlying hardware
    type Error: Debug;

    /// Identifies one physical line served by this transport
    type Channel: Copy + Debug + PartialEq;

    /// Prepares the line for use, leaving it released
    fn init(&mut self, _channel: Self::Channel) -> Result<(), Error<Self::Error>> {
        Ok(())
    }

    /// Performs a reset and listens for a presence pulse
    ///
    /// Returns Err(NoPresence) when no device answered.
    fn reset(&mut self, channel: Self::Channel) -> Result<(), Error<Self::Error>>;

    fn write_byte(&mut self, channel: Self::Channel, byte: u8) -> Result<(), Error<Self::Error>>;

    fn read_byte(&mut self, channel: Self::Channel) -> Result<u8, Error<Self::Error>>;

    fn reset_presence(&mut self, channel: Self::Channel) -> Result<bool, Error<Self::Error>> {
        self.reset(channel).map(|_| true).or_else(|error| {
            if matches!(error, Error::NoPresence) {
                Ok(false)
            } else {
                Err(error)
            }
        })
    }

    fn read_bytes(
        &mut self,
        channel: Self::Channel,
        dst: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        for d in dst {
            *d = self.read_byte(channel)?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, channel: Self::Channel, bytes: &[u8]) -> Result<(), Error<Self::Error>> {
        for b in bytes {
            self.write_byte(channel, *b)?;
        }
        Ok(())
    }

    fn write_command(
        &mut self,
        channel: Self::Channel,
        cmd: impl OpCode,
    ) -> Result<(), Error<Self::Error>> {
        self.write_byte(channel, cmd.op_code())
    }

    fn skip(&mut self, channel: Self::Channel) -> Result<(), Error<Self::Error>> {
        self.write_command(channel, Command::SkipRom)
    }

    /// Addresses a single device, or every device for [`Address::BROADCAST`]
    fn select(&mut self, channel: Self::Channel, addr: &Address) -> Result<(), Error<Self::Error>> {
        if addr.is_broadcast() {
            return self.skip(channel);
        }
        self.write_command(channel, Command::MatchRom)?;
        self.write_bytes(channel, addr.as_ref())
    }

    fn reset_select_write_only(
        &mut self,
        channel: Self::Channel,
        addr: &Address,
        write: &[u8],
    ) -> Result<(), Error<Self::Error>> {
        self.reset(channel)?;
        self.select(channel, addr)?;
        self.write_bytes(channel, write)?;
        Ok(())
    }

    fn reset_select_write_read(
        &mut self,
        channel: Self::Channel,
        addr: &Address,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        self.reset(channel)?;
        self.select(channel, addr)?;
        self.write_bytes(channel, write)?;
        self.read_bytes(channel, read)?;
        Ok(())
    }
}
