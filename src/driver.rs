use crate::{Error, IoWire, OneWire};
use embedded_hal::delay::DelayNs;

const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLES: u8 = 7;
const PRESENCE_SAMPLE_US: u32 = 10;
const RESET_RECOVERY_US: u32 = 410;
const WIRE_HIGH_POLLS: u8 = 125;
const WIRE_HIGH_POLL_US: u32 = 2;

/// Bit-banged OneWire master for `N` lines sharing one delay source
///
/// Lines are addressed by their index in the array handed to [`Driver::new`].
pub struct Driver<W: IoWire, D: DelayNs, const N: usize = 1> {
    wires: [W; N],
    delay: D,
}

impl<W: IoWire, D: DelayNs> Driver<W, D> {
    /// Driver for a single line, reachable as channel `0`
    pub fn single(io_wire: W, delay: D) -> Self {
        Self::new([io_wire], delay)
    }
}

impl<W: IoWire, D: DelayNs, const N: usize> Driver<W, D, N> {
    pub fn new(wires: [W; N], delay: D) -> Self {
        Driver { wires, delay }
    }

    pub fn release(self) -> ([W; N], D) {
        (self.wires, self.delay)
    }

    fn line(&mut self, channel: usize) -> Result<Line<'_, W, D>, Error<W::Error>> {
        let Self { wires, delay } = self;
        match wires.get_mut(channel) {
            Some(io_wire) => Ok(Line { io_wire, delay }),
            None => Err(Error::InvalidChannel(channel)),
        }
    }
}

impl<W: IoWire, D: DelayNs, const N: usize> OneWire for Driver<W, D, N> {
    type Error = W::Error;
    type Channel = usize;

    fn init(&mut self, channel: usize) -> Result<(), Error<W::Error>> {
        self.line(channel)?.io_wire.set_high()?;
        Ok(())
    }

    fn reset(&mut self, channel: usize) -> Result<(), Error<W::Error>> {
        self.line(channel)?.reset()
    }

    fn write_byte(&mut self, channel: usize, byte: u8) -> Result<(), Error<W::Error>> {
        self.line(channel)?.write_byte(byte)?;
        Ok(())
    }

    fn read_byte(&mut self, channel: usize) -> Result<u8, Error<W::Error>> {
        Ok(self.line(channel)?.read_byte()?)
    }
}

/// One line borrowed together with the shared delay
struct Line<'a, W, D> {
    io_wire: &'a mut W,
    delay: &'a mut D,
}

impl<W: IoWire, D: DelayNs> Line<'_, W, D> {
    /// Returns Err(WireFault) if the wire seems to be shortened,
    /// Err(NoPresence) if no device pulled the line low afterwards
    fn reset(&mut self) -> Result<(), Error<W::Error>> {
        self.io_wire.set_high()?;
        self.ensure_wire_high()?;

        self.io_wire.set_low()?;
        self.delay.delay_us(RESET_LOW_US);
        self.io_wire.set_high()?;

        let mut presence = false;
        for _ in 0..PRESENCE_SAMPLES {
            self.delay.delay_us(PRESENCE_SAMPLE_US);
            presence |= self.io_wire.is_low()?;
        }
        self.delay.delay_us(RESET_RECOVERY_US);
        if presence {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    fn ensure_wire_high(&mut self) -> Result<(), Error<W::Error>> {
        for _ in 0..WIRE_HIGH_POLLS {
            if self.io_wire.is_high()? {
                return Ok(());
            }
            self.delay.delay_us(WIRE_HIGH_POLL_US);
        }
        Err(Error::WireFault)
    }

    fn read_byte(&mut self) -> Result<u8, W::Error> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit()? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    fn read_bit(&mut self) -> Result<bool, W::Error> {
        self.io_wire.set_low()?;
        self.delay.delay_us(3);
        self.io_wire.set_high()?;
        self.delay.delay_us(2); // was 10
        let val = self.io_wire.is_high();
        self.delay.delay_us(61); // was 53
        val
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), W::Error> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit((byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    fn write_bit(&mut self, high: bool) -> Result<(), W::Error> {
        self.io_wire.set_low()?;
        self.delay.delay_us(if high { 10 } else { 65 });
        self.io_wire.set_high()?;
        self.delay.delay_us(if high { 55 } else { 5 });
        Ok(())
    }
}
