//! Simulated DS18B20 on a fake bus, and a fake tick scheduler.

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use ds18b20_scheduled::{
    ds18b20::{Ds18b20, Event},
    Address, Error, OneWire, Scheduler, Tick, TICK_INFINITY,
};
use embedded_hal::delay::DelayNs;

pub const INTERVAL: usize = 0;
pub const MEASURE: usize = 1;
pub const RESULT: usize = 2;

pub const ADDRESS: u64 = 0x3c00_0000_1f2e_8d28;

/// Scratchpad of a freshly powered device: 85 degC, 12 bit
pub const POWER_ON_SCRATCHPAD: [u8; 9] = [0x50, 0x05, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x1C];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    Scratchpad,
    PowerSupply,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Released,
    Rom,
    MatchRom { index: usize, matching: bool },
    Function,
    Reading { source: Source, index: usize },
    WritingScratchpad { index: usize },
}

/// One DS18B20 answering on channel 0
pub struct SimBus {
    pub address: Address,
    pub present: bool,
    pub parasite: bool,
    /// Temperature bytes latched into the scratchpad by the next conversion
    pub sample: [u8; 2],
    pub scratchpad: [u8; 9],
    pub eeprom: [u8; 3],
    pub conversions: usize,
    pub copies: usize,
    /// Every byte put on the wire, addressed to this device or not
    pub bytes_written: usize,
    state: State,
}

impl SimBus {
    pub fn new() -> Self {
        SimBus {
            address: Address::from(ADDRESS),
            present: true,
            parasite: false,
            sample: [POWER_ON_SCRATCHPAD[0], POWER_ON_SCRATCHPAD[1]],
            scratchpad: POWER_ON_SCRATCHPAD,
            eeprom: [0x4B, 0x46, 0x7F],
            conversions: 0,
            copies: 0,
            bytes_written: 0,
            state: State::Released,
        }
    }

    pub fn with_config(mut self, config: u8) -> Self {
        self.scratchpad[4] = config;
        self.eeprom[2] = config;
        self
    }

    pub fn with_sample(mut self, lsb: u8, msb: u8) -> Self {
        self.sample = [lsb, msb];
        self
    }

    pub fn parasite(mut self) -> Self {
        self.parasite = true;
        self
    }

    fn check(channel: usize) -> Result<(), Error<BusFault>> {
        if channel == 0 {
            Ok(())
        } else {
            Err(Error::InvalidChannel(channel))
        }
    }

    fn function(&mut self, byte: u8) -> State {
        match byte {
            0x44 => {
                self.conversions += 1;
                self.scratchpad[0] = self.sample[0];
                self.scratchpad[1] = self.sample[1];
                State::Released
            }
            0xBE => State::Reading {
                source: Source::Scratchpad,
                index: 0,
            },
            0xB4 => State::Reading {
                source: Source::PowerSupply,
                index: 0,
            },
            0x4E => State::WritingScratchpad { index: 0 },
            0x48 => {
                self.copies += 1;
                self.eeprom.copy_from_slice(&self.scratchpad[2..5]);
                State::Released
            }
            _ => State::Released,
        }
    }
}

impl OneWire for SimBus {
    type Error = BusFault;
    type Channel = usize;

    fn reset(&mut self, channel: usize) -> Result<(), Error<BusFault>> {
        Self::check(channel)?;
        if !self.present {
            self.state = State::Released;
            return Err(Error::NoPresence);
        }
        self.state = State::Rom;
        Ok(())
    }

    fn write_byte(&mut self, channel: usize, byte: u8) -> Result<(), Error<BusFault>> {
        Self::check(channel)?;
        self.bytes_written += 1;
        self.state = match self.state {
            State::Rom => match byte {
                0xCC => State::Function,
                0x55 => State::MatchRom {
                    index: 0,
                    matching: true,
                },
                _ => State::Released,
            },
            State::MatchRom { index, matching } => {
                let matching = matching && self.address[index] == byte;
                if index + 1 < Address::BYTES as usize {
                    State::MatchRom {
                        index: index + 1,
                        matching,
                    }
                } else if matching {
                    State::Function
                } else {
                    State::Released
                }
            }
            State::Function => self.function(byte),
            State::WritingScratchpad { index } => {
                self.scratchpad[2 + index] = byte;
                if index < 2 {
                    State::WritingScratchpad { index: index + 1 }
                } else {
                    State::Released
                }
            }
            _ => State::Released,
        };
        Ok(())
    }

    fn read_byte(&mut self, channel: usize) -> Result<u8, Error<BusFault>> {
        Self::check(channel)?;
        let byte = match self.state {
            State::Reading {
                source: Source::Scratchpad,
                index,
            } if index < self.scratchpad.len() => {
                self.state = State::Reading {
                    source: Source::Scratchpad,
                    index: index + 1,
                };
                self.scratchpad[index]
            }
            State::Reading {
                source: Source::PowerSupply,
                ..
            } => {
                if self.parasite {
                    0x00
                } else {
                    0xFF
                }
            }
            // released line reads as ones
            _ => 0xFF,
        };
        Ok(byte)
    }
}

/// Plans tasks on a tick counter that only moves when a test advances it
pub struct FakeScheduler {
    pub now: Tick,
    pub capacity: usize,
    planned: Vec<Tick>,
    current: Option<(usize, Tick)>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        FakeScheduler {
            now: 0,
            capacity: 16,
            planned: Vec::new(),
            current: None,
        }
    }

    pub fn planned(&self, task: usize) -> Tick {
        self.planned[task]
    }

    /// Takes the earliest task due at or before `until`, planning it at infinity
    pub fn begin(&mut self, until: Tick) -> Option<usize> {
        let (task, tick) = self
            .planned
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, tick)| *tick <= until)
            .min_by_key(|(_, tick)| *tick)?;
        self.now = self.now.max(tick);
        self.planned[task] = TICK_INFINITY;
        self.current = Some((task, tick));
        Some(task)
    }

    pub fn end(&mut self) {
        self.current = None;
    }
}

impl Scheduler for FakeScheduler {
    type TaskId = usize;

    fn register(&mut self, tick: Tick) -> Option<usize> {
        if self.planned.len() >= self.capacity {
            return None;
        }
        self.planned.push(tick);
        Some(self.planned.len() - 1)
    }

    fn arm_absolute(&mut self, task: usize, tick: Tick) {
        self.planned[task] = tick;
    }

    fn arm_relative(&mut self, task: usize, delay: Tick) {
        self.planned[task] = self.now.saturating_add(delay);
    }

    fn arm_now(&mut self, task: usize) {
        self.planned[task] = self.now;
    }

    fn arm_from_now(&mut self, task: usize, delay: Tick) {
        self.planned[task] = self.now.saturating_add(delay);
    }

    fn arm_current_relative(&mut self, delay: Tick) {
        if let Some((task, tick)) = self.current {
            self.planned[task] = tick.saturating_add(delay);
        }
    }
}

/// Sums every requested delay
#[derive(Default)]
pub struct TotalDelay {
    pub ns: u64,
}

impl DelayNs for TotalDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns += u64::from(ns);
    }
}

pub type Handler = Box<dyn FnMut(Event<BusFault>)>;

pub type Thermometer = Ds18b20<SimBus, FakeScheduler, Handler>;

pub struct Rig {
    pub bus: SimBus,
    pub scheduler: FakeScheduler,
    pub thermometer: Thermometer,
    events: Rc<RefCell<Vec<Event<BusFault>>>>,
}

impl Rig {
    pub fn new(bus: SimBus) -> Self {
        Self::at(bus, Address::from(ADDRESS))
    }

    pub fn at(mut bus: SimBus, address: Address) -> Self {
        let mut scheduler = FakeScheduler::new();
        let mut thermometer = Thermometer::new(&mut bus, &mut scheduler, 0, address)
            .expect("thermometer initialization");

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        thermometer.set_event_handler(Box::new(move |event| sink.borrow_mut().push(event)));

        Rig {
            bus,
            scheduler,
            thermometer,
            events,
        }
    }

    /// Runs every task due up to and including `until`
    pub fn run_until(&mut self, until: Tick) {
        while let Some(task) = self.scheduler.begin(until) {
            assert!(self
                .thermometer
                .run(task, &mut self.bus, &mut self.scheduler));
            self.scheduler.end();
        }
        self.scheduler.now = until;
    }

    pub fn measure(&mut self) -> bool {
        self.thermometer.measure(&mut self.scheduler)
    }

    pub fn set_update_interval(&mut self, interval: Tick) {
        self.thermometer
            .set_update_interval(&mut self.scheduler, interval);
    }

    pub fn events(&self) -> Vec<Event<BusFault>> {
        self.events.borrow().clone()
    }

    pub fn updates(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Update(_)))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Error(_)))
            .count()
    }
}
