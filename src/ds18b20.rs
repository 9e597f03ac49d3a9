//! DS18B20 thermometer driven by a cooperative tick scheduler
//!
//! A measurement never blocks: [`Ds18b20::measure`] plans the *measure* task,
//! which starts a conversion and plans the *result* task after the worst-case
//! conversion time of the configured resolution. The *result* task reads the
//! scratchpad back and reports an [`Event`] to the registered handler. With an
//! update interval set, the *interval* task repeats this on a fixed period.
//!
//! Parasite powered devices are detected, but no strong pull-up is driven
//! during conversion; they need a transport that keeps the line powered.

mod scratchpad;

pub use scratchpad::{conversion_time, Command, Resolution, Scratchpad, Temperature};

use crate::{Address, Error, InitStage, OneWire, OpCode, Scheduler, Tick, TICK_INFINITY};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Family code of the DS18B20 in the first ROM byte
pub const FAMILY_CODE: u8 = 0x28;

/// EEPROM copy time after copy scratchpad
const COPY_SETTLE_MS: u32 = 20;
/// Extra EEPROM copy time when the device draws power from the line
const PARASITE_SETTLE_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerSupply {
    External,
    Parasite,
}

/// Where a handle is in its measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    Idle,
    /// Measure task armed, conversion not started yet
    Measuring,
    /// Conversion running, result task armed
    AwaitingResult,
}

/// Outcome of a measurement cycle, passed to the event handler
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<E: Debug> {
    Update(Temperature),
    Error(Error<E>),
}

#[derive(Debug, Clone, Copy)]
struct Tasks<T> {
    interval: T,
    measure: T,
    result: T,
}

/// One DS18B20 on a shared line
///
/// The handle holds no bus or scheduler; both are lent to each call. Whoever
/// runs the scheduler passes due task ids to [`Ds18b20::run`].
pub struct Ds18b20<B: OneWire, S: Scheduler, H> {
    address: Address,
    channel: B::Channel,
    tasks: Tasks<S::TaskId>,
    handler: Option<H>,
    phase: Phase,
    update_interval: Tick,
    power_supply: PowerSupply,
    resolution: Option<Resolution>,
    temperature: Option<Temperature>,
}

impl<B, S, H> Ds18b20<B, S, H>
where
    B: OneWire,
    S: Scheduler,
    H: FnMut(Event<B::Error>),
{
    /// Registers the driver tasks and queries the device
    ///
    /// Detects the power supply mode and reads the configured resolution,
    /// either failing aborts with [`Error::Initialization`]. No measurement is
    /// planned until [`Self::set_update_interval`] or [`Self::measure`].
    pub fn new(
        bus: &mut B,
        scheduler: &mut S,
        channel: B::Channel,
        address: Address,
    ) -> Result<Self, Error<B::Error>> {
        bus.init(channel)?;

        let mut register = || {
            scheduler
                .register(TICK_INFINITY)
                .ok_or(Error::<B::Error>::Initialization(InitStage::TaskRegistration))
        };
        let tasks = Tasks {
            interval: register()?,
            measure: register()?,
            result: register()?,
        };

        let mut thermometer = Ds18b20 {
            address,
            channel,
            tasks,
            handler: None,
            phase: Phase::Idle,
            update_interval: TICK_INFINITY,
            power_supply: PowerSupply::External,
            resolution: None,
            temperature: None,
        };

        thermometer.power_supply = thermometer.read_power_supply(bus).map_err(|_error| {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "ds18b20 {}: power supply query failed: {}",
                address,
                defmt::Debug2Format(&_error)
            );
            Error::<B::Error>::Initialization(InitStage::ParasiteDetection)
        })?;

        let resolution = thermometer.read_resolution(bus).map_err(|_error| {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "ds18b20 {}: resolution read failed: {}",
                address,
                defmt::Debug2Format(&_error)
            );
            Error::<B::Error>::Initialization(InitStage::ResolutionRead)
        })?;
        thermometer.resolution = Some(resolution);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ds18b20 {}: {} powered, {} bit",
            address,
            thermometer.power_supply,
            resolution.bits()
        );

        Ok(thermometer)
    }

    pub fn set_event_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    pub fn clear_event_handler(&mut self) {
        self.handler = None;
    }

    /// Measures every `interval` ticks, starting right away
    ///
    /// [`TICK_INFINITY`] stops automatic measurements; a conversion already
    /// running still completes.
    pub fn set_update_interval(&mut self, scheduler: &mut S, interval: Tick) {
        self.update_interval = interval;

        if interval == TICK_INFINITY {
            scheduler.arm_absolute(self.tasks.interval, TICK_INFINITY);
        } else {
            scheduler.arm_relative(self.tasks.interval, interval);
            self.measure(scheduler);
        }
    }

    /// Starts a measurement cycle
    ///
    /// Returns `false` if a cycle is already in progress.
    pub fn measure(&mut self, scheduler: &mut S) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }

        self.phase = Phase::Measuring;
        scheduler.arm_now(self.tasks.measure);

        true
    }

    /// Runs the task `task` if it belongs to this handle
    ///
    /// Returns `false` for foreign task ids.
    pub fn run(&mut self, task: S::TaskId, bus: &mut B, scheduler: &mut S) -> bool {
        if task == self.tasks.interval {
            self.task_interval(scheduler);
        } else if task == self.tasks.measure {
            self.task_measure(bus, scheduler);
        } else if task == self.tasks.result {
            self.task_result(bus);
        } else {
            return false;
        }
        true
    }

    /// Changes the resolution and persists it in the device EEPROM
    ///
    /// Blocks for the EEPROM copy, 20 ms or 30 ms on parasite power. The
    /// cached resolution only changes once the write went through.
    pub fn set_resolution(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        resolution: Resolution,
    ) -> Result<(), Error<B::Error>> {
        if self.resolution == Some(resolution) {
            return Ok(());
        }

        let mut scratchpad = self.read_scratchpad(bus)?;
        scratchpad.set_config(resolution.config());
        self.write_scratchpad(bus, delay, &scratchpad)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ds18b20 {}: resolution set to {} bit",
            self.address,
            resolution.bits()
        );

        self.resolution = Some(resolution);
        Ok(())
    }

    fn task_interval(&mut self, scheduler: &mut S) {
        if self.update_interval == TICK_INFINITY {
            return;
        }

        self.measure(scheduler);

        scheduler.arm_current_relative(self.update_interval);
    }

    fn task_measure(&mut self, bus: &mut B, scheduler: &mut S) {
        if self.phase != Phase::Measuring {
            return;
        }

        if let Err(error) = self.start_conversion(bus) {
            self.fail(error);
            return;
        }

        let wait = conversion_time(self.resolution);
        scheduler.arm_from_now(self.tasks.result, wait);
        self.phase = Phase::AwaitingResult;

        #[cfg(feature = "defmt")]
        defmt::trace!("ds18b20 {}: conversion started, result in {}", self.address, wait);
    }

    fn task_result(&mut self, bus: &mut B) {
        if self.phase != Phase::AwaitingResult {
            return;
        }

        match self.read_temperature(bus) {
            Ok(temperature) => {
                self.temperature = Some(temperature);
                self.phase = Phase::Idle;

                #[cfg(feature = "defmt")]
                defmt::trace!("ds18b20 {}: raw sample {}", self.address, temperature.raw());

                self.emit(Event::Update(temperature));
            }
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: Error<B::Error>) {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "ds18b20 {}: measurement failed: {}",
            self.address,
            defmt::Debug2Format(&error)
        );

        self.temperature = None;
        self.phase = Phase::Idle;
        self.emit(Event::Error(error));
    }

    fn emit(&mut self, event: Event<B::Error>) {
        if let Some(handler) = self.handler.as_mut() {
            handler(event);
        }
    }
}

impl<B: OneWire, S: Scheduler, H> Ds18b20<B, S, H> {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn channel(&self) -> B::Channel {
        self.channel
    }

    pub fn power_supply(&self) -> PowerSupply {
        self.power_supply
    }

    /// Period of automatic measurements, [`TICK_INFINITY`] when disabled
    pub fn update_interval(&self) -> Tick {
        self.update_interval
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_measuring(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Last sample, if the last measurement succeeded
    pub fn temperature(&self) -> Option<Temperature> {
        self.temperature
    }

    pub fn temperature_celsius(&self) -> Option<f32> {
        self.temperature.map(|t| t.celsius())
    }

    pub fn owns(&self, task: S::TaskId) -> bool {
        task == self.tasks.interval || task == self.tasks.measure || task == self.tasks.result
    }

    fn start_conversion(&self, bus: &mut B) -> Result<(), Error<B::Error>> {
        bus.reset_select_write_only(self.channel, &self.address, &[Command::Convert.op_code()])
    }

    fn read_temperature(&self, bus: &mut B) -> Result<Temperature, Error<B::Error>> {
        let temperature = self.read_scratchpad(bus)?.temperature();
        if temperature.is_valid() {
            Ok(temperature)
        } else {
            Err(Error::InvalidSample(temperature.raw()))
        }
    }

    fn read_power_supply(&self, bus: &mut B) -> Result<PowerSupply, Error<B::Error>> {
        let mut supply = [0u8];
        bus.reset_select_write_read(
            self.channel,
            &self.address,
            &[Command::ReadPowerSupply.op_code()],
            &mut supply,
        )?;
        // parasite powered devices hold the line low
        Ok(if supply[0] == 0 {
            PowerSupply::Parasite
        } else {
            PowerSupply::External
        })
    }

    fn read_resolution(&self, bus: &mut B) -> Result<Resolution, Error<B::Error>> {
        Resolution::from_config(self.read_scratchpad(bus)?.config())
    }

    fn read_scratchpad(&self, bus: &mut B) -> Result<Scratchpad, Error<B::Error>> {
        let mut scratchpad = Scratchpad::default();
        bus.reset_select_write_read(
            self.channel,
            &self.address,
            &[Command::ReadScratchpad.op_code()],
            scratchpad.as_bytes_mut(),
        )
        .map_err(|error| match error {
            Error::NoPresence => Error::ScratchpadRead,
            other => other,
        })?;
        Ok(scratchpad)
    }

    fn write_scratchpad(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        scratchpad: &Scratchpad,
    ) -> Result<(), Error<B::Error>> {
        let [alarm_high, alarm_low, config] = scratchpad.writable();
        bus.reset_select_write_only(
            self.channel,
            &self.address,
            &[
                Command::WriteScratchpad.op_code(),
                alarm_high,
                alarm_low,
                config,
            ],
        )?;
        bus.reset_select_write_only(
            self.channel,
            &self.address,
            &[Command::CopyScratchpad.op_code()],
        )?;

        delay.delay_ms(COPY_SETTLE_MS);
        if self.power_supply == PowerSupply::Parasite {
            delay.delay_ms(PARASITE_SETTLE_MS);
        }
        Ok(())
    }
}
