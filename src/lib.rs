#![no_std]
#![doc = include_str!("../README.md")]

mod address;
mod bus;
mod command;
mod driver;
#[cfg(feature = "ds18b20")]
pub mod ds18b20;
mod iowire;
mod result;
pub mod scheduler;

pub use address::{Address, AddressError};
pub use bus::OneWire;
pub use command::{Command, OpCode};
pub use driver::Driver;
pub use iowire::IoWire;
pub use result::{Error, InitStage};
pub use scheduler::{Scheduler, Tick, TICK_INFINITY};
