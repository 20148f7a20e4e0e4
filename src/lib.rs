//! A CHIP-8 virtual machine.
//!
//! The core is host-agnostic: the host schedules [`Emulator::execute`] at the
//! instruction clock of its choice and [`Emulator::decrease_timers`] at 60 Hz,
//! feeds key state through [`Emulator::set_key`] and reads the framebuffer back
//! through [`Emulator::display`].

pub mod display;
pub mod emulator;
pub mod quirks;
pub mod random;

pub use display::{Framebuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use emulator::{Emulator, Error, MAX_ROM_SIZE};
pub use quirks::Quirks;
pub use random::ByteSource;
