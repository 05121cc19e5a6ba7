//! Key acquisition for switch-matrix keyboards.
//!
//! This crate turns raw electrical contact states into a temporally ordered
//! stream of keyswitch transitions addressed by matrix position. It is
//! `no_std` and allocation free so the same code runs on the AVR firmware and
//! in host-side tests and tools.
//!
//! The pipeline, leaf to root:
//! - [`KeyAddr`]: compact (row, col) address used everywhere else.
//! - [`debounce`]: the two debouncing policies.
//! - [`backend`]: the hardware (or simulated) sources of raw samples.
//! - [`KeyScanner`]: raw read, debounce and act-on-scan dispatch.
//! - [`ScanFlag`] / [`Device`]: the timer-driven scan schedule.
//! - [`KeyMask`]: per-key suppression bits shared by handlers.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod addr;
pub mod backend;
pub mod bus;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod mask;
pub mod scanner;
pub mod scheduler;

#[cfg(test)]
mod testlog;

pub use addr::{KeyAddr, KeyAddrs};
pub use backend::{Sample, ScanBackend};
pub use bus::{BusError, Clock, LinkHealth};
pub use config::{ConfigError, ScanConfig, ScanInterval};
pub use debounce::{Debouncer, EagerLockout, FreezeAfterChange};
pub use dispatch::{KeySwitchState, KeyswitchHandler};
pub use mask::KeyMask;
pub use scanner::KeyScanner;
pub use scheduler::{Device, ScanFlag};

/// One row (or one flat pin group) worth of key bits: bit `n` set means the
/// key in column `n` is closed.
pub type RowState = u16;

/// Widest row a [`RowState`] can hold.
pub const MAX_COLS: usize = RowState::BITS as usize;
