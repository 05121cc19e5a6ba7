//! Sources of raw key samples.
//!
//! A [`ScanBackend`] knows how to read the electrical state of its rows and
//! nothing else: debouncing, reported state and dispatch all live in
//! [`KeyScanner`](crate::KeyScanner), so every backend feeds the same
//! pipeline.

use core::convert::Infallible;

use crate::RowState;

mod composite;
mod expander;
mod link;
mod matrix;
mod pins;
mod virtual_matrix;

pub use composite::Composite;
pub use expander::{Mcp23018, MCP23018_ADDR};
pub use link::{command, Satellite, REPLY_KEYDATA, SATELLITE_ADDR_BASE};
pub use matrix::DirectMatrix;
pub use pins::DirectPins;
pub use virtual_matrix::VirtualMatrix;

/// Outcome of reading one row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sample {
    /// A new raw reading. Bit `n` set means column `n` is closed.
    Fresh(RowState),
    /// Nothing new this cycle; keep the previous state of the row.
    Stale,
}

/// The hardware side of a key scanner.
pub trait ScanBackend {
    /// Number of rows (or pin groups) this backend reads.
    fn rows(&self) -> u8;

    /// Put the hardware into its idle scanning state. Called once, before
    /// the first scan.
    fn setup(&mut self) {}

    /// Called at the start of every scan pass, before any row is read.
    fn begin_scan(&mut self) {}

    /// Read the raw state of `row`. Must not block beyond a bounded bus
    /// transaction.
    fn read_row(&mut self, row: u8) -> Sample;
}

impl<B: ScanBackend + ?Sized> ScanBackend for &mut B {
    fn rows(&self) -> u8 {
        (**self).rows()
    }

    fn setup(&mut self) {
        (**self).setup()
    }

    fn begin_scan(&mut self) {
        (**self).begin_scan()
    }

    fn read_row(&mut self, row: u8) -> Sample {
        (**self).read_row(row)
    }
}

/// Unwrap the result of an operation that cannot fail.
pub(crate) fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => match e {},
    }
}
