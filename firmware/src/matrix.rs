//! ErgoDox EZ matrix wiring.
//!
//! The matrix is 14 rows by 6 columns. Rows 0-6 are the left half, behind
//! the MCP23018 (GPIOA selects the row, GPIOB reads the columns). Rows 7-13
//! are the right half, wired straight to the Teensy: seven row outputs and
//! six column inputs on port F.

use keyscan::backend::{Composite, DirectMatrix, Mcp23018};
use keyscan::{FreezeAfterChange, KeyScanner, ScanConfig, ScanInterval};

use crate::gpio::{NopDelay, Output, Pin, Port, PullUpInput};
use crate::i2c::Twi;
use crate::timer::TimerClock;

pub const ROWS: usize = 14;
pub const COLS: usize = 6;

const HALF_ROWS: usize = 7;

const ROW_PINS: [Pin; HALF_ROWS] = [
    Pin::new(Port::B, 0),
    Pin::new(Port::B, 1),
    Pin::new(Port::B, 2),
    Pin::new(Port::B, 3),
    Pin::new(Port::D, 2),
    Pin::new(Port::D, 3),
    Pin::new(Port::C, 6),
];

const COL_PINS: [Pin; COLS] = [
    Pin::new(Port::F, 0),
    Pin::new(Port::F, 1),
    Pin::new(Port::F, 4),
    Pin::new(Port::F, 5),
    Pin::new(Port::F, 6),
    Pin::new(Port::F, 7),
];

pub const SCAN_CONFIG: ScanConfig = ScanConfig::DEFAULT;
pub const SCAN_INTERVAL: ScanInterval = SCAN_CONFIG.scan_interval();

pub type LeftHalf = Mcp23018<Twi, TimerClock, HALF_ROWS, COLS>;
pub type RightHalf = DirectMatrix<Output, PullUpInput, NopDelay, HALF_ROWS, COLS>;
pub type Scanner = KeyScanner<Composite<LeftHalf, RightHalf>, FreezeAfterChange, ROWS, COLS>;

/// Claim the right half's pins and put both halves behind one scanner.
pub fn scanner(twi: Twi) -> Scanner {
    let left = Mcp23018::new(twi, TimerClock);
    let right = DirectMatrix::new(
        ROW_PINS.map(Output::new),
        COL_PINS.map(PullUpInput::new),
        NopDelay,
    );
    KeyScanner::new(
        Composite::new(left, right),
        FreezeAfterChange::from_config(&SCAN_CONFIG),
    )
}
