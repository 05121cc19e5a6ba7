//! One switch per pin, no strobing.
//!
//! For devices with only a handful of keys. All `N` pins form a single
//! logical row of `N` columns; each pin has a pull-up and reads low while its
//! switch is closed.

use core::convert::Infallible;

use embedded_hal::digital::v2::InputPin;

use super::{infallible, Sample, ScanBackend};
use crate::{RowState, MAX_COLS};

pub struct DirectPins<I, const N: usize> {
    pins: [I; N],
}

impl<I, const N: usize> DirectPins<I, N>
where
    I: InputPin<Error = Infallible>,
{
    const SHAPE: () = {
        assert!(N > 0, "empty direct pin list");
        assert!(N <= MAX_COLS, "too many direct pins for a pin state");
    };

    pub fn new(pins: [I; N]) -> Self {
        let () = Self::SHAPE;
        Self { pins }
    }

    pub fn release(self) -> [I; N] {
        self.pins
    }

    fn read_pins(&self) -> RowState {
        let mut hot = 0;
        for (i, pin) in self.pins.iter().enumerate() {
            if infallible(pin.is_low()) {
                hot |= 1 << i;
            }
        }
        hot
    }
}

impl<I, const N: usize> ScanBackend for DirectPins<I, N>
where
    I: InputPin<Error = Infallible>,
{
    fn rows(&self) -> u8 {
        1
    }

    fn read_row(&mut self, row: u8) -> Sample {
        match row {
            0 => Sample::Fresh(self.read_pins()),
            _ => Sample::Stale,
        }
    }
}
