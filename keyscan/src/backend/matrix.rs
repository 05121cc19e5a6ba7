//! Row-strobed GPIO matrix.
//!
//! Rows are outputs idling high; a row is selected by driving it low. The
//! columns are inputs with pull-ups, so a closed switch on the selected row
//! reads low.

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

use super::{infallible, Sample, ScanBackend};
use crate::{RowState, MAX_COLS};

/// Default time between selecting a row and sampling the columns.
pub const DEFAULT_SETTLE_US: u8 = 5;

pub struct DirectMatrix<O, I, D, const ROWS: usize, const COLS: usize> {
    rows: [O; ROWS],
    cols: [I; COLS],
    delay: D,
    settle_us: u8,
}

impl<O, I, D, const ROWS: usize, const COLS: usize> DirectMatrix<O, I, D, ROWS, COLS>
where
    O: OutputPin<Error = Infallible>,
    I: InputPin<Error = Infallible>,
    D: DelayUs<u8>,
{
    const SHAPE: () = {
        assert!(ROWS > 0, "matrix has no row pins");
        assert!(ROWS <= u8::MAX as usize, "too many row pins");
        assert!(COLS > 0, "matrix has no column pins");
        assert!(COLS <= MAX_COLS, "too many column pins for a row state");
    };

    pub fn new(rows: [O; ROWS], cols: [I; COLS], delay: D) -> Self {
        let () = Self::SHAPE;
        Self {
            rows,
            cols,
            delay,
            settle_us: DEFAULT_SETTLE_US,
        }
    }

    /// Change the settle delay. It cannot be zero: without it the columns are
    /// sampled before the selected row has pulled them down.
    pub fn with_settle_us(mut self, settle_us: u8) -> Self {
        self.settle_us = settle_us.max(1);
        self
    }

    pub fn strobe(&mut self, row: u8) {
        if let Some(pin) = self.rows.get_mut(usize::from(row)) {
            infallible(pin.set_low());
        }
    }

    pub fn unstrobe(&mut self, row: u8) {
        if let Some(pin) = self.rows.get_mut(usize::from(row)) {
            infallible(pin.set_high());
        }
    }

    /// Hand back the pins and delay.
    pub fn release(self) -> ([O; ROWS], [I; COLS], D) {
        (self.rows, self.cols, self.delay)
    }

    fn read_cols(&self) -> RowState {
        self.cols
            .iter()
            .enumerate()
            .filter(|(_, pin)| infallible(pin.is_low()))
            .fold(0, |bits, (col, _)| bits | (1 << col))
    }
}

impl<O, I, D, const ROWS: usize, const COLS: usize> ScanBackend
    for DirectMatrix<O, I, D, ROWS, COLS>
where
    O: OutputPin<Error = Infallible>,
    I: InputPin<Error = Infallible>,
    D: DelayUs<u8>,
{
    fn rows(&self) -> u8 {
        ROWS as u8
    }

    fn setup(&mut self) {
        for pin in self.rows.iter_mut() {
            infallible(pin.set_high());
        }
    }

    fn read_row(&mut self, row: u8) -> Sample {
        if usize::from(row) >= ROWS {
            return Sample::Stale;
        }
        self.strobe(row);
        self.delay.delay_us(self.settle_us);
        let bits = self.read_cols();
        self.unstrobe(row);
        Sample::Fresh(bits)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use std::rc::Rc;

    use super::*;

    /// The wiring: which (row, col) switches are closed, and which row is
    /// currently driven low.
    #[derive(Default)]
    struct Wiring {
        closed: Cell<[[bool; 3]; 2]>,
        selected: Cell<Option<usize>>,
        delays: Cell<u32>,
    }

    struct Row(Rc<Wiring>, usize);
    struct Col(Rc<Wiring>, usize);
    struct Delay(Rc<Wiring>);

    impl OutputPin for Row {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.selected.set(Some(self.1));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            if self.0.selected.get() == Some(self.1) {
                self.0.selected.set(None);
            }
            Ok(())
        }
    }

    impl InputPin for Col {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            self.is_low().map(|low| !low)
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            // Sampling before the settle delay reads a floating (high) line.
            if self.0.delays.get() == 0 {
                return Ok(false);
            }
            Ok(match self.0.selected.get() {
                Some(row) => self.0.closed.get()[row][self.1],
                None => false,
            })
        }
    }

    impl DelayUs<u8> for Delay {
        fn delay_us(&mut self, us: u8) {
            self.0.delays.set(self.0.delays.get() + u32::from(us));
        }
    }

    fn matrix(wiring: &Rc<Wiring>) -> DirectMatrix<Row, Col, Delay, 2, 3> {
        DirectMatrix::new(
            [Row(wiring.clone(), 0), Row(wiring.clone(), 1)],
            [
                Col(wiring.clone(), 0),
                Col(wiring.clone(), 1),
                Col(wiring.clone(), 2),
            ],
            Delay(wiring.clone()),
        )
    }

    #[test]
    fn test_reads_selected_row() {
        let wiring = Rc::new(Wiring::default());
        wiring.closed.set([[false, true, false], [true, false, true]]);
        let mut m = matrix(&wiring);
        m.setup();

        assert_eq!(m.rows(), 2);
        assert_eq!(m.read_row(0), Sample::Fresh(0b010));
        assert_eq!(m.read_row(1), Sample::Fresh(0b101));
        assert_eq!(wiring.selected.get(), None);
        assert_eq!(wiring.delays.get(), 2 * u32::from(DEFAULT_SETTLE_US));
    }

    #[test]
    fn test_settle_never_zero() {
        let wiring = Rc::new(Wiring::default());
        wiring.closed.set([[true, false, false], [false; 3]]);
        let mut m = matrix(&wiring).with_settle_us(0);
        assert_eq!(m.read_row(0), Sample::Fresh(0b001));
        assert_eq!(wiring.delays.get(), 1);
    }

    #[test]
    fn test_out_of_range_row() {
        let wiring = Rc::new(Wiring::default());
        let mut m = matrix(&wiring);
        assert_eq!(m.read_row(2), Sample::Stale);
    }
}
