//! A matrix held in memory.
//!
//! Used by the host tools to replay recorded scans, and by tests.

use super::{Sample, ScanBackend};
use crate::{KeyAddr, RowState, MAX_COLS};

#[derive(Clone, Debug)]
pub struct VirtualMatrix<const ROWS: usize, const COLS: usize> {
    closed: [RowState; ROWS],
    stale: [bool; ROWS],
    reads: usize,
}

impl<const ROWS: usize, const COLS: usize> VirtualMatrix<ROWS, COLS> {
    const SHAPE: () = {
        assert!(ROWS > 0 && ROWS <= u8::MAX as usize);
        assert!(COLS > 0 && COLS <= MAX_COLS);
    };

    pub fn new() -> Self {
        let () = Self::SHAPE;
        Self {
            closed: [0; ROWS],
            stale: [false; ROWS],
            reads: 0,
        }
    }

    pub fn press(&mut self, addr: KeyAddr<ROWS, COLS>) {
        self.set_pressed(addr, true);
    }

    pub fn release(&mut self, addr: KeyAddr<ROWS, COLS>) {
        self.set_pressed(addr, false);
    }

    /// Invalid addresses are ignored.
    pub fn set_pressed(&mut self, addr: KeyAddr<ROWS, COLS>, pressed: bool) {
        if !addr.is_valid() {
            return;
        }
        let row = &mut self.closed[usize::from(addr.row())];
        let bit = 1 << addr.col();
        if pressed {
            *row |= bit;
        } else {
            *row &= !bit;
        }
    }

    pub fn is_pressed(&self, addr: KeyAddr<ROWS, COLS>) -> bool {
        addr.is_valid() && self.closed[usize::from(addr.row())] & (1 << addr.col()) != 0
    }

    /// Replace a whole row. Bits past `COLS` are dropped.
    pub fn set_row(&mut self, row: u8, bits: RowState) {
        if let Some(r) = self.closed.get_mut(usize::from(row)) {
            *r = bits & Self::col_mask();
        }
    }

    pub fn row(&self, row: u8) -> RowState {
        self.closed.get(usize::from(row)).copied().unwrap_or(0)
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.closed = [0; ROWS];
    }

    /// Make `row` report no new data, as a backend with a dead link would.
    pub fn set_stale(&mut self, row: u8, stale: bool) {
        if let Some(s) = self.stale.get_mut(usize::from(row)) {
            *s = stale;
        }
    }

    /// Number of in-range row reads so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    fn col_mask() -> RowState {
        RowState::MAX >> (MAX_COLS - COLS)
    }
}

impl<const ROWS: usize, const COLS: usize> Default for VirtualMatrix<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROWS: usize, const COLS: usize> ScanBackend for VirtualMatrix<ROWS, COLS> {
    fn rows(&self) -> u8 {
        ROWS as u8
    }

    fn read_row(&mut self, row: u8) -> Sample {
        let row = usize::from(row);
        if row >= ROWS {
            return Sample::Stale;
        }
        self.reads += 1;
        if self.stale[row] {
            Sample::Stale
        } else {
            Sample::Fresh(self.closed[row])
        }
    }
}
