//! Two backends stacked into one row space.
//!
//! Rows `0..row_offset` belong to the first backend and rows from
//! `row_offset` on to the second, renumbered from zero. This is how a split
//! keyboard with one half on GPIO and the other behind an expander or a
//! satellite presents a single matrix to the scanner.

use super::{Sample, ScanBackend};

pub struct Composite<A, B> {
    first: A,
    second: B,
    row_offset: u8,
}

impl<A: ScanBackend, B: ScanBackend> Composite<A, B> {
    pub fn new(first: A, second: B) -> Self {
        let row_offset = first.rows();
        Self {
            first,
            second,
            row_offset,
        }
    }

    /// Start the second backend at `row_offset`, leaving a gap of rows that
    /// never report anything. The offset is never below the first backend's
    /// row count.
    pub fn with_row_offset(first: A, second: B, row_offset: u8) -> Self {
        let row_offset = row_offset.max(first.rows());
        Self {
            first,
            second,
            row_offset,
        }
    }

    pub fn row_offset(&self) -> u8 {
        self.row_offset
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: ScanBackend, B: ScanBackend> ScanBackend for Composite<A, B> {
    fn rows(&self) -> u8 {
        self.row_offset.saturating_add(self.second.rows())
    }

    fn setup(&mut self) {
        self.first.setup();
        self.second.setup();
    }

    fn begin_scan(&mut self) {
        self.first.begin_scan();
        self.second.begin_scan();
    }

    fn read_row(&mut self, row: u8) -> Sample {
        if row < self.first.rows() {
            self.first.read_row(row)
        } else if row >= self.row_offset {
            self.second.read_row(row - self.row_offset)
        } else {
            Sample::Stale
        }
    }
}
