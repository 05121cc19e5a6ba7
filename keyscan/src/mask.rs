//! Per-key suppression bits.
//!
//! Handlers mask a key to tell later handlers to ignore it until it is
//! unmasked again. The scanner never sets or clears a mask on its own.

use crate::{KeyAddr, RowState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMask<const ROWS: usize, const COLS: usize> {
    rows: [RowState; ROWS],
}

impl<const ROWS: usize, const COLS: usize> KeyMask<ROWS, COLS> {
    pub const fn new() -> Self {
        Self { rows: [0; ROWS] }
    }

    /// No-op for an invalid address.
    pub fn mask(&mut self, addr: KeyAddr<ROWS, COLS>) {
        if addr.is_valid() {
            self.rows[usize::from(addr.row())] |= 1 << addr.col();
        }
    }

    /// No-op for an invalid address.
    pub fn unmask(&mut self, addr: KeyAddr<ROWS, COLS>) {
        if addr.is_valid() {
            self.rows[usize::from(addr.row())] &= !(1 << addr.col());
        }
    }

    /// Always false for an invalid address.
    pub fn is_masked(&self, addr: KeyAddr<ROWS, COLS>) -> bool {
        addr.is_valid() && self.rows[usize::from(addr.row())] & (1 << addr.col()) != 0
    }

    pub fn clear(&mut self) {
        self.rows = [0; ROWS];
    }

    pub fn masked_count(&self) -> u8 {
        self.rows.iter().map(|r| r.count_ones() as u8).sum()
    }
}

impl<const ROWS: usize, const COLS: usize> Default for KeyMask<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Addr = KeyAddr<4, 12>;

    #[test]
    fn test_mask_unmask() {
        let mut masks = KeyMask::<4, 12>::new();
        let a = Addr::new(3, 11);
        assert!(!masks.is_masked(a));
        masks.mask(a);
        masks.mask(a);
        assert!(masks.is_masked(a));
        assert!(!masks.is_masked(Addr::new(3, 10)));
        assert_eq!(masks.masked_count(), 1);
        masks.unmask(a);
        assert!(!masks.is_masked(a));
    }

    #[test]
    fn test_invalid_address() {
        let mut masks = KeyMask::<4, 12>::new();
        masks.mask(Addr::none());
        assert_eq!(masks, KeyMask::new());
        assert!(!masks.is_masked(Addr::none()));
        masks.unmask(Addr::none());
    }

    #[test]
    fn test_clear() {
        let mut masks = KeyMask::<4, 12>::new();
        for addr in Addr::all().step_by(5) {
            masks.mask(addr);
        }
        assert_eq!(masks.masked_count(), 10);
        masks.clear();
        assert_eq!(masks.masked_count(), 0);
    }
}
