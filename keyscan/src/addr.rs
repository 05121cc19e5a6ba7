//! Matrix key addressing.
//!
//! A [`KeyAddr`] packs a (row, col) pair into a single byte offset in
//! row-major order. The matrix shape is part of the type, so addresses from
//! different devices cannot be mixed up, and the shape limits are checked
//! once, when the type is first used.

use core::fmt;

use crate::MAX_COLS;

/// A key position in a `ROWS` x `COLS` matrix.
///
/// The offset `ROWS * COLS` is reserved as the "no key" sentinel returned by
/// [`KeyAddr::none`]; every other offset below it is a valid key.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyAddr<const ROWS: usize, const COLS: usize> {
    offset: u8,
}

impl<const ROWS: usize, const COLS: usize> KeyAddr<ROWS, COLS> {
    /// Number of keys in the matrix, which is also the sentinel offset.
    pub const SIZE: u8 = {
        assert!(ROWS > 0, "matrix has no rows");
        assert!(COLS > 0, "matrix has no columns");
        assert!(COLS <= MAX_COLS, "too many columns for a row state");
        assert!(
            ROWS * COLS < u8::MAX as usize,
            "matrix does not fit in a byte-sized key address"
        );
        (ROWS * COLS) as u8
    };

    /// Address of `(row, col)`. Out-of-range coordinates give [`KeyAddr::none`].
    pub const fn new(row: u8, col: u8) -> Self {
        if (row as usize) < ROWS && (col as usize) < COLS {
            Self {
                offset: (row as usize * COLS + col as usize) as u8,
            }
        } else {
            Self::none()
        }
    }

    /// Address at a raw row-major offset. Offsets past the end give
    /// [`KeyAddr::none`].
    pub const fn from_offset(offset: u8) -> Self {
        if offset < Self::SIZE {
            Self { offset }
        } else {
            Self::none()
        }
    }

    /// The "no key" sentinel.
    pub const fn none() -> Self {
        Self { offset: Self::SIZE }
    }

    pub const fn offset(self) -> u8 {
        self.offset
    }

    pub const fn row(self) -> u8 {
        self.offset / COLS as u8
    }

    pub const fn col(self) -> u8 {
        self.offset % COLS as u8
    }

    pub const fn is_valid(self) -> bool {
        self.offset < Self::SIZE
    }

    /// Move by a row and column delta. Anything that leaves the matrix, or
    /// starts outside it, is [`KeyAddr::none`].
    pub fn shifted(self, d_row: i8, d_col: i8) -> Self {
        if !self.is_valid() {
            return Self::none();
        }
        let row = i16::from(self.row()) + i16::from(d_row);
        let col = i16::from(self.col()) + i16::from(d_col);
        match (u8::try_from(row), u8::try_from(col)) {
            (Ok(row), Ok(col)) => Self::new(row, col),
            _ => Self::none(),
        }
    }

    pub fn with_row(self, row: u8) -> Self {
        if !self.is_valid() {
            return self;
        }
        Self::new(row, self.col())
    }

    pub fn with_col(self, col: u8) -> Self {
        if !self.is_valid() {
            return self;
        }
        Self::new(self.row(), col)
    }

    /// The same (row, col) position in a matrix of another shape.
    pub fn convert<const R: usize, const C: usize>(self) -> KeyAddr<R, C> {
        if !self.is_valid() {
            return KeyAddr::none();
        }
        KeyAddr::new(self.row(), self.col())
    }

    /// Every valid address, in row-major order.
    pub const fn all() -> KeyAddrs<ROWS, COLS> {
        KeyAddrs { next: 0 }
    }
}

impl<const ROWS: usize, const COLS: usize> Default for KeyAddr<ROWS, COLS> {
    fn default() -> Self {
        Self::none()
    }
}

impl<const ROWS: usize, const COLS: usize> fmt::Debug for KeyAddr<ROWS, COLS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "KeyAddr({}, {})", self.row(), self.col())
        } else {
            write!(f, "KeyAddr(none)")
        }
    }
}

#[cfg(feature = "defmt")]
impl<const ROWS: usize, const COLS: usize> defmt::Format for KeyAddr<ROWS, COLS> {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_valid() {
            defmt::write!(fmt, "KeyAddr({}, {})", self.row(), self.col())
        } else {
            defmt::write!(fmt, "KeyAddr(none)")
        }
    }
}

/// Iterator over all valid addresses of a shape. Never yields the sentinel.
#[derive(Clone, Debug)]
pub struct KeyAddrs<const ROWS: usize, const COLS: usize> {
    next: u8,
}

impl<const ROWS: usize, const COLS: usize> Iterator for KeyAddrs<ROWS, COLS> {
    type Item = KeyAddr<ROWS, COLS>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next < KeyAddr::<ROWS, COLS>::SIZE {
            let addr = KeyAddr { offset: self.next };
            self.next += 1;
            Some(addr)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::from(KeyAddr::<ROWS, COLS>::SIZE.saturating_sub(self.next));
        (left, Some(left))
    }
}

impl<const ROWS: usize, const COLS: usize> ExactSizeIterator for KeyAddrs<ROWS, COLS> {}

#[cfg(test)]
mod tests {
    use super::*;

    type Addr = KeyAddr<4, 16>;

    #[test]
    fn test_row_col_round_trip() {
        for row in 0..4 {
            for col in 0..16 {
                let addr = Addr::from_offset(Addr::new(row, col).offset());
                assert!(addr.is_valid());
                assert_eq!(addr.row(), row);
                assert_eq!(addr.col(), col);
            }
        }
    }

    #[test]
    fn test_sentinel() {
        assert!(!Addr::none().is_valid());
        assert_eq!(Addr::none().offset(), 64);
        assert_eq!(Addr::default(), Addr::none());
        assert_eq!(Addr::new(4, 0), Addr::none());
        assert_eq!(Addr::new(0, 16), Addr::none());
        assert_eq!(Addr::from_offset(200), Addr::none());
    }

    #[test]
    fn test_enumeration_is_row_major() {
        let all: Vec<Addr> = Addr::all().collect();
        assert_eq!(all.len(), 64);
        assert!(all.iter().all(|a| a.is_valid()));
        assert!(!all.contains(&Addr::none()));
        assert_eq!(all[0], Addr::new(0, 0));
        assert_eq!(all[17], Addr::new(1, 1));
        assert!(all.windows(2).all(|w| w[0] < w[1]));

        // Restartable: a fresh iterator starts over.
        assert_eq!(Addr::all().next(), Some(Addr::new(0, 0)));
        assert_eq!(Addr::all().len(), 64);
    }

    #[test]
    fn test_shifted() {
        let a = Addr::new(1, 2);
        assert_eq!(a.shifted(1, 1), Addr::new(2, 3));
        assert_eq!(a.shifted(-1, -2), Addr::new(0, 0));
        assert_eq!(a.shifted(-2, 0), Addr::none());
        assert_eq!(a.shifted(0, 14), Addr::none());
        assert_eq!(Addr::none().shifted(0, 0), Addr::none());
    }

    #[test]
    fn test_with_row_col() {
        let a = Addr::new(1, 2);
        assert_eq!(a.with_row(3), Addr::new(3, 2));
        assert_eq!(a.with_col(15), Addr::new(1, 15));
        assert_eq!(a.with_row(9), Addr::none());
    }

    #[test]
    fn test_convert() {
        let a = KeyAddr::<14, 6>::new(9, 5);
        let b: KeyAddr<15, 16> = a.convert();
        assert_eq!((b.row(), b.col()), (9, 5));
        let c: KeyAddr<4, 4> = a.convert();
        assert_eq!(c, KeyAddr::none());
    }
}
