//! Per-row debouncing.
//!
//! A [`Debouncer`] holds the history of one row (or one flat pin group) and
//! folds each new raw sample into the reported state. Both policies work on
//! whole rows with bit operations, never allocate and never block.
//!
//! - [`FreezeAfterChange`]: once a key's reported state changes it is frozen
//!   for a fixed number of scans. Used by the strobed GPIO matrix and the
//!   bus expander.
//! - [`EagerLockout`]: the first raw change is reported on the same scan, then
//!   the key is locked against further flips for three scans. Used by direct
//!   pins and newer matrices.

use crate::{RowState, ScanConfig, MAX_COLS};

/// History for one row of keys.
pub trait Debouncer: Copy {
    /// Fold one raw sample into the history. `reported` is the row state as
    /// last reported; the return value is the new reported state.
    fn debounce(&mut self, sample: RowState, reported: RowState) -> RowState;
}

/// Hard refractory period after every reported change.
#[derive(Copy, Clone, Debug)]
pub struct FreezeAfterChange {
    window: u8,
    countdown: [u8; MAX_COLS],
}

impl FreezeAfterChange {
    /// `window` is the number of scans a key stays frozen after it changes.
    pub const fn new(window: u8) -> Self {
        Self {
            window,
            countdown: [0; MAX_COLS],
        }
    }

    pub const fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.debounce_window())
    }

    pub fn is_frozen(&self, col: usize) -> bool {
        self.countdown.get(col).is_some_and(|&c| c > 0)
    }

    /// Bits of the keys allowed to take a fresh sample this scan. Keys still
    /// frozen count down by one.
    fn accept_mask(&mut self) -> RowState {
        let mut accept = 0;
        for (col, countdown) in self.countdown.iter_mut().enumerate() {
            if *countdown > 0 {
                *countdown -= 1;
            } else {
                accept |= 1 << col;
            }
        }
        accept
    }
}

impl Default for FreezeAfterChange {
    fn default() -> Self {
        Self::from_config(&ScanConfig::DEFAULT)
    }
}

impl Debouncer for FreezeAfterChange {
    fn debounce(&mut self, sample: RowState, reported: RowState) -> RowState {
        let accept = self.accept_mask();
        let state = (sample & accept) | (reported & !accept);

        let changes = state ^ reported;
        for (col, countdown) in self.countdown.iter_mut().enumerate() {
            if changes & (1 << col) != 0 {
                *countdown = self.window;
            }
        }
        state
    }
}

/// Report immediately, then lock out.
///
/// Each key carries a two bit counter split across `db0` and `db1`. A key is
/// unstable while its counter is non-zero; a raw change restarts the counter
/// at one and every unstable key advances by one per scan, so the lockout
/// lasts until the counter wraps back to zero.
#[derive(Copy, Clone, Debug, Default)]
pub struct EagerLockout {
    db0: RowState,
    db1: RowState,
    raw: RowState,
}

impl EagerLockout {
    pub const fn new() -> Self {
        Self {
            db0: 0,
            db1: 0,
            raw: 0,
        }
    }

    /// Keys currently locked out.
    pub fn unstable(&self) -> RowState {
        self.db0 | self.db1
    }
}

impl Debouncer for EagerLockout {
    fn debounce(&mut self, sample: RowState, reported: RowState) -> RowState {
        let unstable = self.unstable();
        let delta = (sample ^ reported) & !unstable;

        let changed = sample ^ self.raw;
        self.raw = sample;

        let db1 = (self.db1 ^ self.db0) & unstable;
        let db0 = !self.db0 & unstable;
        self.db0 = db0 | changed;
        self.db1 = db1 & !changed;

        reported ^ delta
    }
}
