//! Raw reads, debouncing and dispatch for one backend.
//!
//! A [`KeyScanner`] keeps two snapshots of the reported matrix. `current` is
//! rewritten by every [`read_matrix`](KeyScanner::read_matrix) pass;
//! `previous` catches up with it row by row during
//! [`act_on_matrix_scan`](KeyScanner::act_on_matrix_scan), after that row's
//! events have been handed out. Dispatching twice without a read in between
//! therefore never reports an edge.

use crate::{
    Debouncer, KeyAddr, KeyMask, KeySwitchState, KeyswitchHandler, RowState, Sample, ScanBackend,
    MAX_COLS,
};

pub struct KeyScanner<B, D, const ROWS: usize, const COLS: usize> {
    backend: B,
    debouncers: [D; ROWS],
    previous: [RowState; ROWS],
    current: [RowState; ROWS],
}

impl<B, D, const ROWS: usize, const COLS: usize> KeyScanner<B, D, ROWS, COLS>
where
    B: ScanBackend,
    D: Debouncer,
{
    /// Columns this scanner addresses; wider backend rows are cut down to it.
    const COL_MASK: RowState = RowState::MAX >> (MAX_COLS - COLS);

    /// Every row starts from a copy of `debouncer`.
    ///
    /// Rows past the backend's own row count are never read and stay
    /// released.
    pub fn new(backend: B, debouncer: D) -> Self {
        let _ = KeyAddr::<ROWS, COLS>::SIZE;
        Self {
            backend,
            debouncers: [debouncer; ROWS],
            previous: [0; ROWS],
            current: [0; ROWS],
        }
    }

    pub fn setup(&mut self) {
        self.backend.setup();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn scanned_rows(&self) -> usize {
        usize::from(self.backend.rows()).min(ROWS)
    }

    /// One acquisition pass: read every row, then debounce the fresh ones
    /// into `current`. Stale rows keep their reported state and their
    /// debounce history untouched.
    pub fn read_matrix(&mut self) {
        let rows = self.scanned_rows();
        let mut samples = [Sample::Stale; ROWS];

        self.backend.begin_scan();
        for (row, sample) in samples.iter_mut().enumerate().take(rows) {
            *sample = self.backend.read_row(row as u8);
        }

        for (row, sample) in samples.into_iter().enumerate() {
            if let Sample::Fresh(bits) = sample {
                let bits = bits & Self::COL_MASK;
                self.current[row] = self.debouncers[row].debounce(bits, self.current[row]);
            }
        }
    }

    /// Hand every key that is down now, or was down at the previous pass,
    /// to `handler` in row-major order.
    pub fn act_on_matrix_scan<H>(&mut self, masks: &mut KeyMask<ROWS, COLS>, handler: &mut H)
    where
        H: KeyswitchHandler<ROWS, COLS> + ?Sized,
    {
        for row in 0..ROWS {
            let was = self.previous[row];
            let is = self.current[row];
            let relevant = was | is;
            if relevant != 0 {
                for col in 0..COLS {
                    let bit = 1 << col;
                    if relevant & bit == 0 {
                        continue;
                    }
                    let state = KeySwitchState::new(was & bit != 0, is & bit != 0);
                    let addr = KeyAddr::new(row as u8, col as u8);
                    handler.handle_keyswitch_event(addr, state, masks);
                }
            }
            self.previous[row] = is;
        }
    }

    pub fn pressed_keyswitch_count(&self) -> u8 {
        count(&self.current)
    }

    pub fn previous_pressed_keyswitch_count(&self) -> u8 {
        count(&self.previous)
    }

    pub fn is_keyswitch_pressed(&self, addr: KeyAddr<ROWS, COLS>) -> bool {
        is_set(&self.current, addr)
    }

    pub fn was_keyswitch_pressed(&self, addr: KeyAddr<ROWS, COLS>) -> bool {
        is_set(&self.previous, addr)
    }

    /// Reported state of one row as of the last read pass.
    pub fn row_state(&self, row: u8) -> RowState {
        self.current.get(usize::from(row)).copied().unwrap_or(0)
    }
}

fn count(rows: &[RowState]) -> u8 {
    rows.iter().map(|r| r.count_ones() as u8).sum()
}

fn is_set<const ROWS: usize, const COLS: usize>(
    rows: &[RowState; ROWS],
    addr: KeyAddr<ROWS, COLS>,
) -> bool {
    addr.is_valid() && rows[usize::from(addr.row())] & (1 << addr.col()) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VirtualMatrix;
    use crate::{EagerLockout, FreezeAfterChange};

    type Addr = KeyAddr<2, 4>;
    type Events = Vec<(Addr, KeySwitchState)>;

    fn collect(scanner: &mut KeyScanner<VirtualMatrix<2, 4>, FreezeAfterChange, 2, 4>) -> Events {
        let mut events = Vec::new();
        let mut masks = KeyMask::new();
        scanner.act_on_matrix_scan(
            &mut masks,
            &mut |addr: Addr, state: KeySwitchState, _: &mut KeyMask<2, 4>| {
                events.push((addr, state))
            },
        );
        events
    }

    #[test]
    fn test_press_hold_release() {
        let mut scanner = KeyScanner::new(VirtualMatrix::<2, 4>::new(), FreezeAfterChange::new(0));
        let k = Addr::new(1, 2);

        scanner.backend_mut().press(k);
        scanner.read_matrix();
        assert!(scanner.is_keyswitch_pressed(k));
        assert!(!scanner.was_keyswitch_pressed(k));
        assert_eq!(collect(&mut scanner), vec![(k, KeySwitchState::IS_PRESSED)]);
        assert!(scanner.was_keyswitch_pressed(k));

        scanner.read_matrix();
        assert_eq!(collect(&mut scanner), vec![(k, KeySwitchState::all())]);

        scanner.backend_mut().release(k);
        scanner.read_matrix();
        assert_eq!(collect(&mut scanner), vec![(k, KeySwitchState::WAS_PRESSED)]);

        scanner.read_matrix();
        assert!(collect(&mut scanner).is_empty());
    }

    #[test]
    fn test_row_major_order() {
        let mut scanner = KeyScanner::new(VirtualMatrix::<2, 4>::new(), FreezeAfterChange::new(0));
        for addr in [Addr::new(1, 0), Addr::new(0, 3), Addr::new(0, 1)] {
            scanner.backend_mut().press(addr);
        }
        scanner.read_matrix();
        let order: Vec<u8> = collect(&mut scanner).iter().map(|(a, _)| a.offset()).collect();
        assert_eq!(order, vec![1, 3, 4]);
        assert_eq!(scanner.pressed_keyswitch_count(), 3);
        assert_eq!(scanner.previous_pressed_keyswitch_count(), 3);
    }

    #[test]
    fn test_dispatch_is_idempotent() {
        let mut scanner = KeyScanner::new(VirtualMatrix::<2, 4>::new(), FreezeAfterChange::new(0));
        scanner.backend_mut().press(Addr::new(0, 0));
        scanner.read_matrix();
        collect(&mut scanner);

        let again = collect(&mut scanner);
        assert_eq!(again, vec![(Addr::new(0, 0), KeySwitchState::all())]);
        assert_eq!(collect(&mut scanner), again);
    }

    #[test]
    fn test_stale_row_keeps_state() {
        let mut scanner = KeyScanner::new(VirtualMatrix::<2, 4>::new(), FreezeAfterChange::new(0));
        scanner.backend_mut().press(Addr::new(1, 1));
        scanner.read_matrix();

        scanner.backend_mut().release(Addr::new(1, 1));
        scanner.backend_mut().set_stale(1, true);
        scanner.read_matrix();
        assert!(scanner.is_keyswitch_pressed(Addr::new(1, 1)));

        scanner.backend_mut().set_stale(1, false);
        scanner.read_matrix();
        assert!(!scanner.is_keyswitch_pressed(Addr::new(1, 1)));
    }

    #[test]
    fn test_handler_masks_keys() {
        let mut scanner = KeyScanner::new(VirtualMatrix::<2, 4>::new(), EagerLockout::new());
        scanner.backend_mut().press(Addr::new(0, 2));
        scanner.read_matrix();

        let mut masks = KeyMask::new();
        scanner.act_on_matrix_scan(
            &mut masks,
            &mut |addr: Addr, state: KeySwitchState, masks: &mut KeyMask<2, 4>| {
                if state.toggled_on() {
                    masks.mask(addr);
                }
            },
        );
        assert!(masks.is_masked(Addr::new(0, 2)));

        // Masks are left alone by the scanner, even across a release.
        scanner.backend_mut().release(Addr::new(0, 2));
        for _ in 0..6 {
            scanner.read_matrix();
            scanner.act_on_matrix_scan(
                &mut masks,
                &mut |_: Addr, _: KeySwitchState, _: &mut KeyMask<2, 4>| {},
            );
        }
        assert!(!scanner.is_keyswitch_pressed(Addr::new(0, 2)));
        assert!(masks.is_masked(Addr::new(0, 2)));
    }

    #[test]
    fn test_wide_backend_rows_are_cut_to_columns() {
        let mut wide = VirtualMatrix::<2, 8>::new();
        wide.press(KeyAddr::new(0, 1));
        wide.press(KeyAddr::new(0, 6));
        wide.press(KeyAddr::new(1, 4));
        let mut scanner = KeyScanner::<_, _, 2, 4>::new(wide, FreezeAfterChange::new(0));
        scanner.read_matrix();

        assert_eq!(scanner.row_state(0), 0b10);
        assert_eq!(scanner.row_state(1), 0);
        assert_eq!(scanner.pressed_keyswitch_count(), 1);

        let mut events = Vec::new();
        scanner.act_on_matrix_scan(
            &mut KeyMask::new(),
            &mut |addr: Addr, state: KeySwitchState, _: &mut KeyMask<2, 4>| {
                events.push((addr, state))
            },
        );
        assert_eq!(events, vec![(Addr::new(0, 1), KeySwitchState::IS_PRESSED)]);
    }

    #[test]
    fn test_invalid_queries() {
        let scanner =
            KeyScanner::<_, _, 2, 4>::new(VirtualMatrix::<2, 4>::new(), EagerLockout::new());
        assert!(!scanner.is_keyswitch_pressed(Addr::none()));
        assert!(!scanner.was_keyswitch_pressed(Addr::none()));
        assert_eq!(scanner.row_state(9), 0);
    }
}
