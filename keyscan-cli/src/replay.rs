use anyhow::{bail, Result};
use keyscan::backend::VirtualMatrix;
use keyscan::{Debouncer, Device, KeyAddr, KeyMask, KeyScanner, KeySwitchState, ScanFlag};
use log::{debug, info};

use crate::transcript::Scan;

/// One delivered keyswitch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub scan: usize,
    pub pass: usize,
    pub row: u8,
    pub col: u8,
    pub state: KeySwitchState,
}

impl Event {
    pub fn describe(&self) -> &'static str {
        if self.state.toggled_on() {
            "pressed"
        } else if self.state.toggled_off() {
            "released"
        } else {
            "held"
        }
    }
}

/// Replay settings that do not depend on the matrix shape.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Main loop iterations per timer tick.
    pub passes_per_scan: usize,
    /// Drop held events.
    pub changes_only: bool,
}

/// Run `scans` through a virtual `ROWS` x `COLS` matrix and collect what a
/// keyswitch handler would have seen.
pub fn replay<D, const ROWS: usize, const COLS: usize>(
    scans: &[Scan],
    debouncer: D,
    options: Options,
) -> Result<Vec<Event>>
where
    D: Debouncer,
{
    let flag = ScanFlag::new();
    let mut device = Device::new(
        KeyScanner::new(VirtualMatrix::<ROWS, COLS>::new(), debouncer),
        &flag,
    );
    device.setup();

    info!(
        "replaying {} scans on a {}x{} matrix",
        scans.len(),
        ROWS,
        COLS
    );

    let mut events = Vec::new();
    for (scan_num, scan) in scans.iter().enumerate() {
        apply_scan(device.scanner_mut().backend_mut(), scan, scan_num)?;
        flag.raise();

        for pass in 0..options.passes_per_scan {
            let mut handler =
                |addr: KeyAddr<ROWS, COLS>, state: KeySwitchState, _: &mut KeyMask<ROWS, COLS>| {
                    if options.changes_only && !state.is_transition() {
                        return;
                    }
                    events.push(Event {
                        scan: scan_num,
                        pass,
                        row: addr.row(),
                        col: addr.col(),
                        state,
                    });
                };
            device.scan_matrix(&mut handler);
        }
        debug!(
            "scan {}: {} keys down",
            scan_num,
            device.scanner().pressed_keyswitch_count()
        );
    }

    Ok(events)
}

fn apply_scan<const ROWS: usize, const COLS: usize>(
    matrix: &mut VirtualMatrix<ROWS, COLS>,
    scan: &Scan,
    scan_num: usize,
) -> Result<()> {
    match scan {
        Scan::Stale => {
            for row in 0..ROWS {
                matrix.set_stale(row as u8, true);
            }
        }
        Scan::Keys(keys) => {
            matrix.clear();
            for row in 0..ROWS {
                matrix.set_stale(row as u8, false);
            }
            for &(row, col) in keys {
                let addr = KeyAddr::<ROWS, COLS>::new(row, col);
                if !addr.is_valid() {
                    bail!(
                        "scan {}: key {},{} is outside the {}x{} matrix",
                        scan_num,
                        row,
                        col,
                        ROWS,
                        COLS
                    );
                }
                matrix.press(addr);
            }
        }
    }
    Ok(())
}
