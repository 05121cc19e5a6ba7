//! When scans happen.
//!
//! A periodic timer interrupt raises a [`ScanFlag`]; the main loop calls
//! [`Device::scan_matrix`] as often as it likes. Raw acquisition only runs
//! when the flag was raised, but every call dispatches, so handlers see the
//! held keys on every loop iteration.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{Debouncer, KeyAddr, KeyMask, KeyScanner, KeyswitchHandler, ScanBackend};

/// Set from interrupt context, taken from the main loop.
///
/// This is the only state the core shares with an interrupt handler.
#[derive(Debug)]
pub struct ScanFlag(AtomicBool);

impl ScanFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark a scan as due. Safe to call from an interrupt handler.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_due(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether a scan was due.
    ///
    /// Load then store rather than a swap, which the AVR target lacks. A
    /// raise landing between the two is absorbed by the scan about to run.
    pub fn take(&self) -> bool {
        if self.0.load(Ordering::Acquire) {
            self.0.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }
}

impl Default for ScanFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// A scanner, its key masks and the flag that paces it.
pub struct Device<'f, B, D, const ROWS: usize, const COLS: usize> {
    scanner: KeyScanner<B, D, ROWS, COLS>,
    masks: KeyMask<ROWS, COLS>,
    flag: &'f ScanFlag,
}

impl<'f, B, D, const ROWS: usize, const COLS: usize> Device<'f, B, D, ROWS, COLS>
where
    B: ScanBackend,
    D: Debouncer,
{
    pub fn new(scanner: KeyScanner<B, D, ROWS, COLS>, flag: &'f ScanFlag) -> Self {
        Self {
            scanner,
            masks: KeyMask::new(),
            flag,
        }
    }

    /// Set up the backend. Call once before the main loop.
    pub fn setup(&mut self) {
        self.scanner.setup();
    }

    /// One main loop iteration: read the matrix if a scan is due, then
    /// dispatch regardless.
    pub fn scan_matrix<H>(&mut self, handler: &mut H)
    where
        H: KeyswitchHandler<ROWS, COLS> + ?Sized,
    {
        if self.flag.take() {
            self.scanner.read_matrix();
        }
        self.scanner.act_on_matrix_scan(&mut self.masks, handler);
    }

    pub fn mask_key(&mut self, addr: KeyAddr<ROWS, COLS>) {
        self.masks.mask(addr);
    }

    pub fn unmask_key(&mut self, addr: KeyAddr<ROWS, COLS>) {
        self.masks.unmask(addr);
    }

    pub fn is_key_masked(&self, addr: KeyAddr<ROWS, COLS>) -> bool {
        self.masks.is_masked(addr)
    }

    pub fn masks(&self) -> &KeyMask<ROWS, COLS> {
        &self.masks
    }

    pub fn scanner(&self) -> &KeyScanner<B, D, ROWS, COLS> {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut KeyScanner<B, D, ROWS, COLS> {
        &mut self.scanner
    }
}
