//! Half a matrix behind an MCP23018 I/O expander.
//!
//! Bank A drives the rows (outputs, active low) and bank B reads the columns
//! (inputs with pull-ups). Every row read is two bus transactions: a write of
//! the row select pattern to `GPIOA`, then a register-select write of `GPIOB`
//! followed by a one byte read.
//!
//! Bus faults never reach the scanner. A fault trips the [`LinkHealth`]
//! breaker and every row reports all released exactly once, the faulting
//! row straight away and the others on their next read. After that the
//! expander is left alone until the backoff window has passed, then the
//! init sequence is retried from [`ScanBackend::begin_scan`].

use embedded_hal::blocking::i2c::{Write, WriteRead};

use super::{Sample, ScanBackend};
use crate::{BusError, Clock, LinkHealth, RowState};

/// Address with all address pins grounded.
pub const MCP23018_ADDR: u8 = 0x20;

// Registers, IOCON.BANK = 0.
const IODIRA: u8 = 0x00;
const GPPUA: u8 = 0x0C;
const GPIOA: u8 = 0x12;
const GPIOB: u8 = 0x13;

/// Bank B pins used as column inputs; the top two are reserved.
const COL_INPUTS: u8 = 0b0011_1111;

pub struct Mcp23018<I, C, const ROWS: usize, const COLS: usize> {
    i2c: I,
    clock: C,
    addr: u8,
    health: LinkHealth,
    /// Rows still owed an all-released sample since the last trip.
    release_pending: u8,
}

impl<I, C, E, const ROWS: usize, const COLS: usize> Mcp23018<I, C, ROWS, COLS>
where
    I: Write<Error = E> + WriteRead<Error = E>,
    E: Into<BusError>,
    C: Clock,
{
    const ALL_ROWS: u8 = ((1u16 << ROWS) - 1) as u8;

    const SHAPE: () = {
        assert!(ROWS > 0 && ROWS <= 8, "expander drives up to 8 rows");
        assert!(COLS > 0 && COLS <= 6, "expander reads up to 6 columns");
    };

    pub fn new(i2c: I, clock: C) -> Self {
        let () = Self::SHAPE;
        Self {
            i2c,
            clock,
            addr: MCP23018_ADDR,
            health: LinkHealth::new(),
            release_pending: 0,
        }
    }

    /// Use a different bus address (address pins not grounded).
    pub fn with_address(mut self, addr: u8) -> Self {
        self.addr = addr;
        self
    }

    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    pub fn release(self) -> (I, C) {
        (self.i2c, self.clock)
    }

    fn select_row(&mut self, row: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.addr, &[GPIOA, !(1u8 << row)])
            .map_err(Into::into)
    }

    fn read_cols(&mut self) -> Result<RowState, BusError> {
        let mut data = [0u8];
        self.i2c
            .write_read(self.addr, &[GPIOB], &mut data)
            .map_err(Into::into)?;
        let mask = ((1u16 << COLS) - 1) as u8;
        Ok(RowState::from(!data[0] & mask))
    }
}

/// Bank A all outputs, bank B the column inputs, then the pull-ups
/// programmed to match. Stops at the first failed write.
fn configure<I, E>(i2c: &mut I, addr: u8) -> Result<(), BusError>
where
    I: Write<Error = E>,
    E: Into<BusError>,
{
    i2c.write(addr, &[IODIRA, 0x00, COL_INPUTS])
        .map_err(Into::into)?;
    i2c.write(addr, &[GPPUA, 0x00, COL_INPUTS])
        .map_err(Into::into)
}

impl<I, C, E, const ROWS: usize, const COLS: usize> ScanBackend for Mcp23018<I, C, ROWS, COLS>
where
    I: Write<Error = E> + WriteRead<Error = E>,
    E: Into<BusError>,
    C: Clock,
{
    fn rows(&self) -> u8 {
        ROWS as u8
    }

    fn setup(&mut self) {
        let now = self.clock.now_ms();
        let result = configure(&mut self.i2c, self.addr);
        self.health.record(result, now);
    }

    fn begin_scan(&mut self) {
        let now = self.clock.now_ms();
        let Self {
            i2c, addr, health, ..
        } = self;
        health.reattach(now, || configure(i2c, *addr));
    }

    fn read_row(&mut self, row: u8) -> Sample {
        if usize::from(row) >= ROWS {
            return Sample::Stale;
        }
        let bit = 1u8 << row;

        if !self.health.is_up() {
            if self.release_pending & bit == 0 {
                return Sample::Stale;
            }
            self.release_pending &= !bit;
            return Sample::Fresh(0);
        }

        match self.select_row(row).and_then(|()| self.read_cols()) {
            Ok(bits) => Sample::Fresh(bits),
            Err(err) => {
                self.health.trip(err);
                self.release_pending = Self::ALL_ROWS & !bit;
                Sample::Fresh(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    struct TestClock(Cell<u32>);

    impl Clock for TestClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    /// Enough of an MCP23018 to scan a matrix.
    #[derive(Default)]
    struct FakeExpander {
        closed: [[bool; 6]; 7],
        gpioa: u8,
        writes: Vec<Vec<u8>>,
        transactions: usize,
        fail: Option<BusError>,
    }

    impl Write for FakeExpander {
        type Error = BusError;

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
            assert_eq!(addr, MCP23018_ADDR);
            self.transactions += 1;
            if let Some(err) = self.fail {
                return Err(err);
            }
            if bytes[0] == GPIOA {
                self.gpioa = bytes[1];
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    impl WriteRead for FakeExpander {
        type Error = BusError;

        fn write_read(
            &mut self,
            _addr: u8,
            bytes: &[u8],
            buffer: &mut [u8],
        ) -> Result<(), BusError> {
            self.transactions += 1;
            if let Some(err) = self.fail {
                return Err(err);
            }
            assert_eq!(bytes, &[GPIOB]);
            // Pulled-up inputs read high unless the selected row closes them.
            let mut value = 0xFF;
            for row in 0..7 {
                if self.gpioa & (1 << row) == 0 {
                    for col in 0..6 {
                        if self.closed[row][col] {
                            value &= !(1 << col);
                        }
                    }
                }
            }
            buffer[0] = value;
            Ok(())
        }
    }

    fn expander<'a>(clock: &'a TestClock) -> Mcp23018<FakeExpander, &'a TestClock, 7, 6> {
        Mcp23018::new(FakeExpander::default(), clock)
    }

    #[test]
    fn test_init_sequence() {
        let clock = TestClock(Cell::new(0));
        let mut ex = expander(&clock);
        assert!(!ex.health().is_up());
        ex.setup();
        assert!(ex.health().is_up());
        let (bus, _) = ex.release();
        assert_eq!(
            bus.writes,
            vec![vec![0x00, 0x00, 0b0011_1111], vec![0x0C, 0x00, 0b0011_1111]]
        );
    }

    #[test]
    fn test_read_rows() {
        let clock = TestClock(Cell::new(0));
        let mut ex = expander(&clock);
        ex.i2c.closed[0][5] = true;
        ex.i2c.closed[3][0] = true;
        ex.i2c.closed[3][2] = true;
        ex.setup();

        assert_eq!(ex.read_row(0), Sample::Fresh(0b10_0000));
        assert_eq!(ex.read_row(1), Sample::Fresh(0));
        assert_eq!(ex.read_row(3), Sample::Fresh(0b101));
        assert_eq!(ex.i2c.gpioa, !(1 << 3));
    }

    #[test]
    fn test_fault_then_backoff() {
        crate::testlog::setup();

        let clock = TestClock(Cell::new(100));
        let mut ex = expander(&clock);
        ex.i2c.closed[2][1] = true;
        ex.setup();
        assert_eq!(ex.read_row(2), Sample::Fresh(0b10));

        // A fault mid-scan reports the row released and trips the breaker.
        ex.i2c.fail = Some(BusError::Nack);
        assert_eq!(ex.read_row(2), Sample::Fresh(0));
        assert_eq!(ex.health().error_code(), BusError::Nack.code());

        // Inside the backoff window: no bus traffic at all.
        ex.i2c.fail = None;
        let before = ex.i2c.transactions;
        clock.0.set(5099);
        ex.begin_scan();
        assert_eq!(ex.read_row(2), Sample::Stale);
        assert_eq!(ex.i2c.transactions, before);

        // Window elapsed: the init sequence runs again and scanning resumes.
        clock.0.set(5100);
        ex.begin_scan();
        assert!(ex.health().is_up());
        assert_eq!(ex.health().last_retry_ms(), 5100);
        assert_eq!(ex.read_row(2), Sample::Fresh(0b10));
    }

    #[test]
    fn test_fault_releases_every_row_once() {
        let clock = TestClock(Cell::new(0));
        let mut ex = expander(&clock);
        ex.i2c.closed[1][0] = true;
        ex.i2c.closed[4][3] = true;
        ex.setup();
        for row in 0..7 {
            ex.read_row(row);
        }

        // The bus drops out while row 3 is being read.
        ex.begin_scan();
        for row in 0..3 {
            assert_ne!(ex.read_row(row), Sample::Stale);
        }
        ex.i2c.fail = Some(BusError::Timeout);
        assert_eq!(ex.read_row(3), Sample::Fresh(0));
        let after_fault = ex.i2c.transactions;
        for row in 4..7 {
            assert_eq!(ex.read_row(row), Sample::Fresh(0));
        }

        // Rows read before the fault catch up on the next pass.
        ex.begin_scan();
        assert_eq!(ex.read_row(0), Sample::Fresh(0));
        assert_eq!(ex.read_row(1), Sample::Fresh(0));
        assert_eq!(ex.read_row(2), Sample::Fresh(0));
        for row in 3..7 {
            assert_eq!(ex.read_row(row), Sample::Stale);
        }

        // From then on every row is stale and the bus stays quiet.
        ex.begin_scan();
        for row in 0..7 {
            assert_eq!(ex.read_row(row), Sample::Stale);
        }
        assert_eq!(ex.i2c.transactions, after_fault);
    }

    #[test]
    fn test_fault_long_after_init_retries_next_pass() {
        let clock = TestClock(Cell::new(0));
        let mut ex = expander(&clock);
        ex.i2c.closed[0][2] = true;
        ex.setup();

        clock.0.set(6000);
        ex.i2c.fail = Some(BusError::Nack);
        assert_eq!(ex.read_row(5), Sample::Fresh(0));

        // Last init was at 0, so the retry is due straight away.
        ex.i2c.fail = None;
        ex.begin_scan();
        assert!(ex.health().is_up());
        assert_eq!(ex.read_row(0), Sample::Fresh(0b100));
    }

    #[test]
    fn test_failed_setup_waits_for_window() {
        let clock = TestClock(Cell::new(0));
        let mut ex = expander(&clock);
        ex.i2c.fail = Some(BusError::Status(0x20));
        ex.setup();
        assert_eq!(ex.i2c.transactions, 1);
        assert_eq!(ex.health().error_code(), 0x20);

        ex.i2c.fail = None;
        clock.0.set(4999);
        ex.begin_scan();
        assert_eq!(ex.i2c.transactions, 1);
        clock.0.set(5000);
        ex.begin_scan();
        assert_eq!(ex.i2c.transactions, 3);
        assert!(ex.health().is_up());
    }
}
