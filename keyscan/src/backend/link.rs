//! Satellite controller on the two-wire bus.
//!
//! The other half of a split keyboard runs its own scanner and answers a
//! small command protocol. Each scan pass does one five byte read: a reply
//! tag followed by four row bytes. A reply with the wrong tag is dropped and
//! the rows keep their previous state.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Read, Write};

use super::{Sample, ScanBackend};
use crate::{BusError, Clock, LinkHealth, RowState};

/// Satellites answer at this address, or'ed with their two address pins.
pub const SATELLITE_ADDR_BASE: u8 = 0x58;

/// Leading command byte of each transaction.
pub mod command {
    pub const VERSION: u8 = 0x01;
    pub const KEYSCAN_INTERVAL: u8 = 0x02;
    pub const LED_SPI_FREQUENCY: u8 = 0x06;
}

/// Tag of a key data reply.
pub const REPLY_KEYDATA: u8 = 0x01;

/// Rows reported by one satellite.
pub const SATELLITE_ROWS: usize = 4;

/// Keyscan interval the satellite is set to when it attaches.
pub const DEFAULT_KEYSCAN_INTERVAL: u8 = 2;

/// Turnaround between a register command and reading its value.
const REGISTER_DELAY_US: u8 = 50;

pub struct Satellite<I, C, D> {
    i2c: I,
    clock: C,
    delay: D,
    addr: u8,
    health: LinkHealth,
    keyscan_interval: u8,
    rows: [u8; SATELLITE_ROWS],
    fresh: bool,
}

impl<I, C, D, E> Satellite<I, C, D>
where
    I: Read<Error = E> + Write<Error = E>,
    E: Into<BusError>,
    C: Clock,
    D: DelayUs<u8>,
{
    /// `ad01` is the state of the satellite's two address pins.
    pub fn new(i2c: I, clock: C, delay: D, ad01: u8) -> Self {
        Self {
            i2c,
            clock,
            delay,
            addr: SATELLITE_ADDR_BASE | (ad01 & 0b11),
            health: LinkHealth::new(),
            keyscan_interval: DEFAULT_KEYSCAN_INTERVAL,
            rows: [0; SATELLITE_ROWS],
            fresh: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    pub fn release(self) -> (I, C, D) {
        (self.i2c, self.clock, self.delay)
    }

    /// Last key data received, one byte per row.
    pub fn key_data(&self) -> [u8; SATELLITE_ROWS] {
        self.rows
    }

    /// Set the satellite's own scan interval. The value is remembered and
    /// sent again whenever the link is re-established.
    pub fn set_keyscan_interval(&mut self, interval: u8) -> Result<(), BusError> {
        self.keyscan_interval = interval;
        self.write_command(&[command::KEYSCAN_INTERVAL, interval])
    }

    pub fn read_keyscan_interval(&mut self) -> Result<u8, BusError> {
        self.read_register(command::KEYSCAN_INTERVAL)
    }

    pub fn read_version(&mut self) -> Result<u8, BusError> {
        self.read_register(command::VERSION)
    }

    pub fn set_led_spi_frequency(&mut self, frequency: u8) -> Result<(), BusError> {
        self.write_command(&[command::LED_SPI_FREQUENCY, frequency])
    }

    pub fn read_led_spi_frequency(&mut self) -> Result<u8, BusError> {
        self.read_register(command::LED_SPI_FREQUENCY)
    }

    fn write_command(&mut self, data: &[u8]) -> Result<(), BusError> {
        if let Some(err) = self.health.last_error() {
            return Err(err);
        }
        self.i2c.write(self.addr, data).map_err(|e| {
            let err = e.into();
            self.health.trip(err);
            err
        })
    }

    fn read_register(&mut self, cmd: u8) -> Result<u8, BusError> {
        self.write_command(&[cmd])?;
        self.delay.delay_us(REGISTER_DELAY_US);
        let mut value = [0u8];
        self.i2c.read(self.addr, &mut value).map_err(|e| {
            let err = e.into();
            self.health.trip(err);
            err
        })?;
        Ok(value[0])
    }

    /// One key data read. Returns whether new rows arrived.
    fn read_keys(&mut self) -> bool {
        let mut reply = [0u8; 1 + SATELLITE_ROWS];
        match self.i2c.read(self.addr, &mut reply) {
            Ok(()) if reply[0] == REPLY_KEYDATA => {
                self.rows.copy_from_slice(&reply[1..]);
                true
            }
            Ok(()) => {
                debug!("dropping satellite reply with tag {:#x}", reply[0]);
                false
            }
            Err(e) => {
                self.health.trip(e.into());
                false
            }
        }
    }
}

fn attach<I, E>(i2c: &mut I, addr: u8, interval: u8) -> Result<(), BusError>
where
    I: Write<Error = E>,
    E: Into<BusError>,
{
    i2c.write(addr, &[command::KEYSCAN_INTERVAL, interval])
        .map_err(Into::into)
}

impl<I, C, D, E> ScanBackend for Satellite<I, C, D>
where
    I: Read<Error = E> + Write<Error = E>,
    E: Into<BusError>,
    C: Clock,
    D: DelayUs<u8>,
{
    fn rows(&self) -> u8 {
        SATELLITE_ROWS as u8
    }

    fn setup(&mut self) {
        let now = self.clock.now_ms();
        let result = attach(&mut self.i2c, self.addr, self.keyscan_interval);
        self.health.record(result, now);
    }

    fn begin_scan(&mut self) {
        self.fresh = false;
        let now = self.clock.now_ms();
        let Self {
            i2c,
            addr,
            health,
            keyscan_interval,
            ..
        } = self;
        if health.reattach(now, || attach(i2c, *addr, *keyscan_interval)) {
            self.fresh = self.read_keys();
        }
    }

    fn read_row(&mut self, row: u8) -> Sample {
        match self.rows.get(usize::from(row)) {
            Some(&bits) if self.fresh => Sample::Fresh(RowState::from(bits)),
            _ => Sample::Stale,
        }
    }
}
