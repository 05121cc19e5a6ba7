//! Two-wire bus faults and the reattach circuit breaker.
//!
//! Backends that talk to another chip over I2C never fail a scan. A bus
//! fault trips the breaker; while it is tripped the backend does no bus
//! traffic at all, and only once [`BACKOFF_MS`] has passed since the last
//! attempt does it run the chip's initialization sequence again.

use thiserror::Error;

/// Minimum time between two reattach attempts.
pub const BACKOFF_MS: u32 = 5000;

/// Transient fault on the two-wire bus.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The peripheral has not been set up yet.
    #[error("peripheral not initialized")]
    Uninitialized,

    /// Address or data byte was not acknowledged.
    #[error("no acknowledge")]
    Nack,

    /// The bus controller never signalled completion.
    #[error("bus timeout")]
    Timeout,

    /// Any other raw controller status.
    #[error("bus status {0:#x}")]
    Status(u8),
}

impl BusError {
    /// Non-zero status code, zero being reserved for "no error".
    pub fn code(self) -> u8 {
        match self {
            BusError::Uninitialized => 0x20,
            BusError::Nack => 2,
            BusError::Timeout => 5,
            BusError::Status(0) => 4,
            BusError::Status(s) => s,
        }
    }
}

/// Millisecond time base. Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Circuit breaker for one bus-attached chip.
#[derive(Copy, Clone, Debug)]
pub struct LinkHealth {
    last_error: Option<BusError>,
    last_retry_ms: u32,
}

impl LinkHealth {
    /// A new link counts as faulted until its first successful init.
    pub const fn new() -> Self {
        Self {
            last_error: Some(BusError::Uninitialized),
            last_retry_ms: 0,
        }
    }

    pub fn is_up(&self) -> bool {
        self.last_error.is_none()
    }

    pub fn last_error(&self) -> Option<BusError> {
        self.last_error
    }

    /// Code of the last error, zero when the link is up.
    pub fn error_code(&self) -> u8 {
        self.last_error.map_or(0, BusError::code)
    }

    pub fn last_retry_ms(&self) -> u32 {
        self.last_retry_ms
    }

    /// Record a fault from an ordinary transaction.
    pub fn trip(&mut self, err: BusError) {
        if self.last_error.is_none() {
            warn!("bus fault {:#x}, detaching", err.code());
        }
        self.last_error = Some(err);
    }

    /// Record the outcome of an init attempt made at `now_ms`.
    pub fn record(&mut self, result: Result<(), BusError>, now_ms: u32) {
        self.last_retry_ms = now_ms;
        match result {
            Ok(()) => {
                if self.last_error.is_some() {
                    info!("bus link up");
                }
                self.last_error = None;
            }
            Err(err) => {
                debug!("bus init failed: {:#x}", err.code());
                self.last_error = Some(err);
            }
        }
    }

    /// True when the link is down and the backoff window has passed.
    pub fn retry_due(&self, now_ms: u32) -> bool {
        !self.is_up() && now_ms.wrapping_sub(self.last_retry_ms) >= BACKOFF_MS
    }

    /// Run `init` if a retry is due. Returns whether the link is up.
    pub fn reattach<F>(&mut self, now_ms: u32, init: F) -> bool
    where
        F: FnOnce() -> Result<(), BusError>,
    {
        if self.is_up() {
            return true;
        }
        if !self.retry_due(now_ms) {
            return false;
        }
        self.record(init(), now_ms);
        self.is_up()
    }
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self::new()
    }
}
