//! Per-device scan configuration.
//!
//! These values are fixed for a device and checked once, at construction.
//! A bad value is a build or startup failure, never something the scan loop
//! has to cope with.

use thiserror::Error;

/// Errors from constructing a scan configuration.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The freeze debouncer needs at least one scan of refractory period.
    #[error("debounce window must be at least one scan")]
    ZeroDebounceWindow,

    /// Interval is zero or longer than the scan timer can count.
    #[error("scan interval of {0}us is out of range")]
    IntervalOutOfRange(u16),

    /// The interval does not fit the 16 bit timer at this clock.
    #[error("scan interval of {interval_us}us needs {ticks} timer ticks at {f_cpu}Hz")]
    TimerOverflow {
        interval_us: u16,
        f_cpu: u32,
        ticks: u32,
    },
}

/// Time between two raw scans, in microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanInterval(u16);

impl ScanInterval {
    /// Longest interval the scan timer is specified for.
    pub const MAX_MICROS: u16 = 8192;

    /// Default for strobed matrices: about 5ms of debounce at a window of 3.
    pub const MATRIX: ScanInterval = ScanInterval(1700);

    /// Default for direct pin devices.
    pub const DIRECT: ScanInterval = ScanInterval(1500);

    pub const fn from_micros(us: u16) -> Result<Self, ConfigError> {
        if us == 0 || us > Self::MAX_MICROS {
            return Err(ConfigError::IntervalOutOfRange(us));
        }
        Ok(Self(us))
    }

    pub const fn as_micros(self) -> u16 {
        self.0
    }

    /// Timer TOP value producing one overflow per interval, for a 16 bit
    /// timer counting up and down (phase correct mode) with no prescaler.
    pub fn timer_ticks(self, f_cpu: u32) -> Result<u16, ConfigError> {
        let ticks = (f_cpu / 2_000_000) * u32::from(self.0);
        match u16::try_from(ticks) {
            Ok(ticks) if ticks > 0 => Ok(ticks),
            _ => Err(ConfigError::TimerOverflow {
                interval_us: self.0,
                f_cpu,
                ticks,
            }),
        }
    }
}

/// Debounce and timing constants for one device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    debounce_window: u8,
    scan_interval: ScanInterval,
}

impl ScanConfig {
    pub const DEFAULT: ScanConfig = ScanConfig {
        debounce_window: 3,
        scan_interval: ScanInterval::MATRIX,
    };

    pub const fn new(debounce_window: u8, scan_interval_us: u16) -> Result<Self, ConfigError> {
        if debounce_window == 0 {
            return Err(ConfigError::ZeroDebounceWindow);
        }
        match ScanInterval::from_micros(scan_interval_us) {
            Ok(scan_interval) => Ok(Self {
                debounce_window,
                scan_interval,
            }),
            Err(e) => Err(e),
        }
    }

    /// Scans a key stays frozen after a reported change.
    pub const fn debounce_window(&self) -> u8 {
        self.debounce_window
    }

    pub const fn scan_interval(&self) -> ScanInterval {
        self.scan_interval
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
