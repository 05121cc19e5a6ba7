//! Timer1 scan tick and the millisecond clock.
//!
//! Timer1 runs in phase correct mode with ICR1 as TOP and no prescaler, so
//! it overflows once per scan interval. The overflow interrupt raises the
//! scan flag and advances the clock; it does nothing else.

use core::cell::Cell;

use avr_device::atmega32u4::TC1;
use avr_device::interrupt::{self, Mutex};
use keyscan::{Clock, ConfigError, ScanFlag, ScanInterval};

pub const F_CPU: u32 = 16_000_000;

const WGM13: u8 = 1 << 4;
const CS10: u8 = 1 << 0;
const TOIE1: u8 = 1 << 0;

pub static SCAN_FLAG: ScanFlag = ScanFlag::new();

static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));
static SUB_MILLI_US: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));
static TICK_US: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));

/// Program Timer1 for `interval` and enable its overflow interrupt.
/// Interrupts still have to be enabled globally.
pub fn start(tc1: &TC1, interval: ScanInterval) -> Result<(), ConfigError> {
    let ticks = interval.timer_ticks(F_CPU)?;
    interrupt::free(|cs| TICK_US.borrow(cs).set(interval.as_micros()));

    tc1.tccr1b.write(|w| unsafe { w.bits(WGM13) });
    tc1.tccr1a.write(|w| unsafe { w.bits(0) });
    tc1.icr1.write(|w| unsafe { w.bits(ticks) });
    tc1.tccr1b.write(|w| unsafe { w.bits(WGM13 | CS10) });
    tc1.timsk1.write(|w| unsafe { w.bits(TOIE1) });
    Ok(())
}

/// Milliseconds since [`start`], counted in scan ticks.
pub struct TimerClock;

impl Clock for TimerClock {
    fn now_ms(&self) -> u32 {
        interrupt::free(|cs| MILLIS.borrow(cs).get())
    }
}

#[avr_device::interrupt(atmega32u4)]
fn TIMER1_OVF() {
    SCAN_FLAG.raise();

    interrupt::free(|cs| {
        let mut us = SUB_MILLI_US.borrow(cs).get() + TICK_US.borrow(cs).get();
        let millis = MILLIS.borrow(cs);
        while us >= 1000 {
            us -= 1000;
            millis.set(millis.get().wrapping_add(1));
        }
        SUB_MILLI_US.borrow(cs).set(us);
    });
}
