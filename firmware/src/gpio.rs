//! ATmega32U4 port pins behind the embedded-hal digital traits.
//!
//! Only the main loop touches the port registers, so the read-modify-write
//! sequences here run without a critical section.

use core::convert::Infallible;

use avr_device::atmega32u4::{PORTB, PORTC, PORTD, PORTF};
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Port {
    B,
    C,
    D,
    F,
}

/// One pin, by port and bit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    port: Port,
    mask: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        Self {
            port,
            mask: 1 << bit,
        }
    }
}

macro_rules! modify {
    ($periph:ident . $reg:ident, $mask:expr, $on:expr) => {{
        let regs = unsafe { &*$periph::ptr() };
        regs.$reg.modify(|r, w| unsafe {
            w.bits(if $on { r.bits() | $mask } else { r.bits() & !$mask })
        });
    }};
}

fn write_ddr(pin: Pin, output: bool) {
    match pin.port {
        Port::B => modify!(PORTB.ddrb, pin.mask, output),
        Port::C => modify!(PORTC.ddrc, pin.mask, output),
        Port::D => modify!(PORTD.ddrd, pin.mask, output),
        Port::F => modify!(PORTF.ddrf, pin.mask, output),
    }
}

/// Output level, or pull-up enable for an input.
fn write_port(pin: Pin, high: bool) {
    match pin.port {
        Port::B => modify!(PORTB.portb, pin.mask, high),
        Port::C => modify!(PORTC.portc, pin.mask, high),
        Port::D => modify!(PORTD.portd, pin.mask, high),
        Port::F => modify!(PORTF.portf, pin.mask, high),
    }
}

fn read_pin(pin: Pin) -> bool {
    let bits = unsafe {
        match pin.port {
            Port::B => (*PORTB::ptr()).pinb.read().bits(),
            Port::C => (*PORTC::ptr()).pinc.read().bits(),
            Port::D => (*PORTD::ptr()).pind.read().bits(),
            Port::F => (*PORTF::ptr()).pinf.read().bits(),
        }
    };
    bits & pin.mask != 0
}

/// Push-pull output, starting high.
pub struct Output(Pin);

impl Output {
    pub fn new(pin: Pin) -> Self {
        write_port(pin, true);
        write_ddr(pin, true);
        Self(pin)
    }
}

impl OutputPin for Output {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        write_port(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        write_port(self.0, true);
        Ok(())
    }
}

/// Input with the internal pull-up enabled.
pub struct PullUpInput(Pin);

impl PullUpInput {
    pub fn new(pin: Pin) -> Self {
        write_ddr(pin, false);
        write_port(pin, true);
        Self(pin)
    }
}

impl InputPin for PullUpInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(read_pin(self.0))
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(!read_pin(self.0))
    }
}

/// Busy-wait delay calibrated for 16MHz.
pub struct NopDelay;

impl DelayUs<u8> for NopDelay {
    fn delay_us(&mut self, us: u8) {
        // ~16 cycles per microsecond: four passes of a four cycle loop.
        for _ in 0..us {
            for _ in 0..4u8 {
                unsafe { core::arch::asm!("nop") };
            }
        }
    }
}
