//! ErgoDox keyboard firmware for ATmega32U4 (Teensy 2.0).
//!
//! Scans both halves on a Timer1 tick, debounces them and dispatches the
//! keyswitch events every main loop iteration. Keymap, HID and USB live
//! above this layer; here the only consumer is the Teensy LED, lit while any
//! key is held.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod gpio;
mod i2c;
mod matrix;
mod timer;

use avr_device::atmega32u4::Peripherals;
use embedded_hal::digital::v2::OutputPin;
use keyscan::{Device, KeyAddr, KeyMask, KeySwitchState};

use gpio::{Output, Pin, Port};
use i2c::Twi;
use matrix::{COLS, ROWS};

const LED: Pin = Pin::new(Port::D, 6);

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Clock prescaler 1 (the Teensy fuses already give 16MHz)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let mut led = Output::new(LED);
    let _ = led.set_low();

    if timer::start(&dp.TC1, matrix::SCAN_INTERVAL).is_err() {
        halt(led);
    }

    let mut device = Device::new(matrix::scanner(Twi::new(dp.TWI)), &timer::SCAN_FLAG);
    device.setup();

    unsafe { avr_device::interrupt::enable() };

    loop {
        let mut held = false;
        let mut any_held =
            |_: KeyAddr<ROWS, COLS>, state: KeySwitchState, _: &mut KeyMask<ROWS, COLS>| {
                held |= state.is_pressed();
            };
        device.scan_matrix(&mut any_held);

        let _ = if held { led.set_high() } else { led.set_low() };
    }
}

/// Bad build-time configuration: LED on, nothing else runs.
fn halt(mut led: Output) -> ! {
    let _ = led.set_high();
    loop {}
}
