//! Polled TWI (I2C) master.
//!
//! Implements the embedded-hal blocking I2C traits so the keyscan bus
//! backends can drive the MCP23018. Every wait on the hardware is bounded;
//! a transfer that never completes reports [`BusError::Timeout`].

use avr_device::atmega32u4::TWI;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use keyscan::BusError;

/// SCL freq = CPU_FREQ / (16 + 2 * TWBR * prescaler)
/// 400kHz = 16MHz / (16 + 2 * 12 * 1) => TWBR = 12
const TWBR_VALUE: u8 = 12;

const TW_START: u8 = 0x08;
const TW_REP_START: u8 = 0x10;
const TW_MT_SLA_ACK: u8 = 0x18;
const TW_MT_SLA_NACK: u8 = 0x20;
const TW_MT_DATA_ACK: u8 = 0x28;
const TW_MT_DATA_NACK: u8 = 0x30;
const TW_MR_SLA_ACK: u8 = 0x40;
const TW_MR_SLA_NACK: u8 = 0x48;
const TW_MR_DATA_ACK: u8 = 0x50;
const TW_MR_DATA_NACK: u8 = 0x58;

const TWINT_TIMEOUT: u16 = 0xFFFF;

pub struct Twi {
    twi: TWI,
}

impl Twi {
    pub fn new(twi: TWI) -> Self {
        twi.twbr.write(|w| unsafe { w.bits(TWBR_VALUE) });
        twi.twsr.write(|w| w.twps().prescaler_1());
        twi.twcr.write(|w| w.twen().set_bit());
        Self { twi }
    }

    fn status(&self) -> u8 {
        self.twi.twsr.read().bits() & 0xF8
    }

    fn wait(&self) -> Result<u8, BusError> {
        let mut timeout = TWINT_TIMEOUT;
        while self.twi.twcr.read().twint().bit_is_clear() {
            timeout -= 1;
            if timeout == 0 {
                return Err(BusError::Timeout);
            }
        }
        Ok(self.status())
    }

    fn expect(&self, ok: u8) -> Result<(), BusError> {
        match self.wait()? {
            s if s == ok => Ok(()),
            TW_MT_SLA_NACK | TW_MT_DATA_NACK | TW_MR_SLA_NACK => Err(BusError::Nack),
            s => Err(BusError::Status(s)),
        }
    }

    fn start(&mut self) -> Result<(), BusError> {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsta().set_bit().twen().set_bit());
        match self.wait()? {
            TW_START | TW_REP_START => Ok(()),
            s => Err(BusError::Status(s)),
        }
    }

    fn stop(&mut self) {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsto().set_bit().twen().set_bit());
    }

    fn send(&mut self, byte: u8, ok: u8) -> Result<(), BusError> {
        self.twi.twdr.write(|w| unsafe { w.bits(byte) });
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.expect(ok)
    }

    fn write_bytes(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.start()?;
        self.send(addr << 1, TW_MT_SLA_ACK)?;
        for &byte in bytes {
            self.send(byte, TW_MT_DATA_ACK)?;
        }
        Ok(())
    }

    fn read_bytes(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.start()?;
        self.send((addr << 1) | 1, TW_MR_SLA_ACK)?;
        let last = buffer.len().saturating_sub(1);
        for (i, byte) in buffer.iter_mut().enumerate() {
            if i == last {
                self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
                self.expect(TW_MR_DATA_NACK)?;
            } else {
                self.twi
                    .twcr
                    .write(|w| w.twint().set_bit().twea().set_bit().twen().set_bit());
                self.expect(TW_MR_DATA_ACK)?;
            }
            *byte = self.twi.twdr.read().bits();
        }
        Ok(())
    }

    /// Run `transfer`, then release the bus whatever happened.
    fn transaction<T>(
        &mut self,
        transfer: impl FnOnce(&mut Self) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        let result = transfer(self);
        self.stop();
        result
    }
}

impl Write for Twi {
    type Error = BusError;

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.transaction(|twi| twi.write_bytes(addr, bytes))
    }
}

impl Read for Twi {
    type Error = BusError;

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.transaction(|twi| twi.read_bytes(addr, buffer))
    }
}

impl WriteRead for Twi {
    type Error = BusError;

    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusError> {
        // Repeated start between the register select and the read.
        self.transaction(|twi| {
            twi.write_bytes(addr, bytes)?;
            twi.read_bytes(addr, buffer)
        })
    }
}
