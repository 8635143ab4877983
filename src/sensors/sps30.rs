// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensirion SPS30 particulate sensor over I2C
//!
//! Each 16-bit word on the wire is followed by a CRC-8 byte. Commands are
//! 16-bit pointers written big-endian, optionally followed by argument words.

use tracing::{debug, trace};

use super::{BusError, Measurement, ParticleBus};

/// Default 7-bit I2C address
pub const SPS30_I2C_ADDRESS: u16 = 0x69;

const CMD_START_MEASUREMENT: u16 = 0x0010;
const CMD_STOP_MEASUREMENT: u16 = 0x0104;
const CMD_READ_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASUREMENT: u16 = 0x0300;
const CMD_AUTO_CLEAN_INTERVAL: u16 = 0x8004;
const CMD_READ_SERIAL: u16 = 0xD033;

/// Big-endian IEEE754 float output format, second byte is a dummy
const OUTPUT_FORMAT_FLOAT: u16 = 0x0300;

const SERIAL_LEN: usize = 32;
const MEASUREMENT_WORDS: usize = 20;

/// Raw byte transport underneath the protocol
pub trait I2cTransport: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<(), BusError>;
}

/// CRC-8 as used by Sensirion (poly 0x31, init 0xFF)
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Build a command frame: pointer followed by CRC-protected argument words
pub fn encode_command(command: u16, args: &[u16]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + args.len() * 3);
    frame.extend_from_slice(&command.to_be_bytes());
    for word in args {
        let bytes = word.to_be_bytes();
        frame.extend_from_slice(&bytes);
        frame.push(crc8(&bytes));
    }
    frame
}

/// Strip and verify CRC bytes from a response, returning the payload bytes
pub fn decode_words(raw: &[u8]) -> Result<Vec<u8>, BusError> {
    if raw.len() % 3 != 0 {
        return Err(BusError::Malformed("response length not a multiple of 3"));
    }

    let mut payload = Vec::with_capacity(raw.len() / 3 * 2);
    for chunk in raw.chunks_exact(3) {
        let expected = crc8(&chunk[..2]);
        if expected != chunk[2] {
            return Err(BusError::Crc { expected, actual: chunk[2] });
        }
        payload.extend_from_slice(&chunk[..2]);
    }
    Ok(payload)
}

/// Decode the ten big-endian floats of a measurement response
pub fn decode_measurement(raw: &[u8]) -> Result<Measurement, BusError> {
    let payload = decode_words(raw)?;
    if payload.len() != MEASUREMENT_WORDS * 2 {
        return Err(BusError::Malformed("measurement must hold ten floats"));
    }

    let mut values = [0f32; 10];
    for (value, bytes) in values.iter_mut().zip(payload.chunks_exact(4)) {
        *value = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    Ok(Measurement {
        mc_1p0: values[0],
        mc_2p5: values[1],
        mc_4p0: values[2],
        mc_10p0: values[3],
        nc_0p5: values[4],
        nc_1p0: values[5],
        nc_2p5: values[6],
        nc_4p0: values[7],
        nc_10p0: values[8],
        typical_particle_size: values[9],
    })
}

/// SPS30 driver on top of any [`I2cTransport`]
pub struct Sps30<T> {
    transport: T,
}

impl<T: I2cTransport> Sps30<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, command: u16, args: &[u16]) -> Result<(), BusError> {
        let frame = encode_command(command, args);
        trace!("sps30 write {:02x?}", frame);
        self.transport.write(&frame)
    }

    fn query(&mut self, command: u16, response_len: usize) -> Result<Vec<u8>, BusError> {
        self.send(command, &[])?;
        let mut raw = vec![0u8; response_len];
        self.transport.read(&mut raw)?;
        trace!("sps30 read {:02x?}", raw);
        decode_words(&raw)
    }
}

impl<T: I2cTransport> ParticleBus for Sps30<T> {
    fn probe(&mut self) -> Result<String, BusError> {
        let payload = self.query(CMD_READ_SERIAL, SERIAL_LEN / 2 * 3)?;
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        let serial = String::from_utf8_lossy(&payload[..end]).into_owned();
        debug!("SPS30 serial: {}", serial);
        Ok(serial)
    }

    fn set_auto_cleaning_interval(&mut self, days: u8) -> Result<(), BusError> {
        let seconds = u32::from(days) * 24 * 60 * 60;
        self.send(
            CMD_AUTO_CLEAN_INTERVAL,
            &[(seconds >> 16) as u16, (seconds & 0xFFFF) as u16],
        )
    }

    fn start_measurement(&mut self) -> Result<(), BusError> {
        self.send(CMD_START_MEASUREMENT, &[OUTPUT_FORMAT_FLOAT])
    }

    fn stop_measurement(&mut self) -> Result<(), BusError> {
        self.send(CMD_STOP_MEASUREMENT, &[])
    }

    fn read_data_ready(&mut self) -> Result<bool, BusError> {
        let payload = self.query(CMD_READ_DATA_READY, 3)?;
        Ok(payload[1] != 0)
    }

    fn read_measurement(&mut self) -> Result<Measurement, BusError> {
        self.send(CMD_READ_MEASUREMENT, &[])?;
        let mut raw = [0u8; MEASUREMENT_WORDS * 3];
        self.transport.read(&mut raw)?;
        decode_measurement(&raw)
    }
}

/// Linux `/dev/i2c-*` transport
#[cfg(feature = "hardware")]
pub mod linux {
    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;

    use super::{I2cTransport, Sps30, SPS30_I2C_ADDRESS};
    use crate::sensors::BusError;

    pub struct LinuxI2c {
        device: LinuxI2CDevice,
    }

    impl LinuxI2c {
        pub fn open(bus: &str, address: u16) -> Result<Self, BusError> {
            let device = LinuxI2CDevice::new(bus, address).map_err(|e| BusError::Io(e.to_string()))?;
            Ok(Self { device })
        }
    }

    impl I2cTransport for LinuxI2c {
        fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
            self.device.write(bytes).map_err(|e| BusError::Io(e.to_string()))
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), BusError> {
            self.device.read(buf).map_err(|e| BusError::Io(e.to_string()))
        }
    }

    /// Open an SPS30 on the given bus at its default address
    pub fn open(bus: &str) -> Result<Sps30<LinuxI2c>, BusError> {
        LinuxI2c::open(bus, SPS30_I2C_ADDRESS).map(Sps30::new)
    }
}
