use crate::answers::*;
use crate::base::{read_exact, write_all, Error, Result, Transport};
use crate::cmds::Command;
use byteorder::{ByteOrder, LittleEndian};
use log::{error, trace};
use std::fmt;

/// Encodes `command` into the bytes sent to the device: the sync byte followed by the opcode.
#[inline]
pub fn encode_request(command: Command) -> [u8; 2] {
    [RPLIDAR_CMD_SYNC_BYTE, command.opcode()]
}

/// Encodes `command` and writes it to `transport`, flushing afterwards.
pub fn send_request<T: Transport + ?Sized>(transport: &mut T, command: Command) -> Result<()> {
    let request = encode_request(command);
    trace!("Sending {:?} request: {:02X?}", command, request);
    write_all(transport, &request)
}

/// How the payload after a descriptor is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One payload of `payload_length` bytes follows, then the exchange ends.
    Single,
    /// Records of `payload_length` bytes follow until the device is told to stop.
    Multi,
}

impl ResponseMode {
    fn from_bits(bits: u8) -> Option<ResponseMode> {
        match bits {
            RPLIDAR_ANS_MODE_SINGLE => Some(ResponseMode::Single),
            RPLIDAR_ANS_MODE_MULTI => Some(ResponseMode::Multi),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Single => write!(f, "single"),
            ResponseMode::Multi => write!(f, "multi"),
        }
    }
}

/// The 7-byte header preceding every device response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseDescriptor {
    /// Size of the single payload, or of every record in a multi response.
    pub payload_length: u32,
    /// Single or multi response.
    pub mode: ResponseMode,
    /// Response data type (last descriptor byte), e.g. `0x06` for health, `0x81` for scans.
    pub data_type: u8,
}

impl ResponseDescriptor {
    /// Parses a raw descriptor.
    ///
    /// Fails with [`Error::FramingError`] if the sync bytes are wrong and with
    /// [`Error::ProtocolViolation`] if the mode bits hold anything but single or multi.
    pub fn parse(bytes: &[u8; RPLIDAR_ANS_DESCRIPTOR_SIZE]) -> Result<ResponseDescriptor> {
        trace!("Parsing response descriptor {:02X?}", bytes);
        if bytes[0..2] != RPLIDAR_ANS_SYNC_BYTES {
            error!(
                "Descriptor sync mismatch: expected {:02X?}, got {:02X?}",
                RPLIDAR_ANS_SYNC_BYTES,
                &bytes[0..2]
            );
            return Err(Error::FramingError {
                received: [bytes[0], bytes[1]],
            });
        }

        let size_q30_subtype = LittleEndian::read_u32(&bytes[2..6]);
        let payload_length = size_q30_subtype & RPLIDAR_ANS_HEADER_SIZE_MASK;
        let mode_bits = (size_q30_subtype >> RPLIDAR_ANS_HEADER_SUBTYPE_SHIFT) as u8;
        let mode = ResponseMode::from_bits(mode_bits).ok_or_else(|| {
            error!("Descriptor carries illegal mode value {}", mode_bits);
            Error::violation(format!("illegal response mode {}", mode_bits))
        })?;

        let descriptor = ResponseDescriptor {
            payload_length,
            mode,
            data_type: bytes[6],
        };
        trace!("Parsed descriptor: {:?}", descriptor);
        Ok(descriptor)
    }

    /// Reads exactly one descriptor from `transport` and parses it.
    pub fn read_from<T: Transport + ?Sized>(transport: &mut T) -> Result<ResponseDescriptor> {
        trace!("Waiting for response descriptor");
        let data = read_exact(transport, RPLIDAR_ANS_DESCRIPTOR_SIZE)?;
        let mut raw = [0; RPLIDAR_ANS_DESCRIPTOR_SIZE];
        raw.copy_from_slice(&data);
        ResponseDescriptor::parse(&raw)
    }

    /// Fails with a protocol violation unless the descriptor has the mode `command` requires.
    pub(crate) fn expect_mode(&self, expected: ResponseMode, command: Command) -> Result<()> {
        if self.mode != expected {
            error!(
                "{:?} answered with a {} response, expected {}",
                command, self.mode, expected
            );
            return Err(Error::violation(format!(
                "{:?} answered with a {} response, expected {}",
                command, self.mode, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::mock::MockTransport;

    #[test]
    fn encode_requests() {
        assert_eq!(encode_request(Command::Scan), [0xA5, 0x20]);
        assert_eq!(encode_request(Command::Stop), [0xA5, 0x25]);
        assert_eq!(encode_request(Command::Reset), [0xA5, 0x40]);
        assert_eq!(encode_request(Command::GetHealth), [0xA5, 0x52]);
    }

    #[test]
    fn send_request_writes_and_flushes() {
        let mut transport = MockTransport::new();
        send_request(&mut transport, Command::ForceScan).unwrap();
        assert_eq!(transport.written(), vec![0xA5, 0x21]);
        assert_eq!(transport.flush_count(), 1);
    }

    #[test]
    fn parse_single_descriptor() {
        let descriptor =
            ResponseDescriptor::parse(&[0xA5, 0x5A, 0x05, 0x00, 0x00, 0x00, 0x40]).unwrap();
        assert_eq!(descriptor.payload_length, 5);
        assert_eq!(descriptor.mode, ResponseMode::Single);
        assert_eq!(descriptor.data_type, 0x40);
    }

    #[test]
    fn parse_multi_descriptor() {
        let descriptor =
            ResponseDescriptor::parse(&[0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]).unwrap();
        assert_eq!(descriptor.payload_length, 5);
        assert_eq!(descriptor.mode, ResponseMode::Multi);
        assert_eq!(descriptor.data_type, RPLIDAR_ANS_TYPE_MEASUREMENT);
    }

    #[test]
    fn parse_uses_all_30_length_bits() {
        let descriptor =
            ResponseDescriptor::parse(&[0xA5, 0x5A, 0xFF, 0xFF, 0xFF, 0x7F, 0x00]).unwrap();
        assert_eq!(descriptor.payload_length, 0x3FFF_FFFF);
        assert_eq!(descriptor.mode, ResponseMode::Multi);

        let descriptor =
            ResponseDescriptor::parse(&[0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06]).unwrap();
        assert_eq!(descriptor.payload_length, 3);
        assert_eq!(descriptor.mode, ResponseMode::Single);
    }

    #[test]
    fn parse_recovers_every_length_and_mode() {
        for &length in &[0u32, 1, 5, 0x1234, 0x00FF_FFFF, 0x3FFF_FFFF] {
            for (bits, mode) in [(0u32, ResponseMode::Single), (1, ResponseMode::Multi)] {
                let word = (bits << 30) | length;
                let mut raw = [0xA5, 0x5A, 0, 0, 0, 0, 0x81];
                LittleEndian::write_u32(&mut raw[2..6], word);
                let descriptor = ResponseDescriptor::parse(&raw).unwrap();
                assert_eq!(descriptor.payload_length, length);
                assert_eq!(descriptor.mode, mode);
            }
        }
    }

    #[test]
    fn parse_rejects_bad_sync_bytes() {
        assert!(matches!(
            ResponseDescriptor::parse(&[0x00, 0x5A, 0x05, 0x00, 0x00, 0x00, 0x40]),
            Err(Error::FramingError {
                received: [0x00, 0x5A]
            })
        ));
        assert!(matches!(
            ResponseDescriptor::parse(&[0xA5, 0x00, 0x05, 0x00, 0x00, 0x00, 0x40]),
            Err(Error::FramingError {
                received: [0xA5, 0x00]
            })
        ));
    }

    #[test]
    fn parse_rejects_illegal_modes() {
        for last in [0x80u8, 0xC0] {
            assert!(matches!(
                ResponseDescriptor::parse(&[0xA5, 0x5A, 0x05, 0x00, 0x00, last, 0x81]),
                Err(Error::ProtocolViolation { .. })
            ));
        }
    }

    #[test]
    fn read_from_transport() {
        let mut transport = MockTransport::new();
        transport.push_input(&[0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06, 0x00]);
        let descriptor = ResponseDescriptor::read_from(&mut transport).unwrap();
        assert_eq!(descriptor.payload_length, 3);
        assert_eq!(transport.pending_input(), 1);
    }

    #[test]
    fn read_from_truncated_transport() {
        let mut transport = MockTransport::new();
        transport.push_input(&[0xA5, 0x5A, 0x03]);
        assert!(matches!(
            ResponseDescriptor::read_from(&mut transport),
            Err(Error::TransportFailure(_))
        ));
    }

    #[test]
    fn expect_mode_mismatch_is_violation() {
        let descriptor = ResponseDescriptor {
            payload_length: 5,
            mode: ResponseMode::Single,
            data_type: 0x81,
        };
        assert!(descriptor
            .expect_mode(ResponseMode::Single, Command::GetHealth)
            .is_ok());
        assert!(matches!(
            descriptor.expect_mode(ResponseMode::Multi, Command::Scan),
            Err(Error::ProtocolViolation { .. })
        ));
    }
}
