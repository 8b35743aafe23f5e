// Serial transport for the drive controller
//
// Packet format: [0xAA, 0x55, Length, Payload..., Checksum]
// Length counts payload bytes only (1..=255).
// Checksum = !(Length + sum(Payload)) & 0xFF

use serialport::{self, ClearBuffer, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use super::{Transport, TransportError};

/// Packet header bytes
pub const FRAME_HEADER: [u8; 2] = [0xAA, 0x55];

/// Serial connection to the motor controller
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialTransport {
    /// Open the serial port with the given baudrate and initial read timeout
    pub fn open(path: &str, baudrate: u32, timeout: Duration) -> Result<Self, TransportError> {
        info!("Opening drive controller link on {} @ {} baud", path, baudrate);
        let port = serialport::new(path, baudrate).timeout(timeout).open()?;
        Ok(Self { port, timeout })
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.set_timeout(timeout)?;

        // Drop anything left over from an abandoned exchange
        self.port.clear(ClearBuffer::Input)?;

        let packet = build_packet(request)?;
        self.port.write_all(&packet)?;
        self.port.flush()?;

        read_packet(&mut self.port, timeout)
    }
}

/// Calculate checksum over length and payload
fn checksum(data: &[u8]) -> u8 {
    let sum: u16 = data.iter().map(|&b| b as u16).sum();
    (!sum & 0xFF) as u8
}

/// Wrap a payload with header, length and checksum
pub(crate) fn build_packet(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let length = match u8::try_from(payload.len()) {
        Ok(0) | Err(_) => {
            return Err(TransportError::Framing {
                reason: format!("Payload length {} outside 1..=255", payload.len()),
            });
        }
        Ok(length) => length,
    };

    let mut packet = Vec::with_capacity(payload.len() + 4);
    packet.extend_from_slice(&FRAME_HEADER);
    packet.push(length);
    packet.extend_from_slice(payload);

    // Checksum over length and payload
    let checksum_data = &packet[2..];
    packet.push(checksum(checksum_data));

    Ok(packet)
}

fn read_exact_or_timeout<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<(), TransportError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            TransportError::Timeout { timeout }
        }
        std::io::ErrorKind::UnexpectedEof => TransportError::Closed,
        _ => TransportError::Io(e),
    })
}

/// Read one response packet and return its payload
pub(crate) fn read_packet<R: Read + ?Sized>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; 3];
    read_exact_or_timeout(reader, &mut header, timeout)?;

    if header[..2] != FRAME_HEADER {
        return Err(TransportError::Framing {
            reason: format!("Invalid header: {:02X?}", &header[..2]),
        });
    }

    let length = header[2] as usize;
    if length == 0 {
        return Err(TransportError::Framing {
            reason: "Zero-length packet".to_string(),
        });
    }

    // Payload + checksum
    let mut remaining = vec![0u8; length + 1];
    read_exact_or_timeout(reader, &mut remaining, timeout)?;

    let received_checksum = remaining[length];
    remaining.truncate(length);

    let mut checksum_data = Vec::with_capacity(length + 1);
    checksum_data.push(header[2]);
    checksum_data.extend_from_slice(&remaining);
    let expected_checksum = checksum(&checksum_data);

    if expected_checksum != received_checksum {
        return Err(TransportError::Framing {
            reason: format!(
                "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
                expected_checksum, received_checksum
            ),
        });
    }

    debug!("Read packet payload: {:02X?}", remaining);
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_checksum() {
        // Length=3, payload [0x02, 0x00, 0x14] -> ~(3+2+0+20) = ~25 = 230
        assert_eq!(checksum(&[3, 0x02, 0x00, 0x14]), 230);
    }

    #[test]
    fn test_build_packet() {
        let packet = build_packet(&[0x04, 0xFF, 0xB1]).unwrap();
        assert_eq!(packet.len(), 7);
        assert_eq!(&packet[..2], &FRAME_HEADER);
        assert_eq!(packet[2], 3);
        assert_eq!(&packet[3..6], &[0x04, 0xFF, 0xB1]);
        assert_eq!(packet[6], checksum(&[3, 0x04, 0xFF, 0xB1]));
    }

    #[test]
    fn test_build_packet_rejects_bad_lengths() {
        assert!(matches!(build_packet(&[]), Err(TransportError::Framing { .. })));
        assert!(matches!(
            build_packet(&[0u8; 256]),
            Err(TransportError::Framing { .. })
        ));
    }

    #[test]
    fn test_read_packet_payload() {
        let wire = build_packet(&[0x00, 0x4B]).unwrap();
        let payload = read_packet(&mut Cursor::new(wire), TIMEOUT).unwrap();
        assert_eq!(payload, vec![0x00, 0x4B]);
    }

    #[test]
    fn test_read_packet_bad_checksum() {
        let mut wire = build_packet(&[0x00]).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        assert!(matches!(
            read_packet(&mut Cursor::new(wire), TIMEOUT),
            Err(TransportError::Framing { .. })
        ));
    }

    #[test]
    fn test_read_packet_bad_header() {
        let wire = vec![0xFF, 0xFF, 0x01, 0x00, 0xFE];
        assert!(matches!(
            read_packet(&mut Cursor::new(wire), TIMEOUT),
            Err(TransportError::Framing { .. })
        ));
    }

    #[test]
    fn test_read_packet_truncated() {
        let wire = vec![0xAA, 0x55, 0x02, 0x00];
        assert!(matches!(
            read_packet(&mut Cursor::new(wire), TIMEOUT),
            Err(TransportError::Closed)
        ));
    }
}
