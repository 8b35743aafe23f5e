// Controller -> host response discrimination
//
// Byte 0 of every response is ACK (0x00) or NCK (0x01). Anything after it is
// opcode-specific.

use crate::error::ProtocolError;

pub const ACK: u8 = 0x00;
pub const NCK: u8 = 0x01;

/// Split a response into its ACK and the opcode-specific remainder
pub fn expect_ack(response: &[u8]) -> Result<&[u8], ProtocolError> {
    match response.split_first() {
        None => Err(ProtocolError::Empty),
        Some((&ACK, rest)) => Ok(rest),
        Some((&NCK, _)) => Err(ProtocolError::Nack {
            response: response.to_vec(),
        }),
        Some((&other, _)) => Err(ProtocolError::UnexpectedAck {
            discriminator: other,
            response: response.to_vec(),
        }),
    }
}

/// Accept only a bare ACK, as returned for every command except GetStatus
pub fn expect_ack_only(response: &[u8]) -> Result<(), ProtocolError> {
    let rest = expect_ack(response)?;
    if !rest.is_empty() {
        return Err(ProtocolError::UnexpectedLength {
            expected: 1,
            response: response.to_vec(),
        });
    }
    Ok(())
}
