// Wire codec for the drive controller link
//
// Provides:
// - Command -> frame encoding (host side) and frame decoding (device side)
// - ACK/NCK response discrimination

pub mod command;
pub mod response;

pub use command::{Command, Frame, FrameError, MAX_FRAME_LEN, Opcode};
pub use response::{ACK, NCK, expect_ack, expect_ack_only};
