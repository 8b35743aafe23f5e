pub mod angle;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod protocol;
pub mod session;
pub mod sim;
pub mod status;
pub mod transport;

pub use angle::{Angle, normalize};
pub use error::{DriveError, ProtocolError, Result, UsageError};
pub use session::{HeadingState, Session};
pub use status::StatusPayload;
pub use transport::{SerialTransport, Transport, TransportError};
