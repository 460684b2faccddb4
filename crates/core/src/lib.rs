pub mod client;
pub mod error;
pub mod media;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::{ClientConfig, Connection};
pub use error::{ErrorKind, Result, RtspError};
pub use media::Frame;
pub use session::{SessionListener, SessionState};
