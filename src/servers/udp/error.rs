//! Errors for the UDP tracker. They are encoded on the wire as `action = 3`
//! responses carrying the error message.
use std::panic::Location;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The error message is fixed by the protocol: clients match on it to
    /// re-run the connect handshake.
    #[error("bad connection")]
    InvalidConnectionId { location: &'static Location<'static> },

    #[error("invalid port")]
    InvalidPort { location: &'static Location<'static> },

    #[error("{source}")]
    TrackerError { source: crate::core::error::Error },

    #[error("internal server error")]
    InternalServer {
        location: &'static Location<'static>,
        message: String,
    },
}

impl From<crate::core::error::Error> for Error {
    fn from(source: crate::core::error::Error) -> Self {
        Self::TrackerError { source }
    }
}
