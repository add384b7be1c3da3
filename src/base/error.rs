use std::error;
use std::fmt;
use std::io;

/// Represents errors that can occur while talking to an RPLIDAR C1.
///
/// Any of these aborts the operation in progress. The device state is then unknown and a
/// reset is recommended before it is used again.
#[derive(Debug)]
pub enum Error {
    /// The response did not start with the expected sync bytes, the stream is desynchronized.
    FramingError { received: [u8; 2] },

    /// The response is well framed but not allowed here (illegal mode value, wrong mode for the
    /// command issued, unexpected payload size, unknown status code).
    ProtocolViolation { description: String },

    /// The device reported an error health status. Contains the device error code.
    DeviceFault { error_code: u16 },

    /// Reading from or writing to the transport failed or timed out.
    TransportFailure(io::Error),

    /// The device doesn't support this operation.
    NotSupported,

    /// The transport is currently owned by an active scan stream.
    TransportBusy,

    /// The execution of operation failed. Contains a description of the failure.
    OperationFail { description: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FramingError { received } => write!(
                f,
                "framing error: expected sync bytes A5 5A, got {:02X} {:02X}",
                received[0], received[1]
            ),
            Error::ProtocolViolation { description } => {
                write!(f, "protocol violation: {}", description)
            }
            Error::DeviceFault { error_code } => {
                write!(f, "device fault: error code {:#06X}", error_code)
            }
            Error::TransportFailure(err) => write!(f, "transport failure: {}", err),
            Error::NotSupported => write!(f, "operation not supported"),
            Error::TransportBusy => write!(f, "transport is owned by an active scan stream"),
            Error::OperationFail { description } => write!(f, "operation failed: {}", description),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::TransportFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::TransportFailure(err)
    }
}

impl Error {
    pub(crate) fn violation(description: impl Into<String>) -> Error {
        Error::ProtocolViolation {
            description: description.into(),
        }
    }
}

/// A specialized `Result` type for RPLIDAR C1 operations.
pub type Result<T> = std::result::Result<T, Error>;
