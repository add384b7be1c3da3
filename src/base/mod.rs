mod error;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "serial")]
mod serial;
mod transport;

pub use self::error::{Error, Result};
#[cfg(feature = "serial")]
pub use self::serial::SerialTransport;
pub use self::transport::Transport;
pub(crate) use self::transport::{read_exact, write_all};
