use crate::base::error::{Error, Result};
use log::{error, trace};
use std::io;

/// The byte-level capability the driver needs from a serial link.
///
/// Opening, closing and configuring the port (baud rate, flow control lines, read timeout)
/// stay with the caller. The driver only ever talks to the device through this trait.
pub trait Transport {
    /// Writes all bytes to the link.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes buffered output to the device.
    fn flush(&mut self) -> io::Result<()>;

    /// Reads up to `n` bytes, blocking until `n` bytes arrived or the link's read timeout
    /// expired. A short result means the timeout expired.
    fn read(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Number of bytes received and waiting in the input buffer.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Discards everything waiting in the input buffer.
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Returns `true` while the underlying link is usable.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        (**self).read(n)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        (**self).clear_input_buffer()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Reads exactly `n` bytes or fails with a timed out transport failure.
pub(crate) fn read_exact<T: Transport + ?Sized>(transport: &mut T, n: usize) -> Result<Vec<u8>> {
    trace!("Reading exactly {} bytes from transport", n);
    let data = transport.read(n)?;
    if data.len() != n {
        error!(
            "Short read from transport: expected {} bytes, got {}",
            n,
            data.len()
        );
        return Err(Error::TransportFailure(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("expected {} bytes, received {}", n, data.len()),
        )));
    }
    trace!("Read {:02X?}", data);
    Ok(data)
}

/// Writes `bytes` and flushes them, failing early if the link is closed.
pub(crate) fn write_all<T: Transport + ?Sized>(transport: &mut T, bytes: &[u8]) -> Result<()> {
    if !transport.is_open() {
        error!("Attempted to write {:02X?} to a closed transport", bytes);
        return Err(Error::TransportFailure(io::Error::new(
            io::ErrorKind::NotConnected,
            "transport is not open",
        )));
    }
    trace!("Writing {:02X?} to transport", bytes);
    transport.write(bytes)?;
    transport.flush()?;
    trace!("Transport flushed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::mock::MockTransport;

    #[test]
    fn read_exact_rejects_short_reads() {
        let mut transport = MockTransport::new();
        transport.push_input(&[1, 2, 3]);

        match read_exact(&mut transport, 5) {
            Err(Error::TransportFailure(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn write_all_refuses_closed_transport() {
        let mut transport = MockTransport::new();
        transport.close();

        assert!(matches!(
            write_all(&mut transport, &[0xA5, 0x25]),
            Err(Error::TransportFailure(_))
        ));
        assert!(transport.written().is_empty());
    }

    #[test]
    fn write_all_flushes() {
        let mut transport = MockTransport::new();
        write_all(&mut transport, &[0xA5, 0x52]).unwrap();
        assert_eq!(transport.written(), vec![0xA5, 0x52]);
        assert_eq!(transport.flush_count(), 1);
    }
}
