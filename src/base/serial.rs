use crate::base::transport::Transport;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};

/// [`Transport`] over an already opened `serialport` port.
///
/// The port's configured timeout bounds every read. Flow control lines (the C1 wants DTR and
/// RTS low) are set by whoever opens the port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> SerialTransport {
        SerialTransport { port }
    }

    /// Gives the port back, e.g. to close it.
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; n];
        let mut filled = 0;
        while filled < n {
            match Read::read(&mut self.port, &mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let n = self.port.bytes_to_read()?;
        Ok(n as usize)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    /// `serialport` has no open flag, so the port counts as open while it still answers
    /// a buffer query.
    fn is_open(&self) -> bool {
        self.port.bytes_to_read().is_ok()
    }
}
