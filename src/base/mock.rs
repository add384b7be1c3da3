use crate::base::transport::Transport;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

const REQUEST_SYNC_BYTE: u8 = 0xA5;

#[derive(Debug, Default)]
struct MockState {
    input: VecDeque<u8>,
    written: Vec<u8>,
    replies: HashMap<u8, VecDeque<Vec<u8>>>,
    closed: bool,
    flushes: usize,
    clears: usize,
    fail_with: Option<io::ErrorKind>,
}

/// Scripted in-memory transport for tests.
///
/// Clones share state, so a test can keep a clone to feed bytes or inspect writes while the
/// driver (or a stream task) owns another.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queues bytes in the input buffer right away.
    pub fn push_input(&self, bytes: &[u8]) {
        self.state().input.extend(bytes.iter().copied());
    }

    /// Queues `reply` to be delivered when a request with `opcode` is written.
    pub fn reply_to(&self, opcode: u8, reply: &[u8]) {
        self.state()
            .replies
            .entry(opcode)
            .or_default()
            .push_back(reply.to_vec());
    }

    /// Makes every subsequent read and availability query fail with `kind`.
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.state().fail_with = Some(kind);
    }

    pub fn close(&self) {
        self.state().closed = true;
    }

    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    pub fn pending_input(&self) -> usize {
        self.state().input.len()
    }

    pub fn flush_count(&self) -> usize {
        self.state().flushes
    }

    pub fn clear_count(&self) -> usize {
        self.state().clears
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        state.written.extend_from_slice(bytes);
        if bytes.len() == 2 && bytes[0] == REQUEST_SYNC_BYTE {
            let reply = state
                .replies
                .get_mut(&bytes[1])
                .and_then(|queue| queue.pop_front());
            if let Some(reply) = reply {
                state.input.extend(reply);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state().flushes += 1;
        Ok(())
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut state = self.state();
        if let Some(kind) = state.fail_with {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        let n = n.min(state.input.len());
        Ok(state.input.drain(..n).collect())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let state = self.state();
        if let Some(kind) = state.fail_with {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        Ok(state.input.len())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.input.clear();
        state.clears += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.state().closed
    }
}
