//! Continuous scan streaming.
//!
//! After the device answered a scan request with a multi response, a dedicated task owns the
//! transport and decodes one record per iteration until it is cancelled. Samples are published
//! to a channel and, optionally, folded into a per-angle [`ScanSnapshot`]. Stopping the task
//! hands the transport back.

use crate::answers::RPLIDAR_RESP_MEASUREMENT_SIZE;
use crate::base::{read_exact, Error, Result, Transport};
use crate::events::{DeviceEvent, Observer};
use crate::internals::RPLIDAR_CANCEL_POLL_INTERVAL;
use crate::protocol::ResponseDescriptor;
use crate::types::{ChannelPolicy, ScanSample, ScanSnapshot, StreamOptions};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use log::{debug, error, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between a stream and whoever wants to stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Asks the stream to stop. It notices at its next iteration or backoff slice.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Totals of a finished stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Final snapshot, if the stream accumulated one.
    pub snapshot: Option<ScanSnapshot>,
    /// Samples handed to the consumer channel.
    pub samples_published: u64,
    /// Samples discarded from a full channel under [`ChannelPolicy::DropOldest`].
    pub samples_dropped: u64,
}

/// Everything a stopped stream gives back.
#[derive(Debug)]
pub struct StreamReport<T> {
    /// The transport, released by the stream.
    pub transport: T,
    pub summary: ScanSummary,
    /// Samples still queued in the channel when the stream was joined.
    pub unread: Vec<ScanSample>,
    /// Why the stream ended early, if it was not cancelled.
    pub error: Option<Error>,
}

/// Checks that a scan descriptor announces records the sample decoder understands.
pub(crate) fn check_record_length(descriptor: &ResponseDescriptor) -> Result<usize> {
    let record_length = descriptor.payload_length as usize;
    if record_length != RPLIDAR_RESP_MEASUREMENT_SIZE {
        error!(
            "Scan records of {} bytes are not supported (expected {})",
            record_length, RPLIDAR_RESP_MEASUREMENT_SIZE
        );
        return Err(Error::violation(format!(
            "scan record length {} is not supported, expected {}",
            record_length, RPLIDAR_RESP_MEASUREMENT_SIZE
        )));
    }
    Ok(record_length)
}

/// Handle to one running scan stream.
///
/// Dropping the handle cancels the stream and waits for it, discarding the transport. Use
/// [`StreamHandle::join`] (or `RplidarDevice::finish_scan`) to get the transport back.
#[derive(Debug)]
pub struct StreamHandle<T> {
    descriptor: ResponseDescriptor,
    cancel: CancelToken,
    samples: Receiver<ScanSample>,
    snapshot: Option<Arc<Mutex<ScanSnapshot>>>,
    worker: Option<JoinHandle<StreamReport<T>>>,
}

impl<T> StreamHandle<T> {
    /// The descriptor that started this stream.
    pub fn descriptor(&self) -> &ResponseDescriptor {
        &self.descriptor
    }

    /// Receiving end of the sample channel. It disconnects once the stream stopped and every
    /// queued sample was taken.
    pub fn samples(&self) -> &Receiver<ScanSample> {
        &self.samples
    }

    /// Point-in-time copy of the snapshot, `None` if the stream doesn't accumulate one.
    pub fn snapshot(&self) -> Option<ScanSnapshot> {
        self.snapshot.as_ref().map(|shared| {
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    /// A token that can stop the stream from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the streaming task has exited, cancelled or failed.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, |worker| worker.is_finished())
    }

    /// Cancels the stream, waits for the task to exit and returns the transport.
    pub fn join(mut self) -> Result<StreamReport<T>> {
        self.cancel.cancel();
        let worker = self.worker.take().ok_or_else(|| Error::OperationFail {
            description: "scan stream was already joined".to_owned(),
        })?;
        debug!("Waiting for scan stream to exit");
        let mut report = worker.join().map_err(|_| {
            error!("Scan stream task panicked, transport is lost");
            Error::OperationFail {
                description: "scan stream task panicked".to_owned(),
            }
        })?;
        report.unread = self.samples.try_iter().collect();
        debug!(
            "Scan stream joined: {} published, {} dropped, {} unread",
            report.summary.samples_published,
            report.summary.samples_dropped,
            report.unread.len()
        );
        Ok(report)
    }
}

impl<T> Drop for StreamHandle<T> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.cancel.cancel();
            if worker.join().is_err() {
                error!("Scan stream task panicked");
            }
        }
    }
}

/// Starts the streaming task on its own thread. `transport` must be positioned right after a
/// multi response descriptor.
pub(crate) fn spawn_stream<T>(
    transport: T,
    descriptor: ResponseDescriptor,
    options: &StreamOptions,
    observer: Arc<dyn Observer>,
) -> Result<StreamHandle<T>>
where
    T: Transport + Send + 'static,
{
    let record_length = check_record_length(&descriptor)?;
    let (sender, samples, drain) = match options.channel {
        ChannelPolicy::Unbounded => {
            let (tx, rx) = unbounded();
            (tx, rx, None)
        }
        ChannelPolicy::Block(capacity) => {
            let (tx, rx) = bounded(capacity.max(1));
            (tx, rx, None)
        }
        ChannelPolicy::DropOldest(capacity) => {
            let (tx, rx) = bounded(capacity.max(1));
            let drain = rx.clone();
            (tx, rx, Some(drain))
        }
    };
    let snapshot = options
        .accumulate_snapshot
        .then(|| Arc::new(Mutex::new(ScanSnapshot::new())));
    let cancel = CancelToken::new();

    let streamer = ScanStreamer {
        transport,
        record_length,
        slack: options.slack,
        backoff: options.backoff,
        idle_backoff: options.idle_backoff,
        cancel: cancel.clone(),
        sender,
        drain,
        snapshot: snapshot.clone(),
        observer,
        published: 0,
        dropped: 0,
    };

    debug!(
        "Spawning scan stream: record length {}, channel {:?}, snapshot {}",
        record_length, options.channel, options.accumulate_snapshot
    );
    let worker = thread::Builder::new()
        .name("rplidar-scan".to_owned())
        .spawn(move || streamer.run())
        .map_err(|e| Error::OperationFail {
            description: format!("failed to spawn scan stream: {}", e),
        })?;

    Ok(StreamHandle {
        descriptor,
        cancel,
        samples,
        snapshot,
        worker: Some(worker),
    })
}

struct ScanStreamer<T> {
    transport: T,
    record_length: usize,
    slack: usize,
    backoff: Duration,
    idle_backoff: Duration,
    cancel: CancelToken,
    sender: Sender<ScanSample>,
    drain: Option<Receiver<ScanSample>>,
    snapshot: Option<Arc<Mutex<ScanSnapshot>>>,
    observer: Arc<dyn Observer>,
    published: u64,
    dropped: u64,
}

impl<T: Transport> ScanStreamer<T> {
    fn run(mut self) -> StreamReport<T> {
        self.observer.notify(&DeviceEvent::StreamStarted {
            record_length: self.record_length,
        });
        let result = self.stream_samples();

        let ScanStreamer {
            transport,
            snapshot,
            observer,
            published,
            dropped,
            ..
        } = self;
        let summary = ScanSummary {
            snapshot: snapshot.map(|shared| {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            }),
            samples_published: published,
            samples_dropped: dropped,
        };

        let error = match result {
            Ok(()) => None,
            Err(e) => {
                error!("Scan stream failed: {}", e);
                observer.notify(&DeviceEvent::StreamFailed {
                    description: e.to_string(),
                });
                Some(e)
            }
        };
        debug!("Scan stream stopped after {} samples", published);
        observer.notify(&DeviceEvent::StreamStopped(summary.clone()));

        StreamReport {
            transport,
            summary,
            unread: Vec::new(),
            error,
        }
    }

    fn stream_samples(&mut self) -> Result<()> {
        let eager_threshold = self.record_length + self.slack;
        while !self.cancel.is_cancelled() {
            let available = self.transport.bytes_available()?;
            if available == 0 {
                self.pause(self.idle_backoff);
                continue;
            }
            if available < eager_threshold {
                trace!(
                    "{} bytes buffered, below {}, backing off",
                    available,
                    eager_threshold
                );
                self.pause(self.backoff);
                if self.cancel.is_cancelled() {
                    break;
                }
                if self.transport.bytes_available()? < self.record_length {
                    continue;
                }
            }

            let record = read_exact(&mut self.transport, self.record_length)?;
            let raw: [u8; RPLIDAR_RESP_MEASUREMENT_SIZE] = record
                [..RPLIDAR_RESP_MEASUREMENT_SIZE]
                .try_into()
                .map_err(|_| Error::violation("truncated scan record"))?;
            let sample = ScanSample::decode(&raw);
            trace!(
                "Sample: quality={}, angle={:.2}, distance={:?}",
                sample.quality,
                sample.angle_deg,
                sample.distance_mm
            );

            if !self.publish(sample) {
                debug!("Sample was not published, stopping scan stream");
                break;
            }

            // Only published samples reach the snapshot.
            if let Some(snapshot) = &self.snapshot {
                snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(&sample);
            }
        }
        Ok(())
    }

    /// Hands `sample` to the consumer according to the channel policy. Returns `false` when
    /// the stream should stop instead.
    fn publish(&mut self, mut sample: ScanSample) -> bool {
        loop {
            if let Some(drain) = &self.drain {
                match self.sender.try_send(sample) {
                    Ok(()) => break,
                    Err(TrySendError::Full(rejected)) => {
                        if drain.try_recv().is_ok() {
                            self.dropped += 1;
                            warn!("Sample channel full, dropped oldest sample");
                            self.observer.notify(&DeviceEvent::SampleDropped);
                        }
                        sample = rejected;
                    }
                    Err(TrySendError::Disconnected(_)) => return false,
                }
            } else {
                match self
                    .sender
                    .send_timeout(sample, RPLIDAR_CANCEL_POLL_INTERVAL)
                {
                    Ok(()) => break,
                    Err(SendTimeoutError::Timeout(rejected)) => {
                        if self.cancel.is_cancelled() {
                            debug!("Cancelled while waiting for room in the sample channel");
                            return false;
                        }
                        sample = rejected;
                    }
                    Err(SendTimeoutError::Disconnected(_)) => return false,
                }
            }
        }
        self.published += 1;
        true
    }

    /// Sleeps for `duration` in short slices, returning early once cancelled.
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(RPLIDAR_CANCEL_POLL_INTERVAL));
        }
    }
}
