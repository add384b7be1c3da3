use crate::cmds::Command;
use crate::protocol::ResponseDescriptor;
use crate::stream::ScanSummary;
use crate::types::DeviceHealth;

/// Something noteworthy that happened while driving the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A request was written and flushed.
    CommandSent(Command),
    /// A response descriptor was parsed.
    DescriptorReceived(ResponseDescriptor),
    /// A health check completed (also emitted when the status is an error).
    HealthChecked(DeviceHealth),
    /// The streaming task started, decoding records of `record_length` bytes.
    StreamStarted { record_length: usize },
    /// The consumer channel was full and the oldest queued sample was discarded.
    SampleDropped,
    /// The streaming task ended because the transport failed.
    StreamFailed { description: String },
    /// The streaming task ended and handed the transport back.
    StreamStopped(ScanSummary),
    /// The device was reset and has settled.
    ResetCompleted,
}

/// Receives [`DeviceEvent`]s from the device and from its streaming task.
///
/// Called on the thread that produced the event, so implementations should return quickly.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &DeviceEvent);
}

impl<F> Observer for F
where
    F: Fn(&DeviceEvent) + Send + Sync,
{
    fn notify(&self, event: &DeviceEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _event: &DeviceEvent) {}
}
