use std::time::Duration;

/// Pause after `Reset` before the device accepts requests again.
pub const RPLIDAR_DEFAULT_RESET_SETTLE: Duration = Duration::from_millis(500);

/// Sleep of the streaming task when only a partial record (plus slack) is buffered.
pub const RPLIDAR_DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Sleep of the streaming task when nothing at all is buffered.
pub const RPLIDAR_DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(500);

/// Bytes beyond one record that should be buffered before the streaming task reads eagerly.
pub const RPLIDAR_DEFAULT_BACKOFF_SLACK: usize = 5;

/// Default capacity of the consumer channel.
pub const RPLIDAR_DEFAULT_CHANNEL_CAPACITY: usize = 8192;

/// Longest single sleep of the streaming task, bounding how late it notices a cancellation.
pub const RPLIDAR_CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Largest single response payload the driver reads. Longer lengths come from a corrupt
/// descriptor.
pub const RPLIDAR_MAX_SINGLE_PAYLOAD: u32 = 1024;
