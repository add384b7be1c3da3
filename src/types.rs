use crate::answers::*;
use crate::base::{Error, Result};
use crate::internals::*;
use crate::utils::{angle_bucket, is_physical_angle, quantize_angle};
use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use std::collections::BTreeMap;
use std::time::Duration;

/// A single measurement decoded from a 5-byte scan record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSample {
    /// Signal quality, `0..=63`.
    pub quality: u8,
    /// Angle in degrees on the sensor's 1/3 degree grid, rounded to two decimals.
    pub angle_deg: f64,
    /// Distance in millimeters, `None` when the sensor got no return.
    pub distance_mm: Option<u16>,
    /// `true` for the first sample of a new revolution.
    pub start_of_revolution: bool,
}

impl ScanSample {
    /// Decodes one scan record.
    ///
    /// Every input decodes. Physically impossible values (e.g. angles above 360) are returned
    /// as they are.
    pub fn decode(record: &[u8; RPLIDAR_RESP_MEASUREMENT_SIZE]) -> ScanSample {
        let quality = record[0] >> RPLIDAR_RESP_MEASUREMENT_QUALITY_SHIFT;
        let start_of_revolution =
            (record[0] & RPLIDAR_RESP_MEASUREMENT_SYNCBIT) == RPLIDAR_RESP_MEASUREMENT_SYNCBIT;

        let angle_q6 = (record[1] >> RPLIDAR_RESP_MEASUREMENT_ANGLE_SHIFT) as u16
            | (record[2] as u16) << RPLIDAR_RESP_MEASUREMENT_ANGLE_HIGH_SHIFT;
        let angle_deg = quantize_angle(angle_q6 as f64 / RPLIDAR_RESP_MEASUREMENT_ANGLE_SCALE);

        let distance_q2 = LittleEndian::read_u16(&record[3..5]);
        let distance_mm = match distance_q2 {
            0 => None,
            raw => Some((raw as f64 / RPLIDAR_RESP_MEASUREMENT_DISTANCE_SCALE) as u16),
        };

        ScanSample {
            quality,
            angle_deg,
            distance_mm,
            start_of_revolution,
        }
    }

    /// Integer degree bucket this sample lands in.
    #[inline]
    pub fn angle_bucket(&self) -> u16 {
        angle_bucket(self.angle_deg)
    }

    /// Returns `true` if the sensor measured a distance for this sample.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.distance_mm.is_some()
    }
}

/// Health status reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Good,
    Warning,
    Error,
}

impl HealthStatus {
    pub fn from_code(code: u8) -> Option<HealthStatus> {
        match code {
            RPLIDAR_HEALTH_STATUS_OK => Some(HealthStatus::Good),
            RPLIDAR_HEALTH_STATUS_WARNING => Some(HealthStatus::Warning),
            RPLIDAR_HEALTH_STATUS_ERROR => Some(HealthStatus::Error),
            _ => None,
        }
    }
}

/// Decoded health answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHealth {
    pub status: HealthStatus,
    /// Device error code, meaningful for warnings and errors. Zero if the payload omits it.
    pub error_code: u16,
}

impl DeviceHealth {
    /// Decodes a health payload: status byte, then an optional little endian error code.
    pub fn decode(payload: &[u8]) -> Result<DeviceHealth> {
        let code = *payload
            .first()
            .ok_or_else(|| Error::violation("empty health payload"))?;
        let status = HealthStatus::from_code(code)
            .ok_or_else(|| Error::violation(format!("unknown health status {}", code)))?;
        let error_code = if payload.len() >= 3 {
            LittleEndian::read_u16(&payload[1..3])
        } else {
            0
        };
        Ok(DeviceHealth { status, error_code })
    }
}

/// Latest distance per integer angle bucket for one scan.
///
/// A bucket is present once a sample landed in it. Its value is `None` if that latest sample
/// had no return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSnapshot {
    buckets: BTreeMap<u16, Option<u16>>,
}

impl ScanSnapshot {
    pub fn new() -> ScanSnapshot {
        ScanSnapshot::default()
    }

    /// Records `sample`, overwriting whatever its bucket held.
    ///
    /// Samples with an angle beyond one revolution are skipped. Returns `true` if the sample
    /// was recorded.
    pub fn record(&mut self, sample: &ScanSample) -> bool {
        if !is_physical_angle(sample.angle_deg) {
            trace!("Skipping sample at {:.2} deg for the snapshot", sample.angle_deg);
            return false;
        }
        self.buckets.insert(sample.angle_bucket(), sample.distance_mm);
        true
    }

    /// `None` if the bucket was never filled, `Some(distance)` otherwise.
    pub fn get(&self, bucket: u16) -> Option<Option<u16>> {
        self.buckets.get(&bucket).copied()
    }

    /// Number of buckets filled so far.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Filled buckets in ascending angle order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, Option<u16>)> + '_ {
        self.buckets.iter().map(|(bucket, distance)| (*bucket, *distance))
    }
}

/// What the streaming task does when the consumer channel is full.
///
/// Capacities of 0 are treated as 1. The default is [`ChannelPolicy::Block`] with
/// `RPLIDAR_DEFAULT_CHANNEL_CAPACITY` (8192) samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPolicy {
    /// Never full. Memory grows if the consumer falls behind.
    Unbounded,
    /// Holds up to the given number of samples; the task waits for room.
    Block(usize),
    /// Holds up to the given number of samples; the oldest queued sample is discarded.
    DropOldest(usize),
}

impl Default for ChannelPolicy {
    fn default() -> ChannelPolicy {
        ChannelPolicy::Block(RPLIDAR_DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Options for starting a scan stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Keep a per-angle snapshot of the latest distances.
    pub accumulate_snapshot: bool,

    /// Send `ForceScan` instead of `Scan`, starting even if the motor speed is not stable.
    pub force_scan: bool,

    /// Capacity policy of the consumer channel.
    pub channel: ChannelPolicy,

    /// Sleep when less than a record plus `slack` bytes are buffered.
    pub backoff: Duration,

    /// Sleep when nothing at all is buffered.
    pub idle_backoff: Duration,

    /// Extra bytes beyond one record that must be buffered before reading without delay.
    pub slack: usize,
}

impl StreamOptions {
    /// Options that also accumulate a snapshot.
    pub fn with_snapshot() -> StreamOptions {
        StreamOptions {
            accumulate_snapshot: true,
            ..StreamOptions::default()
        }
    }

    /// Options that force the scan to start.
    pub fn force_scan() -> StreamOptions {
        StreamOptions {
            force_scan: true,
            ..StreamOptions::default()
        }
    }

    /// Sets the capacity policy of the consumer channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - [`ChannelPolicy::Unbounded`], [`ChannelPolicy::Block`] or
    ///   [`ChannelPolicy::DropOldest`].
    pub fn channel(mut self, channel: ChannelPolicy) -> StreamOptions {
        self.channel = channel;
        self
    }

    /// Sets how long the streaming task sleeps when it has too little to read.
    ///
    /// # Arguments
    ///
    /// * `backoff` - Sleep when a partial backlog (less than a record plus `slack`) is buffered.
    /// * `idle_backoff` - Sleep when nothing is buffered.
    ///
    /// # Returns
    ///
    /// * `StreamOptions` - The updated options, for chaining.
    pub fn backoff(mut self, backoff: Duration, idle_backoff: Duration) -> StreamOptions {
        self.backoff = backoff;
        self.idle_backoff = idle_backoff;
        self
    }

    /// Sets the bytes beyond one record that must be buffered to read without a backoff.
    pub fn slack(mut self, slack: usize) -> StreamOptions {
        self.slack = slack;
        self
    }
}

impl Default for StreamOptions {
    /// No snapshot, regular scan, blocking bounded channel, default backoffs.
    fn default() -> StreamOptions {
        StreamOptions {
            accumulate_snapshot: false,
            force_scan: false,
            channel: ChannelPolicy::default(),
            backoff: RPLIDAR_DEFAULT_BACKOFF,
            idle_backoff: RPLIDAR_DEFAULT_IDLE_BACKOFF,
            slack: RPLIDAR_DEFAULT_BACKOFF_SLACK,
        }
    }
}
