//! # RPLIDAR C1 Driver
//!
//! `rplidarc1` drives a Slamtec RPLIDAR C1 over any byte transport. It checks the device's
//! health, starts a continuous scan on a background task, decodes the 5-byte scan records
//! into [`ScanSample`]s and optionally keeps a per-degree [`ScanSnapshot`] of the latest
//! distances. Stopping or resetting the device is also covered.
//!
//! The driver never opens a port itself. Give it something implementing [`Transport`]
//! (with the `serial` feature, [`SerialTransport`] wraps a `serialport` port).
//!
//! ```ignore
//! use rplidarc1::{RplidarDevice, SerialTransport, StreamOptions};
//! use std::time::Duration;
//!
//! let port = serialport::new("/dev/ttyUSB0", 460_800)
//!     .timeout(Duration::from_secs(1))
//!     .open()?;
//! let mut lidar = RplidarDevice::new(SerialTransport::new(port));
//! lidar.healthcheck()?;
//!
//! let scan = lidar.start_scan(&StreamOptions::with_snapshot())?;
//! for sample in scan.samples().iter().take(500) {
//!     println!("{:6.2} deg -> {:?} mm", sample.angle_deg, sample.distance_mm);
//! }
//! let summary = lidar.finish_scan(scan)?;
//! let port = lidar.shutdown()?;
//! ```

extern crate byteorder;
extern crate crossbeam_channel;
extern crate log;

mod answers;
pub mod base;
mod cmds;
pub mod events;
mod internals;
mod protocol;
pub mod stream;
pub mod types;
pub mod utils;

#[cfg(feature = "serial")]
pub use crate::base::SerialTransport;
pub use crate::base::{Error, Result, Transport};
pub use crate::cmds::Command;
pub use crate::events::{DeviceEvent, NullObserver, Observer};
pub use crate::protocol::{encode_request, ResponseDescriptor, ResponseMode};
pub use crate::stream::{CancelToken, ScanSummary, StreamHandle, StreamReport};
pub use crate::types::{
    ChannelPolicy, DeviceHealth, HealthStatus, ScanSample, ScanSnapshot, StreamOptions,
};

use crate::answers::{
    RPLIDAR_ANS_HEALTH_SIZE, RPLIDAR_ANS_TYPE_DEVHEALTH, RPLIDAR_ANS_TYPE_MEASUREMENT,
};
use crate::base::read_exact;
use crate::internals::*;
use crate::protocol::send_request;
use crate::stream::{check_record_length, spawn_stream};
use log::{debug, error, trace, warn};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What a device answered to a request, resolved once from the descriptor mode.
#[derive(Debug)]
pub enum ResponseOutcome<T> {
    /// A single payload, already read. Empty for commands the device doesn't answer.
    Immediate(Vec<u8>),
    /// A multi response, now streaming on its own task.
    Stream(StreamHandle<T>),
}

/// Control interface of one RPLIDAR C1.
///
/// The device owns its transport between requests. While a scan streams, the transport
/// belongs to the [`StreamHandle`] and every request fails with [`Error::TransportBusy`]
/// until the handle is given back through [`RplidarDevice::finish_scan`].
pub struct RplidarDevice<T> {
    transport: Option<T>,
    observer: Arc<dyn Observer>,
    settle_interval: Duration,
}

impl<T> fmt::Debug for RplidarDevice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RplidarDevice")
            .field("streaming", &self.transport.is_none())
            .field("settle_interval", &self.settle_interval)
            .finish_non_exhaustive()
    }
}

impl<T> RplidarDevice<T>
where
    T: Transport + Send + 'static,
{
    /// Constructs a new `RplidarDevice` that talks through `transport`.
    pub fn new(transport: T) -> RplidarDevice<T> {
        RplidarDevice::with_observer(transport, Arc::new(NullObserver))
    }

    /// Constructs a new `RplidarDevice` reporting [`DeviceEvent`]s to `observer`.
    pub fn with_observer(transport: T, observer: Arc<dyn Observer>) -> RplidarDevice<T> {
        trace!("Creating new RplidarDevice");
        RplidarDevice {
            transport: Some(transport),
            observer,
            settle_interval: RPLIDAR_DEFAULT_RESET_SETTLE,
        }
    }

    /// Changes how long [`RplidarDevice::reset`] waits for the device to come back.
    pub fn set_settle_interval(&mut self, settle_interval: Duration) {
        self.settle_interval = settle_interval;
    }

    /// Returns `true` while a scan stream holds the transport.
    pub fn is_streaming(&self) -> bool {
        self.transport.is_none()
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or_else(|| {
            warn!("Transport requested while a scan stream owns it");
            Error::TransportBusy
        })
    }

    fn send(&mut self, command: Command) -> Result<()> {
        send_request(self.transport_mut()?, command)?;
        debug!("Sent {:?}", command);
        self.observer.notify(&DeviceEvent::CommandSent(command));
        Ok(())
    }

    fn read_descriptor(&mut self) -> Result<ResponseDescriptor> {
        let descriptor = ResponseDescriptor::read_from(self.transport_mut()?)?;
        debug!(
            "Descriptor: {} response, {} bytes, type {:02X}",
            descriptor.mode, descriptor.payload_length, descriptor.data_type
        );
        self.observer
            .notify(&DeviceEvent::DescriptorReceived(descriptor));
        Ok(descriptor)
    }

    fn read_payload(&mut self, descriptor: &ResponseDescriptor) -> Result<Vec<u8>> {
        if descriptor.payload_length > RPLIDAR_MAX_SINGLE_PAYLOAD {
            error!(
                "Single response announces {} bytes, limit is {}",
                descriptor.payload_length, RPLIDAR_MAX_SINGLE_PAYLOAD
            );
            return Err(Error::violation(format!(
                "single response of {} bytes exceeds the {} byte limit",
                descriptor.payload_length, RPLIDAR_MAX_SINGLE_PAYLOAD
            )));
        }
        read_exact(self.transport_mut()?, descriptor.payload_length as usize)
    }

    /// Takes the transport and hands it to a new scan stream. `descriptor` must already be
    /// a validated multi response.
    fn begin_stream(
        &mut self,
        descriptor: ResponseDescriptor,
        options: &StreamOptions,
    ) -> Result<StreamHandle<T>> {
        check_record_length(&descriptor)?;
        let transport = self.transport.take().ok_or(Error::TransportBusy)?;
        spawn_stream(transport, descriptor, options, self.observer.clone())
    }

    /// Queries the device health.
    ///
    /// # Returns
    ///
    /// * `Result<DeviceHealth>` - The decoded health on `Good` or `Warning` (a warning is
    ///   logged). An `Error` status fails with [`Error::DeviceFault`] carrying the device error
    ///   code. A multi answer or a payload other than 3 bytes is a protocol violation.
    pub fn healthcheck(&mut self) -> Result<DeviceHealth> {
        trace!("Checking device health");
        self.send(Command::GetHealth)?;
        let descriptor = self.read_descriptor()?;
        descriptor.expect_mode(ResponseMode::Single, Command::GetHealth)?;
        if descriptor.data_type != RPLIDAR_ANS_TYPE_DEVHEALTH {
            warn!(
                "Health answer has data type {:02X}, expected {:02X}",
                descriptor.data_type, RPLIDAR_ANS_TYPE_DEVHEALTH
            );
        }
        if descriptor.payload_length != RPLIDAR_ANS_HEALTH_SIZE {
            error!(
                "Health answer announces {} bytes, expected {}",
                descriptor.payload_length, RPLIDAR_ANS_HEALTH_SIZE
            );
            return Err(Error::violation(format!(
                "health payload of {} bytes, expected {}",
                descriptor.payload_length, RPLIDAR_ANS_HEALTH_SIZE
            )));
        }
        let payload = self.read_payload(&descriptor)?;
        let health = DeviceHealth::decode(&payload)?;
        self.observer.notify(&DeviceEvent::HealthChecked(health));

        match health.status {
            HealthStatus::Good => {
                debug!("Device health is good");
                Ok(health)
            }
            HealthStatus::Warning => {
                warn!("Device health warning, error code {:#06X}", health.error_code);
                Ok(health)
            }
            HealthStatus::Error => {
                error!("Device health error, error code {:#06X}", health.error_code);
                Err(Error::DeviceFault {
                    error_code: health.error_code,
                })
            }
        }
    }

    /// Starts a continuous scan and returns the handle of its stream.
    ///
    /// Stale input is discarded before the request goes out. The device must answer with a
    /// multi response of 5-byte records. On failure the device keeps its transport.
    ///
    /// # Arguments
    ///
    /// * `options` - Snapshot accumulation, `Scan` or `ForceScan`, channel policy and backoffs.
    ///
    /// # Returns
    ///
    /// * `Result<StreamHandle<T>>` - The running stream. It owns the transport until it is
    ///   handed to [`RplidarDevice::finish_scan`].
    pub fn start_scan(&mut self, options: &StreamOptions) -> Result<StreamHandle<T>> {
        let command = if options.force_scan {
            Command::ForceScan
        } else {
            Command::Scan
        };
        trace!("Starting scan with {:?}", command);
        self.transport_mut()?.clear_input_buffer()?;
        self.send(command)?;
        let descriptor = self.read_descriptor()?;
        descriptor.expect_mode(ResponseMode::Multi, command)?;
        if descriptor.data_type != RPLIDAR_ANS_TYPE_MEASUREMENT {
            warn!(
                "Scan answer has data type {:02X}, expected {:02X}",
                descriptor.data_type, RPLIDAR_ANS_TYPE_MEASUREMENT
            );
        }
        let handle = self.begin_stream(descriptor, options)?;
        debug!("Scan started");
        Ok(handle)
    }

    /// Sends any request and resolves the answer from its descriptor.
    ///
    /// Streaming commands must be answered in multi mode and every other command in single
    /// mode, otherwise the call fails with [`Error::ProtocolViolation`] and the device keeps
    /// its transport.
    ///
    /// # Arguments
    ///
    /// * `command` - The request to send.
    /// * `options` - Stream options, used only if the answer starts a stream.
    ///
    /// # Returns
    ///
    /// * `Result<ResponseOutcome<T>>` - An empty [`ResponseOutcome::Immediate`] for commands
    ///   the device doesn't answer, the payload of a single answer, or a running stream for a
    ///   multi answer.
    pub fn invoke(
        &mut self,
        command: Command,
        options: &StreamOptions,
    ) -> Result<ResponseOutcome<T>> {
        trace!("Invoking {:?}", command);
        self.send(command)?;
        if !command.expects_response() {
            return Ok(ResponseOutcome::Immediate(Vec::new()));
        }

        let descriptor = self.read_descriptor()?;
        let expected = if command.starts_stream() {
            ResponseMode::Multi
        } else {
            ResponseMode::Single
        };
        descriptor.expect_mode(expected, command)?;
        match descriptor.mode {
            ResponseMode::Single => {
                let payload = self.read_payload(&descriptor)?;
                trace!("{:?} answered {:02X?}", command, payload);
                Ok(ResponseOutcome::Immediate(payload))
            }
            ResponseMode::Multi => self
                .begin_stream(descriptor, options)
                .map(ResponseOutcome::Stream),
        }
    }

    /// Stops a stream started by this device, takes the transport back and stops the scan.
    ///
    /// # Arguments
    ///
    /// * `handle` - The stream returned by [`RplidarDevice::start_scan`] or
    ///   [`RplidarDevice::invoke`].
    ///
    /// # Returns
    ///
    /// * `Result<ScanSummary>` - Final snapshot and sample counts. If the stream ended because
    ///   the transport failed, that error is returned after the transport was reclaimed.
    pub fn finish_scan(&mut self, handle: StreamHandle<T>) -> Result<ScanSummary> {
        let report = handle.join()?;
        if self.transport.is_some() {
            warn!("Device already holds a transport, replacing it with the stream's");
        }
        self.transport = Some(report.transport);

        if let Some(err) = report.error {
            if let Err(stop_err) = self.stop() {
                warn!("Failed to stop scan after stream failure: {}", stop_err);
            }
            return Err(err);
        }
        self.stop()?;
        debug!(
            "Scan finished: {} samples published, {} dropped",
            report.summary.samples_published, report.summary.samples_dropped
        );
        Ok(report.summary)
    }

    /// Stops scanning. The device doesn't answer.
    pub fn stop(&mut self) -> Result<()> {
        trace!("Stopping device");
        self.send(Command::Stop)
    }

    /// Stops and resets the device core, then waits the settle interval.
    ///
    /// Nothing is read back. Bytes the device emits while rebooting stay in the input buffer
    /// and are discarded by the next [`RplidarDevice::start_scan`].
    pub fn reset(&mut self) -> Result<()> {
        trace!("Resetting device");
        self.send(Command::Stop)?;
        self.send(Command::Reset)?;
        thread::sleep(self.settle_interval);
        debug!("Device reset, settled for {:?}", self.settle_interval);
        self.observer.notify(&DeviceEvent::ResetCompleted);
        Ok(())
    }

    /// Device information is not decoded by this driver.
    pub fn get_info(&mut self) -> Result<()> {
        Err(Error::NotSupported)
    }

    /// Stops the device and hands the transport back for closing.
    pub fn shutdown(mut self) -> Result<T> {
        trace!("Shutting down device");
        self.stop()?;
        self.transport.take().ok_or(Error::TransportBusy)
    }
}
