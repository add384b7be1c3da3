/// Sync byte that starts every request and every response descriptor.
pub const RPLIDAR_CMD_SYNC_BYTE: u8 = 0xA5;

/// The two sync bytes at the start of a response descriptor.
pub const RPLIDAR_ANS_SYNC_BYTES: [u8; 2] = [RPLIDAR_CMD_SYNC_BYTE, 0x5A];

/// Length of a response descriptor, sync bytes included.
pub const RPLIDAR_ANS_DESCRIPTOR_SIZE: usize = 7;

/// Mask for the payload length in the size/mode word of a descriptor.
pub const RPLIDAR_ANS_HEADER_SIZE_MASK: u32 = 0x3FFF_FFFF;
/// Shift for the response mode in the size/mode word of a descriptor.
pub const RPLIDAR_ANS_HEADER_SUBTYPE_SHIFT: u32 = 30;

/// Response mode value for a single response.
pub const RPLIDAR_ANS_MODE_SINGLE: u8 = 0x0;
/// Response mode value for a continuous multi response.
pub const RPLIDAR_ANS_MODE_MULTI: u8 = 0x1;

/// Response data type of a device health answer.
pub const RPLIDAR_ANS_TYPE_DEVHEALTH: u8 = 0x6;

/// Payload size of a device health answer: status byte and little endian error code.
pub const RPLIDAR_ANS_HEALTH_SIZE: u32 = 3;

/// Response data type of a legacy measurement answer.
pub const RPLIDAR_ANS_TYPE_MEASUREMENT: u8 = 0x81;

// health status

/// Health status code indicating the LIDAR is operating correctly.
pub const RPLIDAR_HEALTH_STATUS_OK: u8 = 0;

/// Health status code indicating a non-critical warning. The LIDAR might still function.
pub const RPLIDAR_HEALTH_STATUS_WARNING: u8 = 1;

/// Health status code indicating a critical error. The LIDAR is likely non-operational.
pub const RPLIDAR_HEALTH_STATUS_ERROR: u8 = 2;

// Measurement answers

/// Size of one legacy measurement record.
pub const RPLIDAR_RESP_MEASUREMENT_SIZE: usize = 5;

/// Mask for extracting the start-of-revolution bit from the first record byte.
pub const RPLIDAR_RESP_MEASUREMENT_SYNCBIT: u8 = 1;
/// Bit shift for extracting the quality value from the first record byte.
pub const RPLIDAR_RESP_MEASUREMENT_QUALITY_SHIFT: u8 = 2;
/// Bit shift for extracting the low angle bits from the second record byte.
pub const RPLIDAR_RESP_MEASUREMENT_ANGLE_SHIFT: u8 = 1;
/// Position of the third record byte within the 15-bit angle.
pub const RPLIDAR_RESP_MEASUREMENT_ANGLE_HIGH_SHIFT: u16 = 7;
/// Angle is transmitted in Q6 fixed point degrees.
pub const RPLIDAR_RESP_MEASUREMENT_ANGLE_SCALE: f64 = 64.0;
/// Distance is transmitted in Q2 fixed point millimeters.
pub const RPLIDAR_RESP_MEASUREMENT_DISTANCE_SCALE: f64 = 4.0;
