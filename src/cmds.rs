// Commands without response

/// Command code to stop the measurement process. The device needs ~10ms before the next request.
pub const RPLIDAR_CMD_STOP: u8 = 0x25;

/// Command code to reset the LIDAR core. The device needs ~500ms to come back.
pub const RPLIDAR_CMD_RESET: u8 = 0x40;

// Commands with a multi response

/// Command code to start a scan.
pub const RPLIDAR_CMD_SCAN: u8 = 0x20;

/// Command code to start a scan regardless of the motor speed.
pub const RPLIDAR_CMD_FORCE_SCAN: u8 = 0x21;

/// Command code to start an express scan. The capsule format is not decoded by this crate.
pub const RPLIDAR_CMD_EXPRESS_SCAN: u8 = 0x82;

// Commands with a single response

/// Command code to request device information (model, firmware, hardware, serial number).
pub const RPLIDAR_CMD_GET_DEVICE_INFO: u8 = 0x50;

/// Command code to request the device's health status.
pub const RPLIDAR_CMD_GET_DEVICE_HEALTH: u8 = 0x52;

/// Command code to request the sample duration of the scan modes.
pub const RPLIDAR_CMD_GET_SAMPLE_RATE: u8 = 0x59;

/// Command code to retrieve LIDAR configuration parameters.
pub const RPLIDAR_CMD_GET_LIDAR_CONF: u8 = 0x84;

/// A request understood by the RPLIDAR C1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Stop,
    Scan,
    ForceScan,
    GetInfo,
    GetHealth,
    Reset,
    ExpressScan,
    GetSampleRate,
    GetLidarConf,
}

impl Command {
    /// Every command, in opcode table order.
    pub const ALL: [Command; 9] = [
        Command::Stop,
        Command::Scan,
        Command::ForceScan,
        Command::GetInfo,
        Command::GetHealth,
        Command::Reset,
        Command::ExpressScan,
        Command::GetSampleRate,
        Command::GetLidarConf,
    ];

    /// The opcode byte sent after the request sync byte.
    #[inline]
    pub fn opcode(self) -> u8 {
        match self {
            Command::Stop => RPLIDAR_CMD_STOP,
            Command::Scan => RPLIDAR_CMD_SCAN,
            Command::ForceScan => RPLIDAR_CMD_FORCE_SCAN,
            Command::GetInfo => RPLIDAR_CMD_GET_DEVICE_INFO,
            Command::GetHealth => RPLIDAR_CMD_GET_DEVICE_HEALTH,
            Command::Reset => RPLIDAR_CMD_RESET,
            Command::ExpressScan => RPLIDAR_CMD_EXPRESS_SCAN,
            Command::GetSampleRate => RPLIDAR_CMD_GET_SAMPLE_RATE,
            Command::GetLidarConf => RPLIDAR_CMD_GET_LIDAR_CONF,
        }
    }

    /// Returns `false` for commands the device never answers.
    #[inline]
    pub fn expects_response(self) -> bool {
        !matches!(self, Command::Stop | Command::Reset)
    }

    /// Returns `true` for commands the device answers with a continuous stream.
    #[inline]
    pub fn starts_stream(self) -> bool {
        matches!(
            self,
            Command::Scan | Command::ForceScan | Command::ExpressScan
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn opcodes_match_wire_table() {
        assert_eq!(Command::Stop.opcode(), 0x25);
        assert_eq!(Command::Scan.opcode(), 0x20);
        assert_eq!(Command::ForceScan.opcode(), 0x21);
        assert_eq!(Command::GetInfo.opcode(), 0x50);
        assert_eq!(Command::GetHealth.opcode(), 0x52);
        assert_eq!(Command::Reset.opcode(), 0x40);
        assert_eq!(Command::ExpressScan.opcode(), 0x82);
        assert_eq!(Command::GetSampleRate.opcode(), 0x59);
        assert_eq!(Command::GetLidarConf.opcode(), 0x84);
    }

    #[test]
    fn opcodes_are_distinct() {
        let opcodes: HashSet<u8> = Command::ALL.iter().map(|c| c.opcode()).collect();
        assert_eq!(opcodes.len(), Command::ALL.len());
    }

    #[test]
    fn response_expectations() {
        assert!(!Command::Stop.expects_response());
        assert!(!Command::Reset.expects_response());
        assert!(Command::GetHealth.expects_response());
        assert!(Command::Scan.starts_stream());
        assert!(!Command::GetSampleRate.starts_stream());
        assert!(Command::ALL
            .iter()
            .filter(|c| c.starts_stream())
            .all(|c| c.expects_response()));
    }
}
