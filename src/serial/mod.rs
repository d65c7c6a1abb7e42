//! # Serial Port Discovery
//!
//! Finds the serial port a HayBox controller is attached to.
//!
//! This module handles:
//! - Enumerating the host's serial ports
//! - Flagging likely HayBox controllers by USB vendor id
//! - Granting a port: the configured path as is, otherwise the first likely candidate
//! - Checking that the granted port can actually be opened

use async_trait::async_trait;
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, info, warn};

use crate::device::{Port, PortProvider};
use crate::error::{HayBoxError, Result};

/// Raspberry Pi (RP2040 boards such as the Pico)
pub const VID_RASPBERRY_PI: u16 = 0x2E8A;

/// Arduino SA (ATmega32U4 boards)
pub const VID_ARDUINO: u16 = 0x2341;

/// USB vendor ids HayBox firmware enumerates under by default
pub const DEFAULT_VENDOR_IDS: &[u16] = &[VID_RASPBERRY_PI, VID_ARDUINO];

/// Default baud rate for the configuration link (USB CDC ignores it)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// One serial port seen on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Device path (e.g., /dev/ttyACM0)
    pub path: String,
    /// USB vendor/product id, when the port is USB
    pub usb_id: Option<(u16, u16)>,
    /// Product string reported over USB
    pub product: Option<String>,
    /// Vendor id matches a board HayBox runs on
    pub likely_haybox: bool,
}

/// Classify a port reported by the OS
///
/// # Arguments
///
/// * `info` - Port as reported by `tokio_serial::available_ports`
/// * `vendor_ids` - USB vendor ids treated as HayBox boards
pub fn classify(info: &SerialPortInfo, vendor_ids: &[u16]) -> PortCandidate {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => PortCandidate {
            path: info.port_name.clone(),
            usb_id: Some((usb.vid, usb.pid)),
            product: usb.product.clone(),
            likely_haybox: vendor_ids.contains(&usb.vid),
        },
        _ => PortCandidate {
            path: info.port_name.clone(),
            usb_id: None,
            product: None,
            likely_haybox: false,
        },
    }
}

/// List the host's serial ports, likely HayBox controllers first
///
/// # Errors
///
/// Returns error if the OS port enumeration fails
pub fn list_ports(vendor_ids: &[u16]) -> Result<Vec<PortCandidate>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| HayBoxError::Serial(format!("Failed to enumerate serial ports: {}", e)))?;

    let mut candidates: Vec<PortCandidate> =
        ports.iter().map(|info| classify(info, vendor_ids)).collect();
    // Stable sort keeps OS order within each group
    candidates.sort_by_key(|c| !c.likely_haybox);

    debug!("Found {} serial ports", candidates.len());
    Ok(candidates)
}

/// Pick the port to use
///
/// A configured path always wins. Otherwise the first likely HayBox
/// candidate is used.
pub fn select_port(configured: Option<&str>, candidates: &[PortCandidate]) -> Option<String> {
    if let Some(path) = configured.filter(|p| !p.is_empty()) {
        return Some(path.to_string());
    }

    candidates
        .iter()
        .find(|c| c.likely_haybox)
        .map(|c| c.path.clone())
}

/// Grants serial ports to the connection manager
#[derive(Debug, Clone)]
pub struct SerialPortProvider {
    configured_path: Option<String>,
    baud_rate: u32,
    vendor_ids: Vec<u16>,
}

impl SerialPortProvider {
    pub fn new(configured_path: Option<String>, baud_rate: u32, vendor_ids: Vec<u16>) -> Self {
        Self {
            configured_path,
            baud_rate,
            vendor_ids,
        }
    }

    /// Open and immediately release the port to confirm access
    fn probe(&self, path: &str) -> Result<()> {
        tokio_serial::new(path, self.baud_rate)
            .open()
            .map(drop)
            .map_err(|e| HayBoxError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

#[async_trait]
impl PortProvider for SerialPortProvider {
    async fn request_port(&self) -> Result<Port> {
        let path = match self.configured_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => path.to_string(),
            None => {
                let candidates = list_ports(&self.vendor_ids)?;
                select_port(None, &candidates).ok_or_else(|| {
                    HayBoxError::PortNotFound(format!(
                        "no serial port with vendor id in [{}]",
                        self.vendor_ids
                            .iter()
                            .map(|vid| format!("{:04x}", vid))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })?
            }
        };

        if let Err(e) = self.probe(&path) {
            warn!("{}", e);
            return Err(e);
        }

        info!("Granted serial port {} at {} baud", path, self.baud_rate);
        Ok(Port::Serial { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::UsbPortInfo;

    fn usb_port(name: &str, vid: u16) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid: 0x000A,
                serial_number: None,
                manufacturer: None,
                product: Some("Pico".to_string()),
            }),
        }
    }

    fn candidate(path: &str, likely_haybox: bool) -> PortCandidate {
        PortCandidate {
            path: path.to_string(),
            usb_id: None,
            product: None,
            likely_haybox,
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(VID_RASPBERRY_PI, 0x2E8A);
        assert_eq!(VID_ARDUINO, 0x2341);
        assert_eq!(DEFAULT_VENDOR_IDS.len(), 2);
    }

    #[test]
    fn test_classify_usb_port_by_vendor() {
        let pico = classify(&usb_port("/dev/ttyACM0", VID_RASPBERRY_PI), DEFAULT_VENDOR_IDS);
        assert!(pico.likely_haybox);
        assert_eq!(pico.usb_id, Some((VID_RASPBERRY_PI, 0x000A)));
        assert_eq!(pico.product.as_deref(), Some("Pico"));

        let other = classify(&usb_port("/dev/ttyUSB0", 0x0403), DEFAULT_VENDOR_IDS);
        assert!(!other.likely_haybox);
    }

    #[test]
    fn test_classify_non_usb_port() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };
        let c = classify(&info, DEFAULT_VENDOR_IDS);
        assert!(!c.likely_haybox);
        assert_eq!(c.usb_id, None);
    }

    #[test]
    fn test_select_prefers_configured_path() {
        let candidates = vec![candidate("/dev/ttyACM0", true)];
        assert_eq!(
            select_port(Some("/dev/ttyACM3"), &candidates),
            Some("/dev/ttyACM3".to_string())
        );
    }

    #[test]
    fn test_select_first_likely_candidate() {
        let candidates = vec![
            candidate("/dev/ttyS0", false),
            candidate("/dev/ttyACM1", true),
            candidate("/dev/ttyACM2", true),
        ];
        assert_eq!(select_port(None, &candidates), Some("/dev/ttyACM1".to_string()));
        assert_eq!(select_port(Some(""), &candidates), Some("/dev/ttyACM1".to_string()));
    }

    #[test]
    fn test_select_nothing_without_candidates() {
        let candidates = vec![candidate("/dev/ttyS0", false)];
        assert_eq!(select_port(None, &candidates), None);
    }

    #[test]
    fn test_probe_invalid_path_returns_error() {
        let provider = SerialPortProvider::new(None, DEFAULT_BAUD_RATE, DEFAULT_VENDOR_IDS.to_vec());
        match provider.probe("/dev/nonexistent_serial_device_12345") {
            Err(HayBoxError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_configured_port_is_probed() {
        let path = "/dev/nonexistent_serial_device_12345";
        let provider = SerialPortProvider::new(
            Some(path.to_string()),
            DEFAULT_BAUD_RATE,
            DEFAULT_VENDOR_IDS.to_vec(),
        );
        match provider.request_port().await {
            Err(HayBoxError::Serial(msg)) => assert!(msg.contains(path)),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Only meaningful with a controller plugged in
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_request_port_with_real_hardware() {
        let provider = SerialPortProvider::new(None, DEFAULT_BAUD_RATE, DEFAULT_VENDOR_IDS.to_vec());
        match provider.request_port().await {
            Ok(port) => println!("Granted {}", port),
            Err(e) => println!("No HayBox hardware detected ({})", e),
        }
    }
}
