//! # Device Boundary
//!
//! Trait abstraction for everything that talks to a HayBox device.
//!
//! The connection manager only sees three seams:
//! - [`PortProvider`]: asks the host for a port (the user grants access)
//! - [`DeviceConnector`]: turns a granted port into a device handle
//! - [`HayBoxDevice`]: identity query, configuration read and write
//!
//! Framing and message encoding live behind these traits. The bundled
//! backend is [`snapshot`], a JSON file that stands in for the device.

pub mod snapshot;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{Config, DeviceInfo};

/// Port granted by the host environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Port {
    /// Serial device node, e.g. `/dev/ttyACM0`
    Serial { path: String },
    /// Device snapshot file
    Snapshot { path: PathBuf },
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Serial { path } => write!(f, "serial:{}", path),
            Port::Snapshot { path } => write!(f, "snapshot:{}", path.display()),
        }
    }
}

/// Handle to a connected HayBox device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HayBoxDevice: Send + Sync {
    /// Query firmware and device identity; `None` when the device did not answer
    async fn get_device_info(&self) -> Result<Option<DeviceInfo>>;

    /// Read the full configuration; `None` when the device has none to give
    async fn get_config(&self) -> Result<Option<Config>>;

    /// Write the full configuration; `false` when the device refused it
    async fn set_config(&self, config: &Config) -> Result<bool>;
}

/// Host-side port request
#[async_trait]
pub trait PortProvider: Send + Sync {
    /// Ask for a port, prompting for consent where the host requires it
    async fn request_port(&self) -> Result<Port>;
}

/// Constructs device handles from granted ports
pub trait DeviceConnector: Send + Sync {
    fn connect(&self, port: Port) -> Result<Arc<dyn HayBoxDevice>>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::HayBoxError;
    use std::sync::Mutex;

    /// Port provider that hands out a fixed port, or fails
    pub struct StaticPortProvider {
        pub port: Option<Port>,
    }

    #[async_trait]
    impl PortProvider for StaticPortProvider {
        async fn request_port(&self) -> Result<Port> {
            self.port
                .clone()
                .ok_or_else(|| HayBoxError::PortNotFound("no port selected".to_string()))
        }
    }

    /// Connector that hands out a prepared device once
    pub struct PreparedConnector {
        pub device: Mutex<Option<Arc<dyn HayBoxDevice>>>,
        pub ports_seen: Mutex<Vec<Port>>,
    }

    impl PreparedConnector {
        pub fn new(device: Arc<dyn HayBoxDevice>) -> Self {
            Self {
                device: Mutex::new(Some(device)),
                ports_seen: Mutex::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self {
                device: Mutex::new(None),
                ports_seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl DeviceConnector for PreparedConnector {
        fn connect(&self, port: Port) -> Result<Arc<dyn HayBoxDevice>> {
            self.ports_seen.lock().unwrap().push(port);
            self.device
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| HayBoxError::Device("device handle construction failed".to_string()))
        }
    }
}
