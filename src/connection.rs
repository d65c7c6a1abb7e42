//! # Connection Manager
//!
//! Owns the device handle for a session and tracks where the connection
//! stands. A connect attempt asks the host for a port, builds a device handle
//! on it, checks the device identity and pulls the initial configuration.
//! Any failure on that path lands in [`ConnectionStatus::Error`] with a
//! message for the user; nothing is retried.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::device::{DeviceConnector, HayBoxDevice, PortProvider};
use crate::error::{HayBoxError, Result};
use crate::model::{Config, DeviceInfo};

/// Message shown when a connect failure carries no text of its own
pub const CONNECT_FAILED_FALLBACK: &str = "Failed to connect to device";

/// Where the connection stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Session-scoped owner of the device handle
pub struct ConnectionManager<P, C> {
    ports: P,
    connector: C,
    status: ConnectionStatus,
    device: Option<Arc<dyn HayBoxDevice>>,
    device_info: Option<DeviceInfo>,
    config: Option<Arc<Config>>,
    error_message: String,
}

impl<P, C> std::fmt::Debug for ConnectionManager<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &self.status)
            .field("device_info", &self.device_info)
            .field("has_config", &self.config.is_some())
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}

impl<P: PortProvider, C: DeviceConnector> ConnectionManager<P, C> {
    pub fn new(ports: P, connector: C) -> Self {
        Self {
            ports,
            connector,
            status: ConnectionStatus::Disconnected,
            device: None,
            device_info: None,
            config: None,
            error_message: String::new(),
        }
    }

    /// Connect to a device
    ///
    /// `&mut self` keeps connects from overlapping. A connect whose future
    /// was dropped leaves the status at `Connecting` until the next call.
    /// On success the status is `Connected` and identity plus configuration
    /// are populated (the configuration stays empty if the device had none
    /// to give). On failure the status is `Error`, the handle and identity
    /// are cleared, and [`error_message`](Self::error_message) holds the
    /// reason.
    pub async fn connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
        self.error_message.clear();

        match self.establish().await {
            Ok(()) => {
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.status = ConnectionStatus::Error;
                self.error_message = failure_message(&e, CONNECT_FAILED_FALLBACK);
                self.device = None;
                self.device_info = None;
                self.config = None;
            }
        }
    }

    async fn establish(&mut self) -> Result<()> {
        let port = self.ports.request_port().await?;
        info!("Port granted: {}", port);

        let device = self.connector.connect(port)?;
        self.device = Some(Arc::clone(&device));

        let info = device
            .get_device_info()
            .await?
            .ok_or(HayBoxError::DeviceInfoUnavailable)?;
        info!(
            "Connected to {} ({} {})",
            info.device_name, info.firmware_name, info.firmware_version
        );
        self.device_info = Some(info);

        match device.get_config().await? {
            Some(config) => {
                info!("Loaded {} game modes", config.game_mode_configs.len());
                self.config = Some(Arc::new(config));
            }
            None => warn!("Device returned no configuration"),
        }

        Ok(())
    }

    /// Drop the device handle, identity and configuration
    ///
    /// The device itself is not told; the handle is simply released.
    pub fn disconnect(&mut self) {
        if self.device.is_some() {
            info!("Disconnected");
        }
        self.device = None;
        self.device_info = None;
        self.config = None;
        self.status = ConnectionStatus::Disconnected;
        self.error_message.clear();
    }

    /// Adopt a configuration published by the list editor
    pub fn handle_config_change(&mut self, config: Arc<Config>) {
        self.config = Some(config);
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn device(&self) -> Option<Arc<dyn HayBoxDevice>> {
        self.device.clone()
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn config(&self) -> Option<Arc<Config>> {
        self.config.clone()
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }
}

/// User-facing text for a failure, with a fallback when the error is silent
pub fn failure_message(err: &HayBoxError, fallback: &str) -> String {
    let message = match err {
        HayBoxError::Device(msg) | HayBoxError::PortNotFound(msg) | HayBoxError::Serial(msg) => {
            msg.clone()
        }
        other => other.to_string(),
    };

    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
