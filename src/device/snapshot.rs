//! # Snapshot Device Backend
//!
//! A JSON file that plays the part of a HayBox device: it answers the
//! identity query and configuration reads, and takes configuration writes.
//! Useful for editing a configuration offline and for exercising the whole
//! editor without hardware.
//!
//! File layout:
//!
//! ```json
//! {
//!   "device_info": { "firmware_name": "HayBox", "firmware_version": "3.0.0", "device_name": "B0XX" },
//!   "config": { "game_mode_configs": [ ... ] },
//!   "saved_at": "2026-10-19T08:00:00Z"
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DeviceConnector, HayBoxDevice, Port, PortProvider};
use crate::error::{HayBoxError, Result};
use crate::model::{Config, DeviceInfo};

/// On-disk contents of a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,

    #[serde(default)]
    pub config: Option<Config>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SnapshotFile {
    /// Snapshot of a freshly flashed device with an empty game mode list
    pub fn blank(device_name: &str) -> Self {
        Self {
            device_info: Some(DeviceInfo {
                firmware_name: "HayBox".to_string(),
                firmware_version: String::new(),
                device_name: device_name.to_string(),
            }),
            config: Some(Config::default()),
            saved_at: None,
        }
    }

    /// Read and parse a snapshot file
    pub async fn read(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the snapshot, replacing the file atomically
    pub async fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Device handle backed by a snapshot file
#[derive(Debug)]
pub struct SnapshotDevice {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl SnapshotDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SnapshotFile> {
        SnapshotFile::read(&self.path).await.map_err(|e| {
            HayBoxError::Device(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl HayBoxDevice for SnapshotDevice {
    async fn get_device_info(&self) -> Result<Option<DeviceInfo>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.device_info)
    }

    async fn get_config(&self) -> Result<Option<Config>> {
        let _guard = self.lock.lock().await;
        let snapshot = self.load().await?;
        debug!(
            "Loaded configuration with {} game modes from {}",
            snapshot.config.as_ref().map_or(0, |c| c.game_mode_configs.len()),
            self.path.display()
        );
        Ok(snapshot.config)
    }

    async fn set_config(&self, config: &Config) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load().await?;
        snapshot.config = Some(config.clone());
        snapshot.saved_at = Some(Utc::now());
        snapshot.write(&self.path).await.map_err(|e| {
            HayBoxError::Device(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        info!(
            "Wrote configuration with {} game modes to {}",
            config.game_mode_configs.len(),
            self.path.display()
        );
        Ok(true)
    }
}

/// Grants a snapshot file as the port
///
/// The grant fails when the file does not exist, the same way a host
/// refuses when no device is attached.
#[derive(Debug, Clone)]
pub struct SnapshotPortProvider {
    path: PathBuf,
}

impl SnapshotPortProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PortProvider for SnapshotPortProvider {
    async fn request_port(&self) -> Result<Port> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(HayBoxError::PortNotFound(format!(
                "snapshot file {} does not exist",
                self.path.display()
            )));
        }

        debug!("Granted snapshot port {}", self.path.display());
        Ok(Port::Snapshot {
            path: self.path.clone(),
        })
    }
}

/// Builds [`SnapshotDevice`] handles from snapshot ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotConnector;

impl DeviceConnector for SnapshotConnector {
    fn connect(&self, port: Port) -> Result<Arc<dyn HayBoxDevice>> {
        match port {
            Port::Snapshot { path } => Ok(Arc::new(SnapshotDevice::new(path))),
            other => Err(HayBoxError::Device(format!(
                "snapshot backend cannot open {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameModeConfig, GameModeId};
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config {
            game_mode_configs: vec![GameModeConfig {
                mode_id: GameModeId::Melee,
                name: "Melee".to_string(),
                ..GameModeConfig::default()
            }],
            other: serde_json::Map::new(),
        }
    }

    async fn write_snapshot(dir: &TempDir, snapshot: &SnapshotFile) -> PathBuf {
        let path = dir.path().join("device.json");
        snapshot.write(&path).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_identity_and_config() {
        let dir = TempDir::new().unwrap();
        let mut snapshot = SnapshotFile::blank("B0XX");
        snapshot.config = Some(sample_config());
        let path = write_snapshot(&dir, &snapshot).await;

        let device = SnapshotDevice::new(&path);
        let info = device.get_device_info().await.unwrap().unwrap();
        assert_eq!(info.device_name, "B0XX");
        assert_eq!(info.firmware_name, "HayBox");

        let config = device.get_config().await.unwrap().unwrap();
        assert_eq!(config, sample_config());
    }

    #[tokio::test]
    async fn test_missing_identity_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir, &SnapshotFile::default()).await;

        let device = SnapshotDevice::new(&path);
        assert!(device.get_device_info().await.unwrap().is_none());
        assert!(device.get_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_config_persists_and_stamps() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir, &SnapshotFile::blank("B0XX")).await;

        let device = SnapshotDevice::new(&path);
        assert!(device.set_config(&sample_config()).await.unwrap());

        let stored = SnapshotFile::read(&path).await.unwrap();
        assert_eq!(stored.config, Some(sample_config()));
        assert!(stored.saved_at.is_some());
        assert_eq!(stored.device_info.unwrap().device_name, "B0XX");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_back_keeps_fields_from_newer_firmware() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        let raw = r#"{
            "device_info": { "firmware_name": "HayBox", "device_name": "B0XX" },
            "config": {
                "game_mode_configs": [{
                    "mode_id": "MODE_MELEE",
                    "name": "A",
                    "analog_config": 7,
                    "button_remapping": [{ "physical_button": "BTN_LF1", "activates": "BTN_EXTRA1" }]
                }]
            }
        }"#;
        tokio::fs::write(&path, raw).await.unwrap();

        let device = SnapshotDevice::new(&path);
        let config = device.get_config().await.unwrap().unwrap();
        assert!(device.set_config(&config).await.unwrap());

        let stored = tokio::fs::read_to_string(&path).await.unwrap();
        let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
        let mode = &stored["config"]["game_mode_configs"][0];
        assert_eq!(mode["analog_config"], 7);
        assert_eq!(mode["button_remapping"][0]["activates"], "BTN_EXTRA1");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_device_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let device = SnapshotDevice::new(&path);
        match device.get_device_info().await {
            Err(HayBoxError::Device(msg)) => assert!(msg.contains("Failed to read")),
            other => panic!("Expected Device error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_port_provider_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let missing = SnapshotPortProvider::new(dir.path().join("absent.json"));
        assert!(matches!(
            missing.request_port().await,
            Err(HayBoxError::PortNotFound(_))
        ));

        let path = write_snapshot(&dir, &SnapshotFile::blank("B0XX")).await;
        let provider = SnapshotPortProvider::new(&path);
        assert_eq!(
            provider.request_port().await.unwrap(),
            Port::Snapshot { path }
        );
    }

    #[test]
    fn test_connector_rejects_serial_ports() {
        let result = SnapshotConnector.connect(Port::Serial {
            path: "/dev/ttyACM0".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_temp_path_sits_next_to_target() {
        assert_eq!(
            temp_path(Path::new("/tmp/device.json")),
            PathBuf::from("/tmp/device.json.tmp")
        );
    }
}
