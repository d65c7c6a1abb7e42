//! # Error Types
//!
//! Custom error types for HayBox Config using `thiserror`.

use thiserror::Error;

/// Main error type for HayBox Config
#[derive(Debug, Error)]
pub enum HayBoxError {
    /// Device answered the identity query with nothing
    #[error("Could not get device info")]
    DeviceInfoUnavailable,

    /// Device reported that the configuration write did not take
    #[error("Failed to save configuration")]
    SaveRejected,

    /// Device-side failure reported by a backend
    #[error("Device error: {0}")]
    Device(String),

    /// No port was granted by the host
    #[error("No port available: {0}")]
    PortNotFound(String),

    /// Serial port enumeration or access errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Operation needs a connected device
    #[error("Not connected to a device")]
    NotConnected,

    /// Operation needs an open mode editor
    #[error("No game mode is open for editing")]
    EditorNotOpen,

    /// Positional argument outside the collection
    #[error("Index {index} is out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Unrecognised button, mode or field name typed by the user
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Settings file errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Snapshot file (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HayBox Config
pub type Result<T> = std::result::Result<T, HayBoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            HayBoxError::DeviceInfoUnavailable.to_string(),
            "Could not get device info"
        );
        assert_eq!(
            HayBoxError::SaveRejected.to_string(),
            "Failed to save configuration"
        );
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = HayBoxError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Index 4 is out of range (have 2)");
    }
}
