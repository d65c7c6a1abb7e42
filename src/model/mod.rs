//! # Configuration Model
//!
//! Value types for the HayBox configuration as this tool sees it.
//!
//! This module handles:
//! - Device identity (`DeviceInfo`)
//! - The root `Config` aggregate and its game mode records
//! - Fixed button, game mode and SOCD enumerations
//! - Structural update helpers used by the editors

pub mod enums;
pub mod records;

pub use enums::{button_options, Button, ButtonOption, GameModeId, RawEnumValue, SocdType};
pub use records::{
    ButtonRemap, Config, DeviceInfo, GameModeConfig, ModeUpdate, RemapField, SocdPair,
    NEW_MODE_NAME,
};
