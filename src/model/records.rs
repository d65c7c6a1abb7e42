//! # Configuration Records
//!
//! Value types exchanged with the device. Every field is optional on the
//! wire and falls back to its default, so a partially populated record from
//! the device still loads. Fields this tool does not model are carried in
//! each record's `other` map and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{Button, GameModeId, SocdType};

/// Identity snapshot reported by the device once per connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub firmware_name: String,
    pub firmware_version: String,
    pub device_name: String,
}

/// One physical button rerouted to a logical button
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonRemap {
    pub physical_button: Button,
    pub activates: Button,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Field selector for [`ButtonRemap`] updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapField {
    PhysicalButton,
    Activates,
}

impl std::str::FromStr for RemapField {
    type Err = crate::error::HayBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physical" | "physical_button" | "physicalbutton" => Ok(RemapField::PhysicalButton),
            "activates" => Ok(RemapField::Activates),
            other => Err(crate::error::HayBoxError::InvalidValue(format!(
                "unknown remap field '{}' (expected physical or activates)",
                other
            ))),
        }
    }
}

impl ButtonRemap {
    /// Entry mapping `physical_button` to `activates`
    pub fn new(physical_button: Button, activates: Button) -> Self {
        Self {
            physical_button,
            activates,
            other: Map::new(),
        }
    }

    /// Copy of this entry with one side replaced
    pub fn with_field(self, field: RemapField, value: Button) -> Self {
        match field {
            RemapField::PhysicalButton => Self {
                physical_button: value,
                ..self
            },
            RemapField::Activates => Self {
                activates: value,
                ..self
            },
        }
    }
}

/// Pair of opposing buttons and how simultaneous presses resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocdPair {
    pub button_dir1: Button,
    pub button_dir2: Button,
    pub socd_type: SocdType,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SocdPair {
    pub fn new(button_dir1: Button, button_dir2: Button, socd_type: SocdType) -> Self {
        Self {
            button_dir1,
            button_dir2,
            socd_type,
            other: Map::new(),
        }
    }
}

/// One named game mode configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameModeConfig {
    pub mode_id: GameModeId,
    pub name: String,
    pub button_remapping: Vec<ButtonRemap>,
    pub socd_pairs: Vec<SocdPair>,
    pub activation_binding: Vec<Button>,
    pub custom_mode_config: u32,
    pub keyboard_mode_config: u32,
    pub rgb_config: u32,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Name given to game modes created from scratch
pub const NEW_MODE_NAME: &str = "New Mode";

impl GameModeConfig {
    /// Fresh record for the "add game mode" action
    ///
    /// Mode id is unspecified, every collection is empty and the sub-config
    /// handles are zero.
    pub fn new_mode() -> Self {
        Self {
            name: NEW_MODE_NAME.to_string(),
            ..Self::default()
        }
    }

    /// New record with the fields present in `update` replaced
    pub fn merged(&self, update: ModeUpdate) -> Self {
        Self {
            mode_id: update.mode_id.unwrap_or_else(|| self.mode_id.clone()),
            name: update.name.unwrap_or_else(|| self.name.clone()),
            button_remapping: update
                .button_remapping
                .unwrap_or_else(|| self.button_remapping.clone()),
            socd_pairs: update.socd_pairs.unwrap_or_else(|| self.socd_pairs.clone()),
            activation_binding: update
                .activation_binding
                .unwrap_or_else(|| self.activation_binding.clone()),
            custom_mode_config: update.custom_mode_config.unwrap_or(self.custom_mode_config),
            keyboard_mode_config: update
                .keyboard_mode_config
                .unwrap_or(self.keyboard_mode_config),
            rgb_config: update.rgb_config.unwrap_or(self.rgb_config),
            other: self.other.clone(),
        }
    }
}

/// Partial field set applied with [`GameModeConfig::merged`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeUpdate {
    pub mode_id: Option<GameModeId>,
    pub name: Option<String>,
    pub button_remapping: Option<Vec<ButtonRemap>>,
    pub socd_pairs: Option<Vec<SocdPair>>,
    pub activation_binding: Option<Vec<Button>>,
    pub custom_mode_config: Option<u32>,
    pub keyboard_mode_config: Option<u32>,
    pub rgb_config: Option<u32>,
}

impl ModeUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn mode_id(mut self, mode_id: GameModeId) -> Self {
        self.mode_id = Some(mode_id);
        self
    }

    pub fn button_remapping(mut self, remapping: Vec<ButtonRemap>) -> Self {
        self.button_remapping = Some(remapping);
        self
    }
}

/// Root configuration aggregate
///
/// Only the game mode list is edited here. Every other top-level field the
/// device sends is carried in `other` untouched, so writing the
/// configuration back never drops anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game_mode_configs: Vec<GameModeConfig>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Config {
    /// Copy of this configuration with the game mode list replaced
    pub fn with_game_modes(&self, game_mode_configs: Vec<GameModeConfig>) -> Self {
        Self {
            game_mode_configs,
            other: self.other.clone(),
        }
    }
}
