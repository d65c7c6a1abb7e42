//! # Fixed Enumerations
//!
//! Logical buttons, game mode identifiers and SOCD resolution types as the
//! HayBox firmware numbers them. Every enumeration can be looked up by its
//! numeric value or by name, and serializes as its wire name (`"BTN_LF1"`).
//!
//! Values outside the tables (a newer firmware, or a bare number) load as
//! `Unknown` and serialize back exactly as they were read.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::HayBoxError;

/// Enumeration value as read from the device when it matches no known member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEnumValue {
    Number(i64),
    Name(String),
}

/// Declares a firmware enumeration together with its value/name tables.
macro_rules! firmware_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $prefix:literal {
            $( $variant:ident = $value:literal => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )+
            /// Value not in the table, kept verbatim
            Unknown(RawEnumValue),
        }

        impl $name {
            /// Every known member, in numeric order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric value as the firmware sees it; `None` for an unknown name
            pub fn value(&self) -> Option<i64> {
                match self {
                    $($name::$variant => Some($value),)+
                    $name::Unknown(RawEnumValue::Number(n)) => Some(*n),
                    $name::Unknown(RawEnumValue::Name(_)) => None,
                }
            }

            /// Reverse lookup of a known member by numeric value
            pub fn from_value(value: i64) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Full enumeration name, e.g. `BTN_LF1`; an unknown number reads as digits
            pub fn wire_name(&self) -> Cow<'_, str> {
                match self {
                    $($name::$variant => Cow::Borrowed($wire),)+
                    $name::Unknown(RawEnumValue::Name(name)) => Cow::Borrowed(name.as_str()),
                    $name::Unknown(RawEnumValue::Number(n)) => Cow::Owned(n.to_string()),
                }
            }

            /// Lookup of a known member by full enumeration name
            pub fn from_wire_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }

            /// Short display label: prefix stripped, first `_` turned into a space
            pub fn label(&self) -> String {
                let wire = self.wire_name();
                let name: &str = &wire;
                name.strip_prefix($prefix).unwrap_or(name).replacen('_', " ", 1)
            }

            fn from_raw(raw: RawEnumValue) -> Self {
                let known = match &raw {
                    RawEnumValue::Number(n) => $name::from_value(*n),
                    RawEnumValue::Name(name) => $name::from_wire_name(name),
                };
                known.unwrap_or($name::Unknown(raw))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $name::Unknown(raw) => raw.serialize(serializer),
                    known => serializer.serialize_str(&known.wire_name()),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawEnumValue::deserialize(deserializer).map($name::from_raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.wire_name())
            }
        }

        impl FromStr for $name {
            type Err = HayBoxError;

            /// Accepts the wire name, the display label, or the numeric value
            /// of a known member (case-insensitive).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let input = s.trim();
                if let Ok(value) = input.parse::<i64>() {
                    return $name::from_value(value).ok_or_else(|| {
                        HayBoxError::InvalidValue(format!("no {} with value {}", stringify!($name), value))
                    });
                }

                let upper = input.to_ascii_uppercase();
                $name::from_wire_name(&upper)
                    .or_else(|| $name::from_wire_name(&format!("{}{}", $prefix, upper.replace(' ', "_"))))
                    .or_else(|| {
                        $name::ALL
                            .iter()
                            .find(|member| member.label().eq_ignore_ascii_case(input))
                            .cloned()
                    })
                    .ok_or_else(|| {
                        HayBoxError::InvalidValue(format!("unknown {} '{}'", stringify!($name), input))
                    })
            }
        }
    };
}

firmware_enum! {
    /// Logical button identifiers
    ///
    /// Buttons are grouped by position on the controller: left fingers (LF),
    /// left thumbs (LT), middle buttons (MB), right thumbs (RT) and right
    /// fingers (RF).
    pub enum Button: "BTN_" {
        Unspecified = 0 => "BTN_UNSPECIFIED",
        Lf1 = 1 => "BTN_LF1",
        Lf2 = 2 => "BTN_LF2",
        Lf3 = 3 => "BTN_LF3",
        Lf4 = 4 => "BTN_LF4",
        Lf5 = 5 => "BTN_LF5",
        Lf6 = 6 => "BTN_LF6",
        Lf7 = 7 => "BTN_LF7",
        Lf8 = 8 => "BTN_LF8",
        Lf9 = 9 => "BTN_LF9",
        Lf10 = 10 => "BTN_LF10",
        Lf11 = 11 => "BTN_LF11",
        Lf12 = 12 => "BTN_LF12",
        Lf13 = 13 => "BTN_LF13",
        Lf14 = 14 => "BTN_LF14",
        Lf15 = 15 => "BTN_LF15",
        Lf16 = 16 => "BTN_LF16",
        Lt1 = 17 => "BTN_LT1",
        Lt2 = 18 => "BTN_LT2",
        Lt3 = 19 => "BTN_LT3",
        Lt4 = 20 => "BTN_LT4",
        Lt5 = 21 => "BTN_LT5",
        Lt6 = 22 => "BTN_LT6",
        Lt7 = 23 => "BTN_LT7",
        Lt8 = 24 => "BTN_LT8",
        Mb1 = 25 => "BTN_MB1",
        Mb2 = 26 => "BTN_MB2",
        Mb3 = 27 => "BTN_MB3",
        Mb4 = 28 => "BTN_MB4",
        Mb5 = 29 => "BTN_MB5",
        Mb6 = 30 => "BTN_MB6",
        Mb7 = 31 => "BTN_MB7",
        Mb8 = 32 => "BTN_MB8",
        Mb9 = 33 => "BTN_MB9",
        Mb10 = 34 => "BTN_MB10",
        Mb11 = 35 => "BTN_MB11",
        Mb12 = 36 => "BTN_MB12",
        Rt1 = 37 => "BTN_RT1",
        Rt2 = 38 => "BTN_RT2",
        Rt3 = 39 => "BTN_RT3",
        Rt4 = 40 => "BTN_RT4",
        Rt5 = 41 => "BTN_RT5",
        Rt6 = 42 => "BTN_RT6",
        Rt7 = 43 => "BTN_RT7",
        Rt8 = 44 => "BTN_RT8",
        Rf1 = 45 => "BTN_RF1",
        Rf2 = 46 => "BTN_RF2",
        Rf3 = 47 => "BTN_RF3",
        Rf4 = 48 => "BTN_RF4",
        Rf5 = 49 => "BTN_RF5",
        Rf6 = 50 => "BTN_RF6",
        Rf7 = 51 => "BTN_RF7",
        Rf8 = 52 => "BTN_RF8",
        Rf9 = 53 => "BTN_RF9",
        Rf10 = 54 => "BTN_RF10",
        Rf11 = 55 => "BTN_RF11",
        Rf12 = 56 => "BTN_RF12",
        Rf13 = 57 => "BTN_RF13",
        Rf14 = 58 => "BTN_RF14",
        Rf15 = 59 => "BTN_RF15",
        Rf16 = 60 => "BTN_RF16",
    }
}

firmware_enum! {
    /// Game mode identifiers
    pub enum GameModeId: "MODE_" {
        Unspecified = 0 => "MODE_UNSPECIFIED",
        Melee = 1 => "MODE_MELEE",
        ProjectM = 2 => "MODE_PROJECT_M",
        Ultimate = 3 => "MODE_ULTIMATE",
        Fgc = 4 => "MODE_FGC",
        RivalsOfAether = 5 => "MODE_RIVALS_OF_AETHER",
        Keyboard = 6 => "MODE_KEYBOARD",
        Custom = 7 => "MODE_CUSTOM",
        Rivals2 = 8 => "MODE_RIVALS_2",
    }
}

firmware_enum! {
    /// Simultaneous opposing cardinal direction resolution methods
    pub enum SocdType: "SOCD_" {
        Unspecified = 0 => "SOCD_UNSPECIFIED",
        Neutral = 1 => "SOCD_NEUTRAL",
        SecondInputPriority = 2 => "SOCD_2IP",
        SecondInputPriorityNoReactivation = 3 => "SOCD_2IP_NO_REAC",
        Dir1Priority = 4 => "SOCD_DIR1_PRIORITY",
        Dir2Priority = 5 => "SOCD_DIR2_PRIORITY",
    }
}

impl Default for Button {
    fn default() -> Self {
        Button::Unspecified
    }
}

impl Default for GameModeId {
    fn default() -> Self {
        GameModeId::Unspecified
    }
}

impl Default for SocdType {
    fn default() -> Self {
        SocdType::Unspecified
    }
}

/// A selectable entry in a button picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonOption {
    pub label: String,
    pub value: Button,
}

/// Buttons offered when editing a remap entry, in numeric order
///
/// Built on first use and shared afterwards.
pub fn button_options() -> &'static [ButtonOption] {
    static OPTIONS: OnceLock<Vec<ButtonOption>> = OnceLock::new();
    OPTIONS.get_or_init(|| {
        Button::ALL
            .iter()
            .map(|button| ButtonOption {
                label: button.label(),
                value: button.clone(),
            })
            .collect()
    })
}
