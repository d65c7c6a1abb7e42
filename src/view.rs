//! # Text Rendering
//!
//! Plain-text rendering of connection state, device identity, the game mode
//! list and the mode editor. Everything returns a `String` so the shell and
//! the one-shot CLI commands print the same thing.

use crate::connection::ConnectionStatus;
use crate::editor::{ConfigEditor, SaveStatus};
use crate::mode_editor::ModeEditor;
use crate::model::{DeviceInfo, GameModeConfig};
use crate::serial::PortCandidate;

const UNKNOWN: &str = "Unknown";

pub fn connection_status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "Device Connected",
        ConnectionStatus::Connecting => "Connecting...",
        ConnectionStatus::Error => "Connection Error",
        ConnectionStatus::Disconnected => "Not Connected",
    }
}

/// Status line plus the error message, if there is one
pub fn connection_summary(status: ConnectionStatus, error_message: &str) -> String {
    let mut out = format!("[{}]", connection_status_label(status));
    if !error_message.is_empty() {
        out.push_str("\n  ");
        out.push_str(error_message);
    }
    out
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN
    } else {
        value
    }
}

pub fn device_info(info: &DeviceInfo) -> String {
    format!(
        "Device Information\n  Firmware Name:    {}\n  Firmware Version: {}\n  Device Name:      {}",
        or_unknown(&info.firmware_name),
        or_unknown(&info.firmware_version),
        or_unknown(&info.device_name),
    )
}

/// Display name of the mode at `index`
///
/// The name if set, else the mode id's name, else its one-based position.
pub fn mode_label(mode: &GameModeConfig, index: usize) -> String {
    if !mode.name.is_empty() {
        mode.name.clone()
    } else if mode.mode_id.is_known() {
        mode.mode_id.wire_name().into_owned()
    } else {
        format!("Mode {}", index + 1)
    }
}

pub fn mode_list(modes: &[GameModeConfig]) -> String {
    let mut lines = vec!["Game Modes".to_string()];
    if modes.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(modes.iter().enumerate().map(|(index, mode)| {
        format!(
            "  {:>2}. {}: {} remapped buttons",
            index,
            mode_label(mode, index),
            mode.button_remapping.len()
        )
    }));
    lines.join("\n")
}

/// Header of the mode editor
pub fn mode_editor_title(mode: &GameModeConfig) -> String {
    let label = if mode.name.is_empty() {
        mode.mode_id.to_string()
    } else {
        mode.name.clone()
    };
    format!("Edit Game Mode: {}", label)
}

pub fn mode_editor(editor: &ModeEditor) -> String {
    let mode = editor.working_copy();
    let mut lines = vec![
        mode_editor_title(mode),
        format!("  Mode Name: {}", mode.name),
        format!("  Mode Id:   {}", mode.mode_id),
        "  Button Remapping".to_string(),
    ];

    if mode.button_remapping.is_empty() {
        lines.push("    No button remapping configured. Use \"add-remap\" to start.".to_string());
    }
    lines.extend(mode.button_remapping.iter().enumerate().map(|(index, remap)| {
        format!(
            "    {:>2}. {} maps to {}",
            index,
            remap.physical_button.label(),
            remap.activates.label()
        )
    }));

    if !mode.socd_pairs.is_empty() {
        lines.push("  SOCD Pairs".to_string());
        lines.extend(mode.socd_pairs.iter().map(|pair| {
            format!(
                "    {} / {}: {}",
                pair.button_dir1.label(),
                pair.button_dir2.label(),
                pair.socd_type.label()
            )
        }));
    }

    if !mode.activation_binding.is_empty() {
        let buttons: Vec<String> = mode.activation_binding.iter().map(|b| b.label()).collect();
        lines.push(format!("  Activation: {}", buttons.join(" + ")));
    }
    lines.join("\n")
}

/// Every selectable button, several per line
pub fn button_options(editor: &ModeEditor) -> String {
    editor
        .button_options()
        .chunks(8)
        .map(|row| {
            row.iter()
                .map(|option| {
                    format!("{:>2}={:<11}", option.value.value().unwrap_or_default(), option.label)
                })
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result banner for the last save, if it should be shown
pub fn save_banner(editor: &ConfigEditor) -> Option<String> {
    match editor.save_status() {
        SaveStatus::Success => Some("Configuration saved successfully!".to_string()),
        SaveStatus::Error if !editor.save_error().is_empty() => Some(editor.save_error().to_string()),
        SaveStatus::Error => Some("Failed to save configuration".to_string()),
        SaveStatus::Idle => None,
    }
}

pub fn save_footer(editor: &ConfigEditor) -> &'static str {
    if editor.is_saving() {
        return "Saving...";
    }
    match editor.save_status() {
        SaveStatus::Success => "Last save: Successful",
        SaveStatus::Error => "Last save: Failed",
        SaveStatus::Idle => "Ready to save",
    }
}

pub fn port_list(candidates: &[PortCandidate]) -> String {
    if candidates.is_empty() {
        return "No serial ports found".to_string();
    }

    candidates
        .iter()
        .map(|c| {
            let mut parts = vec![c.path.clone()];
            if let Some((vid, pid)) = c.usb_id {
                parts.push(format!("usb {:04x}:{:04x}", vid, pid));
            }
            if let Some(product) = &c.product {
                parts.push(product.clone());
            }
            if c.likely_haybox {
                parts.push("(likely HayBox)".to_string());
            }
            parts.join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
