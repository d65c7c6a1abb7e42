//! # Mode Editor
//!
//! Edits one game mode on a private working copy. Nothing reaches the
//! configuration until [`ModeEditor::save`] hands the working copy back;
//! [`ModeEditor::close`] throws it away.

use tracing::debug;

use crate::error::{HayBoxError, Result};
use crate::model::{button_options, ButtonOption, ButtonRemap, GameModeConfig, ModeUpdate, RemapField};
use crate::model::Button;

/// Working copy of a game mode under edit
#[derive(Debug, Clone, PartialEq)]
pub struct ModeEditor {
    working: GameModeConfig,
}

impl ModeEditor {
    /// Open an editor seeded with a copy of `mode`
    pub fn open(mode: &GameModeConfig) -> Self {
        Self {
            working: mode.clone(),
        }
    }

    /// Current state of the working copy
    pub fn working_copy(&self) -> &GameModeConfig {
        &self.working
    }

    /// Buttons selectable on either side of a remap entry
    pub fn button_options(&self) -> &'static [ButtonOption] {
        button_options()
    }

    /// Merge a partial field set into the working copy
    pub fn update_mode(&mut self, update: ModeUpdate) {
        self.working = self.working.merged(update);
    }

    /// Append a remap entry with both sides unspecified
    pub fn add_remapping(&mut self) {
        let mut remapping = self.working.button_remapping.clone();
        remapping.push(ButtonRemap::default());
        self.update_mode(ModeUpdate::default().button_remapping(remapping));
    }

    /// Replace one side of the remap entry at `index`
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if there is no entry at `index`
    pub fn update_remapping(&mut self, index: usize, field: RemapField, value: Button) -> Result<()> {
        let mut remapping = self.working.button_remapping.clone();
        let len = remapping.len();
        let entry = remapping
            .get_mut(index)
            .ok_or(HayBoxError::IndexOutOfRange { index, len })?;
        *entry = entry.clone().with_field(field, value.clone());

        debug!("Remap {} {:?} set to {}", index, field, value);
        self.update_mode(ModeUpdate::default().button_remapping(remapping));
        Ok(())
    }

    /// Remove the remap entry at `index`, shifting later entries down
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if there is no entry at `index`
    pub fn remove_remapping(&mut self, index: usize) -> Result<()> {
        let mut remapping = self.working.button_remapping.clone();
        if index >= remapping.len() {
            return Err(HayBoxError::IndexOutOfRange {
                index,
                len: remapping.len(),
            });
        }
        remapping.remove(index);
        self.update_mode(ModeUpdate::default().button_remapping(remapping));
        Ok(())
    }

    /// Finish editing and hand the working copy back
    pub fn save(self) -> GameModeConfig {
        self.working
    }

    /// Finish editing and discard the working copy
    pub fn close(self) {
        debug!("Discarded edits to '{}'", self.working.name);
    }
}
