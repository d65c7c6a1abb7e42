//! # Configuration List Editor
//!
//! Holds the configuration for a connected session, opens the mode editor
//! on individual records and writes the whole configuration back to the
//! device.
//!
//! Every change builds a new [`Config`] instead of mutating the current one,
//! and is published on a `tokio::sync::watch` channel so the owner of the
//! session sees it. Records are tracked by a [`ModeKey`] handed out when the
//! record enters the editor, so two records with the same name and mode id
//! are never confused with each other.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::connection::failure_message;
use crate::device::HayBoxDevice;
use crate::error::{HayBoxError, Result};
use crate::mode_editor::ModeEditor;
use crate::model::{Config, GameModeConfig};

/// How long a successful save stays visible before reverting to idle
pub const SAVE_STATUS_CLEAR_DELAY: Duration = Duration::from_secs(3);

/// Message shown when a failed save carries no text of its own
pub const SAVE_FAILED_FALLBACK: &str = "Failed to save configuration";

/// Question asked before a game mode is deleted
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this mode?";

/// Stable identity of a record held by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeKey(u64);

/// Outcome of the last save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Success,
    Error,
}

/// Interactive yes/no confirmation
#[async_trait]
pub trait Confirm: Send {
    async fn confirm(&mut self, prompt: &str) -> bool;
}

/// Fixed answer, for callers that already asked
#[async_trait]
impl Confirm for bool {
    async fn confirm(&mut self, _prompt: &str) -> bool {
        *self
    }
}

#[derive(Debug)]
struct EditSession {
    // None for a record that is not in the configuration yet
    key: Option<ModeKey>,
    editor: ModeEditor,
}

/// Editor for the game mode list of one configuration
pub struct ConfigEditor {
    config: Arc<Config>,
    keys: Vec<ModeKey>,
    next_key: u64,
    device: Arc<dyn HayBoxDevice>,
    changes: watch::Sender<Arc<Config>>,
    editing: Option<EditSession>,
    is_saving: bool,
    save_status: SaveStatus,
    save_status_at: Option<Instant>,
    save_error: String,
}

impl std::fmt::Debug for ConfigEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEditor")
            .field("modes", &self.config.game_mode_configs.len())
            .field("editing", &self.editing.is_some())
            .field("is_saving", &self.is_saving)
            .field("save_status", &self.save_status)
            .finish_non_exhaustive()
    }
}

impl ConfigEditor {
    /// Start editing `config`, which was read from `device`
    pub fn new(config: Arc<Config>, device: Arc<dyn HayBoxDevice>) -> Self {
        let (changes, _) = watch::channel(Arc::clone(&config));
        let count = config.game_mode_configs.len() as u64;
        Self {
            config,
            keys: (0..count).map(ModeKey).collect(),
            next_key: count,
            device,
            changes,
            editing: None,
            is_saving: false,
            save_status: SaveStatus::Idle,
            save_status_at: None,
            save_error: String::new(),
        }
    }

    /// Receive every configuration this editor publishes
    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.changes.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn game_modes(&self) -> &[GameModeConfig] {
        &self.config.game_mode_configs
    }

    /// Key of the record at `index`
    pub fn key_at(&self, index: usize) -> Option<ModeKey> {
        self.keys.get(index).copied()
    }

    fn allocate_key(&mut self) -> ModeKey {
        let key = ModeKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn publish(&mut self, config: Config) {
        self.config = Arc::new(config);
        self.changes.send_replace(Arc::clone(&self.config));
    }

    /// Open the mode editor on a fresh "New Mode" record
    ///
    /// The record only joins the configuration once the mode editor is saved.
    pub fn create_new_game_mode(&mut self) {
        debug!("Opening editor on a new game mode");
        self.editing = Some(EditSession {
            key: None,
            editor: ModeEditor::open(&GameModeConfig::new_mode()),
        });
    }

    /// Open the mode editor on the record at `index`
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if there is no record at `index`
    pub fn edit_game_mode(&mut self, index: usize) -> Result<()> {
        let modes = &self.config.game_mode_configs;
        let mode = modes.get(index).ok_or(HayBoxError::IndexOutOfRange {
            index,
            len: modes.len(),
        })?;

        debug!("Opening editor on game mode {} '{}'", index, mode.name);
        self.editing = Some(EditSession {
            key: Some(self.keys[index]),
            editor: ModeEditor::open(mode),
        });
        Ok(())
    }

    /// Open mode editor, if any
    pub fn mode_editor(&self) -> Option<&ModeEditor> {
        self.editing.as_ref().map(|session| &session.editor)
    }

    pub fn mode_editor_mut(&mut self) -> Option<&mut ModeEditor> {
        self.editing.as_mut().map(|session| &mut session.editor)
    }

    /// Save the open mode editor into the configuration
    ///
    /// # Errors
    ///
    /// Returns `EditorNotOpen` if no mode editor is open
    pub fn save_mode_editor(&mut self) -> Result<()> {
        let session = self.editing.take().ok_or(HayBoxError::EditorNotOpen)?;
        self.apply_update(session.key, session.editor.save());
        Ok(())
    }

    /// Discard the open mode editor
    pub fn close_mode_editor(&mut self) {
        if let Some(session) = self.editing.take() {
            session.editor.close();
        }
    }

    /// Merge an edited record back into the configuration and close the editor
    ///
    /// The record replaces the one the editor was opened on, in place. When
    /// that record is not in the configuration (a new mode, or one deleted in
    /// the meantime) it is appended instead.
    pub fn handle_game_mode_update(&mut self, updated: GameModeConfig) {
        let key = self.editing.take().and_then(|session| session.key);
        self.apply_update(key, updated);
    }

    fn apply_update(&mut self, key: Option<ModeKey>, updated: GameModeConfig) {
        let mut modes = self.config.game_mode_configs.clone();
        match key.and_then(|key| self.keys.iter().position(|&k| k == key)) {
            Some(index) => {
                info!("Updated game mode {} '{}'", index, updated.name);
                modes[index] = updated;
            }
            None => {
                info!("Added game mode '{}'", updated.name);
                modes.push(updated);
                let key = self.allocate_key();
                self.keys.push(key);
            }
        }

        let config = self.config.with_game_modes(modes);
        self.publish(config);
    }

    /// Delete the record at `index` once the user confirms
    ///
    /// Returns `Ok(false)` when the user declines; the configuration is then
    /// left as it was.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if there is no record at `index`
    pub async fn delete_game_mode<C>(&mut self, index: usize, confirm: &mut C) -> Result<bool>
    where
        C: Confirm + ?Sized,
    {
        let len = self.config.game_mode_configs.len();
        if index >= len {
            return Err(HayBoxError::IndexOutOfRange { index, len });
        }

        if !confirm.confirm(DELETE_PROMPT).await {
            debug!("Delete of game mode {} declined", index);
            return Ok(false);
        }

        let mut modes = self.config.game_mode_configs.clone();
        let removed = modes.remove(index);
        self.keys.remove(index);
        info!("Deleted game mode {} '{}'", index, removed.name);

        let config = self.config.with_game_modes(modes);
        self.publish(config);
        Ok(true)
    }

    /// Write the whole configuration to the device
    ///
    /// Failures never propagate: they end up in [`save_status`](Self::save_status)
    /// and [`save_error`](Self::save_error). `&mut self` keeps saves from
    /// overlapping; a save whose future was dropped reads as saving until
    /// the next call.
    pub async fn save_to_controller(&mut self) {
        self.is_saving = true;
        self.set_save_status(SaveStatus::Idle);
        self.save_error.clear();

        let config = Config::clone(&self.config);
        match self.device.set_config(&config).await {
            Ok(true) => {
                info!(
                    "Saved configuration with {} game modes",
                    config.game_mode_configs.len()
                );
                self.set_save_status(SaveStatus::Success);
            }
            Ok(false) => {
                error!("Save error: device rejected the configuration");
                self.set_save_status(SaveStatus::Error);
                self.save_error = SAVE_FAILED_FALLBACK.to_string();
            }
            Err(e) => {
                error!("Save error: {}", e);
                self.set_save_status(SaveStatus::Error);
                self.save_error = failure_message(&e, SAVE_FAILED_FALLBACK);
            }
        }

        self.is_saving = false;
    }

    fn set_save_status(&mut self, status: SaveStatus) {
        self.save_status = status;
        self.save_status_at = Some(Instant::now());
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    /// Outcome of the last save; a success reads as idle once
    /// [`SAVE_STATUS_CLEAR_DELAY`] has passed
    pub fn save_status(&self) -> SaveStatus {
        match (self.save_status, self.save_status_at) {
            (SaveStatus::Success, Some(at)) if at.elapsed() >= SAVE_STATUS_CLEAR_DELAY => {
                SaveStatus::Idle
            }
            (status, _) => status,
        }
    }

    /// Message for the last failed save
    pub fn save_error(&self) -> &str {
        &self.save_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockHayBoxDevice;
    use crate::model::{Button, GameModeId, ModeUpdate, RemapField};
    use serde_json::json;

    fn mode(name: &str, mode_id: GameModeId) -> GameModeConfig {
        GameModeConfig {
            mode_id,
            name: name.to_string(),
            ..GameModeConfig::default()
        }
    }

    fn two_modes() -> Config {
        let mut other = serde_json::Map::new();
        other.insert("rgb_brightness".to_string(), json!(200));
        Config {
            game_mode_configs: vec![
                mode("A", GameModeId::Melee),
                mode("B", GameModeId::ProjectM),
            ],
            other,
        }
    }

    fn idle_device() -> Arc<dyn HayBoxDevice> {
        Arc::new(MockHayBoxDevice::new())
    }

    fn editor_with(config: Config) -> ConfigEditor {
        ConfigEditor::new(Arc::new(config), idle_device())
    }

    #[test]
    fn test_rename_replaces_in_place() {
        let mut editor = editor_with(two_modes());
        editor.edit_game_mode(0).unwrap();
        editor
            .mode_editor_mut()
            .unwrap()
            .update_mode(ModeUpdate::default().name("A2"));
        editor.save_mode_editor().unwrap();

        let modes = editor.game_modes();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[0].name, "A2");
        assert_eq!(modes[0].mode_id, GameModeId::Melee);
        assert_eq!(modes[1], mode("B", GameModeId::ProjectM));
        assert!(editor.mode_editor().is_none());
    }

    #[test]
    fn test_new_mode_appends_without_touching_original() {
        let mut editor = editor_with(two_modes());
        let before = editor.config();

        editor.create_new_game_mode();
        assert_eq!(editor.game_modes().len(), 2);
        editor.save_mode_editor().unwrap();

        assert_eq!(before.game_mode_configs.len(), 2);
        let after = editor.config();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.game_mode_configs.len(), 3);
        assert_eq!(after.game_mode_configs[2].name, "New Mode");
        assert_eq!(after.other, before.other);
    }

    #[test]
    fn test_unmatched_update_appends() {
        let mut editor = editor_with(two_modes());
        editor.handle_game_mode_update(mode("C", GameModeId::Fgc));

        let modes = editor.game_modes();
        assert_eq!(modes.len(), 3);
        assert_eq!(modes[0].name, "A");
        assert_eq!(modes[1].name, "B");
        assert_eq!(modes[2].name, "C");
    }

    #[test]
    fn test_duplicate_records_are_told_apart() {
        let config = Config {
            game_mode_configs: vec![
                mode("Same", GameModeId::Melee),
                mode("Same", GameModeId::Melee),
            ],
            ..Config::default()
        };
        let mut editor = editor_with(config);
        editor.edit_game_mode(1).unwrap();
        editor.handle_game_mode_update(mode("Second", GameModeId::Melee));

        let modes = editor.game_modes();
        assert_eq!(modes[0].name, "Same");
        assert_eq!(modes[1].name, "Second");
    }

    #[test]
    fn test_close_discards_edits() {
        let mut editor = editor_with(two_modes());
        let rx = editor.subscribe();
        editor.edit_game_mode(1).unwrap();
        let mode_editor = editor.mode_editor_mut().unwrap();
        mode_editor.add_remapping();
        mode_editor
            .update_remapping(0, RemapField::Activates, Button::Lf5)
            .unwrap();
        editor.close_mode_editor();

        assert!(editor.mode_editor().is_none());
        assert_eq!(editor.config().as_ref(), &two_modes());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_changes_are_published() {
        let mut editor = editor_with(two_modes());
        let mut rx = editor.subscribe();

        editor.create_new_game_mode();
        editor.save_mode_editor().unwrap();

        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone();
        assert!(Arc::ptr_eq(&published, &editor.config()));
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut editor = editor_with(two_modes());
        assert!(matches!(
            editor.edit_game_mode(2),
            Err(HayBoxError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(editor.mode_editor().is_none());
    }

    #[test]
    fn test_save_mode_editor_without_editor() {
        let mut editor = editor_with(two_modes());
        assert!(matches!(
            editor.save_mode_editor(),
            Err(HayBoxError::EditorNotOpen)
        ));
    }

    #[tokio::test]
    async fn test_delete_shifts_later_records() {
        let mut config = two_modes();
        config.game_mode_configs.push(mode("C", GameModeId::Fgc));
        let mut editor = editor_with(config);

        assert!(editor.delete_game_mode(0, &mut true).await.unwrap());

        let modes = editor.game_modes();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[0].name, "B");
        assert_eq!(modes[1].name, "C");
    }

    #[tokio::test]
    async fn test_delete_declined_leaves_config() {
        let mut editor = editor_with(two_modes());
        let before = editor.config();

        assert!(!editor.delete_game_mode(1, &mut false).await.unwrap());
        assert!(Arc::ptr_eq(&before, &editor.config()));
    }

    #[tokio::test]
    async fn test_delete_out_of_range_never_asks() {
        struct Refuse;

        #[async_trait]
        impl Confirm for Refuse {
            async fn confirm(&mut self, _prompt: &str) -> bool {
                panic!("should not be asked");
            }
        }

        let mut editor = editor_with(two_modes());
        assert!(editor.delete_game_mode(5, &mut Refuse).await.is_err());
    }

    #[tokio::test]
    async fn test_editing_deleted_record_appends() {
        let mut editor = editor_with(two_modes());
        editor.edit_game_mode(0).unwrap();
        let edited = editor.mode_editor().unwrap().working_copy().clone();

        // Record removed underneath the open editor
        let mut modes = editor.game_modes().to_vec();
        modes.remove(0);
        editor.keys.remove(0);
        let config = editor.config.with_game_modes(modes);
        editor.publish(config);

        editor.handle_game_mode_update(edited);
        let names: Vec<_> = editor.game_modes().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_save_reverts_to_idle() {
        let mut device = MockHayBoxDevice::new();
        device
            .expect_set_config()
            .withf(|config| config == &two_modes())
            .times(1)
            .returning(|_| Ok(true));
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        editor.save_to_controller().await;
        assert_eq!(editor.save_status(), SaveStatus::Success);
        assert!(!editor.is_saving());

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert_eq!(editor.save_status(), SaveStatus::Success);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(editor.save_status(), SaveStatus::Idle);
    }

    /// Device whose first configuration write never completes
    struct StallOnceDevice {
        writes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl HayBoxDevice for StallOnceDevice {
        async fn get_device_info(&self) -> Result<Option<crate::model::DeviceInfo>> {
            Ok(None)
        }

        async fn get_config(&self) -> Result<Option<Config>> {
            Ok(None)
        }

        async fn set_config(&self, _config: &Config) -> Result<bool> {
            if self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_save_does_not_block_retry() {
        let device = StallOnceDevice {
            writes: std::sync::atomic::AtomicUsize::new(0),
        };
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), editor.save_to_controller()).await;
        assert!(abandoned.is_err());
        assert!(editor.is_saving());

        editor.save_to_controller().await;
        assert!(!editor.is_saving());
        assert_eq!(editor.save_status(), SaveStatus::Success);
    }

    #[tokio::test]
    async fn test_save_error_from_device() {
        let mut device = MockHayBoxDevice::new();
        device
            .expect_set_config()
            .returning(|_| Err(HayBoxError::Device("write timed out".to_string())));
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        editor.save_to_controller().await;
        assert_eq!(editor.save_status(), SaveStatus::Error);
        assert_eq!(editor.save_error(), "write timed out");
        assert!(!editor.is_saving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_save_stays_error() {
        let mut device = MockHayBoxDevice::new();
        device.expect_set_config().returning(|_| Ok(false));
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        editor.save_to_controller().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(editor.save_status(), SaveStatus::Error);
        assert_eq!(editor.save_error(), "Failed to save configuration");
    }

    #[tokio::test]
    async fn test_new_save_clears_previous_error() {
        let mut device = MockHayBoxDevice::new();
        let mut calls = 0;
        device.expect_set_config().times(2).returning(move |_| {
            calls += 1;
            Ok(calls > 1)
        });
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        editor.save_to_controller().await;
        assert_eq!(editor.save_status(), SaveStatus::Error);

        editor.save_to_controller().await;
        assert_eq!(editor.save_status(), SaveStatus::Success);
        assert!(editor.save_error().is_empty());
    }

    #[tokio::test]
    async fn test_save_sends_edited_config() {
        let mut expected = two_modes();
        expected.game_mode_configs[1].name = "B2".to_string();
        let expected_clone = expected.clone();

        let mut device = MockHayBoxDevice::new();
        device
            .expect_set_config()
            .withf(move |config| config == &expected_clone)
            .times(1)
            .returning(|_| Ok(true));
        let mut editor = ConfigEditor::new(Arc::new(two_modes()), Arc::new(device));

        editor.edit_game_mode(1).unwrap();
        editor
            .mode_editor_mut()
            .unwrap()
            .update_mode(ModeUpdate::default().name("B2"));
        editor.save_mode_editor().unwrap();
        editor.save_to_controller().await;

        assert_eq!(editor.config().as_ref(), &expected);
        assert_eq!(editor.save_status(), SaveStatus::Success);
    }
}
