//! # Interactive Shell
//!
//! Line-oriented front end for a configuration session. Reads commands from
//! any async line source and writes to any `Write`, so the same loop serves
//! a terminal and the tests.
//!
//! While a game mode is open for editing the shell is modal: only mode
//! editor commands are accepted until `done` or `cancel`.

use async_trait::async_trait;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::connection::{ConnectionManager, ConnectionStatus};
use crate::device::{DeviceConnector, PortProvider};
use crate::editor::{ConfigEditor, Confirm};
use crate::error::{HayBoxError, Result};
use crate::mode_editor::ModeEditor;
use crate::model::{Button, Config, GameModeId, ModeUpdate, RemapField};
use crate::view;

const HELP: &str = "\
Session:
  connect                 connect to the device
  disconnect              drop the connection
  status                  connection and save status
  info                    device information
  quit                    leave the shell
Game modes:
  list                    list game modes
  new                     create a game mode and open it
  edit <i>                open game mode <i>
  delete <i>              delete game mode <i>
  save                    write the configuration to the device
Mode editor:
  show                    show the mode under edit
  name <text>             rename the mode
  mode <id>               set the mode id (e.g. melee, MODE_FGC, 3)
  add-remap               append a remap entry
  remap <i> physical|activates <button>
                          change one side of remap entry <i>
  unmap <i>               remove remap entry <i>
  buttons                 list selectable buttons
  done                    keep the changes and close the editor
  cancel                  discard the changes and close the editor";

/// One parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Connect,
    Disconnect,
    Status,
    Info,
    List,
    New,
    Edit(usize),
    Delete(usize),
    Save,
    Show,
    Name(String),
    Mode(GameModeId),
    AddRemap,
    Remap(usize, RemapField, Button),
    Unmap(usize),
    Buttons,
    Done,
    Cancel,
}

impl Command {
    /// Command belongs to the mode editor
    pub fn is_mode_editor_command(&self) -> bool {
        matches!(
            self,
            Command::Show
                | Command::Name(_)
                | Command::Mode(_)
                | Command::AddRemap
                | Command::Remap(..)
                | Command::Unmap(_)
                | Command::Buttons
                | Command::Done
                | Command::Cancel
        )
    }
}

fn parse_index(arg: Option<&str>) -> Result<usize> {
    let arg = arg.ok_or_else(|| HayBoxError::InvalidValue("missing index".to_string()))?;
    arg.parse()
        .map_err(|_| HayBoxError::InvalidValue(format!("'{}' is not an index", arg)))
}

fn required<'a>(arg: Option<&'a str>, what: &str) -> Result<&'a str> {
    arg.ok_or_else(|| HayBoxError::InvalidValue(format!("missing {}", what)))
}

impl FromStr for Command {
    type Err = HayBoxError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));
        let mut args = rest.split_whitespace();

        let command = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "status" => Command::Status,
            "info" => Command::Info,
            "list" | "ls" => Command::List,
            "new" => Command::New,
            "edit" => Command::Edit(parse_index(args.next())?),
            "delete" | "rm" => Command::Delete(parse_index(args.next())?),
            "save" => Command::Save,
            "show" => Command::Show,
            "name" => Command::Name(rest.to_string()),
            "mode" => Command::Mode(required(args.next(), "mode id")?.parse()?),
            "add-remap" => Command::AddRemap,
            "remap" => {
                let index = parse_index(args.next())?;
                let field = required(args.next(), "field")?.parse()?;
                let button = required(args.next(), "button")?.parse()?;
                Command::Remap(index, field, button)
            }
            "unmap" => Command::Unmap(parse_index(args.next())?),
            "buttons" => Command::Buttons,
            "done" => Command::Done,
            "cancel" => Command::Cancel,
            other => {
                return Err(HayBoxError::InvalidValue(format!(
                    "unknown command '{}' (try help)",
                    other
                )))
            }
        };
        Ok(command)
    }
}

/// Input lines plus output sink
pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    /// Show `prompt` and read one line; `None` at end of input
    pub async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    pub fn print(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

#[async_trait]
impl<R, W> Confirm for Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn confirm(&mut self, prompt: &str) -> bool {
        match self.read_line(&format!("{} [y/N] ", prompt)).await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive configuration session
pub struct Shell<P, C, R, W> {
    manager: ConnectionManager<P, C>,
    editor: Option<ConfigEditor>,
    changes: Option<watch::Receiver<Arc<Config>>>,
    term: Terminal<R, W>,
}

impl<P, C, R, W> Shell<P, C, R, W>
where
    P: PortProvider,
    C: DeviceConnector,
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(manager: ConnectionManager<P, C>, term: Terminal<R, W>) -> Self {
        Self {
            manager,
            editor: None,
            changes: None,
            term,
        }
    }

    pub fn manager(&self) -> &ConnectionManager<P, C> {
        &self.manager
    }

    pub fn into_terminal(self) -> Terminal<R, W> {
        self.term
    }

    /// Run until `quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        self.term.print("HayBox Configuration Tool (type help for commands)")?;
        loop {
            let prompt = if self.is_editing() {
                "haybox:edit> "
            } else {
                "haybox> "
            };
            let Some(line) = self.term.read_line(prompt).await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => match self.execute(command).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => self.term.print(&format!("error: {}", e))?,
                },
                Err(e) => self.term.print(&format!("error: {}", e))?,
            }
            self.sync_config();
        }
        Ok(())
    }

    fn is_editing(&self) -> bool {
        self.editor
            .as_ref()
            .is_some_and(|editor| editor.mode_editor().is_some())
    }

    /// Hand configurations published by the list editor to the session owner
    fn sync_config(&mut self) {
        if let Some(changes) = self.changes.as_mut() {
            if changes.has_changed().unwrap_or(false) {
                let config = changes.borrow_and_update().clone();
                self.manager.handle_config_change(config);
            }
        }
    }

    fn editor_mut(&mut self) -> Result<&mut ConfigEditor> {
        self.editor.as_mut().ok_or(HayBoxError::NotConnected)
    }

    async fn execute(&mut self, command: Command) -> Result<Flow> {
        debug!("Shell command: {:?}", command);

        if self.is_editing() {
            if !command.is_mode_editor_command()
                && !matches!(command, Command::Help | Command::Quit | Command::Status)
            {
                self.term.print("Finish editing first (done or cancel)")?;
                return Ok(Flow::Continue);
            }
        } else if command.is_mode_editor_command() {
            self.term.print("No game mode is open (use new or edit <i>)")?;
            return Ok(Flow::Continue);
        }

        match command {
            Command::Help => self.term.print(HELP)?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Connect => self.connect().await?,
            Command::Disconnect => {
                self.manager.disconnect();
                self.editor = None;
                self.changes = None;
                self.print_status()?;
            }
            Command::Status => self.print_status()?,
            Command::Info => match self.manager.device_info() {
                Some(info) => {
                    let text = view::device_info(info);
                    self.term.print(&text)?;
                }
                None => return Err(HayBoxError::NotConnected),
            },
            Command::List => {
                let text = view::mode_list(self.editor_mut()?.game_modes());
                self.term.print(&text)?;
            }
            Command::New => {
                self.editor_mut()?.create_new_game_mode();
                self.print_mode_editor()?;
            }
            Command::Edit(index) => {
                self.editor_mut()?.edit_game_mode(index)?;
                self.print_mode_editor()?;
            }
            Command::Delete(index) => {
                let editor = self.editor.as_mut().ok_or(HayBoxError::NotConnected)?;
                let deleted = editor.delete_game_mode(index, &mut self.term).await?;
                if deleted {
                    let text = view::mode_list(editor.game_modes());
                    self.term.print(&text)?;
                }
            }
            Command::Save => {
                let editor = self.editor.as_mut().ok_or(HayBoxError::NotConnected)?;
                self.term.print("Saving...")?;
                editor.save_to_controller().await;
                if let Some(banner) = view::save_banner(editor) {
                    self.term.print(&banner)?;
                }
                self.term.print(view::save_footer(editor))?;
            }
            Command::Show => self.print_mode_editor()?,
            Command::Name(name) => {
                self.mode_editor_mut()?.update_mode(ModeUpdate::default().name(name));
                self.print_mode_editor()?;
            }
            Command::Mode(mode_id) => {
                self.mode_editor_mut()?
                    .update_mode(ModeUpdate::default().mode_id(mode_id));
                self.print_mode_editor()?;
            }
            Command::AddRemap => {
                self.mode_editor_mut()?.add_remapping();
                self.print_mode_editor()?;
            }
            Command::Remap(index, field, button) => {
                self.mode_editor_mut()?.update_remapping(index, field, button)?;
                self.print_mode_editor()?;
            }
            Command::Unmap(index) => {
                self.mode_editor_mut()?.remove_remapping(index)?;
                self.print_mode_editor()?;
            }
            Command::Buttons => {
                let editor = self.mode_editor_mut()?;
                let text = view::button_options(editor);
                self.term.print(&text)?;
            }
            Command::Done => {
                let editor = self.editor_mut()?;
                editor.save_mode_editor()?;
                let text = view::mode_list(editor.game_modes());
                self.term.print(&text)?;
            }
            Command::Cancel => {
                self.editor_mut()?.close_mode_editor();
                self.term.print("Changes discarded")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn mode_editor_mut(&mut self) -> Result<&mut ModeEditor> {
        self.editor_mut()?
            .mode_editor_mut()
            .ok_or(HayBoxError::EditorNotOpen)
    }

    async fn connect(&mut self) -> Result<()> {
        if self.manager.status() == ConnectionStatus::Connected {
            self.term.print("Already connected (disconnect first)")?;
            return Ok(());
        }

        self.editor = None;
        self.changes = None;
        self.term
            .print(view::connection_status_label(ConnectionStatus::Connecting))?;
        self.manager.connect().await;
        self.print_status()?;

        if self.manager.status() != ConnectionStatus::Connected {
            return Ok(());
        }
        if let Some(info) = self.manager.device_info() {
            let text = view::device_info(info);
            self.term.print(&text)?;
        }

        match (self.manager.device(), self.manager.config()) {
            (Some(device), Some(config)) => {
                let editor = ConfigEditor::new(config, device);
                self.changes = Some(editor.subscribe());
                let text = view::mode_list(editor.game_modes());
                self.editor = Some(editor);
                self.term.print(&text)?;
            }
            _ => self.term.print("Device returned no configuration")?,
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let mut text = view::connection_summary(self.manager.status(), self.manager.error_message());
        if let Some(editor) = &self.editor {
            text.push('\n');
            text.push_str(view::save_footer(editor));
        }
        self.term.print(&text)
    }

    fn print_mode_editor(&mut self) -> Result<()> {
        let text = match self.editor.as_ref().and_then(|e| e.mode_editor()) {
            Some(mode_editor) => view::mode_editor(mode_editor),
            None => return Err(HayBoxError::EditorNotOpen),
        };
        self.term.print(&text)
    }
}
