//! # HayBox Config Library
//!
//! Inspect and edit the game mode configuration of a HayBox controller.
//!
//! This library provides the configuration model, the device abstraction,
//! the connection and editing state machines, and the text front end used
//! by the `haybox-config` binary.

pub mod connection;
pub mod device;
pub mod editor;
pub mod error;
pub mod mode_editor;
pub mod model;
pub mod serial;
pub mod settings;
pub mod shell;
pub mod view;
