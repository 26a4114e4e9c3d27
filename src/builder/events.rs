//! Build event types for JSON output.
//!
//! These events are emitted when using `--message-format json`, one JSON
//! object per line. New fields may be added; existing fields are not
//! removed or renamed.
//!
//! # Event Types
//!
//! - `build-started`: the plan is about to run
//! - `node-started`: a node was dispatched
//! - `node-finished`: a node produced (or reused) its artifact
//! - `node-failed`: a node's build step or layout failed
//! - `node-skipped`: a predecessor of the node did not succeed
//! - `build-finished`: the run ended

use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::core::entity_id::EntityId;
use crate::core::platform::Platform;

/// A build event emitted during the build process.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BuildEvent {
    BuildStarted {
        /// Number of plan units
        units: usize,
        platforms: Vec<Platform>,
    },

    NodeStarted {
        node: EntityId,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
    },

    NodeFinished {
        node: EntityId,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
        path: PathBuf,
        /// False when a previous build was reused
        fresh: bool,
    },

    NodeFailed {
        node: EntityId,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
        message: String,
    },

    NodeSkipped {
        node: EntityId,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
        failed_dependency: EntityId,
    },

    BuildFinished {
        success: bool,
        duration_ms: u64,
        built: usize,
        failed: usize,
        skipped: usize,
    },
}

impl BuildEvent {
    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receives build events on the coordinating thread.
pub trait BuildObserver: Send + Sync {
    fn on_event(&self, event: &BuildEvent);
}

/// Prints every event as a JSON line on stdout.
#[derive(Debug, Default)]
pub struct JsonObserver;

impl BuildObserver for JsonObserver {
    fn on_event(&self, event: &BuildEvent) {
        println!("{}", event.to_json());
    }
}

/// Progress bar over plan units.
pub struct ProgressObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        ProgressObserver {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let bar = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(bar) = bar.as_ref() {
            f(bar);
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildObserver for ProgressObserver {
    fn on_event(&self, event: &BuildEvent) {
        match event {
            BuildEvent::BuildStarted { units, .. } => {
                let bar = ProgressBar::new(*units as u64);
                let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";
                if let Ok(style) = ProgressStyle::default_bar().template(template) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                *self.bar.lock().unwrap_or_else(|p| p.into_inner()) = Some(bar);
            }
            BuildEvent::NodeStarted { node, .. } => {
                self.with_bar(|b| b.set_message(node.to_string()))
            }
            BuildEvent::NodeFinished { .. } | BuildEvent::NodeSkipped { .. } => {
                self.with_bar(|b| b.inc(1))
            }
            BuildEvent::NodeFailed { node, message, .. } => self.with_bar(|b| {
                b.inc(1);
                b.println(format!("error: failed to build `{}`: {}", node, message));
            }),
            BuildEvent::BuildFinished { .. } => self.with_bar(|b| b.finish_and_clear()),
        }
    }
}
