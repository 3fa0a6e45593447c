//! jaxOS Shell - Core Data Structures
//!
//! Types shared by the decoder, the dispatcher, the command loop and the
//! render bridge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Parameters of a validated intent, keyed by canonical name.
pub type Params = BTreeMap<String, String>;

/// The closed set of operations a model reply may authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateFile,
    ReadFile,
    DeleteFile,
    ListFiles,
    SystemStatus,
    Browse,
    LaunchApp,
    ListApps,
}

impl Action {
    /// Every whitelisted action, in prompt order.
    pub const ALL: [Action; 8] = [
        Action::CreateFile,
        Action::ReadFile,
        Action::DeleteFile,
        Action::ListFiles,
        Action::SystemStatus,
        Action::Browse,
        Action::LaunchApp,
        Action::ListApps,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateFile => "create_file",
            Action::ReadFile => "read_file",
            Action::DeleteFile => "delete_file",
            Action::ListFiles => "list_files",
            Action::SystemStatus => "system_status",
            Action::Browse => "browse",
            Action::LaunchApp => "launch_app",
            Action::ListApps => "list_apps",
        }
    }

    /// Exact whitelist lookup. No case folding, no trimming.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, whitelisted action derived from model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A whitelisted action with its normalized parameters
    Syscall { action: Action, params: Params },

    /// Anything that could not be authorized
    Unknown { reason: String },
}

impl Intent {
    pub fn syscall(action: Action, params: Params) -> Self {
        Intent::Syscall { action, params }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Intent::Unknown {
            reason: reason.into(),
        }
    }

    /// Action name, `unknown` for rejected replies.
    pub fn action_name(&self) -> &'static str {
        match self {
            Intent::Syscall { action, .. } => action.as_str(),
            Intent::Unknown { .. } => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Intent::Unknown { .. })
    }
}

/// Snapshot of everything the display surface should show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenFrame {
    pub header: Vec<String>,
    pub log: Vec<String>,
    /// Sequence number of `log[0]`, counting lines evicted before it
    pub log_first_seq: u64,
    pub prompt_visible: bool,
    pub prompt_text: String,
    pub input_buffer: String,
    /// Rows reserved above the log for the active app's widgets
    pub start_offset_y: u16,
}

/// Command loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Booting,
    SystemMode,
    AppMode,
    ShuttingDown,
}

impl fmt::Display for KernelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelState::Booting => "BOOTING",
            KernelState::SystemMode => "SYSTEM",
            KernelState::AppMode => "APP",
            KernelState::ShuttingDown => "SHUTTING DOWN",
        };
        f.write_str(name)
    }
}

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Base URL of the Ollama service
    pub ollama_url: String,

    /// Model used for both command decoding and page summaries
    pub model: String,

    /// Upper bound on a single inference round trip
    pub inference_timeout_secs: u64,

    /// Upper bound on a browser page fetch
    pub fetch_timeout_secs: u64,

    /// Input queue poll interval of the worker context
    pub poll_interval_ms: u64,

    /// Kernel log cap (oldest lines evicted first)
    pub log_capacity: usize,

    /// Per-app log cap
    pub app_log_capacity: usize,

    /// Entries shown by `list_files`
    pub list_preview: usize,

    /// Characters of page text handed to the summarizer
    pub browse_char_budget: usize,

    /// Pending render requests before the worker waits on the display
    pub render_queue_capacity: usize,

    pub cursor_blink_ms: u64,

    /// sled database directory
    pub db_path: PathBuf,

    pub log_file: PathBuf,

    /// Lines that end the session in system mode (case-insensitive)
    pub exit_keywords: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "gemma3:12b".to_string(),
            inference_timeout_secs: 60,
            fetch_timeout_secs: 10,
            poll_interval_ms: 100,
            log_capacity: 200,
            app_log_capacity: 100,
            list_preview: 5,
            browse_char_budget: 4000,
            render_queue_capacity: 64,
            cursor_blink_ms: 500,
            db_path: PathBuf::from("jaxos.db"),
            log_file: PathBuf::from("jaxos.log"),
            exit_keywords: vec!["exit".to_string(), "quit".to_string(), "shutdown".to_string()],
        }
    }
}

impl ShellConfig {
    pub fn is_exit_keyword(&self, line: &str) -> bool {
        let line = line.trim();
        self.exit_keywords
            .iter()
            .any(|k| k.eq_ignore_ascii_case(line))
    }
}
