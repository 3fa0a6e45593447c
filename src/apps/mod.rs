//! Mini-apps
//!
//! An app owns its own state and log lines while active. It never touches the
//! display: it reports through [`AppIo`] and exposes widgets as data.

pub mod accounts;
pub mod calculator;
pub mod clock;
pub mod notes;
pub mod sysmon;

use crate::log_buffer::LogBuffer;
use crate::storage::FileStore;
use crate::widgets::{region_height, Widget};

pub use accounts::Accounts;
pub use calculator::Calculator;
pub use clock::Clock;
pub use notes::Notes;
pub use sysmon::SysMon;

/// What the router should do after an app handled a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFlow {
    Continue,
    Close,
}

/// Collaborators handed to app hooks.
pub struct AppIo<'a> {
    /// The session log, shown instead of the kernel log in app mode
    pub log: &'a mut LogBuffer,
    pub store: &'a dyn FileStore,
    /// Signed-in user of the shell session, shared by every app
    pub user: &'a mut Option<String>,
}

pub trait App: Send {
    /// Name shown in the header.
    fn title(&self) -> &str;

    fn on_start(&mut self, io: &mut AppIo<'_>);

    fn on_stop(&mut self, _io: &mut AppIo<'_>) {}

    fn on_input(&mut self, line: &str, io: &mut AppIo<'_>) -> AppFlow;

    /// Periodic idle update; `true` when something visible changed.
    fn on_tick(&mut self, _io: &mut AppIo<'_>) -> bool {
        false
    }

    fn widgets(&self) -> Vec<Widget> {
        Vec::new()
    }

    /// Rows above the session log reserved for widgets.
    fn content_start(&self) -> u16 {
        region_height(&self.widgets())
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.title().to_uppercase())
    }
}

/// Builds a fresh app instance on every launch.
pub type AppFactory = Box<dyn Fn() -> Box<dyn App> + Send>;

/// The apps bundled with the shell, as `(id, factory)` pairs.
pub fn builtin_apps() -> Vec<(&'static str, AppFactory)> {
    vec![
        ("calc", Box::new(|| Box::new(Calculator::new()) as Box<dyn App>) as AppFactory),
        ("clock", Box::new(|| Box::new(Clock::new()) as Box<dyn App>) as AppFactory),
        ("notes", Box::new(|| Box::new(Notes::new()) as Box<dyn App>) as AppFactory),
        ("sysmon", Box::new(|| Box::new(SysMon::new()) as Box<dyn App>) as AppFactory),
        ("users", Box::new(|| Box::new(Accounts::new()) as Box<dyn App>) as AppFactory),
    ]
}
