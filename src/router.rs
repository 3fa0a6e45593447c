//! Application Router
//!
//! Owns the app registry and the single active [`AppSession`]. Launching
//! while another app runs stops that app first; there is never more than
//! one active session.

use crate::apps::{builtin_apps, App, AppFactory, AppFlow, AppIo};
use crate::log_buffer::LogBuffer;
use crate::storage::FileStore;
use crate::widgets::Widget;
use std::collections::BTreeMap;

/// State of the running mini-app
#[derive(Debug, Clone)]
pub struct AppSession {
    pub app_id: String,
    pub widgets: Vec<Widget>,
    pub log: LogBuffer,
    pub is_active: bool,
    /// Rows reserved for widgets above the session log
    pub content_start: u16,
}

struct Running {
    session: AppSession,
    app: Box<dyn App>,
}

impl Running {
    fn refresh_widgets(&mut self) {
        self.session.widgets = self.app.widgets();
        self.session.content_start = self.app.content_start();
    }
}

pub struct AppRouter {
    registry: BTreeMap<String, AppFactory>,
    aliases: BTreeMap<String, String>,
    running: Option<Running>,
    user: Option<String>,
    log_capacity: usize,
}

impl AppRouter {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            registry: BTreeMap::new(),
            aliases: BTreeMap::new(),
            running: None,
            user: None,
            log_capacity,
        }
    }

    /// Router with the built-in apps and their aliases registered.
    pub fn with_builtin_apps(log_capacity: usize) -> Self {
        let mut router = Self::new(log_capacity);
        for (id, factory) in builtin_apps() {
            router.register(id, factory);
        }
        router.alias("calculator", "calc");
        router.alias("note", "notes");
        router.alias("monitor", "sysmon");
        router.alias("login", "users");
        router.alias("accounts", "users");
        router
    }

    pub fn register(&mut self, id: &str, factory: AppFactory) {
        self.registry.insert(normalize_id(id), factory);
    }

    pub fn alias(&mut self, alias: &str, id: &str) {
        self.aliases.insert(normalize_id(alias), normalize_id(id));
    }

    /// Registered app ids, sorted.
    pub fn names(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    fn resolve(&self, id: &str) -> Option<String> {
        let id = normalize_id(id);
        if self.registry.contains_key(&id) {
            return Some(id);
        }
        self.aliases
            .get(&id)
            .filter(|target| self.registry.contains_key(*target))
            .cloned()
    }

    pub fn active(&self) -> Option<&AppSession> {
        self.running.as_ref().map(|r| &r.session)
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn active_title(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.app.title())
    }

    pub fn active_prompt(&self) -> Option<String> {
        self.running.as_ref().map(|r| r.app.prompt())
    }

    /// User signed in through the accounts app.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Start `id`, stopping the active app first.
    ///
    /// An unknown id logs an error line to `kernel_log` and changes nothing.
    pub fn launch(&mut self, id: &str, store: &dyn FileStore, kernel_log: &mut LogBuffer) -> bool {
        let Some(app_id) = self.resolve(id) else {
            log::warn!("launch of unknown app '{}'", id.trim());
            kernel_log.push(format!(
                "[!] App not found: {}. Available: {}",
                id.trim(),
                self.names().join(", ")
            ));
            return false;
        };

        self.close(store, kernel_log);

        let Some(factory) = self.registry.get(&app_id) else {
            return false;
        };
        let mut running = Running {
            session: AppSession {
                app_id: app_id.clone(),
                widgets: Vec::new(),
                log: LogBuffer::new(self.log_capacity),
                is_active: true,
                content_start: 0,
            },
            app: factory(),
        };

        let mut io = AppIo {
            log: &mut running.session.log,
            store,
            user: &mut self.user,
        };
        running.app.on_start(&mut io);
        running.refresh_widgets();

        log::info!("App started: {app_id}");
        kernel_log.push(format!("[SYS] Launched {}", running.app.title()));
        self.running = Some(running);
        true
    }

    /// Stop the active app. No-op without one.
    pub fn close(&mut self, store: &dyn FileStore, kernel_log: &mut LogBuffer) -> bool {
        let Some(mut running) = self.running.take() else {
            return false;
        };

        let mut io = AppIo {
            log: &mut running.session.log,
            store,
            user: &mut self.user,
        };
        running.app.on_stop(&mut io);
        running.session.is_active = false;
        running.session.widgets.clear();

        log::info!("App stopped: {}", running.session.app_id);
        kernel_log.push(format!("[SYS] Closed {}", running.app.title()));
        true
    }

    /// Hand a line to the active app. `false` when no app is active.
    pub fn route_input(&mut self, line: &str, store: &dyn FileStore, kernel_log: &mut LogBuffer) -> bool {
        let Some(running) = self.running.as_mut() else {
            return false;
        };

        let mut io = AppIo {
            log: &mut running.session.log,
            store,
            user: &mut self.user,
        };
        let flow = running.app.on_input(line, &mut io);
        running.refresh_widgets();

        if flow == AppFlow::Close {
            self.close(store, kernel_log);
        }
        true
    }

    /// Idle tick for the active app; `true` when it needs a redraw.
    pub fn tick(&mut self, store: &dyn FileStore) -> bool {
        let Some(running) = self.running.as_mut() else {
            return false;
        };

        let mut io = AppIo {
            log: &mut running.session.log,
            store,
            user: &mut self.user,
        };
        let changed = running.app.on_tick(&mut io);
        if changed {
            running.refresh_widgets();
        }
        changed
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}
