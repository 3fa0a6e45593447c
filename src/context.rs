//! Kernel Context
//!
//! Everything the worker context mutates, passed explicitly by reference to
//! the dispatcher and the command loop.

use crate::inference::InferenceClient;
use crate::log_buffer::LogBuffer;
use crate::navigator::Navigator;
use crate::render::RenderHandle;
use crate::router::AppRouter;
use crate::storage::FileStore;
use crate::types::{KernelState, ScreenFrame, ShellConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SHELL_TITLE: &str = "jaxOS v1.0 // Neural Kernel";
pub const USER_PROMPT: &str = "USER@JAX> ";

/// Holds lines the router writes during one launch.
const SCRATCH_LINES: usize = 16;

pub struct KernelContext {
    pub config: ShellConfig,
    pub store: Arc<dyn FileStore>,
    pub inference: Arc<dyn InferenceClient>,
    pub navigator: Arc<dyn Navigator>,
    /// Kernel log, shown in system mode
    pub log: LogBuffer,
    pub apps: AppRouter,
    pub screen: RenderHandle,
    pub state: KernelState,
    pub prompt_visible: bool,
    booted_at: Instant,
}

impl KernelContext {
    pub fn new(
        config: ShellConfig,
        store: Arc<dyn FileStore>,
        inference: Arc<dyn InferenceClient>,
        navigator: Arc<dyn Navigator>,
        screen: RenderHandle,
    ) -> Self {
        Self {
            log: LogBuffer::new(config.log_capacity),
            apps: AppRouter::with_builtin_apps(config.app_log_capacity),
            config,
            store,
            inference,
            navigator,
            screen,
            state: KernelState::Booting,
            prompt_visible: false,
            booted_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.booted_at.elapsed()
    }

    /// Launch `id`, returning the kernel log lines the router produced.
    pub fn launch_app(&mut self, id: &str) -> Vec<String> {
        let mut lines = LogBuffer::new(SCRATCH_LINES);
        if self.apps.launch(id, self.store.as_ref(), &mut lines) {
            self.state = KernelState::AppMode;
            self.publish_widgets();
            self.redraw();
        }
        lines.lines()
    }

    /// Stop the active app and return to system mode. No-op without one.
    pub fn close_app(&mut self) -> bool {
        if !self.apps.close(self.store.as_ref(), &mut self.log) {
            return false;
        }
        self.sync_mode();
        self.publish_widgets();
        self.redraw();
        true
    }

    /// Give a line to the active app, bypassing decode and dispatch.
    pub fn route_to_app(&mut self, line: &str) {
        self.apps.route_input(line, self.store.as_ref(), &mut self.log);
        self.sync_mode();
        self.publish_widgets();
        self.redraw();
    }

    /// Idle update of the active app.
    pub fn tick_app(&mut self) -> bool {
        if !self.apps.tick(self.store.as_ref()) {
            return false;
        }
        self.publish_widgets();
        self.redraw();
        true
    }

    fn sync_mode(&mut self) {
        if matches!(self.state, KernelState::SystemMode | KernelState::AppMode) {
            self.state = if self.apps.is_active() {
                KernelState::AppMode
            } else {
                KernelState::SystemMode
            };
        }
    }

    /// Snapshot of what the display should show right now.
    pub fn compose_frame(&self) -> ScreenFrame {
        match (self.state, self.apps.active()) {
            (KernelState::AppMode, Some(session)) => {
                let title = self.apps.active_title().unwrap_or(session.app_id.as_str());
                ScreenFrame {
                    header: vec![
                        format!("jaxOS // {title}"),
                        format!("MODE: {}  APP: {}", self.state, session.app_id),
                    ],
                    log: session.log.lines(),
                    log_first_seq: session.log.first_seq(),
                    prompt_visible: self.prompt_visible,
                    prompt_text: self.apps.active_prompt().unwrap_or_default(),
                    input_buffer: String::new(),
                    start_offset_y: session.content_start,
                }
            }
            _ => ScreenFrame {
                header: vec![
                    SHELL_TITLE.to_string(),
                    format!("MODE: {}  CORTEX: {}", self.state, self.inference.model()),
                ],
                log: self.log.lines(),
                log_first_seq: self.log.first_seq(),
                prompt_visible: self.prompt_visible,
                prompt_text: USER_PROMPT.to_string(),
                input_buffer: String::new(),
                start_offset_y: 0,
            },
        }
    }

    /// Queue a redraw on the display context.
    pub fn redraw(&self) {
        if let Err(e) = self.screen.render_frame(self.compose_frame()) {
            log::debug!("redraw dropped: {e}");
        }
    }

    fn publish_widgets(&self) {
        let widgets = self
            .apps
            .active()
            .map(|session| session.widgets.clone())
            .unwrap_or_default();
        if let Err(e) = self.screen.publish_widgets(widgets) {
            log::debug!("widget update dropped: {e}");
        }
    }

    pub fn display_closed(&self) -> bool {
        self.screen.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use crate::navigator::NavigateError;
    use crate::render::{self, Pump, RenderBridge};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl InferenceClient for Offline {
        async fn infer(&self, _prompt: &str, _system: &str) -> Result<String, InferenceError> {
            Err(InferenceError::Unreachable("offline".into()))
        }

        async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
            Err(InferenceError::Unreachable("offline".into()))
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    #[async_trait]
    impl Navigator for Offline {
        async fn browse(&self, _target: &str) -> Result<String, NavigateError> {
            Err(NavigateError::Fetch("offline".into()))
        }
    }

    fn context() -> (KernelContext, RenderBridge) {
        let (screen, bridge) = render::channel(64);
        let mut ctx = KernelContext::new(
            ShellConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(Offline),
            Arc::new(Offline),
            screen,
        );
        ctx.state = KernelState::SystemMode;
        ctx.prompt_visible = true;
        (ctx, bridge)
    }

    #[test]
    fn test_system_frame() {
        let (mut ctx, _bridge) = context();
        ctx.log.push("hello");

        let frame = ctx.compose_frame();
        assert_eq!(frame.header[0], SHELL_TITLE);
        assert_eq!(frame.header[1], "MODE: SYSTEM  CORTEX: test-model");
        assert_eq!(frame.log, vec!["hello"]);
        assert_eq!(frame.prompt_text, USER_PROMPT);
        assert_eq!(frame.start_offset_y, 0);
    }

    #[test]
    fn test_launch_switches_to_app_frame() {
        let (mut ctx, mut bridge) = context();

        let lines = ctx.launch_app("calc");
        assert_eq!(lines, vec!["[SYS] Launched Calculator"]);
        assert_eq!(ctx.state, KernelState::AppMode);

        assert_eq!(bridge.pump(), Pump::Redraw);
        assert!(!bridge.widgets().is_empty());
        assert_eq!(bridge.frame().prompt_text, "CALCULATOR> ");
        assert_eq!(bridge.frame().log[0], "CALCULATOR");
        assert_eq!(bridge.frame().start_offset_y, 10);
    }

    #[test]
    fn test_unknown_app_stays_in_system_mode() {
        let (mut ctx, _bridge) = context();
        let lines = ctx.launch_app("tetris");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[!] App not found: tetris"));
        assert_eq!(ctx.state, KernelState::SystemMode);
    }

    #[test]
    fn test_app_quit_returns_to_system_mode() {
        let (mut ctx, mut bridge) = context();
        ctx.launch_app("notes");
        ctx.route_to_app("/quit");

        assert_eq!(ctx.state, KernelState::SystemMode);
        assert_eq!(ctx.log.last(), Some("[SYS] Closed Notes"));

        bridge.pump();
        assert!(bridge.widgets().is_empty());
        assert_eq!(bridge.frame().prompt_text, USER_PROMPT);
    }

    #[test]
    fn test_close_without_app() {
        let (mut ctx, _bridge) = context();
        assert!(!ctx.close_app());
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn test_display_gone() {
        let (ctx, bridge) = context();
        drop(bridge);
        ctx.redraw();
        assert!(ctx.display_closed());
    }
}
