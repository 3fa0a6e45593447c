//! Command Loop (worker context)
//!
//! `BOOTING -> SYSTEM <-> APP -> SHUTTING DOWN`
//!
//! Each line in system mode runs strictly in order: log it, infer, decode,
//! dispatch, redraw. In app mode lines go straight to the active app.
//! A panic inside one iteration is contained and reported as a log line.

use crate::context::{KernelContext, USER_PROMPT};
use crate::decoder::decode_reply;
use crate::dispatcher::dispatch;
use crate::input::{InputQueue, Polled, ShutdownFlag};
use crate::types::KernelState;
use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::thread::JoinHandle;
use std::time::Duration;

pub const THINKING: &str = "Thinking...";

const BOOT_LINES: [&str; 3] = [
    "jaxOS v1.0 booting...",
    "[*] Initializing Neural Shim...",
    "[*] Mounting file store...",
];

const WORKER_ACK_TIMEOUT: Duration = Duration::from_secs(2);

pub const KERNEL_SYSTEM_PROMPT: &str = r#"You are the Kernel of jaxOS, a retro-futurist AI operating system.
Interpret the user's natural language command and convert it into exactly one JSON system call.

Capabilities:
- File system: create_file (path, content), read_file (path), delete_file (path), list_files
- System: system_status, list_apps, launch_app (name: calc, clock, notes, sysmon, users)
- Network: browse (url, or a search query)

Output ONLY valid JSON. No markdown, no explanations.
Schema: {"action": "action_name", "params": {"param1": "value1"}}
If the request maps to none of the capabilities, output {"action": "unknown", "reason": "short explanation"}.

Examples:
User: "Create a file named notes.txt saying hello world"
Output: {"action": "create_file", "params": {"path": "notes.txt", "content": "hello world"}}

User: "What files do I have?"
Output: {"action": "list_files", "params": {}}

User: "Open the calculator"
Output: {"action": "launch_app", "params": {"name": "calc"}}

User: "What's on hacker news?"
Output: {"action": "browse", "params": {"url": "news.ycombinator.com"}}
"#;

pub struct CommandLoop {
    ctx: KernelContext,
    input: InputQueue,
    shutdown: ShutdownFlag,
}

impl CommandLoop {
    pub fn new(ctx: KernelContext, input: InputQueue, shutdown: ShutdownFlag) -> Self {
        Self { ctx, input, shutdown }
    }

    /// Run until an exit keyword, an interrupt or a lost display.
    pub async fn run(mut self) -> KernelContext {
        self.boot().await;

        let poll_interval = Duration::from_millis(self.ctx.config.poll_interval_ms);
        while !self.shutdown.is_triggered() {
            if self.ctx.display_closed() {
                log::warn!("Display context is gone, shutting down");
                break;
            }

            match self.input.poll(poll_interval).await {
                Polled::Line(line) => self.handle_line(&line).await,
                Polled::Idle => {
                    if self.ctx.state == KernelState::AppMode {
                        self.ctx.tick_app();
                    }
                }
                Polled::Closed => {
                    log::info!("Input closed, shutting down");
                    break;
                }
            }
        }

        self.shut_down();
        self.ctx
    }

    async fn boot(&mut self) {
        log::info!("Booting jaxOS kernel");
        self.ctx.state = KernelState::Booting;
        self.ctx.prompt_visible = false;

        self.ctx.log.push_lines(BOOT_LINES);
        let model = self.ctx.inference.model().to_string();
        self.ctx.log.push(format!("[*] Connecting to Cortex ({model})..."));
        self.ctx.redraw();

        match self.ctx.inference.list_models().await {
            Ok(models) if models.iter().any(|m| m == &model) => {
                log::info!("Cortex online, model {model} installed");
                self.ctx.log.push("[OK] Cortex online.");
            }
            Ok(models) => {
                log::warn!("Model {model} not installed ({} models available)", models.len());
                self.ctx.log.push(format!(
                    "[!] Cortex online, but {model} is not installed ({} models available).",
                    models.len()
                ));
            }
            Err(e) => {
                log::warn!("Cortex model listing failed: {e}");
                self.ctx.log.push(format!("[!] Cortex unreachable: {e}"));
                self.ctx.log.push("[!] Commands will resolve to unknown until it is back.");
            }
        }

        let files = self.ctx.store.list_files().len();
        self.ctx.log.push(format!("[FS] {files} file(s) mounted."));
        self.ctx.log.push("System ready. Waiting for intent...");

        self.ctx.state = KernelState::SystemMode;
        self.ctx.prompt_visible = true;
        self.ctx.redraw();
    }

    async fn handle_line(&mut self, line: &str) {
        let outcome = AssertUnwindSafe(self.process_line(line))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            log::error!("Kernel panic while handling '{line}': {message}");

            self.ctx.log.remove_last_if(THINKING);
            self.ctx.log.push(format!("[!] Kernel panic: {message}"));
            self.ctx.prompt_visible = true;
            self.ctx.redraw();
        }
    }

    async fn process_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if self.ctx.state == KernelState::AppMode {
            self.ctx.route_to_app(line);
            return;
        }

        self.ctx.log.push(format!("{USER_PROMPT}{line}"));

        if self.ctx.config.is_exit_keyword(line) {
            log::info!("Exit keyword received");
            self.ctx.log.push("Shutting down...");
            self.shutdown.trigger();
            return;
        }

        self.ctx.log.push(THINKING);
        self.ctx.prompt_visible = false;
        self.ctx.redraw();

        let inference = self.ctx.inference.clone();
        let reply = tokio::select! {
            reply = inference.infer(line, KERNEL_SYSTEM_PROMPT) => reply,
            _ = shutdown_requested(&self.shutdown, Duration::from_millis(self.ctx.config.poll_interval_ms)) => {
                log::info!("Shutdown during inference, dropping request");
                return;
            }
        };

        self.ctx.log.remove_last_if(THINKING);
        let intent = decode_reply(reply);
        log::info!("Decoded intent: {}", intent.action_name());

        let lines = dispatch(intent, &mut self.ctx).await;
        self.ctx.log.push_lines(lines);

        self.ctx.prompt_visible = true;
        self.ctx.redraw();
    }

    fn shut_down(&mut self) {
        log::info!("Kernel shutting down");
        self.ctx.close_app();
        self.ctx.state = KernelState::ShuttingDown;
        self.ctx.prompt_visible = false;
        self.ctx.redraw();

        if let Err(e) = self.ctx.screen.stop() {
            log::debug!("display already stopped: {e}");
        }
        self.shutdown.trigger();
    }
}

async fn shutdown_requested(flag: &ShutdownFlag, interval: Duration) {
    while !flag.is_triggered() {
        tokio::time::sleep(interval).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Start the worker context on its own thread with a current-thread runtime.
pub fn spawn_worker(ctx: KernelContext, input: InputQueue, shutdown: ShutdownFlag) -> Result<JoinHandle<()>> {
    let (ack_tx, ack_rx) = std::sync::mpsc::channel::<Result<()>>();

    let handle = std::thread::Builder::new()
        .name("jaxos-worker".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ack_tx.send(Err(anyhow!("failed to build tokio runtime: {e}")));
                    return;
                }
            };
            let _ = ack_tx.send(Ok(()));

            rt.block_on(CommandLoop::new(ctx, input, shutdown).run());
            log::info!("Worker context stopped");
        })
        .context("Failed to spawn worker thread")?;

    ack_rx
        .recv_timeout(WORKER_ACK_TIMEOUT)
        .map_err(|_| anyhow!("worker failed to start (timeout)"))??;

    Ok(handle)
}
