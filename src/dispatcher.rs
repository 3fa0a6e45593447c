//! Syscall Dispatcher
//!
//! Executes a validated [`Intent`] against the kernel's collaborators and
//! reports the outcome as log lines. Nothing here returns an error: every
//! failure becomes a line.

use crate::context::KernelContext;
use crate::types::{Action, Intent, Params};
use sysinfo::System;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Execute `intent`, returning the lines to append to the kernel log.
pub async fn dispatch(intent: Intent, ctx: &mut KernelContext) -> Vec<String> {
    let (action, params) = match intent {
        Intent::Unknown { reason } => return vec![format!("[!] Unknown intent: {reason}")],
        Intent::Syscall { action, params } => (action, params),
    };

    log::info!("Executing syscall: {action}");
    let mut lines = vec![format!("[KERNEL] Executing SysCall: {action}")];

    match action {
        Action::CreateFile => match required(&params, action, "path") {
            Ok(path) => {
                let content = params.get("content").map(String::as_str).unwrap_or("");
                if ctx.store.write_file(path, content) {
                    lines.push(format!("[FS] Created {path} ({} bytes)", content.len()));
                } else {
                    lines.push(format!("[FS] Error: could not write {path}."));
                }
            }
            Err(line) => lines.push(line),
        },

        Action::ReadFile => match required(&params, action, "path") {
            Ok(path) => match ctx.store.read_file(path) {
                Some(content) => {
                    lines.push(format!("[FS] Content of {path}:"));
                    if content.is_empty() {
                        lines.push("(empty)".to_string());
                    } else {
                        lines.extend(content.lines().map(str::to_string));
                    }
                }
                None => lines.push(not_found(path)),
            },
            Err(line) => lines.push(line),
        },

        Action::DeleteFile => match required(&params, action, "path") {
            Ok(path) => {
                if ctx.store.delete_file(path) {
                    lines.push(format!("[FS] Deleted {path}"));
                } else {
                    lines.push(not_found(path));
                }
            }
            Err(line) => lines.push(line),
        },

        Action::ListFiles => {
            let files = ctx.store.list_files();
            if files.is_empty() {
                lines.push("[FS] No files.".to_string());
            } else {
                let preview = ctx.config.list_preview;
                lines.push(format!("[FS] {} file(s):", files.len()));
                lines.extend(files.iter().take(preview).map(|f| format!("  - {f}")));
                if files.len() > preview {
                    lines.push(format!("  ... and {} more", files.len() - preview));
                }
            }
        }

        Action::SystemStatus => lines.extend(system_status(ctx)),

        Action::Browse => match required(&params, action, "url") {
            Ok(target) => {
                let navigator = ctx.navigator.clone();
                match navigator.browse(target).await {
                    Ok(summary) => {
                        lines.push(format!("[NET] {target}:"));
                        lines.extend(
                            summary
                                .lines()
                                .filter(|l| !l.trim().is_empty())
                                .map(|l| format!("  {}", l.trim_end())),
                        );
                    }
                    Err(e) => {
                        log::warn!("browse({target}) failed: {e}");
                        lines.push(format!("[NET] Error: {e}"));
                    }
                }
            }
            Err(line) => lines.push(line),
        },

        Action::LaunchApp => match required(&params, action, "name") {
            Ok(name) => lines.extend(ctx.launch_app(name)),
            Err(line) => lines.push(line),
        },

        Action::ListApps => {
            lines.push(format!("[SYS] Apps: {}", ctx.apps.names().join(", ")));
            let active = ctx
                .apps
                .active()
                .map(|session| session.app_id.clone())
                .unwrap_or_else(|| "none".to_string());
            lines.push(format!("[SYS] Active: {active}"));
        }
    }

    lines
}

/// Non-empty parameter or the error line to log instead.
fn required<'a>(params: &'a Params, action: Action, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("[!] {action} requires '{key}'"))
}

fn not_found(path: &str) -> String {
    format!("[FS] Error: File {path} not found.")
}

fn system_status(ctx: &KernelContext) -> Vec<String> {
    let mut sys = System::new();
    sys.refresh_memory();

    let uptime = ctx.uptime().as_secs();
    vec![
        format!(
            "[SYS] RAM: {} MB / {} MB used",
            sys.used_memory() / BYTES_PER_MB,
            sys.total_memory() / BYTES_PER_MB
        ),
        format!("[SYS] Cortex: {}", ctx.inference.model()),
        format!(
            "[SYS] Uptime: {:02}:{:02}:{:02}",
            uptime / 3600,
            (uptime / 60) % 60,
            uptime % 60
        ),
        format!("[SYS] Files: {}", ctx.store.list_files().len()),
        format!("[SYS] User: {}", ctx.apps.user().unwrap_or("guest")),
        format!("[SYS] Mode: {}", ctx.state),
    ]
}
