use super::{App, AppFlow, AppIo};
use crate::widgets::{Rect, Widget};
use std::time::{Duration, Instant};
use sysinfo::System;

const BYTES_PER_MB: u64 = 1024 * 1024;
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq)]
struct Stats {
    cpu_percent: f32,
    used_mb: u64,
    total_mb: u64,
    uptime_secs: u64,
    files: usize,
    users: usize,
}

/// Live host and store gauges, refreshed from the idle tick
pub struct SysMon {
    sys: System,
    stats: Stats,
    refreshed_at: Option<Instant>,
}

impl Default for SysMon {
    fn default() -> Self {
        Self {
            sys: System::new(),
            stats: Stats::default(),
            refreshed_at: None,
        }
    }
}

impl SysMon {
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(&mut self, io: &AppIo<'_>) -> bool {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.refreshed_at = Some(Instant::now());

        let stats = Stats {
            cpu_percent: self.sys.global_cpu_usage(),
            used_mb: self.sys.used_memory() / BYTES_PER_MB,
            total_mb: self.sys.total_memory() / BYTES_PER_MB,
            uptime_secs: System::uptime(),
            files: io.store.list_files().len(),
            users: io.store.user_count(),
        };

        let changed = stats != self.stats;
        self.stats = stats;
        changed
    }
}

impl App for SysMon {
    fn title(&self) -> &str {
        "System Monitor"
    }

    fn on_start(&mut self, io: &mut AppIo<'_>) {
        io.log.push("SYSTEM MONITOR");
        io.log.push("Press Q to quit.");
        self.refresh(io);
    }

    fn on_input(&mut self, line: &str, _io: &mut AppIo<'_>) -> AppFlow {
        if line.trim().eq_ignore_ascii_case("q") {
            AppFlow::Close
        } else {
            AppFlow::Continue
        }
    }

    fn on_tick(&mut self, io: &mut AppIo<'_>) -> bool {
        if self
            .refreshed_at
            .is_some_and(|at| at.elapsed() < REFRESH_INTERVAL)
        {
            return false;
        }
        self.refresh(io)
    }

    fn widgets(&self) -> Vec<Widget> {
        let s = &self.stats;
        let rows = [
            format!("CPU   {:>5.1}%", s.cpu_percent),
            format!("RAM   {} / {} MB", s.used_mb, s.total_mb),
            format!(
                "UP    {}h {:02}m {:02}s",
                s.uptime_secs / 3600,
                (s.uptime_secs / 60) % 60,
                s.uptime_secs % 60
            ),
            format!("DISK  {} file(s), {} user(s)", s.files, s.users),
        ];

        let mut widgets = vec![Widget::button(Rect::new(0, 0, 8, 1), "[ QUIT ]", "q")];
        for (row, text) in rows.into_iter().enumerate() {
            widgets.push(Widget::label(Rect::new(0, 2 + row as u16, 40, 1), text));
        }
        widgets
    }
}
