use super::{App, AppFlow, AppIo};
use crate::widgets::{Rect, Widget};
use chrono::Local;

/// Digital clock, refreshed from the idle tick
#[derive(Debug, Default)]
pub struct Clock {
    shown: String,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }
}

impl App for Clock {
    fn title(&self) -> &str {
        "Clock"
    }

    fn on_start(&mut self, io: &mut AppIo<'_>) {
        io.log.push("DIGITAL CLOCK");
        io.log.push("Press Q to quit.");
        self.shown = Self::now();
    }

    fn on_input(&mut self, line: &str, _io: &mut AppIo<'_>) -> AppFlow {
        if line.trim().eq_ignore_ascii_case("q") {
            AppFlow::Close
        } else {
            AppFlow::Continue
        }
    }

    fn on_tick(&mut self, _io: &mut AppIo<'_>) -> bool {
        let now = Self::now();
        if now == self.shown {
            return false;
        }
        self.shown = now;
        true
    }

    fn widgets(&self) -> Vec<Widget> {
        vec![Widget::label(Rect::new(3, 1, 8, 1), self.shown.clone())]
    }
}
