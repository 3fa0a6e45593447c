//! Render Bridge
//!
//! The worker never draws. It sends whole [`ScreenFrame`] snapshots over a
//! bounded channel through a [`RenderHandle`]; the display context drains
//! them with [`RenderBridge::pump`] and owns the only mutable screen state:
//! the current frame, the published widgets, the live input line and the
//! scroll position.
//!
//! `RenderBridge` is `!Send`: it never leaves the display thread.

use crate::types::ScreenFrame;
use crate::widgets::{self, Widget};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRequest {
    /// Replace the whole frame
    Frame(ScreenFrame),
    /// Replace the widget set of the active app
    Widgets(Vec<Widget>),
    /// Stop the display event loop
    Shutdown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("display context is gone")]
    Disconnected,
}

/// Worker-side sender of render requests.
#[derive(Clone)]
pub struct RenderHandle {
    tx: Sender<RenderRequest>,
    closed: Arc<AtomicBool>,
}

impl RenderHandle {
    fn send(&self, request: RenderRequest) -> Result<(), RenderError> {
        let result = match self.tx.try_send(request) {
            Ok(()) => Ok(()),
            // Blocks the worker thread until the display drains a slot. The
            // worker runtime is current-thread and hosts only the command loop.
            Err(TrySendError::Full(request)) => self.tx.send(request).map_err(|_| ()),
            Err(TrySendError::Disconnected(_)) => Err(()),
        };

        result.map_err(|()| {
            self.closed.store(true, Ordering::SeqCst);
            RenderError::Disconnected
        })
    }

    pub fn render_frame(&self, frame: ScreenFrame) -> Result<(), RenderError> {
        self.send(RenderRequest::Frame(frame))
    }

    pub fn publish_widgets(&self, widgets: Vec<Widget>) -> Result<(), RenderError> {
        self.send(RenderRequest::Widgets(widgets))
    }

    /// Ask the display to leave its event loop.
    pub fn stop(&self) -> Result<(), RenderError> {
        self.send(RenderRequest::Shutdown)
    }

    /// `true` once a send found the display gone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Outcome of draining pending render requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    Idle,
    Redraw,
    Stop,
}

/// Display-side screen state.
pub struct RenderBridge {
    rx: Receiver<RenderRequest>,
    frame: ScreenFrame,
    widgets: Vec<Widget>,
    input: String,
    top: usize,
    pinned: bool,
    viewport_height: usize,
    widget_origin: (u16, u16),
    _display_only: PhantomData<*const ()>,
}

/// Create a connected handle/bridge pair.
pub fn channel(capacity: usize) -> (RenderHandle, RenderBridge) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));

    let handle = RenderHandle {
        tx,
        closed: Arc::new(AtomicBool::new(false)),
    };
    let bridge = RenderBridge {
        rx,
        frame: ScreenFrame::default(),
        widgets: Vec::new(),
        input: String::new(),
        top: 0,
        pinned: true,
        viewport_height: 1,
        widget_origin: (0, 0),
        _display_only: PhantomData,
    };
    (handle, bridge)
}

impl RenderBridge {
    /// Drain pending requests. Of several queued frames only the newest is applied.
    pub fn pump(&mut self) -> Pump {
        let mut latest = None;
        let mut changed = false;

        loop {
            match self.rx.try_recv() {
                Ok(RenderRequest::Frame(frame)) => latest = Some(frame),
                Ok(RenderRequest::Widgets(widgets)) => {
                    self.widgets = widgets;
                    changed = true;
                }
                Ok(RenderRequest::Shutdown) | Err(TryRecvError::Disconnected) => return Pump::Stop,
                Err(TryRecvError::Empty) => break,
            }
        }

        if let Some(frame) = latest {
            self.apply_frame(frame);
            changed = true;
        }

        if changed {
            Pump::Redraw
        } else {
            Pump::Idle
        }
    }

    /// Replace the frame as a whole. The live input line is kept, and a
    /// scrolled-up view stays on the same lines while old ones are evicted.
    pub fn apply_frame(&mut self, mut frame: ScreenFrame) {
        frame.input_buffer = self.input.clone();
        if !self.pinned {
            let evicted = frame.log_first_seq.saturating_sub(self.frame.log_first_seq);
            self.top = self
                .top
                .saturating_sub(usize::try_from(evicted).unwrap_or(usize::MAX));
        }
        self.frame = frame;
        self.clamp_scroll();
    }

    pub fn frame(&self) -> &ScreenFrame {
        &self.frame
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    fn max_top(&self) -> usize {
        self.frame.log.len().saturating_sub(self.viewport_height)
    }

    fn clamp_scroll(&mut self) {
        let max_top = self.max_top();
        if self.pinned || self.top >= max_top {
            self.top = max_top;
            self.pinned = true;
        }
    }

    pub fn set_viewport_height(&mut self, rows: usize) {
        self.viewport_height = rows.max(1);
        self.clamp_scroll();
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.top = self.top.min(self.max_top()).saturating_sub(rows);
        self.pinned = self.top >= self.max_top();
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.top = self.top.saturating_add(rows);
        self.clamp_scroll();
    }

    pub fn at_bottom(&self) -> bool {
        self.pinned
    }

    /// Log lines inside the viewport.
    pub fn visible_log(&self) -> &[String] {
        let log = &self.frame.log;
        let start = self.top.min(log.len());
        let end = start.saturating_add(self.viewport_height).min(log.len());
        &log[start..end]
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
        self.frame.input_buffer = self.input.clone();
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
        self.frame.input_buffer = self.input.clone();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.frame.input_buffer.clear();
    }

    /// Take the completed line and jump back to the newest output.
    pub fn take_input(&mut self) -> String {
        self.frame.input_buffer.clear();
        self.pinned = true;
        self.clamp_scroll();
        std::mem::take(&mut self.input)
    }

    /// Screen cell where widget coordinates start, recorded while drawing.
    pub fn set_widget_origin(&mut self, x: u16, y: u16) {
        self.widget_origin = (x, y);
    }

    /// Line emitted by the button under screen cell `(col, row)`.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<String> {
        let (ox, oy) = self.widget_origin;
        if col < ox || row < oy {
            return None;
        }
        widgets::hit_test(&self.widgets, col - ox, row - oy)
    }
}
