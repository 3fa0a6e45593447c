//! jaxOS Shell - Natural-Language Command Layer
//!
//! Free-form text goes to an inference service; the reply is decoded into a
//! whitelisted [`Intent`] before anything touches files, the network or the
//! app registry. Replies that cannot be authorized become `unknown`.
//!
//! # Architecture
//!
//! - **Decoder**: raw model reply → validated [`Intent`] (pure, never fails)
//! - **Dispatcher**: [`Intent`] → collaborator calls → log lines
//! - **Render Bridge**: worker → display frame snapshots over a bounded channel
//! - **Command Loop**: boot, poll input, infer, decode, dispatch, redraw
//! - **Application Router**: single active mini-app, start/stop hooks
//!
//! Two contexts: the worker thread (command loop, network I/O) and the
//! display thread (terminal, keystrokes). They share only the input queue
//! and the render channel.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jaxos::{decode, Action, Intent};
//!
//! let reply = "```json\n{\"intent\": \"create_file\", \"filename\": \"x\", \"file_content\": \"y\"}\n```";
//! match decode(reply) {
//!     Intent::Syscall { action: Action::CreateFile, params } => {
//!         assert_eq!(params["path"], "x");
//!     }
//!     other => println!("rejected: {other:?}"),
//! }
//! ```

pub mod apps;
pub mod auth;
pub mod config;
pub mod context;
pub mod decoder;
pub mod dispatcher;
pub mod display;
pub mod inference;
pub mod input;
pub mod kernel;
pub mod log_buffer;
pub mod navigator;
pub mod render;
pub mod router;
pub mod storage;
pub mod types;
pub mod widgets;

pub use auth::AuthError;
pub use context::KernelContext;
pub use decoder::{decode, decode_reply};
pub use dispatcher::dispatch;
pub use inference::{InferenceClient, InferenceError, OllamaClient};
pub use kernel::{spawn_worker, CommandLoop};
pub use log_buffer::LogBuffer;
pub use navigator::{NavigateError, Navigator, WebNavigator};
pub use router::{AppRouter, AppSession};
pub use storage::{FileStore, MemoryStore, SledStore};
pub use types::*;
