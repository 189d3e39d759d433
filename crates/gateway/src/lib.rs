//! HTTP gateway and lifecycle for the one-shot share service.
//!
//! Three routes sit in front of one file: `/` issues a download pass after
//! the device validates the visitor's token, `/api/fileinfo` describes the
//! file, `/download` consumes the pass and streams it. The first completed
//! download (or an interrupt) shuts the whole service down.

pub mod handlers;
mod net;
pub mod server;
pub mod shutdown;
pub mod state;

pub use {
    server::{build_app, run},
    shutdown::ShutdownHandle,
    state::{AppState, FileInfo, SharedFile},
};
