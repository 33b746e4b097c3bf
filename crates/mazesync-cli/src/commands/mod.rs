pub mod authorize;
pub mod clear;
pub mod config;
pub mod context;
pub mod prompts;
pub mod sync;
pub mod sync_ui;
pub mod watch;
