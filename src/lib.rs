// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod feedback;
pub mod games;
pub mod history;
pub mod logging;
pub mod monitor;
pub mod player;
pub mod runtime;
pub mod selector;
pub mod session;
pub mod speech;
pub mod timers;
pub mod ui;
