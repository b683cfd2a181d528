//! The bot itself.
//!
//! This module provides:
//! - Configuration loading and validation
//! - Cancellation, jitter and interruptible pacing
//! - Screen state detection (home, battle, percentage)
//! - Randomized clicking through `cliclick`
//! - The control loop and the ESC stop listener

pub mod config;
pub mod detection;
pub mod input;
pub mod runner;
pub mod state;
pub mod stop;
pub mod timing;

pub use config::{load_config, resolve_config_path};
pub use input::Cliclick;
pub use runner::Bot;
pub use stop::start_stop_listener;
pub use timing::{CancelToken, Pacer, SystemClock};
