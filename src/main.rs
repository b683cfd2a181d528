//! Autofight
//!
//! A macOS screen automation bot: starts a fight from the home screen, plays
//! a randomized setup, watches an on-screen percentage through OCR and backs
//! out through a fixed cancel sequence. Press ESC to stop.

mod automation;
mod capture;
mod error;
mod geometry;
mod ocr;
mod paths;
mod tool;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use automation::{Bot, CancelToken, Cliclick, Pacer, SystemClock};
use capture::ScreencaptureCli;
use ocr::TesseractOcr;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    // Missing required keys end the run here, before any click
    let arg = std::env::args().nth(1);
    let config_path = automation::resolve_config_path(arg.as_deref());
    let config = automation::load_config(&config_path)?;

    let (tesseract, tessdata) = match ocr::ensure_tesseract(config.ocr.tesseract_path.as_deref())
    {
        Ok(found) => found,
        Err(e) => {
            log(&format!("Warning: {}", e));
            log("Percent readings will be empty until Tesseract is installed.");
            (PathBuf::from("tesseract"), None)
        }
    };

    let token = CancelToken::new();
    automation::start_stop_listener(token.clone());

    let pacer = Pacer::new(token, Box::new(SystemClock::new()));
    let mut bot = Bot::new(
        &config,
        pacer,
        Box::new(ScreencaptureCli::new(config.capture_scale)),
        Box::new(TesseractOcr::new(tesseract, tessdata)),
        Box::new(Cliclick::new()),
    );

    log("Running. Press ESC to stop.");
    let loops = bot.run_forever();
    log(&format!("[EXIT] stopped cleanly after {} loops", loops));
    Ok(())
}
