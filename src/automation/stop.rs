//! Global ESC listener that requests a stop.

use rdev::{Event, EventType, Key, listen};
use std::thread;

use crate::automation::timing::CancelToken;

/// The key that stops the bot.
pub const STOP_KEY: Key = Key::Escape;

/// Spawns a background thread that cancels `token` on the first ESC press.
///
/// Later presses are ignored. The thread only ever sets the token.
pub fn start_stop_listener(token: CancelToken) {
    thread::spawn(move || {
        let result = listen(move |event| on_event(&token, &event));
        if let Err(e) = result {
            crate::log(&format!(
                "[KEYBOARD] Failed to listen for ESC ({:?}). Grant Accessibility permission to your terminal.",
                e
            ));
        }
    });
}

fn on_event(token: &CancelToken, event: &Event) {
    if let EventType::KeyPress(key) = event.event_type {
        if is_stop_key(key) && token.cancel() {
            crate::log("[KEYBOARD] ESC pressed -> stopping");
        }
    }
}

fn is_stop_key(key: Key) -> bool {
    key == STOP_KEY
}
