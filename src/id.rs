//! ID generation utilities
//!
//! Turn IDs only correlate log lines for a single chat turn; they are never persisted.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique turn ID
///
/// Format: `turn-{timestamp_ms}-{random_hex}`
/// Example: `turn-1738300800123-a1b2`
pub fn generate_turn_id() -> String {
    let random: u16 = rand::rng().random();
    format!("turn-{}-{:04x}", now_ms(), random)
}
