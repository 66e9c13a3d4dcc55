//! Request tracing identifiers.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Generate a random 64-bit B3 trace/span id as 16 lowercase hex digits.
pub fn generate_trace_id() -> String {
    let id: u64 = rand::thread_rng().gen();
    format!("{:016x}", id)
}

/// Current time in milliseconds, used as a cache-busting query value.
pub fn request_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_format() {
        let id = generate_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_trace_ids_differ() {
        assert_ne!(generate_trace_id(), generate_trace_id());
    }

    #[test]
    fn test_request_timestamp_is_millis() {
        assert!(request_timestamp() > 1_600_000_000_000);
    }
}
