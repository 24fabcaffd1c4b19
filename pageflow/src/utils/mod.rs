//! Shared helpers: bounded polling, jittered delays, and timestamps.

mod delay;
mod poll;
pub mod timestamps;

pub use delay::{jittered_delay, sleep_jittered, DelayRange};
pub use poll::{poll_until, PollExhausted, PollPolicy};
pub use timestamps::{compact_date, file_timestamp, iso_timestamp, normalize_date, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.contains(':'));
    }
}
