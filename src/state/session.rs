// Session timing

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// Start of a reporting session, captured at `begin`
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
    wall: DateTime<Local>,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            wall: Local::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed().as_millis()
    }

    /// Wall-clock start as written into report headers: `yyyy.MM.dd HH:mm:ss:SSS`
    pub fn timestamp(&self) -> String {
        self.wall.format("%Y.%m.%d %H:%M:%S:%3f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_shape() {
        let stamp = SessionClock::start().timestamp();
        // 2024.01.31 12:34:56:789
        assert_eq!(stamp.len(), 23);
        assert_eq!(&stamp[4..5], ".");
        assert_eq!(&stamp[19..20], ":");
    }
}
