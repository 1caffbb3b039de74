use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use catalog_core::Clock;

/// Clock that advances one second on every read.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::seconds(1);
        now
    }
}
