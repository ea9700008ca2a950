//! Clock abstraction
//!
//! Daily quota windows roll over at UTC midnight. The current day comes from
//! an injected clock rather than ambient time so rollover behavior can be
//! tested deterministically.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in UTC
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub type DynClock = Arc<dyn Clock>;

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl SystemClock {
    pub fn boxed() -> DynClock {
        Arc::new(SystemClock)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedClock;
    use super::*;

    #[test]
    fn test_today_is_utc_date() {
        let clock = FixedClock::at("2025-06-01T23:59:59Z".parse().unwrap());
        assert_eq!(clock.today(), "2025-06-01".parse::<NaiveDate>().unwrap());

        clock.set("2025-06-02T00:00:01Z".parse().unwrap());
        assert_eq!(clock.today(), "2025-06-02".parse::<NaiveDate>().unwrap());
    }
}
