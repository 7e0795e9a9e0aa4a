//! # Afritix Testing
//!
//! Testing utilities for the Afritix ticket wallet.
//!
//! This crate provides:
//! - [`InMemoryTicketBackend`]: a `TicketBackend` held in memory, with call
//!   counters and error injection
//! - [`FixedClock`] and [`test_clock`]: deterministic time
//! - [`ReducerTest`]: Given-When-Then assertions for reducers
//! - [`fixtures`]: ready-made rows for the common scenarios
//!
//! ## Example
//!
//! ```ignore
//! use afritix_testing::{fixtures, InMemoryTicketBackend};
//!
//! #[tokio::test]
//! async fn sells_out() {
//!     let backend = InMemoryTicketBackend::new();
//!     let catalog = fixtures::seed_catalog(&backend, 1);
//!     // ... purchase twice, second one is Unavailable
//! }
//! ```

pub mod backend;
pub mod fixtures;
pub mod reducer_test;

use afritix_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same instant until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same instant.
    ///
    /// # Example
    ///
    /// ```
    /// use afritix_testing::mocks::FixedClock;
    /// use afritix_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::days(2));
    /// assert_eq!(clock.now() - before, Duration::days(2));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to `time`
        #[allow(clippy::unwrap_used)] // Test infrastructure
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }

        /// Move the clock forward by `by`
        #[allow(clippy::unwrap_used)] // Test infrastructure
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Test infrastructure
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use backend::{BackendCall, InMemoryTicketBackend};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
