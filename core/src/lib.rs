//! # Afritix Core
//!
//! Core traits and types for the Afritix ticket wallet.
//!
//! The wallet is a thin client over a managed backend. This crate holds the
//! pieces every other crate agrees on:
//!
//! - **Domain types** ([`types`]): tickets, validation events, transfers
//! - **Errors** ([`error`]): the backend error shape and the ticket error taxonomy
//! - **Backend seam** ([`backend`]): the query/mutation contract the backend fulfils
//! - **Reducer plumbing** ([`reducer`], [`effect`], [`environment`]): the
//!   `(State, Action, Environment) → Effects` shape the view state is written in
//!
//! ## Example
//!
//! ```ignore
//! use afritix_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for TicketViewReducer {
//!     type State = TicketViewState;
//!     type Action = TicketViewAction;
//!     type Environment = TicketEnvironment<B>;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TicketViewState,
//!         action: TicketViewAction,
//!         env: &TicketEnvironment<B>,
//!     ) -> SmallVec<[Effect<TicketViewAction>; 4]> {
//!         // State transition, then describe the backend call
//!         SmallVec::new()
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::{smallvec, SmallVec};

pub use backend::TicketBackend;
pub use error::{BackendError, RecipientError, TicketError};

/// Reducer module - state transitions for view state
///
/// Reducers are plain functions `(State, Action, Environment) → Effects`.
/// They mutate state synchronously and describe any I/O as [`Effect`](crate::effect::Effect)
/// values for the store to run.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer owns
    /// - `Action`: Commands from callers and outcomes fed back by effects
    /// - `Environment`: Injected dependencies (backend, clock)
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must not perform I/O here; anything asynchronous
        /// goes into the returned effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - descriptions of asynchronous work
///
/// Effects are values returned from reducers. The store executes them and
/// feeds any produced action back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed by a store
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap a future producing an optional follow-up action
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Expiry stamps, synthetic history cut-offs and issuance timestamps all
    /// read the time through this trait so tests can pin it.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn effect_debug_hides_future() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert!(Effect::<u8>::None.is_none());
    }
}
