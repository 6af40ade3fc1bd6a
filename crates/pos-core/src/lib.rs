//! Core traits and types for the POS transactional core.
//!
//! This crate provides the fundamental abstractions used to build the
//! event-driven cart, terminal, tranlog and report services on top of
//! CQRS and event sourcing.
//!
//! ## Core Concepts
//!
//! - **State**: domain state for a feature (a cart, a terminal session).
//! - **Action**: all possible inputs to a reducer (commands and events).
//! - **Reducer**: pure function `(State, Action, Environment) -> (State, Effects)`.
//! - **Effect**: side effect descriptions (not execution).
//! - **Environment**: injected dependencies via traits (clock, event store, event bus).
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell.
//! - Unidirectional data flow.
//! - Explicit effects (no hidden I/O).
//! - Dependency injection via Environment.

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod event;
pub mod event_bus;
pub mod event_store;
pub mod projection;
pub mod stream;

pub use event::{Event, EventError, SerializedEvent};
pub use event_bus::{EventBus, EventBusError, EventStream};
pub use event_store::{EventStore, EventStoreError};
pub use projection::{EventPosition, Projection, ProjectionCheckpoint, ProjectionError, ProjectionStore};
pub use stream::{ParseStreamIdError, StreamId, Version};

/// Reducer module: the core trait for business logic.
///
/// Reducers are pure functions: `(State, Action, Environment) -> Effects`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;

    /// The Reducer trait: core abstraction for business logic.
    pub trait Reducer {
        /// The state type this reducer operates on.
        type State;

        /// The action type this reducer processes.
        type Action;

        /// The environment type with injected dependencies.
        type Environment;

        /// Reduce an action into state changes and effects. A pure function
        /// that validates the action, updates state in place, and returns
        /// effect descriptions for the runtime to execute.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Vec<Effect<Self::Action>>;
    }
}

/// Effect module: side effect descriptions.
///
/// Effects are NOT executed immediately. They are values returned from
/// reducers and executed by the runtime, which keeps reducers pure and
/// unit-testable without a database or event bus in the loop.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type: describes a side effect to be executed by the runtime.
    #[allow(missing_docs)]
    pub enum Effect<Action> {
        /// No-op effect.
        None,

        /// Run effects in parallel.
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially.
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries, the delivery tracker's
        /// republish sweep).
        Delay { duration: Duration, action: Box<Action> },

        /// Arbitrary async computation. Returns `Option<Action>`: if `Some`,
        /// the action is fed back into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel.
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially.
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Transform the action type of this effect, for composing effects
        /// from different reducers into a higher-level action type.
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            F: Fn(Action) -> B + Send + Sync + 'static + Clone,
            Action: 'static,
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| map_effect(e, f.clone())).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| map_effect(e, f.clone())).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }

    fn map_effect<A, B, F>(effect: Effect<A>, f: F) -> Effect<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static + Clone,
        A: 'static,
        B: Send + 'static,
    {
        match effect {
            Effect::None => Effect::None,
            Effect::Parallel(effects) => {
                Effect::Parallel(effects.into_iter().map(|e| map_effect(e, f.clone())).collect())
            },
            Effect::Sequential(effects) => {
                Effect::Sequential(effects.into_iter().map(|e| map_effect(e, f.clone())).collect())
            },
            Effect::Delay { duration, action } => Effect::Delay {
                duration,
                action: Box::new(f(*action)),
            },
            Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
        }
    }
}

/// Environment module: dependency-injection traits. All external
/// dependencies (clock, event store, event bus, id generation) are
/// abstracted behind traits and injected via the Environment parameter,
/// so reducers stay unit-testable without a database.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait: abstracts time for testability. Production uses
    /// `Utc::now()`; tests use a fixed or stepped clock so FSM transitions
    /// and terminal open/close rollovers are deterministic.
    pub trait Clock: Send + Sync {
        /// Get the current time.
        fn now(&self) -> DateTime<Utc>;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Action1,
        Action2,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum MappedAction {
        Mapped(TestAction),
    }

    #[test]
    fn effect_merge_produces_parallel() {
        let merged = Effect::merge(vec![Effect::None, Effect::<TestAction>::None]);
        match merged {
            Effect::Parallel(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("expected Parallel effect"),
        }
    }

    #[test]
    fn effect_chain_produces_sequential() {
        let chained = Effect::chain(vec![Effect::None, Effect::<TestAction>::None]);
        match chained {
            Effect::Sequential(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("expected Sequential effect"),
        }
    }

    #[test]
    fn effect_map_transforms_delay_action() {
        let effect: Effect<TestAction> = Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(TestAction::Action1),
        };

        let mapped: Effect<MappedAction> = effect.map(MappedAction::Mapped);

        match mapped {
            Effect::Delay { action, .. } => assert_eq!(*action, MappedAction::Mapped(TestAction::Action1)),
            _ => panic!("expected Delay effect"),
        }
    }

    #[tokio::test]
    async fn effect_map_transforms_future_result() {
        let effect: Effect<TestAction> = Effect::Future(Box::pin(async { Some(TestAction::Action2) }));
        let mapped: Effect<MappedAction> = effect.map(MappedAction::Mapped);

        match mapped {
            Effect::Future(fut) => {
                assert_eq!(fut.await, Some(MappedAction::Mapped(TestAction::Action2)));
            },
            _ => panic!("expected Future effect"),
        }
    }
}
