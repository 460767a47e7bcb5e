//! Given-When-Then harness for reducers
//!
//! Drives a reducer synchronously without a Store, so tests can assert on
//! state and on the effect descriptions a command produces without running
//! them.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use eventhub_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test.
///
/// `given_state` sets the starting state, `when_action` queues actions
/// (applied in order), and the `then_*` checks run against the final state
/// and the effects returned by the LAST action.
///
/// # Example
///
/// ```ignore
/// use eventhub_testing::ReducerTest;
///
/// ReducerTest::new(BookingReducer::new())
///     .with_env(test_environment())
///     .given_state(BookingState::with_requests(vec![pending("r1")]))
///     .when_action(BookingAction::TransitionStatus { .. })
///     .then_state(|state| assert!(state.is_in_flight(&RequestId::from("r1"))))
///     .then_effects(assertions::assert_has_future_effect)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_checks: Vec<StateCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a test for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }

    /// Environment passed to every reduce call
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Starting state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When). May be called more than once.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Check the final state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Check the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Apply the actions and run every check
    ///
    /// # Panics
    ///
    /// Panics if the state, environment, or at least one action is missing,
    /// or if a check fails.
    #[allow(clippy::panic)] // Test harness
    #[allow(clippy::expect_used)] // Test harness
    pub fn run(self) {
        let mut state = self.initial_state.expect("call given_state() before run()");
        let env = self.environment.expect("call with_env() before run()");
        assert!(!self.actions.is_empty(), "call when_action() before run()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for check in self.state_checks {
            check(&state);
        }
        for check in self.effect_checks {
            check(&effects);
        }
    }
}

/// Effect assertions
pub mod assertions {
    use eventhub_core::effect::Effect;

    /// Assert that nothing needs to run
    ///
    /// # Panics
    ///
    /// Panics if any effect is not `None`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, found {}: {effects:?}",
            effects.len()
        );
    }

    /// Assert the number of top-level effects
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "Unexpected effect count");
    }

    /// Assert at least one async effect was produced
    ///
    /// # Panics
    ///
    /// Panics if no `Future` effect is present at the top level.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected a Future effect"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct Counter {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum CounterAction {
        Add(i32),
        Echo,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = Counter;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Counter,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Add(n) => {
                    state.count += n;
                    smallvec![Effect::None]
                },
                CounterAction::Echo => {
                    smallvec![Effect::Future(Box::pin(async { Some(CounterAction::Add(1)) }))]
                },
            }
        }
    }

    #[test]
    fn applies_actions_in_order() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(Counter { count: 0 })
            .when_action(CounterAction::Add(2))
            .when_action(CounterAction::Add(-5))
            .then_state(|state| assert_eq!(state.count, -3))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn effects_come_from_last_action() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(Counter { count: 0 })
            .when_action(CounterAction::Add(1))
            .when_action(CounterAction::Echo)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }
}
