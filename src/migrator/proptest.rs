//! Property-Based Tests for Candidate Ordering
//!
//! # Test Properties
//!
//! 1. **Override Order**: any valid override is evaluated exactly, in the given order
//! 2. **Short Circuit**: nothing after the first success is evaluated

#![cfg(test)]

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use super::context::ClusterSet;
use super::engine::tests::{engine, request, Behavior, FakeStrategy};
use crate::error::Error;

const NAMES: [&str; 4] = ["w", "x", "y", "z"];

/// Non-empty override lists drawn from the registered names, in any order.
fn override_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(NAMES.to_vec(), 1..=NAMES.len()).prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Evaluation follows the override exactly when nothing is applicable.
    #[test]
    fn prop_override_is_evaluated_in_order(overrides in override_strategy()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (engine, _) = engine(
            NAMES
                .into_iter()
                .map(|name| FakeStrategy::new(name, Behavior::NotApplicable, &log) as Arc<dyn super::Strategy>)
                .collect(),
        );

        let result = tokio_test::block_on(engine.run(
            &request(&overrides),
            &ClusterSet::new(),
            &CancellationToken::new(),
        ));

        let err = result.err().unwrap();
        let exhausted = matches!(err, Error::Exhausted { .. });
        prop_assert!(exhausted);
        prop_assert_eq!(&*log.lock(), &overrides);

        let attempted: Vec<&str> = err.attempts().iter().map(|a| a.strategy.as_str()).collect();
        prop_assert_eq!(attempted, overrides);
    }

    /// The first succeeding candidate is the last one evaluated.
    #[test]
    fn prop_success_short_circuits(overrides in override_strategy(), winner in 0usize..4) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let winner = NAMES[winner];
        let (engine, _) = engine(
            NAMES
                .into_iter()
                .map(|name| {
                    let behavior = if name == winner { Behavior::Succeed } else { Behavior::Fail };
                    FakeStrategy::new(name, behavior, &log) as Arc<dyn super::Strategy>
                })
                .collect(),
        );

        let result = tokio_test::block_on(engine.run(
            &request(&overrides),
            &ClusterSet::new(),
            &CancellationToken::new(),
        ));

        match overrides.iter().position(|n| *n == winner) {
            Some(index) => {
                let report = result.unwrap();
                prop_assert_eq!(report.strategy.as_str(), winner);
                prop_assert_eq!(&*log.lock(), &overrides[..=index]);
            }
            None => {
                prop_assert!(result.is_err());
                prop_assert_eq!(&*log.lock(), &overrides);
            }
        }
    }
}
