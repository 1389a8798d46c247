//! Probability-combination registry.
//!
//! A probmethod reduces a list of named scores to one scalar. It is
//! applied at two levels: per datapoint (one score per model) and per
//! entity (one score per datapoint). The name attached to each score is
//! the model name at the datapoint level and the datapoint name at the
//! entity level, so parameterized methods can weight by position name.
//!
//! Method specs follow the grammar `name` | `name:<JSON-object>`; the
//! suffix is split off at the first `:` and handed to the method raw.
//! Only parameter-accepting methods parse it.

use std::collections::HashMap;

use crate::errors::{EmbsearchError, EmbsearchResult, SearchError};

/// A combination function: named scores + optional raw parameter suffix.
pub type CombineFn = fn(&[(&str, f64)], Option<&str>) -> EmbsearchResult<f64>;

/// Named-function dispatch table. Dispatch is by exact match on the
/// name part of the spec.
pub struct Probmethods {
    methods: HashMap<String, CombineFn>,
}

impl Probmethods {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// The registry with the built-in methods installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("weighted_average", weighted_average);
        registry.register("wavg", weighted_average);
        registry.register("DictionaryWeightedAverage", dictionary_weighted_average);
        registry.register("HVEWAvg", hvew_average);
        registry
    }

    /// Register a method under a name. This is the extension point;
    /// re-registering a name replaces the previous function.
    pub fn register(&mut self, name: impl Into<String>, f: CombineFn) {
        self.methods.insert(name.into(), f);
    }

    /// Reduce `scores` according to `spec`.
    pub fn combine(&self, spec: &str, scores: &[(&str, f64)]) -> EmbsearchResult<f64> {
        let (name, params) = match spec.split_once(':') {
            Some((name, params)) => (name, Some(params)),
            None => (spec, None),
        };
        let f = self
            .methods
            .get(name)
            .ok_or_else(|| SearchError::UnknownProbmethod {
                name: name.to_string(),
            })?;
        f(scores, params)
    }

    /// Whether a spec's method name is registered.
    pub fn contains(&self, spec: &str) -> bool {
        let name = spec.split_once(':').map(|(n, _)| n).unwrap_or(spec);
        self.methods.contains_key(name)
    }
}

impl Default for Probmethods {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// `wavg`: self-weighted average with `f(x) = 1/(1-x)`. Any score ≥ 1
/// saturates the result at 1. Amplifies high-confidence scores.
fn weighted_average(scores: &[(&str, f64)], _params: Option<&str>) -> EmbsearchResult<f64> {
    if scores.is_empty() {
        return Ok(0.0);
    }
    if scores.iter().any(|(_, x)| *x >= 1.0) {
        return Ok(1.0);
    }
    let fact = |x: f64| 1.0 / (1.0 - x);
    let numerator: f64 = scores.iter().map(|(_, x)| x * fact(*x)).sum();
    let denominator: f64 = scores.iter().map(|(_, x)| fact(*x)).sum();
    Ok(numerator / denominator)
}

/// `DictionaryWeightedAverage:{name: weight, …}`: arithmetic mean with
/// per-name weights from the parameter object. Names absent from the
/// object weigh 1.
fn dictionary_weighted_average(
    scores: &[(&str, f64)],
    params: Option<&str>,
) -> EmbsearchResult<f64> {
    let weights: HashMap<String, f64> = match params {
        Some(raw) => {
            serde_json::from_str(raw).map_err(|e| EmbsearchError::BadSettings {
                reason: format!("DictionaryWeightedAverage parameters: {e}"),
            })?
        }
        None => HashMap::new(),
    };
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (name, score) in scores {
        let weight = weights.get(*name).copied().unwrap_or(1.0);
        weighted_sum += weight * score;
        weight_sum += weight;
    }
    if weight_sum == 0.0 {
        return Ok(0.0);
    }
    Ok(weighted_sum / weight_sum)
}

/// `HVEWAvg`: one minus the harmonic mean of the distances to 1, with
/// the same ≥ 1 saturation as `wavg`. Identity for a single score;
/// amplifies high scores more aggressively than `wavg`.
fn hvew_average(scores: &[(&str, f64)], _params: Option<&str>) -> EmbsearchResult<f64> {
    if scores.is_empty() {
        return Ok(0.0);
    }
    if scores.iter().any(|(_, x)| *x >= 1.0) {
        return Ok(1.0);
    }
    let inverse_distance_sum: f64 = scores.iter().map(|(_, x)| 1.0 / (1.0 - x)).sum();
    Ok(1.0 - scores.len() as f64 / inverse_distance_sum)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn unnamed(xs: &[f64]) -> Vec<(&'static str, f64)> {
        xs.iter().map(|x| ("", *x)).collect()
    }

    #[test]
    fn wavg_saturates_at_one() {
        let registry = Probmethods::with_builtins();
        let scores = unnamed(&[1.0, 0.1, 0.2]);
        assert_eq!(registry.combine("wavg", &scores).unwrap(), 1.0);
    }

    #[test]
    fn wavg_of_single_score_is_identity() {
        let registry = Probmethods::with_builtins();
        for x in [0.1, 0.5, 0.99] {
            let got = registry.combine("weighted_average", &unnamed(&[x])).unwrap();
            assert!((got - x).abs() < 1e-12);
        }
    }

    #[test]
    fn wavg_leans_toward_high_scores() {
        let registry = Probmethods::with_builtins();
        let got = registry.combine("wavg", &unnamed(&[0.9, 0.1])).unwrap();
        assert!(got > 0.5, "expected amplification, got {got}");
    }

    #[test]
    fn empty_scores_reduce_to_zero() {
        let registry = Probmethods::with_builtins();
        assert_eq!(registry.combine("wavg", &[]).unwrap(), 0.0);
        assert_eq!(registry.combine("HVEWAvg", &[]).unwrap(), 0.0);
        assert_eq!(
            registry.combine("DictionaryWeightedAverage", &[]).unwrap(),
            0.0
        );
    }

    #[test]
    fn unknown_probmethod_errors() {
        let registry = Probmethods::with_builtins();
        let err = registry.combine("no_such_method", &unnamed(&[0.5])).unwrap_err();
        assert!(matches!(
            err,
            EmbsearchError::SearchError(SearchError::UnknownProbmethod { .. })
        ));
    }

    #[test]
    fn dictionary_weights_by_name() {
        let registry = Probmethods::with_builtins();
        let scores = vec![("title", 1.0f64), ("text", 0.0)];
        // title weighted 3:1 → 0.75.
        let got = registry
            .combine("DictionaryWeightedAverage:{\"title\": 3}", &scores)
            .unwrap();
        assert!((got - 0.75).abs() < 1e-12);
        // No parameters → plain average.
        let got = registry
            .combine("DictionaryWeightedAverage", &scores)
            .unwrap();
        assert!((got - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dictionary_rejects_malformed_parameters() {
        let registry = Probmethods::with_builtins();
        let err = registry
            .combine("DictionaryWeightedAverage:{broken", &unnamed(&[0.5]))
            .unwrap_err();
        assert!(matches!(err, EmbsearchError::BadSettings { .. }));
    }

    #[test]
    fn suffix_is_ignored_by_plain_methods() {
        let registry = Probmethods::with_builtins();
        let got = registry.combine("wavg:{\"x\": 1}", &unnamed(&[0.5])).unwrap();
        assert!((got - 0.5).abs() < 1e-12);
    }

    #[test]
    fn hvew_single_score_is_identity() {
        let registry = Probmethods::with_builtins();
        for x in [0.0, 0.25, 0.9] {
            let got = registry.combine("HVEWAvg", &unnamed(&[x])).unwrap();
            assert!((got - x).abs() < 1e-12);
        }
    }

    #[test]
    fn hvew_saturates_at_one() {
        let registry = Probmethods::with_builtins();
        assert_eq!(registry.combine("HVEWAvg", &unnamed(&[1.0, 0.2])).unwrap(), 1.0);
    }

    #[test]
    fn custom_registration_dispatches() {
        fn max_score(scores: &[(&str, f64)], _: Option<&str>) -> EmbsearchResult<f64> {
            Ok(scores.iter().map(|(_, x)| *x).fold(0.0, f64::max))
        }
        let mut registry = Probmethods::with_builtins();
        registry.register("max", max_score);
        assert!(registry.contains("max"));
        assert_eq!(registry.combine("max", &unnamed(&[0.2, 0.7])).unwrap(), 0.7);
    }

    proptest! {
        #[test]
        fn wavg_is_monotone(
            base in proptest::collection::vec(0.0f64..0.99, 1..6),
            index in 0usize..6,
            bump in 0.001f64..0.01,
        ) {
            let index = index % base.len();
            let registry = Probmethods::with_builtins();
            let low = registry.combine("wavg", &unnamed(&base)).unwrap();
            let mut bumped = base.clone();
            bumped[index] = (bumped[index] + bump).min(0.999);
            let high = registry.combine("wavg", &unnamed(&bumped)).unwrap();
            prop_assert!(high >= low - 1e-12);
        }
    }
}
