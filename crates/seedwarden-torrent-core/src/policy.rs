//! Ignore/remove/relabel classification over a [`RuleSet`].

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::model::Torrent;
use crate::rules::{EvalError, LabelRule, Predicate, RuleSet, Value};

/// Failure of a single predicate within a group.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// The predicate produced a non-boolean value.
    #[error("predicate returned a non-boolean result")]
    NonBoolean {
        /// Position within the group.
        index: usize,
        /// Kind of value produced.
        found: &'static str,
    },
    /// The predicate faulted.
    #[error("predicate evaluation failed")]
    Evaluation {
        /// Position within the group.
        index: usize,
        /// Underlying fault.
        #[source]
        source: EvalError,
    },
}

/// Rule group a predicate belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleGroup {
    /// Ignore predicates.
    Ignore,
    /// Remove predicates.
    Remove,
    /// Updates of the named label rule.
    Label(String),
}

impl Display for RuleGroup {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => formatter.write_str("ignore"),
            Self::Remove => formatter.write_str("remove"),
            Self::Label(name) => write!(formatter, "label:{name}"),
        }
    }
}

/// Predicate failure tagged with the rule group under evaluation.
#[derive(Debug, Error)]
#[error("rule evaluation failed")]
pub struct PolicyError {
    /// Group being evaluated.
    pub rule: RuleGroup,
    /// Predicate failure.
    #[source]
    pub source: PredicateError,
}

fn check(
    index: usize,
    predicate: &dyn Predicate,
    torrent: &Torrent,
) -> Result<bool, PredicateError> {
    match predicate.evaluate(torrent) {
        Ok(Value::Bool(result)) => Ok(result),
        Ok(other) => Err(PredicateError::NonBoolean {
            index,
            found: other.kind(),
        }),
        Err(source) => Err(PredicateError::Evaluation { index, source }),
    }
}

/// True as soon as one predicate holds; false when none do.
///
/// # Errors
///
/// Returns a [`PredicateError`] for the first predicate that faults or yields a non-boolean
/// before a match is found.
pub fn single_match(
    predicates: &[Box<dyn Predicate>],
    torrent: &Torrent,
) -> Result<bool, PredicateError> {
    for (index, predicate) in predicates.iter().enumerate() {
        if check(index, predicate.as_ref(), torrent)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// False as soon as one predicate fails; true when all hold.
///
/// # Errors
///
/// Returns a [`PredicateError`] for the first predicate that faults or yields a non-boolean
/// before a mismatch is found.
pub fn all_match(
    predicates: &[Box<dyn Predicate>],
    torrent: &Torrent,
) -> Result<bool, PredicateError> {
    for (index, predicate) in predicates.iter().enumerate() {
        if !check(index, predicate.as_ref(), torrent)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Policy evaluation bound to one rule set.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEngine<'a> {
    rules: &'a RuleSet,
}

impl<'a> PolicyEngine<'a> {
    /// Bind the engine to a rule set.
    #[must_use]
    pub const fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Whether any ignore predicate holds.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] tagged [`RuleGroup::Ignore`] when a predicate fails.
    pub fn should_ignore(&self, torrent: &Torrent) -> Result<bool, PolicyError> {
        single_match(&self.rules.ignores, torrent).map_err(|source| PolicyError {
            rule: RuleGroup::Ignore,
            source,
        })
    }

    /// Whether any remove predicate holds.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] tagged [`RuleGroup::Remove`] when a predicate fails.
    pub fn should_remove(&self, torrent: &Torrent) -> Result<bool, PolicyError> {
        single_match(&self.rules.removes, torrent).map_err(|source| PolicyError {
            rule: RuleGroup::Remove,
            source,
        })
    }

    /// Name of the first label rule whose updates all hold.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] tagged with the failing label rule.
    pub fn should_relabel(&self, torrent: &Torrent) -> Result<Option<&'a str>, PolicyError> {
        for LabelRule { name, updates } in &self.rules.labels {
            let matched = all_match(updates, torrent).map_err(|source| PolicyError {
                rule: RuleGroup::Label(name.clone()),
                source,
            })?;
            if matched {
                return Ok(Some(name.as_str()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Expr, Field, predicate_fn};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn torrent(label: &str, ratio: f32) -> Torrent {
        Torrent {
            hash: "hash".into(),
            label: label.into(),
            ratio,
            ..Torrent::default()
        }
    }

    fn label_is(value: &str) -> Expr {
        Expr::Eq(
            Box::new(Expr::field(Field::Label)),
            Box::new(Expr::value(value)),
        )
    }

    fn ratio_above(value: f64) -> Expr {
        Expr::Gt(
            Box::new(Expr::field(Field::Ratio)),
            Box::new(Expr::value(value)),
        )
    }

    #[test]
    fn single_match_stops_after_first_true() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rules = RuleSet::new()
            .with_remove(label_is("tv"))
            .with_remove(predicate_fn("counter", move |_: &Torrent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bool(true))
            }));
        let engine = PolicyEngine::new(&rules);

        assert!(engine.should_remove(&torrent("tv", 0.0)).expect("classify"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(engine.should_remove(&torrent("movies", 0.0)).expect("classify"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_match_false_when_nothing_holds() {
        let rules = RuleSet::new()
            .with_ignore(label_is("keep"))
            .with_ignore(ratio_above(10.0));
        let engine = PolicyEngine::new(&rules);
        assert!(!engine.should_ignore(&torrent("tv", 1.0)).expect("classify"));
        assert!(!PolicyEngine::new(&RuleSet::new())
            .should_remove(&torrent("tv", 1.0))
            .expect("classify"));
    }

    #[test]
    fn all_match_stops_after_first_false() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let predicates: Vec<Box<dyn Predicate>> = vec![
            Box::new(label_is("tv")),
            Box::new(predicate_fn("counter", move |_: &Torrent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bool(true))
            })),
        ];
        assert!(!all_match(&predicates, &torrent("movies", 0.0)).expect("classify"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(all_match(&predicates, &torrent("tv", 0.0)).expect("classify"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(all_match(&[], &torrent("tv", 0.0)).expect("classify"));
    }

    #[test]
    fn relabel_first_satisfied_rule_wins() {
        let archive = LabelRule::new("archive").with_update(label_is("tv"));
        let long_term = LabelRule::new("long-term")
            .with_update(label_is("tv"))
            .with_update(ratio_above(1.0));
        let rules = RuleSet::new()
            .with_label(LabelRule::new("never").with_update(label_is("none")))
            .with_label(long_term)
            .with_label(archive);
        let engine = PolicyEngine::new(&rules);
        assert_eq!(
            engine.should_relabel(&torrent("tv", 2.0)).expect("classify"),
            Some("long-term")
        );
        assert_eq!(
            engine.should_relabel(&torrent("tv", 0.5)).expect("classify"),
            Some("archive")
        );
        assert_eq!(engine.should_relabel(&torrent("movies", 2.0)).expect("classify"), None);

        let reordered = RuleSet::new()
            .with_label(LabelRule::new("archive").with_update(label_is("tv")))
            .with_label(
                LabelRule::new("long-term")
                    .with_update(label_is("tv"))
                    .with_update(ratio_above(1.0)),
            );
        assert_eq!(
            PolicyEngine::new(&reordered)
                .should_relabel(&torrent("tv", 2.0))
                .expect("classify"),
            Some("archive")
        );
    }

    #[test]
    fn non_boolean_results_are_errors() {
        let rules = RuleSet::new()
            .with_ignore(Expr::field(Field::Ratio))
            .with_remove(label_is("tv"))
            .with_remove(Expr::field(Field::Label));
        let engine = PolicyEngine::new(&rules);

        let err = engine
            .should_ignore(&torrent("tv", 1.0))
            .expect_err("ratio is not a boolean");
        assert_eq!(err.rule, RuleGroup::Ignore);
        assert!(matches!(
            err.source,
            PredicateError::NonBoolean { index: 0, found: "float" }
        ));

        let err = engine
            .should_remove(&torrent("movies", 1.0))
            .expect_err("label is not a boolean");
        assert!(matches!(
            err.source,
            PredicateError::NonBoolean { index: 1, found: "text" }
        ));
    }

    #[test]
    fn evaluation_faults_name_the_label_rule() {
        let rules = RuleSet::new().with_label(
            LabelRule::new("broken").with_update(Expr::Lt(
                Box::new(Expr::field(Field::Name)),
                Box::new(Expr::value(1_i64)),
            )),
        );
        let err = PolicyEngine::new(&rules)
            .should_relabel(&torrent("tv", 1.0))
            .expect_err("text vs int comparison");
        assert_eq!(err.rule.to_string(), "label:broken");
        assert!(matches!(err.source, PredicateError::Evaluation { index: 0, .. }));
    }
}
