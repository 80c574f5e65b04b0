//! Rule sets and the embedded expression language predicates are written in.
//!
//! # Design
//! - Predicates evaluate against exactly one [`Torrent`] and yield a [`Value`].
//! - Booleans are not assumed: the policy engine rejects any other result kind.
//! - Expressions are plain data so configuration can deserialize them directly.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::Torrent;

/// Faults raised while evaluating an expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// An operand had a kind the operation cannot accept.
    #[error("expression operand has an unexpected type")]
    TypeMismatch {
        /// Operation being evaluated.
        operation: &'static str,
        /// Kind the operation expects.
        expected: &'static str,
        /// Kind that was supplied.
        found: &'static str,
    },
    /// Two operands cannot be compared with each other.
    #[error("expression operands cannot be compared")]
    Incomparable {
        /// Operation being evaluated.
        operation: &'static str,
        /// Kind of the left operand.
        left: &'static str,
        /// Kind of the right operand.
        right: &'static str,
    },
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// List of strings (file paths).
    List(Vec<String>),
}

impl Value {
    /// Short name of the value kind, used in error context.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "integer fields are compared against float literals"
    )]
    const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn compare(&self, other: &Self, operation: &'static str) -> Result<Ordering, EvalError> {
        let incomparable = || EvalError::Incomparable {
            operation,
            left: self.kind(),
            right: other.kind(),
        };
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => Ok(left.cmp(right)),
            (Self::Text(left), Self::Text(right)) => Ok(left.cmp(right)),
            (Self::Bool(left), Self::Bool(right)) => Ok(left.cmp(right)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(left), Some(right)) => left.partial_cmp(&right).ok_or_else(incomparable),
                _ => Err(incomparable()),
            },
        }
    }

    fn equals(&self, other: &Self, operation: &'static str) -> Result<bool, EvalError> {
        match (self, other) {
            (Self::List(left), Self::List(right)) => Ok(left == right),
            _ => self
                .compare(other, operation)
                .map(|ordering| ordering == Ordering::Equal),
        }
    }
}

/// Torrent attributes addressable from an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Info hash.
    Hash,
    /// Display name.
    Name,
    /// Save directory.
    Path,
    /// Absolute file paths.
    Files,
    /// Total size in bytes.
    TotalBytes,
    /// Downloaded bytes.
    DownloadedBytes,
    /// Finished downloading.
    Downloaded,
    /// Uploading.
    Seeding,
    /// Raw backend state.
    State,
    /// Share ratio.
    Ratio,
    /// Seconds since added.
    AddedSeconds,
    /// Hours since added.
    AddedHours,
    /// Days since added.
    AddedDays,
    /// Seconds seeding.
    SeedingSeconds,
    /// Hours seeding.
    SeedingHours,
    /// Days seeding.
    SeedingDays,
    /// Category.
    Label,
    /// Swarm seeds.
    Seeds,
    /// Swarm peers.
    Peers,
    /// Tracker domain.
    TrackerName,
    /// Tracker status message.
    TrackerStatus,
    /// Free space estimate in GiB.
    FreeSpaceGb,
    /// Whether the free space estimate is established.
    FreeSpaceSet,
    /// Tracker no longer knows the torrent.
    IsUnregistered,
}

impl Field {
    /// Read the attribute from a torrent record.
    #[must_use]
    pub fn read(self, torrent: &Torrent) -> Value {
        match self {
            Self::Hash => Value::Text(torrent.hash.clone()),
            Self::Name => Value::Text(torrent.name.clone()),
            Self::Path => Value::Text(torrent.path.clone()),
            Self::Files => Value::List(torrent.files.clone()),
            Self::TotalBytes => Value::Int(torrent.total_bytes),
            Self::DownloadedBytes => Value::Int(torrent.downloaded_bytes),
            Self::Downloaded => Value::Bool(torrent.downloaded),
            Self::Seeding => Value::Bool(torrent.seeding),
            Self::State => Value::Text(torrent.state.clone()),
            Self::Ratio => Value::Float(f64::from(torrent.ratio)),
            Self::AddedSeconds => Value::Int(torrent.added_seconds),
            Self::AddedHours => Value::Float(f64::from(torrent.added_hours)),
            Self::AddedDays => Value::Float(f64::from(torrent.added_days)),
            Self::SeedingSeconds => Value::Int(torrent.seeding_seconds),
            Self::SeedingHours => Value::Float(f64::from(torrent.seeding_hours)),
            Self::SeedingDays => Value::Float(f64::from(torrent.seeding_days)),
            Self::Label => Value::Text(torrent.label.clone()),
            Self::Seeds => Value::Int(torrent.seeds),
            Self::Peers => Value::Int(torrent.peers),
            Self::TrackerName => Value::Text(torrent.tracker_name.clone()),
            Self::TrackerStatus => Value::Text(torrent.tracker_status.clone()),
            Self::FreeSpaceGb => Value::Float(torrent.free_space_gb),
            Self::FreeSpaceSet => Value::Bool(torrent.free_space_set),
            Self::IsUnregistered => Value::Bool(torrent.is_unregistered()),
        }
    }
}

/// Regular expression compiled once when the rule is built.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error when the pattern is not a valid regular expression.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// Source text of the pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for Pattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Pattern").field(&self.0.as_str()).finish()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Expression tree evaluated against a torrent record.
///
/// YAML documents spell each node as a single-key map (`gt: [a, b]`); read them
/// through `serde_yaml::with::singleton_map_recursive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Read a torrent attribute.
    Field(Field),
    /// Literal value.
    Value(Value),
    /// Boolean negation.
    Not(Box<Expr>),
    /// True when every operand is true; stops at the first false.
    And(Vec<Expr>),
    /// True when any operand is true; stops at the first true.
    Or(Vec<Expr>),
    /// Equality.
    Eq(Box<Expr>, Box<Expr>),
    /// Inequality.
    Ne(Box<Expr>, Box<Expr>),
    /// Less than.
    Lt(Box<Expr>, Box<Expr>),
    /// Less than or equal.
    Le(Box<Expr>, Box<Expr>),
    /// Greater than.
    Gt(Box<Expr>, Box<Expr>),
    /// Greater than or equal.
    Ge(Box<Expr>, Box<Expr>),
    /// Substring test on text, membership test on lists.
    Contains(Box<Expr>, Box<Expr>),
    /// Text prefix test.
    StartsWith(Box<Expr>, Box<Expr>),
    /// Text suffix test.
    EndsWith(Box<Expr>, Box<Expr>),
    /// Regular expression test on text.
    Matches(Box<Expr>, Pattern),
    /// Equality against any of the listed literals.
    In(Box<Expr>, Vec<Value>),
}

impl Expr {
    /// Field reference.
    #[must_use]
    pub const fn field(field: Field) -> Self {
        Self::Field(field)
    }

    /// Literal value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Evaluate the expression against a torrent.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] when an operand has a kind the operation cannot handle.
    pub fn eval(&self, torrent: &Torrent) -> Result<Value, EvalError> {
        match self {
            Self::Field(field) => Ok(field.read(torrent)),
            Self::Value(value) => Ok(value.clone()),
            Self::Not(inner) => Ok(Value::Bool(!inner.eval_bool(torrent, "not")?)),
            Self::And(operands) => {
                for operand in operands {
                    if !operand.eval_bool(torrent, "and")? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Self::Or(operands) => {
                for operand in operands {
                    if operand.eval_bool(torrent, "or")? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Self::Eq(left, right) => {
                let (left, right) = (left.eval(torrent)?, right.eval(torrent)?);
                left.equals(&right, "eq").map(Value::Bool)
            }
            Self::Ne(left, right) => {
                let (left, right) = (left.eval(torrent)?, right.eval(torrent)?);
                left.equals(&right, "ne").map(|equal| Value::Bool(!equal))
            }
            Self::Lt(left, right) => Self::ordered(torrent, left, right, "lt", Ordering::is_lt),
            Self::Le(left, right) => Self::ordered(torrent, left, right, "le", Ordering::is_le),
            Self::Gt(left, right) => Self::ordered(torrent, left, right, "gt", Ordering::is_gt),
            Self::Ge(left, right) => Self::ordered(torrent, left, right, "ge", Ordering::is_ge),
            Self::Contains(haystack, needle) => {
                let (haystack, needle) = (haystack.eval(torrent)?, needle.eval(torrent)?);
                match (&haystack, &needle) {
                    (Value::Text(text), Value::Text(part)) => Ok(Value::Bool(text.contains(part))),
                    (Value::List(items), Value::Text(item)) => {
                        Ok(Value::Bool(items.iter().any(|candidate| candidate == item)))
                    }
                    _ => Err(EvalError::Incomparable {
                        operation: "contains",
                        left: haystack.kind(),
                        right: needle.kind(),
                    }),
                }
            }
            Self::StartsWith(text, prefix) => {
                Self::text_pair(torrent, text, prefix, "starts_with", |text, prefix| {
                    text.starts_with(prefix)
                })
            }
            Self::EndsWith(text, suffix) => {
                Self::text_pair(torrent, text, suffix, "ends_with", |text, suffix| {
                    text.ends_with(suffix)
                })
            }
            Self::Matches(subject, pattern) => match subject.eval(torrent)? {
                Value::Text(text) => Ok(Value::Bool(pattern.0.is_match(&text))),
                other => Err(EvalError::TypeMismatch {
                    operation: "matches",
                    expected: "text",
                    found: other.kind(),
                }),
            },
            Self::In(subject, options) => {
                let subject = subject.eval(torrent)?;
                for option in options {
                    if subject.equals(option, "in")? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }

    fn eval_bool(&self, torrent: &Torrent, operation: &'static str) -> Result<bool, EvalError> {
        match self.eval(torrent)? {
            Value::Bool(value) => Ok(value),
            other => Err(EvalError::TypeMismatch {
                operation,
                expected: "bool",
                found: other.kind(),
            }),
        }
    }

    fn ordered(
        torrent: &Torrent,
        left: &Self,
        right: &Self,
        operation: &'static str,
        test: fn(Ordering) -> bool,
    ) -> Result<Value, EvalError> {
        let (left, right) = (left.eval(torrent)?, right.eval(torrent)?);
        left.compare(&right, operation).map(|ordering| Value::Bool(test(ordering)))
    }

    fn text_pair(
        torrent: &Torrent,
        left: &Self,
        right: &Self,
        operation: &'static str,
        test: fn(&str, &str) -> bool,
    ) -> Result<Value, EvalError> {
        match (left.eval(torrent)?, right.eval(torrent)?) {
            (Value::Text(left), Value::Text(right)) => Ok(Value::Bool(test(&left, &right))),
            (left, right) => Err(EvalError::Incomparable {
                operation,
                left: left.kind(),
                right: right.kind(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Compiled predicate evaluated against one torrent record.
pub trait Predicate: Send + Sync + Debug {
    /// Evaluate the predicate; the policy engine requires a boolean result.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] when the predicate itself faults.
    fn evaluate(&self, torrent: &Torrent) -> Result<Value, EvalError>;
}

impl Predicate for Expr {
    fn evaluate(&self, torrent: &Torrent) -> Result<Value, EvalError> {
        self.eval(torrent)
    }
}

/// Predicate backed by a closure.
pub struct FnPredicate<F> {
    label: &'static str,
    func: F,
}

/// Wrap a closure as a predicate.
pub const fn predicate_fn<F>(label: &'static str, func: F) -> FnPredicate<F>
where
    F: Fn(&Torrent) -> Result<Value, EvalError> + Send + Sync,
{
    FnPredicate { label, func }
}

impl<F> Debug for FnPredicate<F> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("FnPredicate").field(&self.label).finish()
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Torrent) -> Result<Value, EvalError> + Send + Sync,
{
    fn evaluate(&self, torrent: &Torrent) -> Result<Value, EvalError> {
        (self.func)(torrent)
    }
}

/// Named relabel rule whose updates must all hold.
#[derive(Debug)]
pub struct LabelRule {
    /// Label applied when every update matches.
    pub name: String,
    /// Predicates evaluated with all-match semantics.
    pub updates: Vec<Box<dyn Predicate>>,
}

impl LabelRule {
    /// Start a rule with no updates.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            updates: Vec::new(),
        }
    }

    /// Append an update predicate.
    #[must_use]
    pub fn with_update(mut self, predicate: impl Predicate + 'static) -> Self {
        self.updates.push(Box::new(predicate));
        self
    }
}

/// Ignore, remove, and label predicates supplied to one client.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// Predicates evaluated with single-match semantics to skip a torrent.
    pub ignores: Vec<Box<dyn Predicate>>,
    /// Predicates evaluated with single-match semantics to remove a torrent.
    pub removes: Vec<Box<dyn Predicate>>,
    /// Ordered relabel rules; the first satisfied rule wins.
    pub labels: Vec<LabelRule>,
}

impl RuleSet {
    /// Empty rule set that ignores, removes, and relabels nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ignore predicate.
    #[must_use]
    pub fn with_ignore(mut self, predicate: impl Predicate + 'static) -> Self {
        self.ignores.push(Box::new(predicate));
        self
    }

    /// Append a remove predicate.
    #[must_use]
    pub fn with_remove(mut self, predicate: impl Predicate + 'static) -> Self {
        self.removes.push(Box::new(predicate));
        self
    }

    /// Append a relabel rule.
    #[must_use]
    pub fn with_label(mut self, rule: LabelRule) -> Self {
        self.labels.push(rule);
        self
    }
}
