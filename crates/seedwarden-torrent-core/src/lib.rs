#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Backend-agnostic torrent records, rule evaluation, and removal sequencing.
//!
//! Layout: `model` (torrent record + derivation helpers), `rules` (expression
//! language and rule sets), `policy.rs` (ignore/remove/relabel evaluation),
//! `space.rs` (free-space accounting), `removal.rs` (version-gated removal
//! sequence), `service` (`TorrentClient` contract), `error.rs` (taxonomy).

pub mod error;
pub mod model;
pub mod policy;
pub mod removal;
pub mod rules;
pub mod service;
pub mod space;

pub use error::{BoxError, ClientError, ClientResult};
pub use model::{
    Elapsed, FreeSpaceView, Torrent, TorrentSet, TrackerEntry, TrackerSummary,
    is_downloaded_state, is_seeding_state, select_tracker, tracker_domain,
};
pub use policy::{PolicyEngine, PolicyError, PredicateError, RuleGroup};
pub use removal::{
    ApiVersion, ControlVerb, MINIMUM_API_VERSION, RemovalSequence, RemovalState, RemovalStep,
    RemovalVerbs, SettleIntervals, VERB_CUTOFF_VERSION, VerbSet,
};
pub use rules::{
    EvalError, Expr, Field, FnPredicate, LabelRule, Pattern, Predicate, RuleSet, Value,
    predicate_fn,
};
pub use service::TorrentClient;
pub use space::{DiskProbe, FreeSpaceAccountant, GIB, StatvfsProbe};
