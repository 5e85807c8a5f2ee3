//! Policy registry, fetching, and evaluation
//!
//! Policies are declarative guardrails over a changeset: remote rule sets
//! fetched over HTTPS (with a two-tier cache), local rule sets from the user
//! config, and a merge that folds them into one effective rule set the
//! evaluator runs against the files and commit message.

pub mod cache;
pub mod evaluator;
pub mod fetcher;
pub mod registry;
pub mod types;

pub use evaluator::{evaluate, EvalResult, Violation};
pub use fetcher::PolicyFetcher;
pub use registry::PolicyRegistry;
pub use types::{LocalPolicy, MergedPolicy, PolicyRef, PolicyRules, RemotePolicy};
