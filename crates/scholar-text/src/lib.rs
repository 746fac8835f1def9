//! scholar-text
//!
//! Keyword search over the paper index: a compound lexical query
//! (`keyword`) wrapped in a bounded backoff state machine (`retry`).

pub mod keyword;
pub mod retry;

pub use keyword::{compound_query, KeywordSearcher};
pub use retry::{retry, RetryPolicy, RetryState, Sleeper, TokioSleeper};
