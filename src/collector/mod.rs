//! State collection for the decision loop
//!
//! Gathers market, account and news data into one snapshot per cycle,
//! keeping per-symbol failures next to the data that did arrive.

mod news;
mod snapshot;

#[cfg(test)]
pub use news::MockNewsSource;
pub use news::{NewsApiClient, NewsSource};
pub use snapshot::{SnapshotCollector, StateSnapshot};
