//! Tests for the account store, organized by concern:
//! - lookups: cache hits, not-found errors and listings
//! - keys: authorized key caching, cooldowns and pruning
//! - on_demand: refreshes triggered by lookup misses
//! - periodic: the background refresh loops

mod periodic;
