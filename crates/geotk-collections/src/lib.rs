//! General-purpose collections used across the toolkit.
//!
//! - [`RangeSet`]: sorted, disjoint half-open ranges
//! - [`LazyList`]: a list that pulls from an iterator on demand
//! - [`ProxyMap`]: read-only overlay of several maps
//! - [`WeakValueHashMap`] and [`Cache`]: weak-value storage, purged on demand
//!   or by a tokio task from [`spawn_cleaner`]

pub mod cache;
pub mod cleaner;
pub mod lazy_list;
pub mod proxy_map;
pub mod range_set;
pub mod weak_value_map;

pub use cache::{Cache, CacheStats};
pub use cleaner::{spawn_cleaner, Purge};
pub use lazy_list::LazyList;
pub use proxy_map::ProxyMap;
pub use range_set::RangeSet;
pub use weak_value_map::WeakValueHashMap;
