//! poolgrid-adapters — `PoolAdapter` implementations.
//!
//! Each adapter wraps a narrow view of an external pool and translates it
//! into `AdapterMetrics`. Only the mock adapter can actually change its
//! size at runtime; the others report what they see and, where the
//! backend cannot be resized live, log the static configuration change
//! that would achieve the requested size.
//!
//! | adapter | backend view | `resize_pool` |
//! |---|---|---|
//! | `CachePoolAdapter` | `CacheConnectionPool` | always `false` |
//! | `RelationalPoolAdapter` | `RelationalConnectionPool` | always `false` |
//! | `VectorStoreAdapter` | `VectorStoreClient` | no-op, `true` |
//! | `MockPoolAdapter` | in-memory simulation | resizes within `[1, max_size]` |

pub mod cache;
pub mod counters;
pub mod mock;
pub mod relational;
pub mod vector;

pub use cache::{CacheConnectionPool, CachePoolAdapter, CachePoolStats};
pub use counters::RequestCounters;
pub use mock::MockPoolAdapter;
pub use relational::{RelationalConnectionPool, RelationalPoolAdapter, RelationalPoolStatus};
pub use vector::{VectorStoreAdapter, VectorStoreClient};
