/*!
 * Two-tier translation cache.
 *
 * Identical text fragments translated to the same language pair are never
 * paid for twice: a volatile TTL tier answers hot lookups, and a durable
 * SQLite tier backs it permanently.
 */

pub mod key;
pub mod two_tier;
pub mod volatile;

pub use two_tier::{CacheHit, CacheStats, CacheTier, TwoTierCache};
pub use volatile::{InMemoryVolatileCache, VolatileCache};
