pub mod ttl;

pub use ttl::{TeamLookupCache, TtlCache};
