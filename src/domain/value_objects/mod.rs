mod cache_key;
mod object_ref;

pub use cache_key::{CacheKey, CACHE_PREFIX};
pub use object_ref::ObjectRef;
