use bytes::Bytes;
use serde::Serialize;

/// Cache-Control for derivatives that may be cached downstream
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000";
/// Cache-Control for fresh (cache-bypassing) responses
pub const CACHE_CONTROL_NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// How the transformation cache answered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Nothing to transform, the original was served untouched
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes served for a transform request plus the response metadata
#[derive(Debug, Clone)]
pub struct TransformedArtifact {
    pub data: Bytes,
    pub content_type: String,
    pub cache_status: CacheStatus,
    pub fresh: bool,
}

impl TransformedArtifact {
    pub fn was_cache_hit(&self) -> bool {
        self.cache_status == CacheStatus::Hit
    }

    pub fn cache_control(&self) -> &'static str {
        if self.fresh {
            CACHE_CONTROL_NO_STORE
        } else {
            CACHE_CONTROL_IMMUTABLE
        }
    }
}
