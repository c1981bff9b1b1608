pub mod memory_url_cache;
pub mod safe_browsing_client;

pub use memory_url_cache::MemoryUrlCache;
pub use safe_browsing_client::SafeBrowsingClient;
