// Core URL safety module - extraction, threat-intelligence port, and the
// heuristic fallback used when the authoritative service is unavailable.

pub mod url_validator;

pub use url_validator::*;
