// URL threat validation - core business logic for link safety.
//
// Flow per submission:
// 1. Extract and dedupe URLs from the text
// 2. Skip trusted domains (domain or parent-domain match)
// 3. Short-circuit on cached verdicts
// 4. Batch-query the threat-intelligence service for the rest
// 5. On missing credential, timeout, or API failure: heuristic fallback
//
// The external service is the only blocking I/O in the pipeline and is
// reached through the ThreatIntelClient port. Its failure never propagates
// to the caller.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum UrlCheckError {
    #[error("Threat API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// One batched lookup against the external threat-intelligence service.
///
/// Returns a map of url -> threat type for every URL the service matched;
/// URLs absent from the map were not matched and are considered safe.
#[async_trait]
pub trait ThreatIntelClient: Send + Sync {
    async fn find_threat_matches(
        &self,
        urls: &[String],
    ) -> Result<HashMap<String, String>, UrlCheckError>;
}

/// Memoization of authoritative per-URL verdicts, used only to avoid repeat
/// external lookups. Race-tolerant: concurrent writers may cause redundant
/// lookups but never a wrong verdict.
pub trait UrlVerdictCache: Send + Sync {
    fn get(&self, url: &str) -> Option<bool>;
    fn insert(&self, url: &str, is_safe: bool);
}

// ============================================================================
// RESULT TYPE
// ============================================================================

/// Outcome of validating every URL in one piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct UrlValidationResult {
    /// No malicious URL among the full extracted set
    pub is_safe: bool,
    pub malicious_urls: Vec<String>,
    pub total_urls: usize,
    /// url -> threat type, for the URLs that were flagged
    pub details: HashMap<String, String>,
}

impl UrlValidationResult {
    pub fn safe(total_urls: usize) -> Self {
        Self {
            is_safe: true,
            malicious_urls: Vec::new(),
            total_urls,
            details: HashMap::new(),
        }
    }
}

// ============================================================================
// URL EXTRACTION
// ============================================================================

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Matches scheme-prefixed URLs and bare www. links; panics only on a
        // malformed literal, which the tests below would catch.
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).unwrap()
    })
}

/// Extract URLs from text, deduped and in order of first appearance.
/// Trailing sentence punctuation is stripped so "see www.a.com." matches.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for m in url_pattern().find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'))
            .to_string();
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }
    urls
}

/// Host portion of a URL: scheme and path stripped, port dropped, lowercased.
fn host_of(url: &str) -> String {
    let lowered = url.to_lowercase();
    let rest = lowered
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    rest.split(['/', '?', '#'])
        .next()
        .unwrap_or(rest)
        .split(':')
        .next()
        .unwrap_or("")
        .to_string()
}

fn host_matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

// ============================================================================
// TRUSTED DOMAINS & HEURISTICS
// ============================================================================

/// Domains exempted from validation. Parent-domain match, so
/// en.wikipedia.org is covered by wikipedia.org.
const TRUSTED_DOMAINS: &[&str] = &[
    "google.com",
    "youtube.com",
    "wikipedia.org",
    "github.com",
    "reddit.com",
    "tumblr.com",
    "twitter.com",
    "instagram.com",
    "facebook.com",
    "imgur.com",
    "deviantart.com",
    "pinterest.com",
];

const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly", "rb.gy", "cutt.ly",
    "shorte.st",
];

const LOW_TRUST_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "click", "loan", "work",
];

const LOGIN_KEYWORDS: &[&str] = &[
    "login", "signin", "sign-in", "verify", "account", "secure", "password", "banking", "update",
];

fn ipv4_host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap())
}

fn digit_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{6,}").unwrap())
}

fn is_trusted(url: &str) -> bool {
    let host = host_of(url);
    TRUSTED_DOMAINS.iter().any(|d| host_matches_domain(&host, d))
}

/// Pattern-based risk check used when the authoritative service is
/// unreachable or unconfigured. Fails closed on suspicion: a hit marks the
/// URL malicious rather than skipping validation.
pub fn heuristic_threat(url: &str) -> Option<&'static str> {
    let host = host_of(url);

    if SHORTENER_DOMAINS.iter().any(|d| host_matches_domain(&host, d)) {
        return Some("url_shortener");
    }

    if ipv4_host_pattern().is_match(&host) {
        return Some("ip_address_host");
    }

    if digit_run_pattern().is_match(url) {
        return Some("suspicious_number_sequence");
    }

    let lowered = url.to_lowercase();
    let tld = host.rsplit('.').next().unwrap_or("");
    if LOW_TRUST_TLDS.contains(&tld) && LOGIN_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Some("phishing_pattern");
    }

    None
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Validates every URL in a piece of content against the trusted-domain
/// list, the verdict cache, the threat-intelligence service, and the
/// heuristic fallback. A missing client means heuristics-only mode, which is
/// a supported configuration, not an error.
pub struct UrlThreatValidator {
    client: Option<Arc<dyn ThreatIntelClient>>,
    cache: Arc<dyn UrlVerdictCache>,
}

impl UrlThreatValidator {
    pub fn new(client: Option<Arc<dyn ThreatIntelClient>>, cache: Arc<dyn UrlVerdictCache>) -> Self {
        Self { client, cache }
    }

    pub async fn check_content(&self, text: &str) -> UrlValidationResult {
        let urls = extract_urls(text);
        let total_urls = urls.len();
        if urls.is_empty() {
            return UrlValidationResult::safe(0);
        }

        let mut malicious_urls = Vec::new();
        let mut details = HashMap::new();
        let mut candidates = Vec::new();

        for url in &urls {
            if is_trusted(url) {
                continue;
            }
            match self.cache.get(url) {
                Some(true) => {}
                Some(false) => {
                    malicious_urls.push(url.clone());
                    details.insert(url.clone(), "cached_verdict".to_string());
                }
                None => candidates.push(url.clone()),
            }
        }

        if !candidates.is_empty() {
            match self.lookup(&candidates).await {
                Some(matches) => {
                    // Every queried URL updates the cache, matched or not.
                    for url in &candidates {
                        let threat = matches.get(url);
                        self.cache.insert(url, threat.is_none());
                        if let Some(threat_type) = threat {
                            malicious_urls.push(url.clone());
                            details.insert(url.clone(), threat_type.clone());
                        }
                    }
                }
                None => {
                    // Heuristic verdicts are deterministic and cheap; they
                    // are not cached so a later authoritative answer wins.
                    for url in &candidates {
                        if let Some(threat_type) = heuristic_threat(url) {
                            malicious_urls.push(url.clone());
                            details.insert(url.clone(), threat_type.to_string());
                        }
                    }
                }
            }
        }

        UrlValidationResult {
            is_safe: malicious_urls.is_empty(),
            malicious_urls,
            total_urls,
            details,
        }
    }

    /// Returns None when the authoritative path is unavailable and the
    /// caller should fall back to heuristics.
    async fn lookup(&self, candidates: &[String]) -> Option<HashMap<String, String>> {
        let client = self.client.as_ref()?;
        match client.find_threat_matches(candidates).await {
            Ok(matches) => Some(matches),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    urls = candidates.len(),
                    "Threat intelligence lookup failed, using heuristic fallback"
                );
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
