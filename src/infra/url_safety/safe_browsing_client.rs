// Threat-intelligence client for the Safe Browsing v4 lookup API.
// Exposes only the one batched call the core layer needs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::url_safety::{ThreatIntelClient, UrlCheckError};

/// Hard bound on the one blocking network call in the moderation path.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const THREAT_TYPES: &[&str] = &[
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

pub struct SafeBrowsingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SafeBrowsingClient {
    pub fn new(api_key: String) -> Result<Self, UrlCheckError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UrlCheckError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://safebrowsing.googleapis.com".to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ThreatIntelClient for SafeBrowsingClient {
    async fn find_threat_matches(
        &self,
        urls: &[String],
    ) -> Result<HashMap<String, String>, UrlCheckError> {
        let body = ApiLookupRequest {
            client: ApiClientInfo {
                client_id: "fiction-moderation",
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ApiThreatInfo {
                threat_types: THREAT_TYPES,
                platform_types: &["ANY_PLATFORM"],
                threat_entry_types: &["URL"],
                threat_entries: urls.iter().map(|url| ApiThreatEntry { url }).collect(),
            },
        };

        let url = format!("{}/v4/threatMatches:find", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UrlCheckError::Http("threat lookup timed out".to_string())
                } else {
                    UrlCheckError::Http(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(UrlCheckError::Api(format!(
                "threat API returned {}",
                resp.status()
            )));
        }

        let parsed: ApiLookupResponse = resp
            .json()
            .await
            .map_err(|e| UrlCheckError::Api(e.to_string()))?;

        let mut matches = HashMap::new();
        for m in parsed.matches.unwrap_or_default() {
            if let (Some(threat_type), Some(entry)) = (m.threat_type, m.threat) {
                if let Some(url) = entry.url {
                    matches.insert(url, threat_type);
                }
            }
        }
        Ok(matches)
    }
}

#[derive(Debug, Serialize)]
struct ApiLookupRequest<'a> {
    client: ApiClientInfo<'a>,
    #[serde(rename = "threatInfo")]
    threat_info: ApiThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
struct ApiClientInfo<'a> {
    #[serde(rename = "clientId")]
    client_id: &'a str,
    #[serde(rename = "clientVersion")]
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiThreatInfo<'a> {
    #[serde(rename = "threatTypes")]
    threat_types: &'a [&'a str],
    #[serde(rename = "platformTypes")]
    platform_types: &'a [&'a str],
    #[serde(rename = "threatEntryTypes")]
    threat_entry_types: &'a [&'a str],
    #[serde(rename = "threatEntries")]
    threat_entries: Vec<ApiThreatEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiLookupResponse {
    matches: Option<Vec<ApiThreatMatch>>,
}

#[derive(Debug, Deserialize)]
struct ApiThreatMatch {
    #[serde(rename = "threatType")]
    threat_type: Option<String>,
    threat: Option<ApiMatchedEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiMatchedEntry {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = ApiLookupRequest {
            client: ApiClientInfo {
                client_id: "fiction-moderation",
                client_version: "0.2.0",
            },
            threat_info: ApiThreatInfo {
                threat_types: THREAT_TYPES,
                platform_types: &["ANY_PLATFORM"],
                threat_entry_types: &["URL"],
                threat_entries: vec![ApiThreatEntry {
                    url: "https://evil.example.net/x",
                }],
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["client"]["clientId"], "fiction-moderation");
        assert_eq!(json["threatInfo"]["threatTypes"][0], "MALWARE");
        assert_eq!(
            json["threatInfo"]["threatEntries"][0]["url"],
            "https://evil.example.net/x"
        );
    }

    #[test]
    fn test_response_parsing_with_matches() {
        let raw = r#"{
            "matches": [
                {
                    "threatType": "SOCIAL_ENGINEERING",
                    "platformType": "ANY_PLATFORM",
                    "threat": {"url": "https://evil.example.net/x"},
                    "cacheDuration": "300s"
                }
            ]
        }"#;
        let parsed: ApiLookupResponse = serde_json::from_str(raw).unwrap();
        let matches = parsed.matches.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].threat_type.as_deref(), Some("SOCIAL_ENGINEERING"));
        assert_eq!(
            matches[0].threat.as_ref().unwrap().url.as_deref(),
            Some("https://evil.example.net/x")
        );
    }

    #[test]
    fn test_empty_response_means_no_matches() {
        let parsed: ApiLookupResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.matches.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Port 9 (discard) is never listening in the test environment
        let client = SafeBrowsingClient::with_base_url(
            "test-key".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        let result = client
            .find_threat_matches(&["https://example.com".to_string()])
            .await;
        assert!(matches!(result, Err(UrlCheckError::Http(_))));
    }
}
