// Filter pipeline - runs every detector plus the URL validator and
// aggregates one verdict.
//
// All four checks run unconditionally with no short-circuiting: the details
// map must reflect the complete picture even when one check already forces
// rejection, so reviewers see everything that fired.
//
// Aggregation policy:
// - high-severity profanity      -> blocked
// - spam (any severity)          -> blocked
// - hate speech                  -> stays allowed, high-priority report
// - malicious URL                -> blocked, blocked-URL attempt logged
//
// Hate speech routes to human review instead of auto-blocking: fiction
// gets emotionally intense, so those hits need a human decision.

use std::collections::HashMap;
use std::sync::Arc;

use super::filter_models::{
    AutoAction, ContentFlag, FilterConfig, FilterType, FlagDetail, PipelineVerdict, Severity,
};
use super::hate_speech_detector::HateSpeechDetector;
use super::profanity_detector::ProfanityDetector;
use super::spam_detector::SpamDetector;
use crate::core::url_safety::{ThreatIntelClient, UrlThreatValidator, UrlVerdictCache};

pub struct FilterPipeline {
    profanity: ProfanityDetector,
    spam: SpamDetector,
    hate_speech: HateSpeechDetector,
    url_validator: UrlThreatValidator,
}

impl FilterPipeline {
    /// Build from the three per-type config rows. Detectors for disabled
    /// rows are constructed as no-ops.
    pub fn new(
        profanity_config: &FilterConfig,
        spam_config: &FilterConfig,
        hate_speech_config: &FilterConfig,
        threat_client: Option<Arc<dyn ThreatIntelClient>>,
        url_cache: Arc<dyn UrlVerdictCache>,
    ) -> Self {
        Self {
            profanity: ProfanityDetector::new(profanity_config),
            spam: SpamDetector::new(spam_config),
            hate_speech: HateSpeechDetector::new(hate_speech_config),
            url_validator: UrlThreatValidator::new(threat_client, url_cache),
        }
    }

    /// Default-configured pipeline used when the config store is
    /// unavailable: moderation keeps working on moderate defaults.
    pub fn with_defaults(
        threat_client: Option<Arc<dyn ThreatIntelClient>>,
        url_cache: Arc<dyn UrlVerdictCache>,
    ) -> Self {
        Self::new(
            &FilterConfig::default_for(FilterType::Profanity),
            &FilterConfig::default_for(FilterType::Spam),
            &FilterConfig::default_for(FilterType::HateSpeech),
            threat_client,
            url_cache,
        )
    }

    pub async fn filter_content(&self, text: &str, content_type: &str) -> PipelineVerdict {
        let profanity = self.profanity.check(text);
        let spam = self.spam.check(text);
        let hate_speech = self.hate_speech.check(text);
        let urls = self.url_validator.check_content(text).await;

        let mut allowed = true;
        let mut flags = Vec::new();
        let mut auto_actions = Vec::new();

        if profanity.detected {
            flags.push(ContentFlag::Profanity);
            if profanity.severity == Severity::High {
                allowed = false;
            }
        }

        if spam.detected {
            flags.push(ContentFlag::Spam);
            allowed = false;
        }

        if hate_speech.detected {
            flags.push(ContentFlag::HateSpeech);
            auto_actions.push(AutoAction::CreateHighPriorityReport);
        }

        if !urls.is_safe {
            flags.push(ContentFlag::MaliciousUrl);
            allowed = false;
            auto_actions.push(AutoAction::LogBlockedUrlAttempt);
        }

        if !flags.is_empty() {
            tracing::info!(
                content_type,
                allowed,
                flags = ?flags,
                "Content filter flagged submission"
            );
        }

        let mut details = HashMap::new();
        details.insert(ContentFlag::Profanity, FlagDetail::Filter(profanity));
        details.insert(ContentFlag::Spam, FlagDetail::Filter(spam));
        details.insert(ContentFlag::HateSpeech, FlagDetail::Filter(hate_speech));
        details.insert(ContentFlag::MaliciousUrl, FlagDetail::Url(urls));

        PipelineVerdict {
            allowed,
            flags,
            auto_actions,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    struct MapCache(DashMap<String, bool>);

    impl UrlVerdictCache for MapCache {
        fn get(&self, url: &str) -> Option<bool> {
            self.0.get(url).map(|v| *v)
        }

        fn insert(&self, url: &str, is_safe: bool) {
            self.0.insert(url.to_string(), is_safe);
        }
    }

    fn pipeline() -> FilterPipeline {
        FilterPipeline::with_defaults(None, Arc::new(MapCache(DashMap::new())))
    }

    fn pipeline_with(hate_speech_config: FilterConfig) -> FilterPipeline {
        FilterPipeline::new(
            &FilterConfig::default_for(FilterType::Profanity),
            &FilterConfig::default_for(FilterType::Spam),
            &hate_speech_config,
            None,
            Arc::new(MapCache(DashMap::new())),
        )
    }

    #[tokio::test]
    async fn test_clean_story_is_allowed_with_no_actions() {
        let verdict = pipeline()
            .filter_content("This is a fantastic story about friendship", "story")
            .await;
        assert!(verdict.allowed);
        assert!(verdict.flags.is_empty());
        assert!(verdict.auto_actions.is_empty());
        // Details stay complete even when nothing fired
        assert_eq!(verdict.details.len(), 4);
    }

    #[tokio::test]
    async fn test_spam_blocks() {
        let verdict = pipeline()
            .filter_content(
                "Buy now!!! Click here www.a.com www.b.com www.c.com www.d.com",
                "story",
            )
            .await;
        assert!(!verdict.allowed);
        assert!(verdict.flags.contains(&ContentFlag::Spam));
    }

    #[tokio::test]
    async fn test_high_severity_profanity_blocks() {
        let verdict = pipeline().filter_content("well, fuck", "chapter").await;
        assert!(!verdict.allowed);
        assert!(verdict.flags.contains(&ContentFlag::Profanity));
    }

    #[tokio::test]
    async fn test_medium_profanity_flags_without_blocking() {
        // Moderate sensitivity detects medium severity but only high blocks
        let verdict = pipeline().filter_content("that bastard left", "chapter").await;
        assert!(verdict.allowed);
        assert!(verdict.flags.contains(&ContentFlag::Profanity));
    }

    #[tokio::test]
    async fn test_hate_speech_never_blocks_but_files_report() {
        let mut cfg = FilterConfig::default_for(FilterType::HateSpeech);
        cfg.blacklist.insert("filthy outsiders".to_string());
        cfg.sensitivity = crate::core::moderation::Sensitivity::Strict;

        let verdict = pipeline_with(cfg)
            .filter_content("keep the filthy outsiders away", "comment")
            .await;

        assert!(verdict.allowed);
        assert_eq!(verdict.flags, vec![ContentFlag::HateSpeech]);
        assert_eq!(
            verdict.auto_actions,
            vec![AutoAction::CreateHighPriorityReport]
        );
    }

    #[tokio::test]
    async fn test_malicious_url_blocks_and_logs_attempt() {
        // No client configured, so the shortener heuristic decides
        let verdict = pipeline()
            .filter_content("grab it at https://bit.ly/freebies", "story")
            .await;
        assert!(!verdict.allowed);
        assert!(verdict.flags.contains(&ContentFlag::MaliciousUrl));
        assert!(verdict
            .auto_actions
            .contains(&AutoAction::LogBlockedUrlAttempt));
    }

    #[tokio::test]
    async fn test_details_complete_when_multiple_checks_fire() {
        let verdict = pipeline()
            .filter_content(
                "FUCK BUY NOW CLICK HERE https://bit.ly/x www.a.com www.b.com www.c.com",
                "story",
            )
            .await;
        assert!(!verdict.allowed);
        assert_eq!(verdict.details.len(), 4);
        assert!(verdict.flags.contains(&ContentFlag::Profanity));
        assert!(verdict.flags.contains(&ContentFlag::Spam));
        assert!(verdict.flags.contains(&ContentFlag::MaliciousUrl));
    }

    #[tokio::test]
    async fn test_disabled_hate_speech_filter_never_flags() {
        let mut cfg = FilterConfig::default_for(FilterType::HateSpeech);
        cfg.blacklist.insert("filthy outsiders".to_string());
        cfg.enabled = false;

        let verdict = pipeline_with(cfg)
            .filter_content("keep the filthy outsiders away", "comment")
            .await;

        assert!(verdict.allowed);
        assert!(!verdict.flags.contains(&ContentFlag::HateSpeech));
        assert!(verdict.auto_actions.is_empty());
    }
}
