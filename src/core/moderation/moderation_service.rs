// Moderation service - core business logic for content filtering.
//
// This service handles:
// - Per-filter-type policy storage (seed, upsert, fresh read per pipeline)
// - Building the filter pipeline and moderating submissions
// - Deriving the user-facing rejection message
// - Automated remediation (report creation, automated-flag rows)
//
// NO storage or HTTP dependencies here - those arrive through ports.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

use super::filter_models::{
    AutoAction, AutomatedFlag, ContentFlag, FilterConfig, FilterType, FlagDetail,
    ModerationReport, PipelineVerdict, ReportPriority, Sensitivity,
};
use super::filter_pipeline::FilterPipeline;
use crate::core::url_safety::{ThreatIntelClient, UrlVerdictCache};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting moderation data: filter configs, automated flags,
/// reports, and the synthetic reporter identity.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Get the config row for one filter type, if present.
    async fn get_config(
        &self,
        filter_type: FilterType,
    ) -> Result<Option<FilterConfig>, ModerationError>;

    /// Insert or update the config row for its filter type (idempotent key).
    async fn upsert_config(&self, config: FilterConfig) -> Result<(), ModerationError>;

    /// Persist one automated flag row (append-only).
    async fn insert_flag(&self, flag: AutomatedFlag) -> Result<(), ModerationError>;

    /// Persist a moderation report, returning its id.
    async fn insert_report(&self, report: ModerationReport) -> Result<i64, ModerationError>;

    /// Get-or-create the well-known "system" reporter identity, returning
    /// its id. Called once at startup, not in the moderation hot path.
    async fn ensure_system_reporter(&self) -> Result<i64, ModerationError>;
}

// ============================================================================
// RESULT TYPE
// ============================================================================

/// What the submission layer gets back. Side effects have already run by the
/// time this is returned; callers only translate `blocked` + `error_message`
/// into a user-facing rejection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModerationOutcome {
    pub allowed: bool,
    pub blocked: bool,
    pub error_message: Option<String>,
    pub flags: Vec<ContentFlag>,
    pub auto_actions: Vec<AutoAction>,
    pub details: HashMap<ContentFlag, FlagDetail>,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: ModerationStore> {
    store: S,
    threat_client: Option<Arc<dyn ThreatIntelClient>>,
    url_cache: Arc<dyn UrlVerdictCache>,
    /// Provisioned once at construction; automated reports are filed under
    /// this identity.
    system_reporter_id: i64,
}

impl<S: ModerationStore> ModerationService<S> {
    pub async fn new(
        store: S,
        threat_client: Option<Arc<dyn ThreatIntelClient>>,
        url_cache: Arc<dyn UrlVerdictCache>,
    ) -> Result<Self, ModerationError> {
        let system_reporter_id = store.ensure_system_reporter().await?;
        Ok(Self {
            store,
            threat_client,
            url_cache,
            system_reporter_id,
        })
    }

    /// Seed all three filter types at enabled/moderate, only where absent.
    /// Existing rows are never overwritten.
    pub async fn initialize_default_configs(&self) -> Result<(), ModerationError> {
        for filter_type in FilterType::ALL {
            if self.store.get_config(filter_type).await?.is_none() {
                self.store
                    .upsert_config(FilterConfig::default_for(filter_type))
                    .await?;
                tracing::info!(%filter_type, "Seeded default filter config");
            }
        }
        Ok(())
    }

    /// Upsert the policy row for one filter type (admin surface).
    #[allow(dead_code)]
    pub async fn create_or_update_config(
        &self,
        filter_type: FilterType,
        enabled: bool,
        sensitivity: Sensitivity,
        whitelist: BTreeSet<String>,
        blacklist: BTreeSet<String>,
        updated_by: Option<String>,
    ) -> Result<FilterConfig, ModerationError> {
        let config = FilterConfig {
            filter_type,
            enabled,
            sensitivity,
            whitelist,
            blacklist,
            updated_by,
            updated_at: Utc::now(),
        };
        self.store.upsert_config(config.clone()).await?;
        Ok(config)
    }

    #[allow(dead_code)]
    pub async fn get_config(
        &self,
        filter_type: FilterType,
    ) -> Result<Option<FilterConfig>, ModerationError> {
        self.store.get_config(filter_type).await
    }

    /// Build a pipeline from the current config rows, read fresh on every
    /// call so admin changes take effect immediately. A storage failure
    /// degrades to the default-configured pipeline rather than failing the
    /// moderation decision.
    pub async fn get_pipeline(&self) -> FilterPipeline {
        match self.load_configs().await {
            Ok(configs) => FilterPipeline::new(
                &configs[0],
                &configs[1],
                &configs[2],
                self.threat_client.clone(),
                Arc::clone(&self.url_cache),
            ),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Failed to read filter configs, using default pipeline"
                );
                FilterPipeline::with_defaults(
                    self.threat_client.clone(),
                    Arc::clone(&self.url_cache),
                )
            }
        }
    }

    /// The three config rows in FilterType::ALL order, with defaults filled
    /// in for missing rows.
    async fn load_configs(&self) -> Result<Vec<FilterConfig>, ModerationError> {
        let mut configs = Vec::with_capacity(FilterType::ALL.len());
        for filter_type in FilterType::ALL {
            let config = self
                .store
                .get_config(filter_type)
                .await?
                .unwrap_or_else(|| FilterConfig::default_for(filter_type));
            configs.push(config);
        }
        Ok(configs)
    }

    /// Moderate one submission. `content_id` is present only when the
    /// entity already exists in storage (post-creation submissions); when
    /// present, one automated-flag row is persisted per flag regardless of
    /// the allowed/blocked outcome.
    pub async fn moderate(
        &self,
        content: &str,
        content_type: &str,
        content_id: Option<i64>,
    ) -> ModerationOutcome {
        let pipeline = self.get_pipeline().await;
        let verdict = pipeline.filter_content(content, content_type).await;

        if let Some(content_id) = content_id {
            self.log_automated_flags(content_type, content_id, &verdict.flags, &verdict.details)
                .await;
        }

        self.run_auto_actions(content_type, content_id, &verdict)
            .await;

        let error_message = if verdict.allowed {
            None
        } else {
            Some(derive_error_message(&verdict.flags))
        };

        ModerationOutcome {
            allowed: verdict.allowed,
            blocked: !verdict.allowed,
            error_message,
            flags: verdict.flags,
            auto_actions: verdict.auto_actions,
            details: verdict.details,
        }
    }

    /// Persist one AutomatedFlag row per detected issue. Failures are logged
    /// per flag and never alter the already-computed verdict.
    async fn log_automated_flags(
        &self,
        content_type: &str,
        content_id: i64,
        flags: &[ContentFlag],
        details: &HashMap<ContentFlag, FlagDetail>,
    ) {
        for flag_type in flags {
            let confidence = details
                .get(flag_type)
                .map(FlagDetail::confidence)
                .unwrap_or(1.0);
            let flag = AutomatedFlag {
                content_type: content_type.to_string(),
                content_id,
                flag_type: *flag_type,
                confidence,
                reviewed: false,
                created_at: Utc::now(),
            };
            if let Err(err) = self.store.insert_flag(flag).await {
                tracing::error!(
                    %flag_type,
                    content_type,
                    content_id,
                    error = %err,
                    "Failed to persist automated flag"
                );
            }
        }
    }

    /// Execute the queued auto actions. Not idempotent: a repeat invocation
    /// for the same content files another report; deduplication belongs to
    /// the review workflow.
    async fn run_auto_actions(
        &self,
        content_type: &str,
        content_id: Option<i64>,
        verdict: &PipelineVerdict,
    ) {
        for action in &verdict.auto_actions {
            match action {
                AutoAction::CreateHighPriorityReport => {
                    self.create_hate_speech_report(content_type, content_id, verdict)
                        .await;
                }
                AutoAction::LogBlockedUrlAttempt => {
                    if let Some(FlagDetail::Url(result)) =
                        verdict.details.get(&ContentFlag::MaliciousUrl)
                    {
                        tracing::warn!(
                            content_type,
                            content_id,
                            malicious_urls = ?result.malicious_urls,
                            total_urls = result.total_urls,
                            "Blocked submission containing malicious URLs"
                        );
                    }
                }
            }
        }
    }

    async fn create_hate_speech_report(
        &self,
        content_type: &str,
        content_id: Option<i64>,
        verdict: &PipelineVerdict,
    ) {
        let matched = match verdict.details.get(&ContentFlag::HateSpeech) {
            Some(FlagDetail::Filter(v)) => v.matched_terms.join(", "),
            _ => String::new(),
        };

        // The type-specific id field is set from the content type; an
        // unrecognized type just omits both rather than failing the report.
        let (story_id, chapter_id) = match content_type {
            "story" => (content_id, None),
            "chapter" => (None, content_id),
            _ => (None, None),
        };

        let report = ModerationReport {
            reporter_id: self.system_reporter_id,
            reason: "hate_speech".to_string(),
            details: format!("Automated filter match: {}", matched),
            story_id,
            chapter_id,
            priority: ReportPriority::High,
            created_at: Utc::now(),
        };

        match self.store.insert_report(report).await {
            Ok(report_id) => {
                tracing::info!(
                    report_id,
                    content_type,
                    "Filed high-priority moderation report"
                );
            }
            Err(err) => {
                tracing::error!(
                    content_type,
                    error = %err,
                    "Failed to file moderation report"
                );
            }
        }
    }
}

/// User-facing message for a blocked submission. Fixed precedence, first
/// match wins; messages are never combined.
fn derive_error_message(flags: &[ContentFlag]) -> String {
    if flags.contains(&ContentFlag::Spam) {
        "Your submission was flagged as spam. Please remove promotional content and excessive links."
            .to_string()
    } else if flags.contains(&ContentFlag::Profanity) {
        "Your submission contains language that violates our content guidelines.".to_string()
    } else if flags.contains(&ContentFlag::MaliciousUrl) {
        "Your submission contains links that failed our safety check.".to_string()
    } else {
        "Your submission could not be accepted. Please review our content guidelines.".to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
