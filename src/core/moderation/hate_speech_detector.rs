// Hate-speech detection - configured trigger keywords plus builtin
// structural patterns (collective generalizations, exclusionary phrasing,
// dehumanizing language).
//
// The keyword list is external configuration (the hate_speech config row's
// blacklist) rather than a hardcoded slur list. Thresholds sit lower than
// the other detectors; hits go to review, not auto-block.

use regex::Regex;
use std::collections::BTreeSet;

use super::filter_models::{FilterConfig, FilterVerdict, Sensitivity, Severity};

const KEYWORD_WEIGHT: f64 = 0.3;
const PATTERN_WEIGHT: f64 = 0.4;
const HIGH_SEVERITY_CONFIDENCE: f64 = 0.7;

/// Builtin structural patterns, labeled for the verdict's matched terms.
const PATTERNS: &[(&str, &str)] = &[
    (
        "collective_generalization",
        r"(?i)\ball\s+\w+\s+(?:people|folks|women|men|fans|writers|readers|users)\s+are\b",
    ),
    (
        "exclusionary_phrasing",
        r"(?i)\b(?:don'?t|do\s+not|doesn'?t)\s+belong\s+(?:here|in|on)\b",
    ),
    (
        "exclusionary_phrasing",
        r"(?i)\b(?:go|get)\s+back\s+to\s+where\b",
    ),
    (
        "dehumanizing_language",
        r"(?i)\b(?:are|they'?re)\s+(?:all\s+)?(?:animals|vermin|subhuman|parasites|cockroaches)\b",
    ),
    (
        "eliminationist_language",
        r"(?i)\bshould\s+(?:all\s+)?be\s+(?:banned|removed|wiped\s+out|eliminated)\b",
    ),
];

fn threshold(sensitivity: Sensitivity) -> f64 {
    match sensitivity {
        Sensitivity::Strict => 0.2,
        Sensitivity::Moderate => 0.4,
        Sensitivity::Permissive => 0.6,
    }
}

pub struct HateSpeechDetector {
    enabled: bool,
    sensitivity: Sensitivity,
    keywords: BTreeSet<String>,
    patterns: Vec<(&'static str, Regex)>,
}

impl HateSpeechDetector {
    /// Build from the hate_speech config row. Patterns are compiled once
    /// here, not per check.
    pub fn new(config: &FilterConfig) -> Self {
        let whitelist: BTreeSet<String> =
            config.whitelist.iter().map(|w| w.to_lowercase()).collect();
        let keywords = config
            .blacklist
            .iter()
            .map(|w| w.to_lowercase())
            .filter(|w| !whitelist.contains(w))
            .collect();

        // The pattern literals are fixed and valid; a bad one is dropped
        // rather than taking the detector down.
        let patterns = PATTERNS
            .iter()
            .filter_map(|(label, pattern)| Regex::new(pattern).ok().map(|re| (*label, re)))
            .collect();

        Self {
            enabled: config.enabled,
            sensitivity: config.sensitivity,
            keywords,
            patterns,
        }
    }

    pub fn check(&self, text: &str) -> FilterVerdict {
        if !self.enabled {
            return FilterVerdict::clean();
        }

        let lowered = text.to_lowercase();
        let mut confidence = 0.0;
        let mut matched_terms = Vec::new();

        for keyword in &self.keywords {
            if lowered.contains(keyword.as_str()) {
                confidence += KEYWORD_WEIGHT;
                matched_terms.push(keyword.clone());
            }
        }

        for (label, pattern) in &self.patterns {
            if pattern.is_match(text) {
                confidence += PATTERN_WEIGHT;
                matched_terms.push((*label).to_string());
            }
        }

        let confidence = confidence.min(1.0);
        let detected = confidence > threshold(self.sensitivity);

        let severity = if confidence >= HIGH_SEVERITY_CONFIDENCE {
            Severity::High
        } else if detected {
            Severity::Medium
        } else {
            Severity::Low
        };

        FilterVerdict {
            detected,
            severity,
            matched_terms,
            confidence,
        }
    }
}
