// Profanity detection - word-boundary matching against a fixed severity
// table plus the operator-configured blacklist, minus the whitelist.
//
// Pure function of (text, config): the detector is an immutable value built
// from one config row and holds no other state.

use std::collections::BTreeSet;

use super::filter_models::{FilterConfig, FilterVerdict, Sensitivity, Severity};

/// Fixed word -> severity table for the builtin list. Operator-blacklisted
/// terms are not in this table and count as High.
fn builtin_severity(word: &str) -> Option<Severity> {
    match word {
        "fuck" | "fucking" | "fucker" | "motherfucker" | "cunt" | "cocksucker" => {
            Some(Severity::High)
        }
        "shit" | "bitch" | "asshole" | "bastard" | "dick" | "pussy" | "whore" | "slut" => {
            Some(Severity::Medium)
        }
        "damn" | "hell" | "crap" | "ass" | "piss" => Some(Severity::Low),
        _ => None,
    }
}

pub struct ProfanityDetector {
    enabled: bool,
    sensitivity: Sensitivity,
    whitelist: BTreeSet<String>,
    blacklist: BTreeSet<String>,
}

impl ProfanityDetector {
    /// Build from the profanity config row. A disabled row yields a no-op
    /// detector that always returns a clean verdict.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            sensitivity: config.sensitivity,
            whitelist: config.whitelist.iter().map(|w| w.to_lowercase()).collect(),
            blacklist: config.blacklist.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn check(&self, text: &str) -> FilterVerdict {
        if !self.enabled {
            return FilterVerdict::clean();
        }

        let lowered = text.to_lowercase();
        let mut matched_terms = Vec::new();
        let mut max_severity = Severity::Low;

        // Apostrophes stay inside tokens so contractions survive tokenization.
        let mut seen = BTreeSet::new();
        for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '\'') {
            if token.is_empty() || !seen.insert(token) {
                continue;
            }
            if self.whitelist.contains(token) {
                continue;
            }

            let severity = if self.blacklist.contains(token) {
                Some(Severity::High)
            } else {
                builtin_severity(token)
            };

            if let Some(severity) = severity {
                matched_terms.push(token.to_string());
                max_severity = max_severity.max(severity);
            }
        }

        if matched_terms.is_empty() {
            return FilterVerdict::clean();
        }

        let detected = match self.sensitivity {
            Sensitivity::Strict => true,
            Sensitivity::Moderate => max_severity >= Severity::Medium,
            Sensitivity::Permissive => max_severity == Severity::High,
        };

        FilterVerdict {
            detected,
            severity: max_severity,
            matched_terms,
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::FilterType;

    fn config(sensitivity: Sensitivity) -> FilterConfig {
        FilterConfig {
            sensitivity,
            ..FilterConfig::default_for(FilterType::Profanity)
        }
    }

    #[test]
    fn test_clean_text_passes() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Strict));
        let verdict = detector.check("This is a fantastic story about friendship");
        assert!(!verdict.detected);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.matched_terms.is_empty());
    }

    #[test]
    fn test_strict_flags_any_severity() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Strict));
        let verdict = detector.check("well damn, that ending");
        assert!(verdict.detected);
        assert_eq!(verdict.severity, Severity::Low);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_moderate_ignores_low_severity() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Moderate));
        let verdict = detector.check("well damn, that ending");
        assert!(!verdict.detected);
        // Matches are still reported for auditability
        assert_eq!(verdict.matched_terms, vec!["damn"]);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_moderate_flags_high_severity() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Moderate));
        let verdict = detector.check("what the fuck was that chapter");
        assert!(verdict.detected);
        assert_eq!(verdict.severity, Severity::High);
    }

    #[test]
    fn test_permissive_only_flags_high() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Permissive));

        let medium = detector.check("that villain is a bastard");
        assert!(!medium.detected);
        assert_eq!(medium.severity, Severity::Medium);

        let high = detector.check("oh fuck");
        assert!(high.detected);
    }

    #[test]
    fn test_severity_is_max_among_hits() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Strict));
        let verdict = detector.check("damn this shit");
        assert_eq!(verdict.severity, Severity::Medium);
        assert_eq!(verdict.matched_terms.len(), 2);
    }

    #[test]
    fn test_whitelist_exempts_builtin_word() {
        let mut cfg = config(Sensitivity::Strict);
        cfg.whitelist.insert("hell".to_string());
        let detector = ProfanityDetector::new(&cfg);
        let verdict = detector.check("the road to Hell is well paved");
        assert!(!verdict.detected);
    }

    #[test]
    fn test_blacklist_word_counts_as_high() {
        let mut cfg = config(Sensitivity::Permissive);
        cfg.blacklist.insert("frak".to_string());
        let detector = ProfanityDetector::new(&cfg);
        let verdict = detector.check("frak this");
        assert!(verdict.detected);
        assert_eq!(verdict.severity, Severity::High);
    }

    #[test]
    fn test_word_boundaries_prevent_substring_hits() {
        let detector = ProfanityDetector::new(&config(Sensitivity::Strict));
        // "class" contains "ass" but is not a token match
        let verdict = detector.check("the class assembled for the assessment");
        assert!(!verdict.detected);
    }

    #[test]
    fn test_disabled_detector_is_noop() {
        let mut cfg = config(Sensitivity::Strict);
        cfg.enabled = false;
        let detector = ProfanityDetector::new(&cfg);
        let verdict = detector.check("fuck");
        assert!(!verdict.detected);
        assert!(verdict.matched_terms.is_empty());
    }
}
