// Spam detection - four independent additive signals with a sensitivity
// threshold. Each signal contributes a fixed weight and the sum is capped at
// 1.0; the verdict fires when confidence exceeds the configured threshold.

use super::filter_models::{FilterConfig, FilterVerdict, Sensitivity, Severity};
use crate::core::url_safety::extract_urls;

const EXCESSIVE_LINKS_MIN: usize = 3;
const EXCESSIVE_LINKS_WEIGHT: f64 = 0.4;

const REPEATED_TEXT_RATIO: f64 = 0.5;
const REPEATED_TEXT_WEIGHT: f64 = 0.3;

const PROMOTIONAL_HIT_WEIGHT: f64 = 0.15;
const PROMOTIONAL_WEIGHT_CAP: f64 = 0.5;

const CAPS_MIN_LEN: usize = 20;
const CAPS_RATIO: f64 = 0.7;
const CAPS_WEIGHT: f64 = 0.2;

const PROMOTIONAL_KEYWORDS: &[&str] = &[
    "buy now",
    "buy",
    "click here",
    "free money",
    "limited time",
    "act now",
    "order now",
    "subscribe",
    "discount",
    "promo code",
    "visit my",
    "check out my",
    "earn cash",
    "make money",
    "winner",
    "giveaway",
];

fn threshold(sensitivity: Sensitivity) -> f64 {
    match sensitivity {
        Sensitivity::Strict => 0.3,
        Sensitivity::Moderate => 0.5,
        Sensitivity::Permissive => 0.7,
    }
}

/// Fraction of adjacent word pairs that are exact duplicates.
fn consecutive_duplicate_ratio(lowered: &str) -> f64 {
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() < 2 {
        return 0.0;
    }
    let duplicates = words.windows(2).filter(|w| w[0] == w[1]).count();
    duplicates as f64 / (words.len() - 1) as f64
}

fn uppercase_ratio(text: &str) -> f64 {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return 0.0;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters.len() as f64
}

pub struct SpamDetector {
    enabled: bool,
    sensitivity: Sensitivity,
}

impl SpamDetector {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            sensitivity: config.sensitivity,
        }
    }

    pub fn check(&self, text: &str) -> FilterVerdict {
        if !self.enabled {
            return FilterVerdict::clean();
        }

        let lowered = text.to_lowercase();
        let mut confidence = 0.0;
        let mut matched_terms = Vec::new();

        if extract_urls(text).len() >= EXCESSIVE_LINKS_MIN {
            confidence += EXCESSIVE_LINKS_WEIGHT;
            matched_terms.push("excessive_links".to_string());
        }

        if consecutive_duplicate_ratio(&lowered) >= REPEATED_TEXT_RATIO {
            confidence += REPEATED_TEXT_WEIGHT;
            matched_terms.push("repeated_text".to_string());
        }

        let promo_hits = PROMOTIONAL_KEYWORDS
            .iter()
            .filter(|k| lowered.contains(*k))
            .count();
        if promo_hits > 0 {
            confidence += (PROMOTIONAL_HIT_WEIGHT * promo_hits as f64).min(PROMOTIONAL_WEIGHT_CAP);
            matched_terms.push("promotional_content".to_string());
        }

        if text.len() > CAPS_MIN_LEN && uppercase_ratio(text) > CAPS_RATIO {
            confidence += CAPS_WEIGHT;
            matched_terms.push("excessive_caps".to_string());
        }

        let confidence = confidence.min(1.0);
        let detected = confidence > threshold(self.sensitivity);

        FilterVerdict {
            detected,
            // Severity follows the detected flag; the gradation lives in
            // the confidence value.
            severity: if detected { Severity::High } else { Severity::Low },
            matched_terms,
            confidence,
        }
    }
}
