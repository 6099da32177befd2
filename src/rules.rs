//! Deterministic keyword rules layered over the statistical classifier.
//!
//! The model is fit on a small corpus and cannot be trusted alone for
//! safety-critical detection, so a fixed keyword layer can force a complaint
//! to High or downgrade a low-confidence prediction to Medium. Every
//! prediction path ends here, including the rule-based fallback.

use crate::complaints::{Category, Urgency, UrgencyPrediction};

/// Model confidence below which a prediction is treated as inconclusive.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Terms that force High regardless of category or model output.
const EMERGENCY_KEYWORDS: [&str; 30] = [
    "emergency",
    "urgent",
    "immediate",
    "danger",
    "dangerous",
    "fire",
    "accident",
    "flood",
    "flooding",
    "overflow",
    "burst",
    "leak",
    "gas",
    "explosion",
    "injured",
    "hurt",
    "bleeding",
    "unconscious",
    "trapped",
    "collapse",
    "sparking",
    "shock",
    "electrocution",
    "fallen",
    "blocking",
    "contaminated",
    "poisonous",
    "toxic",
    "disease",
    "illness",
];

const SAFETY_KEYWORDS: [&str; 6] = [
    "crime",
    "theft",
    "violence",
    "harassment",
    "assault",
    "suspicious",
];

const WATER_KEYWORDS: [&str; 6] = ["burst", "flooding", "contaminated", "dirty", "brown", "smell"];

const ELECTRICAL_KEYWORDS: [&str; 6] = ["spark", "wire", "shock", "burn", "fire", "exposed"];

/// Strong terms that alone push the fallback predictor to High.
const STRONG_EMERGENCY_WORDS: [&str; 3] = ["emergency", "danger", "urgent"];

/// High-urgency indicators for the fallback predictor.
const FALLBACK_HIGH_WORDS: [&str; 21] = [
    "emergency",
    "urgent",
    "immediate",
    "danger",
    "dangerous",
    "fire",
    "accident",
    "flood",
    "overflow",
    "burst",
    "leak",
    "gas",
    "sparking",
    "broken",
    "damaged",
    "safety",
    "hazard",
    "risk",
    "critical",
    "serious",
    "severe",
];

/// Medium-urgency indicators for the fallback predictor.
const FALLBACK_MEDIUM_WORDS: [&str; 12] = [
    "problem",
    "issue",
    "concern",
    "complaint",
    "irregular",
    "frequent",
    "delay",
    "slow",
    "inconvenience",
    "disturbance",
    "poor",
    "bad",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Apply the override precedence to a raw prediction and return the final
/// tier. Evaluated strictly in order: emergency keywords, category-specific
/// danger keywords, low-confidence downgrade, then the model's own label.
pub fn apply_overrides(
    description: &str,
    category: Category,
    prediction: UrgencyPrediction,
) -> Urgency {
    let lowered = description.to_lowercase();

    if contains_any(&lowered, &EMERGENCY_KEYWORDS) {
        return Urgency::High;
    }

    let category_keywords: &[&str] = match category {
        Category::PublicSafety => &SAFETY_KEYWORDS,
        Category::WaterSupply => &WATER_KEYWORDS,
        Category::StreetlightElectricity => &ELECTRICAL_KEYWORDS,
        _ => &[],
    };
    if contains_any(&lowered, category_keywords) {
        return Urgency::High;
    }

    if prediction.confidence < LOW_CONFIDENCE_THRESHOLD {
        return Urgency::Medium;
    }

    prediction.label
}

/// Pure keyword-count predictor used when the pipeline cannot serve a
/// prediction. Cannot fail; the result still passes through
/// [`apply_overrides`] at the call site.
pub fn predict_fallback(description: &str) -> Urgency {
    let lowered = description.to_lowercase();

    let high_count = FALLBACK_HIGH_WORDS
        .iter()
        .filter(|word| lowered.contains(*word))
        .count();
    let medium_count = FALLBACK_MEDIUM_WORDS
        .iter()
        .filter(|word| lowered.contains(*word))
        .count();

    if high_count >= 2 || contains_any(&lowered, &STRONG_EMERGENCY_WORDS) {
        Urgency::High
    } else if high_count >= 1 || medium_count >= 2 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: Urgency, confidence: f32) -> UrgencyPrediction {
        UrgencyPrediction { label, confidence }
    }

    #[test]
    fn emergency_keywords_force_high() {
        let final_label = apply_overrides(
            "gas leak smell strong entire building evacuation needed",
            Category::PublicSafety,
            prediction(Urgency::Low, 0.99),
        );
        assert_eq!(final_label, Urgency::High);
    }

    #[test]
    fn emergency_keywords_are_case_insensitive() {
        let final_label = apply_overrides(
            "FIRE near the transformer",
            Category::OtherMunicipal,
            prediction(Urgency::Low, 0.99),
        );
        assert_eq!(final_label, Urgency::High);
    }

    #[test]
    fn category_keywords_apply_only_to_their_category() {
        // "theft" is a Public Safety trigger, not a Roads trigger.
        let safety = apply_overrides(
            "repeated theft at the market",
            Category::PublicSafety,
            prediction(Urgency::Low, 0.9),
        );
        assert_eq!(safety, Urgency::High);

        let roads = apply_overrides(
            "repeated theft at the market",
            Category::RoadsPotholes,
            prediction(Urgency::Low, 0.9),
        );
        assert_eq!(roads, Urgency::Low);
    }

    #[test]
    fn low_confidence_downgrades_to_medium() {
        let final_label = apply_overrides(
            "street sweeping schedule unclear",
            Category::OtherMunicipal,
            prediction(Urgency::Low, 0.4),
        );
        assert_eq!(final_label, Urgency::Medium);
    }

    #[test]
    fn confident_predictions_pass_through() {
        let final_label = apply_overrides(
            "park bench paint peeling",
            Category::OtherMunicipal,
            prediction(Urgency::Low, 0.8),
        );
        assert_eq!(final_label, Urgency::Low);
    }

    #[test]
    fn fallback_strong_term_is_high() {
        assert_eq!(predict_fallback("emergency at the crossing"), Urgency::High);
    }

    #[test]
    fn fallback_two_high_words_are_high() {
        assert_eq!(
            predict_fallback("pipe burst causing flood on the street"),
            Urgency::High
        );
    }

    #[test]
    fn fallback_one_high_word_is_medium() {
        assert_eq!(predict_fallback("wall damaged near school"), Urgency::Medium);
    }

    #[test]
    fn fallback_two_medium_words_are_medium() {
        assert_eq!(
            predict_fallback("frequent delay in garbage pickup"),
            Urgency::Medium
        );
    }

    #[test]
    fn fallback_plain_text_is_low() {
        assert_eq!(
            predict_fallback("request for new park bench"),
            Urgency::Low
        );
    }
}
