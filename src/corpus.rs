//! Hand-authored bootstrap corpus for the urgency classifier.
//!
//! The curated patterns below are always merged into every training pass so
//! the model never falls below rule-of-thumb quality when real complaint data
//! is scarce. Every category appears in every urgency tier at least once.
//! [`generate`] is deterministic: the same sequence on every call.

use crate::complaints::Category::{self, *};
use crate::complaints::LabeledExample;
use crate::complaints::Urgency::{self, *};

/// Synonym substitutions used to expand each curated pattern, applied in
/// order. A substitution is skipped when the source word is absent so no
/// pattern is duplicated verbatim.
const SYNONYMS: [(&str, &str); 7] = [
    ("problem", "issue"),
    ("required", "needed"),
    ("complaint", "concern"),
    ("help", "assistance"),
    ("urgent", "immediate"),
    ("dangerous", "risky"),
    ("broken", "damaged"),
];

/// Maximum number of lexical variants added per curated pattern.
const MAX_VARIANTS: usize = 2;

/// Safety and emergency situations.
const HIGH_PATTERNS: [(&str, Category); 16] = [
    (
        "water pipe burst flooding street emergency immediate help needed",
        WaterSupply,
    ),
    (
        "electricity wire fallen dangerous sparking safety hazard",
        StreetlightElectricity,
    ),
    (
        "large tree fallen blocking entire road traffic jam emergency",
        TreeFall,
    ),
    (
        "manhole cover missing pedestrian fell injured dangerous",
        RoadsPotholes,
    ),
    (
        "gas leak smell strong entire building evacuation needed",
        PublicSafety,
    ),
    (
        "sewer overflow contaminated water health hazard disease spread",
        DrainageWaterLogging,
    ),
    (
        "streetlight completely dark accident prone dangerous area crime",
        StreetlightElectricity,
    ),
    (
        "garbage pile rotting smell disease outbreak rats insects",
        GarbageWaste,
    ),
    ("pothole very deep vehicle damage accident risk", RoadsPotholes),
    (
        "traffic signal not working major intersection accidents",
        TrafficParking,
    ),
    (
        "water contaminated dirty brown color stomach illness",
        WaterSupply,
    ),
    (
        "construction debris sharp objects children playing area",
        OtherMunicipal,
    ),
    (
        "flood water stagnant mosquito breeding dengue risk",
        DrainageWaterLogging,
    ),
    (
        "electrical box open exposed wires shock risk",
        StreetlightElectricity,
    ),
    (
        "stray dogs aggressive biting people safety concern",
        PublicSafety,
    ),
    (
        "loudspeaker blaring all night hospital zone patients distressed",
        NoisePollution,
    ),
];

/// Problems that need attention but are not emergencies.
const MEDIUM_PATTERNS: [(&str, Category); 16] = [
    (
        "water pressure low timing irregular inconvenience",
        WaterSupply,
    ),
    (
        "electricity power cut frequent load shedding problem",
        StreetlightElectricity,
    ),
    (
        "pothole causing inconvenience vehicle bumpy ride",
        RoadsPotholes,
    ),
    (
        "drainage slow water logging rain problem",
        DrainageWaterLogging,
    ),
    (
        "streetlight dim not bright enough visibility",
        StreetlightElectricity,
    ),
    (
        "garbage collection irregular delay complaint",
        GarbageWaste,
    ),
    (
        "traffic congestion peak hours slow movement",
        TrafficParking,
    ),
    (
        "noise pollution construction site disturbing",
        NoisePollution,
    ),
    (
        "tree branch hanging loose trimming required",
        TreeFall,
    ),
    (
        "parking space insufficient residential area",
        TrafficParking,
    ),
    ("road repair needed cracks developing", RoadsPotholes),
    (
        "water billing incorrect higher amount charged",
        WaterSupply,
    ),
    (
        "waste segregation not happening mixed garbage",
        GarbageWaste,
    ),
    (
        "street dog population increasing nuisance",
        PublicSafety,
    ),
    (
        "public toilet cleaning required maintenance",
        OtherMunicipal,
    ),
    (
        "drain cover loose rattling noise vehicles passing",
        DrainageWaterLogging,
    ),
];

/// General maintenance and minor issues.
const LOW_PATTERNS: [(&str, Category); 16] = [
    ("water meter reading request schedule visit", WaterSupply),
    (
        "electricity bill query information needed",
        StreetlightElectricity,
    ),
    ("small pothole minor inconvenience can wait", RoadsPotholes),
    (
        "drainage cleaning scheduled maintenance required",
        DrainageWaterLogging,
    ),
    (
        "streetlight replacement bulb not working",
        StreetlightElectricity,
    ),
    (
        "garbage bin additional required more capacity",
        GarbageWaste,
    ),
    ("traffic signage improvement suggestion", TrafficParking),
    (
        "noise complaint minor disturbance occasional",
        NoisePollution,
    ),
    (
        "tree pruning beautification garden maintenance",
        TreeFall,
    ),
    (
        "general complaint feedback suggestion improvement",
        OtherMunicipal,
    ),
    ("road marking paint faded renewal needed", RoadsPotholes),
    ("water connection new application processing", WaterSupply),
    ("park maintenance grass cutting required", OtherMunicipal),
    ("complaint status inquiry follow up", OtherMunicipal),
    (
        "neighbourhood watch volunteer enrollment information",
        PublicSafety,
    ),
    ("information request municipal services", OtherMunicipal),
];

/// Produce the fixed bootstrap corpus: every curated pattern followed by its
/// lexical variants, in a stable order.
pub fn generate() -> Vec<LabeledExample> {
    let tiers: [(&[(&str, Category)], Urgency); 3] = [
        (&HIGH_PATTERNS, High),
        (&MEDIUM_PATTERNS, Medium),
        (&LOW_PATTERNS, Low),
    ];

    let mut examples = Vec::new();
    for (patterns, urgency) in tiers {
        for &(description, category) in patterns {
            examples.push(LabeledExample::new(description, category, urgency));
            for variant in variations(description).into_iter().take(MAX_VARIANTS) {
                examples.push(LabeledExample::new(variant, category, urgency));
            }
        }
    }
    examples
}

/// Expand one description into lexical variants: synonym substitutions for
/// words actually present, then an intensity variant when "very" is absent.
fn variations(description: &str) -> Vec<String> {
    let words: Vec<&str> = description.split_whitespace().collect();
    let mut variants = Vec::new();
    for (source, replacement) in SYNONYMS {
        if words.contains(&source) {
            variants.push(description.replace(source, replacement));
        }
    }
    if !description.contains("very") {
        variants.push(format!("very {description}"));
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaints::{Category, Urgency};

    #[test]
    fn generate_is_deterministic() {
        assert_eq!(generate(), generate());
    }

    #[test]
    fn every_category_appears_in_every_tier() {
        let examples = generate();
        for category in Category::ALL {
            for urgency in Urgency::ALL {
                assert!(
                    examples
                        .iter()
                        .any(|ex| ex.category == category && ex.urgency == urgency),
                    "no {urgency} example for {category}"
                );
            }
        }
    }

    #[test]
    fn tiers_are_comparably_sized() {
        let examples = generate();
        let count =
            |tier: Urgency| examples.iter().filter(|ex| ex.urgency == tier).count() as i64;
        let (high, medium, low) = (count(Urgency::High), count(Urgency::Medium), count(Urgency::Low));
        assert!((high - medium).abs() <= high / 4);
        assert!((high - low).abs() <= high / 4);
    }

    #[test]
    fn variants_substitute_only_present_words() {
        let variants = variations("garbage collection irregular delay complaint");
        // "complaint" is present, so the synonym variant comes first.
        assert_eq!(
            variants[0],
            "garbage collection irregular delay concern"
        );
        assert!(variants.iter().all(|v| v != "garbage collection irregular delay complaint"));
    }

    #[test]
    fn intensity_variant_skipped_when_already_intense() {
        let variants = variations("pothole very deep vehicle damage accident risk");
        assert!(variants.iter().all(|v| !v.starts_with("very very")));
    }

    #[test]
    fn each_pattern_contributes_at_most_three_examples() {
        let examples = generate();
        let base_patterns = HIGH_PATTERNS.len() + MEDIUM_PATTERNS.len() + LOW_PATTERNS.len();
        assert!(examples.len() > base_patterns);
        assert!(examples.len() <= base_patterns * (1 + MAX_VARIANTS));
    }
}
