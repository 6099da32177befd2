//! Domain types shared by the urgency classifier and its collaborators.

pub mod store;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Priority tier assigned to a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    /// All tiers in classifier class order.
    pub const ALL: [Urgency; 3] = [Urgency::High, Urgency::Medium, Urgency::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::High => "High",
            Urgency::Medium => "Medium",
            Urgency::Low => "Low",
        }
    }

    /// Position of the tier inside [`Urgency::ALL`].
    pub fn class_index(self) -> usize {
        match self {
            Urgency::High => 0,
            Urgency::Medium => 1,
            Urgency::Low => 2,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown urgency string.
#[derive(Debug, Error)]
#[error("Unknown urgency label: {0}")]
pub struct UnknownUrgency(pub String);

impl FromStr for Urgency {
    type Err = UnknownUrgency;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("high") => Ok(Urgency::High),
            v if v.eq_ignore_ascii_case("medium") => Ok(Urgency::Medium),
            v if v.eq_ignore_ascii_case("low") => Ok(Urgency::Low),
            other => Err(UnknownUrgency(other.to_string())),
        }
    }
}

/// Closed set of complaint categories known to the portal.
///
/// The record store keeps categories as free text; the classifier boundary
/// maps them into this enum so predictions never run against a category the
/// training corpus has no coverage for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    RoadsPotholes,
    WaterSupply,
    StreetlightElectricity,
    GarbageWaste,
    DrainageWaterLogging,
    PublicSafety,
    TreeFall,
    TrafficParking,
    NoisePollution,
    OtherMunicipal,
}

impl Category {
    /// All ten known categories.
    pub const ALL: [Category; 10] = [
        Category::RoadsPotholes,
        Category::WaterSupply,
        Category::StreetlightElectricity,
        Category::GarbageWaste,
        Category::DrainageWaterLogging,
        Category::PublicSafety,
        Category::TreeFall,
        Category::TrafficParking,
        Category::NoisePollution,
        Category::OtherMunicipal,
    ];

    /// Display name as the portal UI renders it.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::RoadsPotholes => "Roads & Potholes",
            Category::WaterSupply => "Water Supply Issues",
            Category::StreetlightElectricity => "Streetlight & Electricity",
            Category::GarbageWaste => "Garbage & Waste Management",
            Category::DrainageWaterLogging => "Drainage & Water Logging",
            Category::PublicSafety => "Public Safety & Security",
            Category::TreeFall => "Tree Fall & Maintenance",
            Category::TrafficParking => "Traffic & Parking",
            Category::NoisePollution => "Noise Pollution",
            Category::OtherMunicipal => "Other Municipal Issues",
        }
    }

    /// Map a stored category string to the closed set, defaulting unknown
    /// values to [`Category::OtherMunicipal`].
    pub fn parse_lossy(value: &str) -> Category {
        value.parse().unwrap_or(Category::OtherMunicipal)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category string.
#[derive(Debug, Error)]
#[error("Unknown complaint category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(trimmed.to_string()))
    }
}

/// One labeled training example, either hand-authored or sourced from a
/// resolved complaint. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub description: String,
    pub category: Category,
    pub urgency: Urgency,
}

impl LabeledExample {
    pub fn new(description: impl Into<String>, category: Category, urgency: Urgency) -> Self {
        Self {
            description: description.into(),
            category,
            urgency,
        }
    }
}

/// Raw classifier output before rule overrides are applied. Ephemeral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrgencyPrediction {
    pub label: Urgency,
    /// Top-class probability in `[0, 1]`.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_parses_case_insensitively() {
        assert_eq!("high".parse::<Urgency>().unwrap(), Urgency::High);
        assert_eq!(" Medium ".parse::<Urgency>().unwrap(), Urgency::Medium);
        assert!("critical".parse::<Urgency>().is_err());
    }

    #[test]
    fn class_index_matches_all_order() {
        for (idx, urgency) in Urgency::ALL.into_iter().enumerate() {
            assert_eq!(urgency.class_index(), idx);
        }
    }

    #[test]
    fn category_round_trips_display_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn unknown_category_maps_to_other() {
        assert_eq!(
            Category::parse_lossy("Alien Invasions"),
            Category::OtherMunicipal
        );
    }
}
