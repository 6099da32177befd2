//! Expected-resolution-time lookup.
//!
//! A pure table: base hours per urgency tier scaled by a fixed per-category
//! multiplier. No learning and no persisted state.

use std::fmt;

use crate::complaints::{Category, Urgency};

/// Base resolution window per tier, in hours.
fn base_hours(urgency: Urgency) -> f32 {
    match urgency {
        Urgency::High => 24.0,
        Urgency::Medium => 72.0,
        Urgency::Low => 168.0,
    }
}

/// Categories known to resolve faster or slower than the baseline.
fn category_multiplier(category: Category) -> f32 {
    match category {
        Category::GarbageWaste => 0.5,
        Category::StreetlightElectricity => 0.8,
        Category::WaterSupply => 1.2,
        Category::RoadsPotholes => 1.5,
        Category::DrainageWaterLogging => 1.3,
        Category::PublicSafety => 0.3,
        Category::TreeFall => 1.0,
        Category::TrafficParking => 0.7,
        Category::NoisePollution => 0.6,
        Category::OtherMunicipal => 1.0,
    }
}

/// An expected resolution window, floored to whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionEstimate {
    pub hours: u64,
}

impl fmt::Display for ResolutionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours < 24 {
            write!(f, "{} hours", self.hours)
        } else if self.hours < 168 {
            let days = self.hours / 24;
            write!(f, "{} day{}", days, if days > 1 { "s" } else { "" })
        } else {
            let weeks = self.hours / 168;
            write!(f, "{} week{}", weeks, if weeks > 1 { "s" } else { "" })
        }
    }
}

/// Look up the expected resolution time for a classified complaint.
pub fn estimate(urgency: Urgency, category: Category) -> ResolutionEstimate {
    let hours = (base_hours(urgency) * category_multiplier(category)).floor() as u64;
    ResolutionEstimate { hours }
}
