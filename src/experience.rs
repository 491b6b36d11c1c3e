use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::normalize::normalize;

// Leading year count; group 2 is set when it opens a range ("11-20", "1 to 2").
static LEADING_YEARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(\s*(?:-|to\b))?").expect("static regex")
});

// Checked in order against the normalized label.
static CUES: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"\bfresher\b|\bno\s*experience\b", 0.25),
        (r"\bless\s*than\s*1\b", 0.75),
        (r"\b1\s*(?:-|to)\s*2\b", 2.0),
        (r"\b[23]\s*(?:-|to)\s*5\b", 4.0),
        (r"\b(?:above|over|more\s*than)\s*5\b|\b5\s*\+", 6.0),
    ]
    .into_iter()
    .map(|(pattern, years)| (Regex::new(pattern).expect("static regex"), years))
    .collect()
});

/// Representative year value for a free-text experience label.
///
/// A leading year count wins ("10+ years", "7 years in aged care"). Bucket
/// labels map to a value inside their own bucket, and any other range falls
/// back to its lower bound. Empty or unrecognised input is 0 years.
pub fn parse_experience_years(label: &str) -> f64 {
    let normalized = normalize(Some(label));

    let leading = LEADING_YEARS.captures(&normalized).and_then(|caps| {
        let years = caps[1].parse::<f64>().ok()?;
        Some((years, caps.get(2).is_some()))
    });
    if let Some((years, false)) = leading {
        return years;
    }

    CUES.iter()
        .find(|(cue, _)| cue.is_match(&normalized))
        .map(|(_, years)| *years)
        .or(leading.map(|(lower, _)| lower))
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub label: String,
    pub min: f64,
    pub max: Option<f64>,
}

impl ExperienceRange {
    pub fn new(label: &str, min: f64, max: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
        }
    }

    pub fn contains(&self, years: f64) -> bool {
        years >= self.min && self.max.is_none_or(|max| years < max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRangeTable {
    ranges: Vec<ExperienceRange>,
}

impl Default for ExperienceRangeTable {
    fn default() -> Self {
        Self::shared()
    }
}

impl ExperienceRangeTable {
    pub fn new(ranges: Vec<ExperienceRange>) -> Self {
        Self { ranges }
    }

    pub fn shared() -> Self {
        Self::new(vec![
            ExperienceRange::new("Fresher", 0.0, Some(0.5)),
            ExperienceRange::new("Less than 1 year", 0.5, Some(1.0)),
            ExperienceRange::new("1 – 2 years", 1.0, Some(3.0)),
            ExperienceRange::new("3 – 5 years", 3.0, Some(5.0)),
            ExperienceRange::new("Above 5 years", 5.0, None),
        ])
    }

    pub fn ranges(&self) -> &[ExperienceRange] {
        &self.ranges
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(|r| r.label.as_str())
    }

    pub fn lookup(&self, label: &str) -> Option<&ExperienceRange> {
        let wanted = normalize(Some(label));
        self.ranges
            .iter()
            .find(|r| normalize(Some(&r.label)) == wanted)
    }

    pub fn matches_any<'a>(&self, years: f64, labels: impl IntoIterator<Item = &'a String>) -> bool {
        labels
            .into_iter()
            .filter_map(|label| self.lookup(label))
            .any(|range| range.contains(years))
    }
}
