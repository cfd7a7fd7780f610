use serde::{Deserialize, Serialize};

/// Accessibility capabilities of a place.
///
/// All-false means either "no support" or "classification failed"; the two are not
/// distinguished on the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessibilityInfo {
    #[serde(rename = "Physical Accessibility")]
    pub physical: bool,
    #[serde(rename = "Sensory Accessibility")]
    pub sensory: bool,
    #[serde(rename = "Cognitive Accessibility")]
    pub cognitive: bool,
    #[serde(rename = "Inclusive Amenities")]
    pub inclusive_amenities: bool,
}

impl AccessibilityInfo {
    pub const KEYS: [&'static str; 4] = [
        "Physical Accessibility",
        "Sensory Accessibility",
        "Cognitive Accessibility",
        "Inclusive Amenities",
    ];

    /// The canonical all-false record
    #[must_use]
    pub const fn none() -> Self {
        Self {
            physical: false,
            sensory: false,
            cognitive: false,
            inclusive_amenities: false,
        }
    }

    #[must_use]
    pub fn has_any(&self) -> bool {
        self.physical || self.sensory || self.cognitive || self.inclusive_amenities
    }

    /// Labels of the supported capabilities, in display order
    #[must_use]
    pub fn supported(&self) -> Vec<&'static str> {
        [
            self.physical,
            self.sensory,
            self.cognitive,
            self.inclusive_amenities,
        ]
        .into_iter()
        .zip(Self::KEYS)
        .filter_map(|(available, label)| available.then_some(label))
        .collect()
    }
}
