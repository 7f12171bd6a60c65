use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Result of classifying an MRI image.
///
/// The four known labels are the classes of the dementia dataset the
/// classifier is meant for. Anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredictionLabel {
    VeryMildDemented,
    MildDemented,
    ModerateDemented,
    NonDemented,
    Other(String),
}

impl PredictionLabel {
    pub const KNOWN: [PredictionLabel; 4] = [
        PredictionLabel::VeryMildDemented,
        PredictionLabel::MildDemented,
        PredictionLabel::ModerateDemented,
        PredictionLabel::NonDemented,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PredictionLabel::VeryMildDemented => "VeryMildDemented",
            PredictionLabel::MildDemented => "MildDemented",
            PredictionLabel::ModerateDemented => "ModerateDemented",
            PredictionLabel::NonDemented => "NonDemented",
            PredictionLabel::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PredictionLabel::Other(_))
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PredictionLabel {
    fn from(raw: &str) -> Self {
        match raw {
            "VeryMildDemented" => PredictionLabel::VeryMildDemented,
            "MildDemented" => PredictionLabel::MildDemented,
            "ModerateDemented" => PredictionLabel::ModerateDemented,
            "NonDemented" => PredictionLabel::NonDemented,
            other => PredictionLabel::Other(other.to_string()),
        }
    }
}

impl FromStr for PredictionLabel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PredictionLabel::from(s))
    }
}

impl Serialize for PredictionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PredictionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PredictionLabel::from(raw.as_str()))
    }
}
