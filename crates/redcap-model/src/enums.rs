//! Type-safe enumerations for field-map policy and transform configuration.
//!
//! These enums give compile-time meaning to values that arrive as free text
//! in the field-map CSV and the TOML configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Release status of a field, as recorded in the field map.
///
/// Only `Include` releases a raw value. The `TransformDate*` statuses release
/// a value only after the transform stage has cleaned it. Anything else is
/// withheld.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldStatus {
    /// Raw value may be released.
    Include,
    /// Never released.
    Exclude,
    /// Date released at year precision after transformation.
    TransformDateYear,
    /// Date released at day precision after transformation.
    TransformDate,
    /// Date-time released at minute precision after transformation.
    TransformDateTime,
    /// Date-time released at second precision after transformation.
    TransformDateTimeSeconds,
    /// Status text not recognized; treated as excluded.
    Other(String),
}

impl FieldStatus {
    /// Returns the canonical name as it appears in the field map.
    pub fn as_str(&self) -> &str {
        match self {
            FieldStatus::Include => "Include",
            FieldStatus::Exclude => "Exclude",
            FieldStatus::TransformDateYear => "TransformDateYear",
            FieldStatus::TransformDate => "TransformDate",
            FieldStatus::TransformDateTime => "TransformDateTime",
            FieldStatus::TransformDateTimeSeconds => "TransformDateTimeSeconds",
            FieldStatus::Other(text) => text,
        }
    }

    /// Output granularity for transform-eligible date statuses.
    pub fn granularity(&self) -> Option<DateGranularity> {
        match self {
            FieldStatus::TransformDateYear => Some(DateGranularity::Year),
            FieldStatus::TransformDate => Some(DateGranularity::Date),
            FieldStatus::TransformDateTime => Some(DateGranularity::DateTimeMinute),
            FieldStatus::TransformDateTimeSeconds => Some(DateGranularity::DateTimeSeconds),
            _ => None,
        }
    }

    /// Returns true for any of the `TransformDate*` statuses.
    pub fn is_transform_date(&self) -> bool {
        self.granularity().is_some()
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldStatus {
    type Err = std::convert::Infallible;

    /// Unrecognized text becomes [`FieldStatus::Other`] so the filter can
    /// withhold it instead of failing the load.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let status = match trimmed.to_ascii_uppercase().as_str() {
            "INCLUDE" => FieldStatus::Include,
            "EXCLUDE" => FieldStatus::Exclude,
            "TRANSFORMDATEYEAR" => FieldStatus::TransformDateYear,
            "TRANSFORMDATE" => FieldStatus::TransformDate,
            "TRANSFORMDATETIME" => FieldStatus::TransformDateTime,
            "TRANSFORMDATETIMESECONDS" => FieldStatus::TransformDateTimeSeconds,
            _ => FieldStatus::Other(trimmed.to_string()),
        };
        Ok(status)
    }
}

/// Precision a transformed date is written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    Year,
    Date,
    DateTimeMinute,
    DateTimeSeconds,
}

impl DateGranularity {
    /// All granularities, coarsest first.
    pub const ALL: [DateGranularity; 4] = [
        DateGranularity::Year,
        DateGranularity::Date,
        DateGranularity::DateTimeMinute,
        DateGranularity::DateTimeSeconds,
    ];

    /// `chrono` format string used when writing a value at this precision.
    pub fn format_str(&self) -> &'static str {
        match self {
            DateGranularity::Year => "%Y",
            DateGranularity::Date => "%Y-%m-%d",
            DateGranularity::DateTimeMinute => "%Y-%m-%d %H:%M",
            DateGranularity::DateTimeSeconds => "%Y-%m-%d %H:%M:%S",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateGranularity::Year => "year",
            DateGranularity::Date => "date",
            DateGranularity::DateTimeMinute => "date_time_minute",
            DateGranularity::DateTimeSeconds => "date_time_seconds",
        }
    }
}

impl fmt::Display for DateGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Date transform mode; exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Seconds between the anchor date and the field date.
    TotalSeconds,
    /// Fixed offset added to every date.
    DateShifting,
    /// Per-subject offset derived from the subject's date of birth.
    DobShifting,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::TotalSeconds => "total_seconds",
            TransformMode::DateShifting => "date_shifting",
            TransformMode::DobShifting => "dob_shifting",
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransformMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total_seconds" => Ok(TransformMode::TotalSeconds),
            "date_shifting" => Ok(TransformMode::DateShifting),
            "dob_shifting" => Ok(TransformMode::DobShifting),
            _ => Err(ModelError::InvalidTransformMode(s.to_string())),
        }
    }
}

/// Where a transform writes its derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Derived values become transform records; raw records are untouched.
    #[default]
    SideChannel,
    /// Derived values replace the raw value and the record is marked cleaned.
    InPlace,
}

impl OutputMode {
    pub fn from_in_place(in_place: bool) -> Self {
        if in_place {
            OutputMode::InPlace
        } else {
            OutputMode::SideChannel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("include".parse::<FieldStatus>().unwrap(), FieldStatus::Include);
        assert_eq!(
            " TransformDateTime ".parse::<FieldStatus>().unwrap(),
            FieldStatus::TransformDateTime
        );
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = "Review".parse::<FieldStatus>().unwrap();
        assert_eq!(status, FieldStatus::Other("Review".to_string()));
        assert!(!status.is_transform_date());
        assert_eq!(status.to_string(), "Review");
    }

    #[test]
    fn granularity_follows_status() {
        assert_eq!(
            FieldStatus::TransformDateYear.granularity(),
            Some(DateGranularity::Year)
        );
        assert_eq!(FieldStatus::Include.granularity(), None);
    }

    #[test]
    fn transform_mode_rejects_unknown() {
        assert_eq!(
            "dob_shifting".parse::<TransformMode>().unwrap(),
            TransformMode::DobShifting
        );
        assert!("shift_everything".parse::<TransformMode>().is_err());
    }
}
