use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Type of a description (RF1 description type codes)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display, EnumIter,
)]
pub enum DescriptionType {
    Unspecified,
    Preferred,
    Synonym,
    FullySpecifiedName,
}

impl DescriptionType {
    pub fn code(&self) -> u64 {
        match self {
            DescriptionType::Unspecified => 0,
            DescriptionType::Preferred => 1,
            DescriptionType::Synonym => 2,
            DescriptionType::FullySpecifiedName => 3,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::iter().find(|t| t.code() == code)
    }

    /// Codes of every known description type except `exclude`.
    ///
    /// The set is materialized from the full enumeration each time it is
    /// requested, so new variants are picked up automatically.
    pub fn codes_except(exclude: DescriptionType) -> Vec<u64> {
        Self::iter()
            .filter(|t| *t != exclude)
            .map(|t| t.code())
            .collect()
    }
}

/// Status of an individual description (RF1 description status codes)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display, EnumIter,
)]
pub enum DescriptionStatus {
    Current,
    NonCurrent,
    Duplicate,
    Outdated,
    Erroneous,
    Limited,
    Inappropriate,
    ConceptNonCurrent,
    MovedElsewhere,
    PendingMove,
}

impl DescriptionStatus {
    pub fn code(&self) -> u64 {
        match self {
            DescriptionStatus::Current => 0,
            DescriptionStatus::NonCurrent => 1,
            DescriptionStatus::Duplicate => 2,
            DescriptionStatus::Outdated => 3,
            DescriptionStatus::Erroneous => 5,
            DescriptionStatus::Limited => 6,
            DescriptionStatus::Inappropriate => 7,
            DescriptionStatus::ConceptNonCurrent => 8,
            DescriptionStatus::MovedElsewhere => 10,
            DescriptionStatus::PendingMove => 11,
        }
    }
}
