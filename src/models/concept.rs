use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Status of a concept (RF1 concept status codes)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display, EnumIter,
)]
pub enum ConceptStatus {
    Current,
    Retired,
    Duplicate,
    Outdated,
    Ambiguous,
    Erroneous,
    Limited,
    MovedElsewhere,
    PendingMove,
}

impl ConceptStatus {
    /// Numeric status code as distributed in the release files
    pub fn code(&self) -> u64 {
        match self {
            ConceptStatus::Current => 0,
            ConceptStatus::Retired => 1,
            ConceptStatus::Duplicate => 2,
            ConceptStatus::Outdated => 3,
            ConceptStatus::Ambiguous => 4,
            ConceptStatus::Erroneous => 5,
            ConceptStatus::Limited => 6,
            ConceptStatus::MovedElsewhere => 10,
            ConceptStatus::PendingMove => 11,
        }
    }

    /// Look up a status from its numeric code
    pub fn from_code(code: u64) -> Option<Self> {
        Self::iter().find(|s| s.code() == code)
    }

    /// Whether concepts with this status are considered active
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConceptStatus::Current | ConceptStatus::Limited | ConceptStatus::PendingMove
        )
    }

    /// Codes of every status that counts as active
    pub fn active_codes() -> Vec<u64> {
        Self::iter().filter(|s| s.is_active()).map(|s| s.code()).collect()
    }
}

/// Well-known dm+d product concepts used as direct parents of medicinal products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum DmdProduct {
    VirtualTherapeuticMoiety,
    VirtualMedicinalProduct,
    ActualMedicinalProduct,
    TradeFamily,
}

impl DmdProduct {
    pub fn concept_id(&self) -> u64 {
        match self {
            DmdProduct::VirtualTherapeuticMoiety => 10363801000001108,
            DmdProduct::VirtualMedicinalProduct => 10363901000001102,
            DmdProduct::ActualMedicinalProduct => 10364001000001104,
            DmdProduct::TradeFamily => 9191801000001103,
        }
    }
}
