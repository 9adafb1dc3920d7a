//! Reusable, non-scoring constraints on search results

use crate::models::{ConceptStatus, DescriptionType, DmdProduct};
use crate::search::document::DescriptionFields;
use tantivy::query::{ConstScoreQuery, Query, QueryClone, TermSetQuery};
use tantivy::schema::{Field, Term};

/// A set-membership predicate over indexed description fields.
///
/// Filters only include or exclude documents. When compiled they contribute a
/// score of zero, so they never reorder the hits that survive them.
#[derive(Debug)]
pub enum Filter {
    /// Recursive parent set intersects the ids
    RecursiveParent(Vec<u64>),

    /// Direct "is-a" parent set intersects the ids
    DirectParent(Vec<u64>),

    /// Description type code is one of the codes
    DescriptionType(Vec<u64>),

    /// Concept status code is one of the codes
    ConceptStatus(Vec<u64>),

    /// Any caller-built engine query, used purely as a constraint
    Custom(Box<dyn Query>),
}

impl Clone for Filter {
    fn clone(&self) -> Self {
        match self {
            Filter::RecursiveParent(ids) => Filter::RecursiveParent(ids.clone()),
            Filter::DirectParent(ids) => Filter::DirectParent(ids.clone()),
            Filter::DescriptionType(codes) => Filter::DescriptionType(codes.clone()),
            Filter::ConceptStatus(codes) => Filter::ConceptStatus(codes.clone()),
            Filter::Custom(query) => Filter::Custom(query.box_clone()),
        }
    }
}

impl Filter {
    pub fn by_recursive_parent(ids: impl IntoIterator<Item = u64>) -> Self {
        Filter::RecursiveParent(ids.into_iter().collect())
    }

    pub fn by_direct_parent(ids: impl IntoIterator<Item = u64>) -> Self {
        Filter::DirectParent(ids.into_iter().collect())
    }

    pub fn by_description_type(types: impl IntoIterator<Item = DescriptionType>) -> Self {
        Filter::DescriptionType(types.into_iter().map(|t| t.code()).collect())
    }

    /// Every known description type except `exclude`, materialized now
    pub fn excluding_description_type(exclude: DescriptionType) -> Self {
        Filter::DescriptionType(DescriptionType::codes_except(exclude))
    }

    pub fn without_fully_specified_names() -> Self {
        Self::excluding_description_type(DescriptionType::FullySpecifiedName)
    }

    pub fn active_concepts_only() -> Self {
        Filter::ConceptStatus(ConceptStatus::active_codes())
    }

    /// Concepts that are a type of VTM or TF
    pub fn dmd_vtm_or_tf() -> Self {
        Self::by_direct_parent([
            DmdProduct::VirtualTherapeuticMoiety.concept_id(),
            DmdProduct::TradeFamily.concept_id(),
        ])
    }

    /// Concepts that are a type of VMP or AMP
    pub fn dmd_vmp_or_amp() -> Self {
        Self::by_direct_parent([
            DmdProduct::ActualMedicinalProduct.concept_id(),
            DmdProduct::VirtualMedicinalProduct.concept_id(),
        ])
    }

    pub fn custom(query: Box<dyn Query>) -> Self {
        Filter::Custom(query)
    }

    /// Compile into an engine query that scores zero for every match
    pub fn to_query(&self, fields: &DescriptionFields) -> Box<dyn Query> {
        let inner: Box<dyn Query> = match self {
            Filter::RecursiveParent(ids) => set_query(fields.recursive_parent, ids),
            Filter::DirectParent(ids) => set_query(fields.direct_parent, ids),
            Filter::DescriptionType(codes) => set_query(fields.description_type, codes),
            Filter::ConceptStatus(codes) => set_query(fields.concept_status, codes),
            Filter::Custom(query) => query.box_clone(),
        };
        Box::new(ConstScoreQuery::new(inner, 0.0))
    }
}

fn set_query(field: Field, values: &[u64]) -> Box<dyn Query> {
    Box::new(TermSetQuery::new(
        values.iter().map(|v| Term::from_field_u64(field, *v)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluding_type_materializes_remaining_codes() {
        match Filter::without_fully_specified_names() {
            Filter::DescriptionType(codes) => {
                assert!(!codes.contains(&DescriptionType::FullySpecifiedName.code()));
                assert_eq!(codes.len(), 3);
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_active_concepts_uses_active_status_set() {
        match Filter::active_concepts_only() {
            Filter::ConceptStatus(codes) => assert_eq!(codes, ConceptStatus::active_codes()),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_single_and_many_parent_ids() {
        match Filter::by_recursive_parent([22298006]) {
            Filter::RecursiveParent(ids) => assert_eq!(ids, vec![22298006]),
            other => panic!("unexpected filter {:?}", other),
        }
        match Filter::by_direct_parent(vec![1, 2, 3]) {
            Filter::DirectParent(ids) => assert_eq!(ids.len(), 3),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_custom_filter_clones() {
        let filter = Filter::custom(Box::new(tantivy::query::AllQuery));
        assert!(matches!(filter.clone(), Filter::Custom(_)));
    }
}
