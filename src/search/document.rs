//! Search document structures and indexing

use crate::search::error::{SearchError, SearchResult};
use crate::search::tokenizer::TERMINOLOGY_TOKENIZER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tantivy::schema::*;
use tantivy::TantivyDocument;

pub const FIELD_TERM: &str = "term";
pub const FIELD_PREFERRED_TERM: &str = "preferredTerm";
pub const FIELD_LANGUAGE: &str = "language";
pub const FIELD_DESCRIPTION_ID: &str = "descriptionId";
pub const FIELD_CONCEPT_ID: &str = "conceptId";
pub const FIELD_DESCRIPTION_STATUS: &str = "descriptionStatus";
pub const FIELD_CONCEPT_STATUS: &str = "conceptStatus";
pub const FIELD_DESCRIPTION_TYPE: &str = "descriptionType";
pub const FIELD_DIRECT_PARENT: &str = "directParentConceptId";
pub const FIELD_RECURSIVE_PARENT: &str = "recursiveParentConceptId";

/// One indexed description, as handed over by the persistence layer.
///
/// Parent sets are precomputed upstream: `direct_parent_concept_ids` holds the
/// one-hop "is-a" targets of the owning concept and
/// `recursive_parent_concept_ids` its full ancestor closure. Both may be empty
/// for root concepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDescription {
    /// Unique key; re-indexing the same id replaces the earlier document
    pub description_id: u64,

    /// Owning concept
    pub concept_id: u64,

    /// Searchable label
    pub term: String,

    /// Display label of the owning concept
    #[serde(default)]
    pub preferred_term: Option<String>,

    pub language_code: String,

    pub description_status_code: u64,

    pub concept_status_code: u64,

    pub description_type_code: u64,

    #[serde(default)]
    pub direct_parent_concept_ids: BTreeSet<u64>,

    #[serde(default)]
    pub recursive_parent_concept_ids: BTreeSet<u64>,
}

impl IndexedDescription {
    /// A description with no term content is never indexed
    pub fn has_content(&self) -> bool {
        !self.term.trim().is_empty()
    }

    /// Convert to Tantivy document
    pub fn to_tantivy_doc(&self, fields: &DescriptionFields) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(fields.term, &self.term);
        if let Some(ref preferred) = self.preferred_term {
            doc.add_text(fields.preferred_term, preferred);
        }
        doc.add_text(fields.language, &self.language_code);
        doc.add_u64(fields.description_id, self.description_id);
        doc.add_u64(fields.concept_id, self.concept_id);
        doc.add_u64(fields.description_status, self.description_status_code);
        doc.add_u64(fields.concept_status, self.concept_status_code);
        doc.add_u64(fields.description_type, self.description_type_code);
        for parent in &self.direct_parent_concept_ids {
            doc.add_u64(fields.direct_parent, *parent);
        }
        for parent in &self.recursive_parent_concept_ids {
            doc.add_u64(fields.recursive_parent, *parent);
        }
        doc
    }

    /// Term identifying any existing document for this description
    pub fn id_term(&self, fields: &DescriptionFields) -> Term {
        Term::from_field_u64(fields.description_id, self.description_id)
    }
}

/// Resolved field handles for the description schema
#[derive(Debug, Clone, Copy)]
pub struct DescriptionFields {
    pub term: Field,
    pub preferred_term: Field,
    pub language: Field,
    pub description_id: Field,
    pub concept_id: Field,
    pub description_status: Field,
    pub concept_status: Field,
    pub description_type: Field,
    pub direct_parent: Field,
    pub recursive_parent: Field,
}

impl DescriptionFields {
    /// Resolve every field, treating a missing one as a damaged index
    pub fn from_schema(schema: &Schema) -> SearchResult<Self> {
        let field = |name: &str| {
            schema.get_field(name).map_err(|_| {
                SearchError::IndexCorruption(format!("field `{}` missing from index schema", name))
            })
        };

        Ok(Self {
            term: field(FIELD_TERM)?,
            preferred_term: field(FIELD_PREFERRED_TERM)?,
            language: field(FIELD_LANGUAGE)?,
            description_id: field(FIELD_DESCRIPTION_ID)?,
            concept_id: field(FIELD_CONCEPT_ID)?,
            description_status: field(FIELD_DESCRIPTION_STATUS)?,
            concept_status: field(FIELD_CONCEPT_STATUS)?,
            description_type: field(FIELD_DESCRIPTION_TYPE)?,
            direct_parent: field(FIELD_DIRECT_PARENT)?,
            recursive_parent: field(FIELD_RECURSIVE_PARENT)?,
        })
    }
}

/// Build the search schema for descriptions
pub fn build_description_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Term - tokenized with the shared analyzer, frequencies kept for scoring
    let term_indexing = TextFieldIndexing::default()
        .set_tokenizer(TERMINOLOGY_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions)
        .set_fieldnorms(true);
    schema_builder.add_text_field(
        FIELD_TERM,
        TextOptions::default()
            .set_indexing_options(term_indexing)
            .set_stored(),
    );

    // Preferred term - display only
    schema_builder.add_text_field(FIELD_PREFERRED_TERM, STORED);

    // Language - raw keyword
    schema_builder.add_text_field(FIELD_LANGUAGE, STRING | STORED);

    // Identity and status codes - indexed for deletes and filters, stored for results
    schema_builder.add_u64_field(FIELD_DESCRIPTION_ID, INDEXED | STORED);
    schema_builder.add_u64_field(FIELD_CONCEPT_ID, INDEXED | STORED);
    schema_builder.add_u64_field(FIELD_DESCRIPTION_STATUS, INDEXED | STORED);
    schema_builder.add_u64_field(FIELD_CONCEPT_STATUS, INDEXED | STORED);
    schema_builder.add_u64_field(FIELD_DESCRIPTION_TYPE, INDEXED | STORED);

    // Hierarchy - multi-valued, filter only
    schema_builder.add_u64_field(FIELD_DIRECT_PARENT, INDEXED);
    schema_builder.add_u64_field(FIELD_RECURSIVE_PARENT, INDEXED);

    schema_builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::schema::Value;

    fn sample() -> IndexedDescription {
        IndexedDescription {
            description_id: 41398015,
            concept_id: 22298006,
            term: "Myocardial infarction".to_string(),
            preferred_term: Some("Myocardial infarction".to_string()),
            language_code: "en".to_string(),
            description_status_code: 0,
            concept_status_code: 0,
            description_type_code: 1,
            direct_parent_concept_ids: [251061000, 414545008].into_iter().collect(),
            recursive_parent_concept_ids: [138875005, 404684003, 251061000, 414545008]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_schema_building() {
        let schema = build_description_schema();
        assert!(DescriptionFields::from_schema(&schema).is_ok());
        assert!(schema.get_field(FIELD_TERM).is_ok());
        assert!(schema.get_field(FIELD_RECURSIVE_PARENT).is_ok());
    }

    #[test]
    fn test_missing_field_is_corruption() {
        let mut builder = Schema::builder();
        builder.add_text_field(FIELD_TERM, TEXT | STORED);
        let schema = builder.build();
        assert!(matches!(
            DescriptionFields::from_schema(&schema),
            Err(SearchError::IndexCorruption(_))
        ));
    }

    #[test]
    fn test_description_to_document() {
        let schema = build_description_schema();
        let fields = DescriptionFields::from_schema(&schema).unwrap();
        let doc = sample().to_tantivy_doc(&fields);

        assert_eq!(
            doc.get_first(fields.term).and_then(|v| v.as_str()),
            Some("Myocardial infarction")
        );
        assert_eq!(
            doc.get_first(fields.concept_id).and_then(|v| v.as_u64()),
            Some(22298006)
        );
        assert_eq!(doc.get_all(fields.recursive_parent).count(), 4);
        assert_eq!(doc.get_all(fields.direct_parent).count(), 2);
    }

    #[test]
    fn test_preferred_term_omitted_when_absent() {
        let schema = build_description_schema();
        let fields = DescriptionFields::from_schema(&schema).unwrap();
        let mut description = sample();
        description.preferred_term = None;
        let doc = description.to_tantivy_doc(&fields);
        assert!(doc.get_first(fields.preferred_term).is_none());
    }

    #[test]
    fn test_blank_term_has_no_content() {
        let mut description = sample();
        description.term = "   ".to_string();
        assert!(!description.has_content());
    }

    #[test]
    fn test_json_record_shape() {
        let json = r#"{"descriptionId":1,"conceptId":2,"term":"Asthma","languageCode":"en",
            "descriptionStatusCode":0,"conceptStatusCode":0,"descriptionTypeCode":1}"#;
        let description: IndexedDescription = serde_json::from_str(json).unwrap();
        assert_eq!(description.term, "Asthma");
        assert!(description.preferred_term.is_none());
        assert!(description.recursive_parent_concept_ids.is_empty());
    }
}
