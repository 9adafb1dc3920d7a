//! Search query building and parsing

use crate::search::config::SearchConfig;
use crate::search::document::DescriptionFields;
use crate::search::error::SearchResult;
use crate::search::filter::Filter;
use crate::search::tokenizer::{self, token_len};
use serde::{Deserialize, Serialize};
use tantivy::query::{
    BooleanQuery, EmptyQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery,
};
use tantivy::schema::{IndexRecordOption, Term};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::Index;
use tracing::debug;

/// Hard ceiling on fuzzy edit distance
pub const MAX_FUZZY_EDITS: u8 = 2;

/// Token-length thresholds for the built-in compiler
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryOptions {
    /// Tokens at least this long are OR'd with a prefix match
    pub prefix_min_chars: usize,

    /// Tokens strictly longer than this use a fuzzy match when fuzziness is on
    pub fuzzy_min_chars: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            prefix_min_chars: 3,
            fuzzy_min_chars: 3,
        }
    }
}

impl From<&SearchConfig> for QueryOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            prefix_min_chars: config.prefix_min_chars,
            fuzzy_min_chars: config.fuzzy_min_chars,
        }
    }
}

/// Clamp a requested edit distance to the supported range
pub fn clamp_fuzzy_edits(edits: u8) -> u8 {
    edits.min(MAX_FUZZY_EDITS)
}

/// Compiles free text and filters into a single engine query
#[derive(Clone)]
pub struct QueryCompiler {
    index: Index,
    fields: DescriptionFields,
    analyzer: TextAnalyzer,
    options: QueryOptions,
}

impl QueryCompiler {
    /// Create a compiler that tokenizes with the analyzer registered on `index`
    pub fn new(index: Index, fields: DescriptionFields, options: QueryOptions) -> Self {
        let analyzer = tokenizer::analyzer_for(&index);
        Self {
            index,
            fields,
            analyzer,
            options,
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn fields(&self) -> &DescriptionFields {
        &self.fields
    }

    /// Built-in hybrid exact/prefix/fuzzy compilation of `text`.
    ///
    /// Every token must match. A token of at least `prefix_min_chars` may match
    /// either exactly (or fuzzily) or as a prefix; shorter tokens only match
    /// exactly. Returns `None` when the text yields no tokens.
    pub fn compile_text(&self, text: &str, fuzzy_max_edits: u8) -> Option<Box<dyn Query>> {
        let fuzzy = clamp_fuzzy_edits(fuzzy_max_edits);
        let mut analyzer = self.analyzer.clone();
        let tokens = tokenizer::tokenize(&mut analyzer, text);
        if tokens.is_empty() {
            return None;
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .map(|token| (Occur::Must, self.token_query(token, fuzzy)))
            .collect();

        debug!(
            text = %text,
            tokens = tokens.len(),
            fuzzy = fuzzy,
            "Compiled search text"
        );
        Some(Box::new(BooleanQuery::new(clauses)))
    }

    fn token_query(&self, token: &str, fuzzy: u8) -> Box<dyn Query> {
        let len = token_len(token);
        let term = Term::from_field_text(self.fields.term, token);

        let exact: Box<dyn Query> = if fuzzy > 0 && len > self.options.fuzzy_min_chars {
            Box::new(FuzzyTermQuery::new(term.clone(), fuzzy, true))
        } else {
            Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs))
        };

        if len >= self.options.prefix_min_chars {
            let prefix: Box<dyn Query> = Box::new(FuzzyTermQuery::new_prefix(term, 0, true));
            Box::new(BooleanQuery::new(vec![
                (Occur::Should, exact),
                (Occur::Should, prefix),
            ]))
        } else {
            exact
        }
    }

    /// Parse caller syntax with the engine query parser over `term`.
    ///
    /// Terms are AND-ed by default.
    pub fn parse(&self, text: &str) -> SearchResult<Box<dyn Query>> {
        let mut parser = QueryParser::for_index(&self.index, vec![self.fields.term]);
        parser.set_conjunction_by_default();
        Ok(parser.parse_query(text)?)
    }

    /// Combine a base query with filters as non-scoring mandatory clauses.
    ///
    /// With neither a base query nor filters the result matches nothing.
    pub fn combine(&self, base: Option<Box<dyn Query>>, filters: &[Filter]) -> Box<dyn Query> {
        if filters.is_empty() {
            return base.unwrap_or_else(|| Box::new(EmptyQuery));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(filters.len() + 1);
        if let Some(query) = base {
            clauses.push((Occur::Must, query));
        }
        for filter in filters {
            clauses.push((Occur::Must, filter.to_query(&self.fields)));
        }
        Box::new(BooleanQuery::new(clauses))
    }

    /// Compile a full request: an explicit query wins over search text
    pub fn compile(
        &self,
        explicit: Option<Box<dyn Query>>,
        text: Option<&str>,
        fuzzy_max_edits: u8,
        filters: &[Filter],
    ) -> Box<dyn Query> {
        let base = match explicit {
            Some(query) => Some(query),
            None => text.and_then(|t| self.compile_text(t, fuzzy_max_edits)),
        };
        self.combine(base, filters)
    }
}

/// Parse a comma-delimited list of identifiers.
///
/// Kept for compatibility: any malformed element yields an empty list, which is
/// indistinguishable from blank input. Use [`try_parse_id_list`] to tell the two
/// apart.
pub fn parse_id_list(list: &str) -> Vec<u64> {
    try_parse_id_list(list).unwrap_or_default()
}

/// Parse a comma-delimited list of identifiers, rejecting malformed elements
pub fn try_parse_id_list(list: &str) -> SearchResult<Vec<u64>> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|item| {
            item.trim().parse::<u64>().map_err(|e| {
                crate::search::error::SearchError::InvalidIdList(format!("`{}`: {}", item, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::document::build_description_schema;
    use crate::search::error::SearchError;

    fn compiler() -> QueryCompiler {
        let index = Index::create_in_ram(build_description_schema());
        tokenizer::register(&index);
        let fields = DescriptionFields::from_schema(&index.schema()).unwrap();
        QueryCompiler::new(index, fields, QueryOptions::default())
    }

    #[test]
    fn test_empty_text_compiles_to_nothing() {
        let c = compiler();
        assert!(c.compile_text("", 0).is_none());
        assert!(c.compile_text("  ,, ", 2).is_none());
        let query = c.compile(None, None, 0, &[]);
        assert!(format!("{:?}", query).contains("EmptyQuery"));
    }

    #[test]
    fn test_short_token_has_no_prefix_clause() {
        let c = compiler();
        let query = format!("{:?}", c.compile_text("pa", 2).unwrap());
        assert!(query.contains("TermQuery"));
        assert!(!query.contains("Fuzzy"));
    }

    #[test]
    fn test_long_token_gets_prefix_and_fuzzy() {
        let c = compiler();
        let plain = format!("{:?}", c.compile_text("asthma", 0).unwrap());
        assert!(plain.contains("TermQuery"));
        assert!(plain.contains("prefix: true"));

        let fuzzy = format!("{:?}", c.compile_text("asthma", 1).unwrap());
        assert!(fuzzy.contains("distance: 1"));
    }

    #[test]
    fn test_fuzzy_edits_are_clamped() {
        assert_eq!(clamp_fuzzy_edits(7), 2);
        assert_eq!(clamp_fuzzy_edits(1), 1);
        let c = compiler();
        let fuzzy = format!("{:?}", c.compile_text("amoxicillin", 9).unwrap());
        assert!(fuzzy.contains("distance: 2"));
    }

    #[test]
    fn test_parse_reports_syntax_errors() {
        let c = compiler();
        assert!(c.parse("heart AND failure").is_ok());
        assert!(matches!(
            c.parse("unknownfield:heart"),
            Err(SearchError::QuerySyntax(_))
        ));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2, 3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list(""), Vec::<u64>::new());
        assert_eq!(parse_id_list("1,x,3"), Vec::<u64>::new());
    }

    #[test]
    fn test_try_parse_id_list_distinguishes_malformed() {
        assert_eq!(try_parse_id_list("  ").unwrap(), Vec::<u64>::new());
        assert!(matches!(
            try_parse_id_list("12,,13"),
            Err(SearchError::InvalidIdList(_))
        ));
    }
}
