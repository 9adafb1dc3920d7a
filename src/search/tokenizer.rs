//! Text analysis shared by indexing and querying
//!
//! The `term` field is indexed with the analyzer registered here, and the query
//! compiler fetches the very same analyzer back from the index before splitting
//! search text. Keeping a single definition is what makes prefix and exact
//! matches line up with the stored terms.

use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, Token, TokenStream,
};
use tantivy::Index;

/// Name under which the analyzer is registered on every opened index
pub const TERMINOLOGY_TOKENIZER: &str = "terminology";

/// Tokens longer than this (in bytes) are dropped rather than indexed
pub const MAX_TOKEN_LEN: usize = 255;

/// Build the analyzer: word split on non-alphanumerics, then lowercase.
pub fn terminology_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .build()
}

/// Register the analyzer with an index; must happen on every open
pub fn register(index: &Index) {
    index
        .tokenizers()
        .register(TERMINOLOGY_TOKENIZER, terminology_analyzer());
}

/// Fetch the analyzer registered on `index`, falling back to a fresh one
pub fn analyzer_for(index: &Index) -> TextAnalyzer {
    index
        .tokenizers()
        .get(TERMINOLOGY_TOKENIZER)
        .unwrap_or_else(terminology_analyzer)
}

/// Split `text` into normalized terms, in order, duplicates kept
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut stream = analyzer.token_stream(text);
    stream.process(&mut |token: &Token| terms.push(token.text.clone()));
    terms
}

/// Token length as used by the prefix and fuzzy thresholds
pub fn token_len(token: &str) -> usize {
    token.chars().count()
}
