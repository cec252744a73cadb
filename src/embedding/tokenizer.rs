/// Tokenizer used by the keyword index
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Anything that turns text into an ordered sequence of lowercase tokens
///
/// Index build and query time must use the same tokenizer.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Identity recorded in the sparse artifact manifest
    fn name(&self) -> &str;
}

/// Tantivy analyzer: split on non-alphanumeric characters, then lowercase
#[derive(Clone)]
pub struct SimpleTokenizerAdapter {
    analyzer: TextAnalyzer,
}

impl SimpleTokenizerAdapter {
    pub const NAME: &'static str = "tantivy-simple-lowercase";

    pub fn new() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build();
        Self { analyzer }
    }
}

impl Default for SimpleTokenizerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for SimpleTokenizerAdapter {
    fn tokenize(&self, text: &str) -> Vec<String> {
        // token_stream needs &mut; analyzers are cheap to clone
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);

        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_punctuation() {
        let tokenizer = SimpleTokenizerAdapter::new();
        assert_eq!(
            tokenizer.tokenize("BERT-based Retrieval, revisited!"),
            vec!["bert", "based", "retrieval", "revisited"]
        );
    }

    #[test]
    fn test_preserves_order_and_repeats() {
        let tokenizer = SimpleTokenizerAdapter::new();
        assert_eq!(
            tokenizer.tokenize("loss loss gradient loss"),
            vec!["loss", "loss", "gradient", "loss"]
        );
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = SimpleTokenizerAdapter::new();
        assert!(tokenizer.tokenize("  \n ").is_empty());
    }
}
