use crate::analysis::filter::{LowercaseFilter, TokenFilter};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer};

/// Tokenizer followed by a chain of token filters
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: impl Into<String>, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name: name.into(),
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Token texts only
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Lower-cased words; used for natural language fields
    pub fn text() -> Self {
        Analyzer::new("text", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// Untouched value; used for strings, references and ids
    pub fn keyword() -> Self {
        Analyzer::new("keyword", Box::new(KeywordTokenizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_analyzer_lowercases_words() {
        assert_eq!(Analyzer::text().terms("Chat NOIR"), vec!["chat", "noir"]);
        assert_eq!(Analyzer::keyword().terms("Chat NOIR"), vec!["Chat NOIR"]);
    }
}
