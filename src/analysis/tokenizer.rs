use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Splits at Unicode word boundaries
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        for (offset, word) in text.unicode_word_indices() {
            if word.len() <= self.max_token_length {
                tokens.push(Token::new(word, position, offset));
                position += 1;
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// The whole input as a single token
#[derive(Debug, Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        vec![Token::new(text, 0, 0)]
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_splits_words_with_offsets() {
        let tokens = StandardTokenizer::default().tokenize("Big, red  cat");
        let words: Vec<(&str, u32, usize)> = tokens.iter().map(|t| (t.text.as_str(), t.position, t.offset)).collect();
        assert_eq!(words, vec![("Big", 0, 0), ("red", 1, 5), ("cat", 2, 10)]);
    }

    #[test]
    fn keyword_keeps_input() {
        let tokens = KeywordTokenizer.tokenize("New York");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "New York");
    }
}
