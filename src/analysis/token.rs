use serde::{Serialize, Deserialize};

/// A term of analysed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,     // word index, used for phrase matching
    pub offset: usize,     // byte offset in the original text
}

impl Token {
    pub fn new(text: impl Into<String>, position: u32, offset: usize) -> Self {
        Token {
            text: text.into(),
            position,
            offset,
        }
    }
}
