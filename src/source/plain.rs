//! Plain text: the whole input as one monospaced, wrapped block.

use crate::model::{Block, Document};

pub fn document(text: &str) -> Document {
    let text = text.replace("\r\n", "\n");
    Document::new(vec![Block::Preformatted { text }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_preformatted_block() {
        let doc = document("line one\r\nline two\n");
        assert_eq!(
            doc.blocks,
            vec![Block::Preformatted {
                text: "line one\nline two\n".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_input() {
        let doc = document("");
        assert_eq!(doc.blocks.len(), 1);
    }
}
