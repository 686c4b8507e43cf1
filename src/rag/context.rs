//! Context building for grounded answers.

use crate::vector_store::RetrievalResult;

/// Separator between chunks in the context block.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join retrieved chunks, in retrieval order, into one context block.
pub fn format_context_for_prompt(result: &RetrievalResult) -> String {
    result
        .texts()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Format retrieved chunks for display to the user.
pub fn format_context_for_display(result: &RetrievalResult) -> String {
    result
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[{}] chunk #{} (score: {:.2})\n{}",
                i + 1,
                chunk.index,
                chunk.score,
                chunk.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::ScoredChunk;

    fn result() -> RetrievalResult {
        RetrievalResult::new(vec![
            ScoredChunk {
                index: 4,
                content: "Cats sleep a lot. ".to_string(),
                score: 0.91,
            },
            ScoredChunk {
                index: 1,
                content: "They like boxes.".to_string(),
                score: 0.52,
            },
        ])
    }

    #[test]
    fn test_prompt_context_keeps_retrieval_order() {
        assert_eq!(
            format_context_for_prompt(&result()),
            "Cats sleep a lot.\n\nThey like boxes."
        );
        assert_eq!(format_context_for_prompt(&RetrievalResult::default()), "");
    }

    #[test]
    fn test_display_context() {
        let display = format_context_for_display(&result());
        assert!(display.starts_with("[1] chunk #4 (score: 0.91)\nCats sleep a lot."));
        assert!(display.contains("[2] chunk #1 (score: 0.52)"));
    }
}
