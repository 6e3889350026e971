use proptest::prelude::*;
use wikitrans_chunker::{Chunker, ChunkerConfig};

fn chunker(max_tokens: usize) -> Chunker {
    Chunker::try_new(ChunkerConfig::with_max_tokens(max_tokens)).expect("valid config")
}

/// Non-blank lines of `text`, trimmed, in order
fn content_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn document() -> impl Strategy<Value = String> {
    let paragraph = "[a-zA-Z0-9 ,.{}|=\\[\\]]{1,120}";
    let section = (
        prop::option::of((2usize..=6, "[A-Za-z ]{1,20}")),
        prop::collection::vec(paragraph, 0..5),
    )
        .prop_map(|(heading, paragraphs)| {
            let body = paragraphs
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty() && !p.starts_with("=="))
                .collect::<Vec<_>>()
                .join("\n\n");
            match heading {
                Some((level, title)) => {
                    let marks = "=".repeat(level);
                    format!("{marks} {} {marks}\n{body}", title.trim())
                }
                None => body,
            }
        });
    prop::collection::vec(section, 0..8).prop_map(|sections| sections.join("\n"))
}

proptest! {
    #[test]
    fn chunks_cover_all_content_in_order(text in document(), max_tokens in 5usize..200) {
        let chunks = chunker(max_tokens).chunk_text(&text);
        prop_assert!(!chunks.is_empty());

        let rebuilt = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        prop_assert_eq!(content_lines(&rebuilt), content_lines(&text));
    }

    #[test]
    fn only_forced_chunks_exceed_budget(text in document(), max_tokens in 5usize..200) {
        let chunker = chunker(max_tokens);
        for chunk in chunker.chunk_text(&text) {
            prop_assert_eq!(chunk.estimated_tokens, chunker.estimate(&chunk.content));
            if !chunk.is_oversized() {
                prop_assert!(chunk.estimated_tokens <= max_tokens);
            }
        }
    }
}

#[test]
fn nine_thousand_token_section_packs_paragraphs_greedily() {
    let paragraph = |c: char| c.to_string().repeat(9000);
    let text = format!(
        "== Section ==\n{}\n\n{}\n\n{}",
        paragraph('a'),
        paragraph('b'),
        paragraph('c')
    );

    let chunks = chunker(7000).chunk_text(&text);
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].content.starts_with("== Section ==\n"));
    assert!(chunks.iter().all(|c| c.estimated_tokens <= 7000));
    assert!(chunks.iter().all(|c| !c.is_oversized()));
}

#[test]
fn free_function_returns_plain_text() {
    let chunks = wikitrans_chunker::chunk_text("== A ==\nalpha\n== B ==\nbeta", 5);
    assert_eq!(chunks, vec!["== A ==\nalpha", "== B ==\nbeta"]);
}
