//! Footnote rewriting for assistant answers.
//!
//! The model cites sources inline as `[doc1]`, `[doc2]`, ... where N is the
//! 1-based position in the citation list of the preceding tool message. For
//! display these become superscript-style markers numbered in order of first
//! appearance, and only the citations actually referenced are kept.

use crate::api::Citation;

const MARKER_OPEN: &str = "[doc";
/// Longest document number the model emits.
const MAX_MARKER_DIGITS: usize = 3;

/// An answer with its markers rewritten and its citations filtered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAnswer {
    pub markdown: String,
    /// Cited subset in footnote order. `id` holds the original document
    /// number and `reindex_id` the footnote number.
    pub citations: Vec<Citation>,
}

/// Rewrites `[docN]` markers into ` ^K^ ` footnotes.
///
/// Repeated references to the same document reuse its footnote number.
/// Markers pointing outside `citations` are left untouched.
pub fn parse_answer(answer: &str, citations: &[Citation]) -> ParsedAnswer {
    let mut markdown = String::with_capacity(answer.len());
    let mut cited: Vec<Citation> = Vec::new();
    // (document number, footnote number)
    let mut assigned: Vec<(usize, usize)> = Vec::new();

    let mut rest = answer;
    while let Some(start) = rest.find(MARKER_OPEN) {
        markdown.push_str(&rest[..start]);
        let after = &rest[start + MARKER_OPEN.len()..];

        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if (1..=MAX_MARKER_DIGITS).contains(&digits) && after.as_bytes().get(digits) == Some(&b']') {
            let doc: usize = after[..digits].parse().unwrap_or(0);
            let footnote = match assigned.iter().find(|(d, _)| *d == doc) {
                Some(&(_, k)) => Some(k),
                None => doc
                    .checked_sub(1)
                    .and_then(|i| citations.get(i))
                    .map(|source| {
                        let k = cited.len() + 1;
                        let mut citation = source.clone();
                        citation.id = Some(doc.to_string());
                        citation.reindex_id = Some(k.to_string());
                        cited.push(citation);
                        assigned.push((doc, k));
                        k
                    }),
            };

            if let Some(k) = footnote {
                markdown.push_str(&format!(" ^{k}^ "));
                rest = &after[digits + 1..];
                continue;
            }
        }

        markdown.push_str(MARKER_OPEN);
        rest = after;
    }
    markdown.push_str(rest);

    ParsedAnswer {
        markdown,
        citations: cited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> Vec<Citation> {
        (1..=3)
            .map(|i| Citation {
                id: Some(i.to_string()),
                content: Some(format!("Citation {i}")),
                ..Default::default()
            })
            .collect()
    }

    fn reindexed(i: usize, k: usize) -> Citation {
        Citation {
            reindex_id: Some(k.to_string()),
            ..sources()[i - 1].clone()
        }
    }

    #[test]
    fn test_valid_markers_are_rewritten() {
        let parsed = parse_answer(
            "This is the answer with citations [doc1] and [doc2].",
            &sources(),
        );
        assert_eq!(
            parsed.markdown,
            "This is the answer with citations  ^1^  and  ^2^ ."
        );
        assert_eq!(parsed.citations, vec![reindexed(1, 1), reindexed(2, 2)]);
    }

    #[test]
    fn test_duplicate_markers_share_a_footnote() {
        let parsed = parse_answer("Twice [doc1] and [doc1].", &sources());
        assert_eq!(parsed.markdown, "Twice  ^1^  and  ^1^ .");
        assert_eq!(parsed.citations, vec![reindexed(1, 1)]);
    }

    #[test]
    fn test_footnotes_follow_first_appearance() {
        let parsed = parse_answer("[doc3] then [doc1]", &sources());
        assert_eq!(parsed.markdown, " ^1^  then  ^2^ ");
        assert_eq!(parsed.citations[0].id.as_deref(), Some("3"));
        assert_eq!(parsed.citations[1].reindex_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_out_of_range_markers_are_untouched() {
        let parsed = parse_answer("Valid [doc1] and invalid [doc99] and [doc0].", &sources());
        assert_eq!(parsed.markdown, "Valid  ^1^  and invalid [doc99] and [doc0].");
        assert_eq!(parsed.citations.len(), 1);
    }

    #[test]
    fn test_malformed_markers_are_untouched() {
        let text = "Odd [doc] [docX] [doc1234] [doc2";
        let parsed = parse_answer(text, &sources());
        assert_eq!(parsed.markdown, text);
        assert!(parsed.citations.is_empty());
    }

    #[test]
    fn test_empty_answer_and_no_citations() {
        assert_eq!(parse_answer("", &sources()), ParsedAnswer::default());
        let parsed = parse_answer("No sources [doc1].", &[]);
        assert_eq!(parsed.markdown, "No sources [doc1].");
        assert!(parsed.citations.is_empty());
    }
}
