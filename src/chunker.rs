/*!
 * Document chunking.
 *
 * Splits a document into bounded chunks for translation, preferring
 * paragraph boundaries, then sentence boundaries, and hard-cutting only
 * when no boundary fits the budget. Chunk texts partition the input
 * exactly: concatenating them in order reconstructs the document
 * byte for byte.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::glossary::Glossary;

/// Boundary after a blank line separating paragraphs
static PARAGRAPH_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Boundary after sentence-ending punctuation followed by whitespace
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.!?…]["')\]]*\s+"#).unwrap());

/// One chunk of a document, positioned by order
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkText {
    /// 0-based position within the document
    pub order: usize,
    /// Slice of the source document
    pub text: String,
}

/// Split a document into chunks of at most `max_chunk_size` characters.
///
/// A cut never lands inside an occurrence of a glossary term; the cut is
/// moved before the term instead, and a term longer than the whole budget
/// is kept in one chunk, overflowing the budget rather than splitting.
pub fn split(text: &str, max_chunk_size: usize, glossary: Option<&Glossary>) -> Vec<ChunkText> {
    split_inner(text, max_chunk_size, glossary, None)
}

/// Like [`split`], but stop once the prefix limits are reached.
///
/// Used for preview jobs: only the first `max_chunks` chunks are produced,
/// and no further chunk is started once `max_chars` characters have been
/// emitted.
pub fn split_preview(
    text: &str,
    max_chunk_size: usize,
    glossary: Option<&Glossary>,
    max_chunks: usize,
    max_chars: usize,
) -> Vec<ChunkText> {
    split_inner(text, max_chunk_size, glossary, Some((max_chunks, max_chars)))
}

fn split_inner(
    text: &str,
    max_chunk_size: usize,
    glossary: Option<&Glossary>,
    preview: Option<(usize, usize)>,
) -> Vec<ChunkText> {
    if text.is_empty() || max_chunk_size == 0 {
        return Vec::new();
    }

    let forbidden = glossary
        .map(|g| term_ranges(text, g))
        .unwrap_or_default();

    let paragraph_cuts: Vec<usize> = PARAGRAPH_BOUNDARY
        .find_iter(text)
        .map(|m| m.end())
        .filter(|&p| !inside_forbidden(p, &forbidden))
        .collect();
    let sentence_cuts: Vec<usize> = SENTENCE_BOUNDARY
        .find_iter(text)
        .map(|m| m.end())
        .filter(|&p| !inside_forbidden(p, &forbidden))
        .collect();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut emitted_chars = 0usize;

    while start < text.len() {
        if let Some((max_chunks, max_chars)) = preview {
            if chunks.len() >= max_chunks || emitted_chars >= max_chars {
                break;
            }
        }

        let limit = advance_chars(text, start, max_chunk_size);
        let cut = if limit >= text.len() {
            text.len()
        } else {
            pick_cut(start, limit, &paragraph_cuts, &sentence_cuts, &forbidden)
        };

        let chunk_text = &text[start..cut];
        emitted_chars += chunk_text.chars().count();
        chunks.push(ChunkText {
            order: chunks.len(),
            text: chunk_text.to_string(),
        });
        start = cut;
    }

    chunks
}

/// Byte offset `count` characters past `start`, clamped to the text end
fn advance_chars(text: &str, start: usize, count: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(count)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

/// Byte ranges of every glossary term occurrence
fn term_ranges(text: &str, glossary: &Glossary) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for term in &glossary.terms {
        if term.source.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(pos) = text[from..].find(&term.source) {
            let abs = from + pos;
            ranges.push((abs, abs + term.source.len()));
            from = abs + term.source.len();
        }
    }
    ranges.sort_unstable();
    ranges
}

fn inside_forbidden(pos: usize, ranges: &[(usize, usize)]) -> bool {
    ranges.iter().any(|&(s, e)| pos > s && pos < e)
}

/// Best cut in `(start, limit]`: furthest paragraph boundary, else furthest
/// sentence boundary, else a hard cut at the limit moved out of any term
fn pick_cut(
    start: usize,
    limit: usize,
    paragraph_cuts: &[usize],
    sentence_cuts: &[usize],
    forbidden: &[(usize, usize)],
) -> usize {
    let best_in = |cuts: &[usize]| -> Option<usize> {
        cuts.iter().copied().filter(|&c| c > start && c <= limit).next_back()
    };

    if let Some(cut) = best_in(paragraph_cuts) {
        return cut;
    }
    if let Some(cut) = best_in(sentence_cuts) {
        return cut;
    }

    // Hard cut. If it lands inside a term occurrence, back off to the
    // term start; a term filling the whole budget is kept intact instead.
    if let Some(&(s, e)) = forbidden.iter().find(|&&(s, e)| limit > s && limit < e) {
        if s > start {
            return s;
        }
        return e;
    }
    limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::Glossary;

    fn reassemble(chunks: &[ChunkText]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_split_withEmptyInput_shouldProduceNoChunks() {
        assert!(split("", 100, None).is_empty());
    }

    #[test]
    fn test_split_withShortInput_shouldProduceSingleChunk() {
        let chunks = split("Hello world.", 100, None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].order, 0);
        assert_eq!(chunks[0].text, "Hello world.");
    }

    #[test]
    fn test_split_shouldPartitionInputExactly() {
        let text = "First sentence here. Second one follows. Third closes it out.\n\nA new paragraph starts. And it keeps going for a while longer.";
        let chunks = split(text, 40, None);
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks), text);
        let total: i64 = chunks.iter().map(|c| c.text.chars().count() as i64).sum();
        assert_eq!(total, text.chars().count() as i64);
    }

    #[test]
    fn test_split_ordersAreContiguousFromZero() {
        let text = "One. Two. Three. Four. Five. Six. Seven. Eight. Nine. Ten.";
        let chunks = split(text, 12, None);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.order, i);
        }
    }

    #[test]
    fn test_split_shouldPreferParagraphBoundary() {
        let text = "Short opening paragraph.\n\nSecond paragraph with more text in it.";
        let chunks = split(text, 40, None);
        assert_eq!(chunks[0].text, "Short opening paragraph.\n\n");
    }

    #[test]
    fn test_split_shouldFallBackToSentenceBoundary() {
        let text = "A first sentence sits here. A second sentence follows it closely.";
        let chunks = split(text, 40, None);
        assert_eq!(chunks[0].text, "A first sentence sits here. ");
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_split_shouldRespectBudgetWithoutBoundaries() {
        let text = "abcdefghij".repeat(5);
        let chunks = split(&text, 10, None);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.text.chars().count() == 10));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_split_shouldNotCutInsideGlossaryTerm() {
        let glossary = Glossary::identity(["Maximilian"]);
        // without the glossary the hard cut at 12 would land mid-term
        let text = "abcdefgMaximilian tail";
        let chunks = split(text, 12, Some(&glossary));
        assert_eq!(reassemble(&chunks), text);
        for chunk in &chunks {
            let has_prefix = chunk.text.contains("Maxi");
            let has_whole = chunk.text.contains("Maximilian");
            assert!(!has_prefix || has_whole, "term split across chunks: {:?}", chunk.text);
        }
    }

    #[test]
    fn test_split_withTermLongerThanBudget_shouldKeepTermWhole() {
        let glossary = Glossary::identity(["Llanfairpwllgwyngyll"]);
        let text = "Llanfairpwllgwyngyll is a village";
        let chunks = split(text, 10, Some(&glossary));
        assert_eq!(reassemble(&chunks), text);
        assert!(chunks[0].text.contains("Llanfairpwllgwyngyll"));
    }

    #[test]
    fn test_split_withMultibyteText_shouldPartitionExactly() {
        let text = "Olá, como está você? Tudo bem por aí? Até à próxima vez então.";
        let chunks = split(text, 25, None);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_splitPreview_shouldStopAtMaxChunks() {
        let text = "One. Two. Three. Four. Five. Six. Seven. Eight. Nine. Ten.";
        let full = split(text, 12, None);
        let preview = split_preview(text, 12, None, 2, 10_000);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0], full[0]);
        assert_eq!(preview[1], full[1]);
    }

    #[test]
    fn test_splitPreview_shouldStopAtMaxChars() {
        let text = "abcdefghij".repeat(10);
        let preview = split_preview(&text, 10, None, 100, 25);
        // third chunk crosses the 25-char limit; no fourth chunk starts
        assert_eq!(preview.len(), 3);
    }
}
