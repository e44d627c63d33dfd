/*!
 * Glossary term protection around provider calls.
 *
 * Pinned terms are swapped for opaque placeholder tokens before the text is
 * sent to the provider, and the placeholders are replaced with the required
 * target-language renderings afterwards. The provider never sees the terms,
 * so it cannot rewrite them.
 */

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counter backing globally unique placeholder tokens
static PLACEHOLDER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A single pinned term and its required rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// Term as it appears in the source text
    pub source: String,
    /// Required rendering in the target language
    pub target: String,
}

/// A set of terms whose rendering is pinned during translation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Glossary {
    pub terms: Vec<GlossaryTerm>,
}

impl Glossary {
    pub fn new(terms: Vec<GlossaryTerm>) -> Self {
        Self { terms }
    }

    /// Build a glossary whose renderings equal their source terms
    /// (the usual proper-noun case)
    pub fn identity<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| {
                    let t = t.into();
                    GlossaryTerm {
                        source: t.clone(),
                        target: t,
                    }
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Text with glossary terms replaced by placeholder tokens
#[derive(Debug, Clone)]
pub struct Protected {
    /// Text safe to hand to the provider
    pub text: String,
    /// Placeholder token paired with its target rendering
    pub placeholders: Vec<(String, String)>,
}

/// Either raw text still open to scanning, or a span already locked
/// behind a placeholder. Locked spans are never re-scanned, so a short
/// term can never match inside another term's placeholder.
enum Segment {
    Text(String),
    Locked(String),
}

fn next_placeholder() -> String {
    let n = PLACEHOLDER_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("GLOSSARY_TERM_{}", n)
}

/// Replace every occurrence of every glossary term with a unique
/// placeholder token. Terms are processed longest first so overlapping
/// terms resolve to the longer match.
pub fn protect(text: &str, glossary: &Glossary) -> Protected {
    if glossary.is_empty() || text.is_empty() {
        return Protected {
            text: text.to_string(),
            placeholders: Vec::new(),
        };
    }

    let mut terms: Vec<&GlossaryTerm> = glossary.terms.iter().filter(|t| !t.source.is_empty()).collect();
    terms.sort_by(|a, b| b.source.len().cmp(&a.source.len()));

    let mut segments = vec![Segment::Text(text.to_string())];
    let mut placeholders = Vec::new();

    for term in terms {
        let mut next_segments = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Locked(s) => next_segments.push(Segment::Locked(s)),
                Segment::Text(s) => {
                    let mut rest = s.as_str();
                    while let Some(pos) = rest.find(&term.source) {
                        if pos > 0 {
                            next_segments.push(Segment::Text(rest[..pos].to_string()));
                        }
                        let token = next_placeholder();
                        placeholders.push((token.clone(), term.target.clone()));
                        next_segments.push(Segment::Locked(token));
                        rest = &rest[pos + term.source.len()..];
                    }
                    if !rest.is_empty() {
                        next_segments.push(Segment::Text(rest.to_string()));
                    }
                }
            }
        }
        segments = next_segments;
    }

    let mut out = String::with_capacity(text.len());
    for segment in &segments {
        match segment {
            Segment::Text(s) | Segment::Locked(s) => out.push_str(s),
        }
    }

    Protected {
        text: out,
        placeholders,
    }
}

/// Substitute each placeholder token with its target rendering.
///
/// Tokens are numbered ascending within one `protect` call and a
/// lower-numbered token is a prefix of some higher-numbered ones
/// (`GLOSSARY_TERM_1` sits inside `GLOSSARY_TERM_10`), so substitution
/// runs in reverse: higher tokens are gone before a prefix can match.
pub fn restore(text: &str, placeholders: &[(String, String)]) -> String {
    let mut out = text.to_string();
    for (token, rendering) in placeholders.iter().rev() {
        out = out.replace(token, rendering);
    }
    out
}
