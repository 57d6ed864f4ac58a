//! Citation tracking.
//!
//! Answer text cites literature as `[PMID:<id>]` and structured records as
//! `[DATA:<entity>]`. A bracket may list several ids: `[PMID:1, PMID:2]` or
//! `[PMID:1, 2]`. Only ids present in the evidence handed to the tracker
//! survive; markers for anything else are removed from the text.

use neurocite_core::answer::CitedPaper;
use neurocite_core::evidence::{EvidenceChunk, StructuredFact};
use tracing::warn;

/// Text with verified citations.
#[derive(Debug, Clone, PartialEq)]
pub struct Citations {
    /// The text with unknown markers removed.
    pub text: String,
    /// Cited papers, first mention first, each once.
    pub papers: Vec<CitedPaper>,
    /// Entities of cited structured records, first mention first.
    pub data: Vec<String>,
}

/// Resolves citation markers against the evidence a text was written from.
pub struct CitationTracker<'a> {
    chunks: Vec<&'a EvidenceChunk>,
    facts: &'a [StructuredFact],
}

enum Marker<'t> {
    Pmids(Vec<&'t str>),
    Data(&'t str),
}

fn strip_prefix_ignore_case<'t>(s: &'t str, prefix: &str) -> Option<&'t str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn parse_marker(inner: &str) -> Option<Marker<'_>> {
    let inner = inner.trim();
    if let Some(rest) = strip_prefix_ignore_case(inner, "PMID:") {
        let ids = rest
            .split(',')
            .map(|part| {
                let part = part.trim();
                strip_prefix_ignore_case(part, "PMID:").unwrap_or(part).trim()
            })
            .filter(|id| !id.is_empty())
            .collect();
        return Some(Marker::Pmids(ids));
    }
    strip_prefix_ignore_case(inner, "DATA:").map(|entity| Marker::Data(entity.trim()))
}

impl<'a> CitationTracker<'a> {
    pub fn new(chunks: impl IntoIterator<Item = &'a EvidenceChunk>, facts: &'a [StructuredFact]) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            facts,
        }
    }

    fn chunk(&self, pmid: &str) -> Option<&'a EvidenceChunk> {
        self.chunks.iter().copied().find(|c| c.pmid == pmid)
    }

    fn fact(&self, entity: &str) -> Option<&'a StructuredFact> {
        self.facts.iter().find(|f| f.entity.eq_ignore_ascii_case(entity))
    }

    /// Scan `text`, keep markers that resolve and drop the rest.
    pub fn finalize(&self, text: &str) -> Citations {
        let mut out = String::with_capacity(text.len());
        let mut papers: Vec<CitedPaper> = Vec::new();
        let mut data: Vec<String> = Vec::new();
        let mut rest = text;

        while let Some(open) = rest.find('[') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find(']') else {
                out.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let inner = &after[..close];
            if let Some(nested) = inner.rfind('[') {
                // Rescan from the innermost bracket: "[see [PMID:1]]".
                let split = open + 1 + nested;
                out.push_str(&rest[open..split]);
                rest = &rest[split..];
                continue;
            }
            rest = &after[close + 1..];

            let rendered = match parse_marker(inner) {
                None => Some(format!("[{inner}]")),
                Some(Marker::Pmids(ids)) => {
                    let known: Vec<&str> = ids
                        .into_iter()
                        .filter(|id| match self.chunk(id) {
                            Some(chunk) => {
                                if !papers.iter().any(|p| p.pmid == chunk.pmid) {
                                    papers.push(CitedPaper {
                                        pmid: chunk.pmid.clone(),
                                        title: chunk.title.clone(),
                                    });
                                }
                                true
                            }
                            None => {
                                warn!(pmid = %id, "Dropping citation of a document not in the evidence");
                                false
                            }
                        })
                        .collect();
                    (!known.is_empty()).then(|| {
                        known
                            .iter()
                            .map(|id| format!("[PMID:{id}]"))
                            .collect::<String>()
                    })
                }
                Some(Marker::Data(entity)) => match self.fact(entity) {
                    Some(fact) => {
                        if !data.iter().any(|d| d.eq_ignore_ascii_case(&fact.entity)) {
                            data.push(fact.entity.clone());
                        }
                        Some(format!("[DATA:{}]", fact.entity))
                    }
                    None => {
                        warn!(entity, "Dropping citation of a record not in the evidence");
                        None
                    }
                },
            };

            match rendered {
                Some(marker) => out.push_str(&marker),
                None => {
                    // Avoid leaving "claim ." behind a removed marker.
                    let trimmed = out.trim_end_matches([' ', '\t']).len();
                    out.truncate(trimmed);
                }
            }
        }
        out.push_str(rest);

        Citations {
            text: out,
            papers,
            data,
        }
    }
}
