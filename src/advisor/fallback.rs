//! Canned fallback answers.
//!
//! The last degradation tier: no embedding, no store, no LLM. A naive
//! keyword match on the raw question selects a pre-written answer so the
//! user still gets something useful when every provider is down. Callers
//! must surface these as fallback content, never as grounded answers.

use super::SourceRef;

/// A pre-written answer with the evidence notes it was written from.
#[derive(Debug, Clone, PartialEq)]
pub struct CannedAnswer {
    pub answer: &'static str,
    pub sources: &'static [(&'static str, f32)],
}

struct CannedEntry {
    keywords: &'static [&'static str],
    answer: CannedAnswer,
}

const CANNED_ENTRIES: &[CannedEntry] = &[
    CannedEntry {
        keywords: &["oily", "shine", "greasy"],
        answer: CannedAnswer {
            answer: "For oily skin, use a gentle foaming cleanser with salicylic acid, \
                     followed by a lightweight, oil-free moisturizer. Niacinamide helps \
                     regulate oil production and minimize the look of pores, so a 10% \
                     niacinamide serum is a good addition to your routine.",
            sources: &[
                ("Salicylic acid helps unclog pores and reduce oil production", 0.89),
                ("Niacinamide regulates sebum production and minimizes pores", 0.87),
            ],
        },
    },
    CannedEntry {
        keywords: &["sensitive", "red", "irritat"],
        answer: CannedAnswer {
            answer: "For sensitive skin that gets red easily, focus on gentle, \
                     fragrance-free products. Look for ingredients like ceramides, \
                     hyaluronic acid, and colloidal oatmeal, and avoid alcohol, strong \
                     fragrances, or harsh acids until your skin barrier recovers.",
            sources: &[
                ("Ceramides help restore and maintain the skin barrier", 0.92),
                ("Fragrance-free formulas reduce irritation risk", 0.85),
            ],
        },
    },
    CannedEntry {
        keywords: &["aging", "wrinkle", "anti-aging", "fine line"],
        answer: CannedAnswer {
            answer: "For anti-aging and wrinkle prevention, build a routine around \
                     retinoids, vitamin C, and peptides. Start with a low-strength \
                     retinol a few nights a week, use a vitamin C serum in the morning, \
                     and apply a broad-spectrum SPF 30+ sunscreen every day. Hyaluronic \
                     acid helps plump fine lines in the meantime.",
            sources: &[
                ("Retinoids boost collagen production and reduce fine lines", 0.94),
                ("Vitamin C protects against environmental damage", 0.88),
            ],
        },
    },
    CannedEntry {
        keywords: &["dry", "flaky", "tight"],
        answer: CannedAnswer {
            answer: "For very dry skin, use a cream-based cleanser and rich moisturizers \
                     with ceramides, glycerin, and hyaluronic acid. Apply moisturizer to \
                     damp skin to lock in hydration, and avoid hot water and harsh \
                     cleansers that strip your natural oils.",
            sources: &[
                ("Ceramides and glycerin provide long-lasting hydration", 0.91),
                ("Applying moisturizer to damp skin increases effectiveness", 0.86),
            ],
        },
    },
];

const DEFAULT_ANSWER: CannedAnswer = CannedAnswer {
    answer: "I'd be happy to help you with your skincare concerns! Could you tell me \
             more about your specific skin type or the issues you're experiencing? For \
             example, do you have oily, dry, sensitive, or combination skin?",
    sources: &[],
};

/// Pick a canned answer by naive keyword match on the raw question.
/// Entries are checked in order; the first keyword hit wins.
#[inline]
pub fn canned_answer(question: &str) -> CannedAnswer {
    let question = question.to_lowercase();

    CANNED_ENTRIES
        .iter()
        .find(|entry| entry.keywords.iter().any(|kw| question.contains(kw)))
        .map_or(DEFAULT_ANSWER, |entry| entry.answer.clone())
}

impl CannedAnswer {
    /// Evidence notes as source references for the response payload.
    #[inline]
    pub fn source_refs(&self) -> Vec<SourceRef> {
        self.sources
            .iter()
            .map(|(label, similarity)| SourceRef {
                label: (*label).to_string(),
                similarity: *similarity,
            })
            .collect()
    }
}
