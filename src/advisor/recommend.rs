//! Recommendation composition.
//!
//! Maps named skin concerns to one synthetic query string, retrieves the
//! closest products, and formats them for display. A single combined
//! embedding deliberately trades per-concern precision for one provider
//! call instead of N.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;

use crate::retrieval::RankedResult;

/// Expanded descriptions for the concerns the advisor knows well. Lookup
/// is case-insensitive; unknown concerns pass through verbatim.
const CONCERN_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "acne",
        "products for acne-prone skin, treating breakouts and preventing new acne",
    ),
    (
        "blackheads",
        "products that unclog pores and remove blackheads",
    ),
    (
        "dark spots",
        "products for hyperpigmentation and evening skin tone",
    ),
    (
        "wrinkles",
        "anti-aging products that reduce fine lines and wrinkles",
    ),
    (
        "redness",
        "products that calm and soothe irritated, red skin",
    ),
    (
        "sensitivity",
        "gentle products for sensitive skin that won't cause irritation",
    ),
];

/// Expand a list of concerns into one space-joined query string.
///
/// Known concerns are replaced by their descriptive phrase; unknown ones
/// are kept verbatim so they still contribute to the embedding.
#[inline]
pub fn expand_concerns(concerns: &[String]) -> String {
    let phrases: Vec<&str> = concerns
        .iter()
        .map(|concern| {
            let key = concern.trim();
            CONCERN_DESCRIPTIONS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map_or(key, |(_, description)| *description)
        })
        .filter(|phrase| !phrase.is_empty())
        .collect();

    phrases.join(" ")
}

/// Format a price for display, two decimals, dollar-prefixed.
#[inline]
pub fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

/// One formatted product recommendation. Display fields missing from the
/// payload stay `None` and their line is omitted, not errored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub product_id: i64,
    pub name: String,
    pub similarity: f32,
    pub key_benefits: Option<String>,
    pub active_ingredients: Option<String>,
    pub usage: Option<String>,
    pub price: Option<String>,
}

/// What a recommendation request produced. `NoMatches` means the search
/// ran and found nothing; `Unavailable` means the search could not run.
/// The two must never be conflated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Matches {
        products: Vec<ProductRecommendation>,
    },
    NoMatches,
    Unavailable {
        reason: String,
    },
}

/// A composed recommendation payload for a set of concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    pub concerns: Vec<String>,
    pub query: String,
    pub outcome: RecommendationOutcome,
}

const NO_MATCHES_MESSAGE: &str =
    "I couldn't find specific products matching your skin concerns in our database.";
const UNAVAILABLE_MESSAGE: &str =
    "I apologize, but I couldn't access the product database at the moment.";

impl ProductRecommendation {
    /// Build a formatted recommendation from a ranked product result.
    #[inline]
    pub fn from_result(result: &RankedResult) -> Self {
        let payload = &result.payload;

        Self {
            product_id: result.item_id,
            name: result.name.clone(),
            similarity: result.similarity,
            key_benefits: display_field(payload, "keyBenefits"),
            active_ingredients: display_field(payload, "activeContent"),
            usage: display_field(payload, "howToUse"),
            price: payload
                .get("price")
                .and_then(Value::as_f64)
                .map(format_price),
        }
    }
}

impl RecommendationPayload {
    #[inline]
    pub fn from_results(concerns: Vec<String>, query: String, results: &[RankedResult]) -> Self {
        let outcome = if results.is_empty() {
            RecommendationOutcome::NoMatches
        } else {
            RecommendationOutcome::Matches {
                products: results.iter().map(ProductRecommendation::from_result).collect(),
            }
        };

        debug!(
            "Composed recommendation for {:?}: {} result(s)",
            concerns,
            results.len()
        );

        Self {
            concerns,
            query,
            outcome,
        }
    }

    #[inline]
    pub fn unavailable(concerns: Vec<String>, query: String, reason: String) -> Self {
        Self {
            concerns,
            query,
            outcome: RecommendationOutcome::Unavailable { reason },
        }
    }

    /// Render the payload as conversational text.
    #[inline]
    pub fn render(&self) -> String {
        match &self.outcome {
            RecommendationOutcome::Unavailable { .. } => UNAVAILABLE_MESSAGE.to_string(),
            RecommendationOutcome::NoMatches => NO_MATCHES_MESSAGE.to_string(),
            RecommendationOutcome::Matches { products } => {
                let mut text =
                    String::from("Based on your skin concerns, here are some recommended products:\n\n");

                for (i, product) in products.iter().enumerate() {
                    let _ = writeln!(text, "{}. {}", i + 1, product.name);
                    if let Some(benefits) = &product.key_benefits {
                        let _ = writeln!(text, "   Key Benefits: {}", benefits);
                    }
                    if let Some(ingredients) = &product.active_ingredients {
                        let _ = writeln!(text, "   Active Ingredients: {}", ingredients);
                    }
                    if let Some(usage) = &product.usage {
                        let _ = writeln!(text, "   How to Use: {}", usage);
                    }
                    if let Some(price) = &product.price {
                        let _ = writeln!(text, "   Price: {}", price);
                    }
                    text.push('\n');
                }

                text.trim_end().to_string()
            }
        }
    }
}

/// Pull a display field out of a payload, joining arrays with commas.
/// Empty strings count as missing.
fn display_field(payload: &Value, field: &str) -> Option<String> {
    match payload.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Array(items) => {
            let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if joined.is_empty() {
                None
            } else {
                Some(joined.join(", "))
            }
        }
        _ => None,
    }
}
