//! Semantic keywords per node via TF-IDF over identifier tokens.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub const SCORE_THRESHOLD: f64 = 0.2;
pub const MAX_KEYWORDS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub token: String,
    pub score: f64,
}

/// Top keywords of every document, keyed by document id.
///
/// Uses raw term counts, smooth idf `ln((1 + n) / (1 + df)) + 1` and
/// l2-normalized vectors. Keeps at most [`MAX_KEYWORDS`] terms scoring above
/// [`SCORE_THRESHOLD`], by descending score then token.
pub fn keywords<'a>(
    documents: impl IntoIterator<Item = (&'a str, &'a [String])>,
) -> BTreeMap<String, Vec<Keyword>> {
    let documents: Vec<(&str, HashMap<&str, usize>)> = documents
        .into_iter()
        .map(|(id, tokens)| {
            let mut counts = HashMap::new();
            for token in tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            (id, counts)
        })
        .collect();

    let n = documents.len() as f64;
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for (_, counts) in &documents {
        for &token in counts.keys() {
            *document_frequency.entry(token).or_insert(0) += 1;
        }
    }

    documents
        .iter()
        .map(|(id, counts)| {
            let mut weights: Vec<(&str, f64)> = counts
                .iter()
                .map(|(&token, &count)| {
                    let df = document_frequency.get(token).copied().unwrap_or(0) as f64;
                    let idf = ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                    (token, count as f64 * idf)
                })
                .collect();
            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in &mut weights {
                    *w /= norm;
                }
            }
            weights.retain(|(_, w)| *w > SCORE_THRESHOLD);
            weights.sort_by(|(ta, wa), (tb, wb)| wb.total_cmp(wa).then_with(|| ta.cmp(tb)));
            weights.truncate(MAX_KEYWORDS);
            let top = weights
                .into_iter()
                .map(|(token, score)| Keyword {
                    token: token.to_string(),
                    score,
                })
                .collect();
            (id.to_string(), top)
        })
        .collect()
}
