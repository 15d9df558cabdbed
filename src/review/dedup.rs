//! Folding of findings that point at the same clause.
//!
//! The extractor often reports overlapping quotes for one offending
//! paragraph; near-duplicates are merged before debate so each clause is
//! contested exactly once. Similarity is Jaccard over the character sets of
//! normalised quotes — crude, but quotes are short and the threshold is
//! deliberately high.

use std::collections::HashSet;

use super::types::Finding;

const QUOTE_SIMILARITY_THRESHOLD: f64 = 0.6;

pub fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    if findings.len() <= 1 {
        return findings;
    }

    let before = findings.len();
    let mut merged: Vec<Finding> = Vec::new();
    let mut consumed = vec![false; findings.len()];

    for i in 0..findings.len() {
        if consumed[i] {
            continue;
        }
        let mut keeper = findings[i].clone();

        for j in (i + 1)..findings.len() {
            if consumed[j] {
                continue;
            }
            let similarity = quote_similarity(&keeper.source_quote, &findings[j].source_quote);
            if similarity > QUOTE_SIMILARITY_THRESHOLD {
                tracing::debug!(similarity, "folding overlapping findings");
                keeper = merge_pair(keeper, findings[j].clone());
                consumed[j] = true;
            }
        }
        merged.push(keeper);
    }

    if merged.len() < before {
        tracing::info!(before, after = merged.len(), "overlapping findings folded");
    }
    merged
}

/// Merge two overlapping findings: the graver one survives with its
/// identity, absorbs the other description, and takes the shorter quote
/// (shorter quotes locate the clause more precisely).
fn merge_pair(a: Finding, b: Finding) -> Finding {
    let (mut keeper, absorbed) = if b.severity > a.severity { (b, a) } else { (a, b) };

    if !absorbed.description.is_empty() && absorbed.description != keeper.description {
        keeper.description = format!(
            "{}\n\nRelated finding: {}",
            keeper.description, absorbed.description
        );
    }
    if !absorbed.source_quote.is_empty()
        && absorbed.source_quote.chars().count() < keeper.source_quote.chars().count()
    {
        keeper.source_quote = absorbed.source_quote;
    }
    keeper
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn quote_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = normalize(a).chars().collect();
    let set_b: HashSet<char> = normalize(b).chars().collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::types::Severity;

    fn finding(id: &str, severity: Severity, quote: &str, description: &str) -> Finding {
        Finding {
            id: id.to_string(),
            severity,
            description: description.to_string(),
            source_quote: quote.to_string(),
            suggested_remedy: "fix it".to_string(),
            cited_rule: "rule".to_string(),
            precedent: None,
            defense: None,
            ruling: None,
            ruling_confidence: None,
        }
    }

    #[test]
    fn identical_quotes_are_folded_keeping_graver_severity() {
        let findings = vec![
            finding("a", Severity::Medium, "bidders must register locally", "first view"),
            finding("b", Severity::High, "bidders must register locally", "second view"),
        ];

        let merged = dedup_findings(findings);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "b");
        assert_eq!(merged[0].severity, Severity::High);
        assert!(merged[0].description.contains("Related finding: first view"));
    }

    #[test]
    fn distinct_quotes_are_untouched() {
        let findings = vec![
            finding("a", Severity::High, "bidders must register locally", "d1"),
            finding("b", Severity::Low, "tax rebate of 30% for firms above the revenue floor", "d2"),
        ];

        let merged = dedup_findings(findings);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn shorter_quote_wins_within_a_fold() {
        let findings = vec![
            finding(
                "a",
                Severity::High,
                "bidders must register locally before submitting any offer to the authority",
                "d1",
            ),
            finding("b", Severity::Low, "bidders must register locally", "d2"),
        ];

        let merged = dedup_findings(findings);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[0].source_quote, "bidders must register locally");
    }

    #[test]
    fn single_finding_passes_through() {
        let findings = vec![finding("a", Severity::Low, "quote", "d")];
        let merged = dedup_findings(findings);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a");
    }

    #[test]
    fn empty_quotes_never_match() {
        assert_eq!(quote_similarity("", ""), 0.0);
        assert_eq!(quote_similarity("abc", ""), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "restrict non-local enterprises";
        let b = "non-local enterprises restricted";
        assert!((quote_similarity(a, b) - quote_similarity(b, a)).abs() < 1e-9);
    }
}
