//! Risk extractor ("auditor").
//!
//! Drives retrieval over sliding-window fragments of the document, folds the
//! retrieved precedents and rules into one extraction prompt, and parses the
//! oracle's reply into typed findings. Parsing is lenient element-by-element
//! and fail-open overall: a malformed element is dropped, a malformed reply
//! yields an empty finding list, and retrieval trouble only costs
//! evidentiary support, never the extraction itself.

use serde::Deserialize;
use uuid::Uuid;

use crate::oracle::GenerationOracle;
use crate::retrieval::agent::RetrievalAgent;
use crate::retrieval::store::{ScoredCandidate, SimilaritySearch};
use crate::text_util::{
    sliding_windows, strip_code_fence, truncate_at_boundary, EXTRACTION_EXCERPT,
};

use super::prompts::build_extraction_prompt;
use super::types::{Category, Finding, Severity};

/// Window geometry for retrieval fragments.
const FRAGMENT_WINDOW: usize = 1_000;
const FRAGMENT_OVERLAP: usize = 200;
/// Fragments scanned per document — bounds the retrieval fan-out.
const MAX_FRAGMENTS: usize = 5;
/// Context caps inside the prompt.
const MAX_PRECEDENTS_IN_PROMPT: usize = 5;
const MAX_RULES_IN_PROMPT: usize = 3;

#[allow(clippy::too_many_arguments)]
pub fn extract_findings(
    oracle: &dyn GenerationOracle,
    agent: &RetrievalAgent<'_>,
    precedents: &dyn SimilaritySearch,
    rules: &dyn SimilaritySearch,
    category: Category,
    document_text: &str,
    guidance: &str,
    model: &str,
) -> Vec<Finding> {
    let fragments: Vec<String> = sliding_windows(document_text, FRAGMENT_WINDOW, FRAGMENT_OVERLAP)
        .into_iter()
        .take(MAX_FRAGMENTS)
        .collect();

    let precedent_hits = agent
        .batch_retrieval_for_risks(&fragments, precedents)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "precedent retrieval degraded; extracting without precedents");
            Vec::new()
        });
    let rule_hits = agent
        .batch_retrieval_for_risks(&fragments, rules)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "rule retrieval degraded; extracting without rule context");
            Vec::new()
        });

    tracing::info!(
        fragments = fragments.len(),
        precedents = precedent_hits.len(),
        rules = rule_hits.len(),
        "extraction context assembled"
    );

    let system = build_extraction_prompt(
        category,
        guidance,
        &format_precedents(&precedent_hits[..precedent_hits.len().min(MAX_PRECEDENTS_IN_PROMPT)]),
        &format_rules(&rule_hits[..rule_hits.len().min(MAX_RULES_IN_PROMPT)]),
    );
    let excerpt = truncate_at_boundary(document_text, EXTRACTION_EXCERPT);
    let user = format!("Document content:\n{excerpt}");

    let raw = match oracle.generate(&system, &user, true, model) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!("extraction oracle returned no content; no findings produced");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "extraction oracle call failed; no findings produced");
            return Vec::new();
        }
    };

    let findings = parse_findings(&raw);
    tracing::info!(count = findings.len(), "findings extracted");
    findings
}

/// Shape the oracle is asked for. Unknown fields (including any id the
/// oracle invents) are ignored.
#[derive(Deserialize)]
struct RawFinding {
    severity: Option<Severity>,
    #[serde(default)]
    description: Option<String>,
    source_quote: Option<String>,
    #[serde(default)]
    suggested_remedy: Option<String>,
    cited_rule: Option<String>,
    #[serde(default)]
    precedent: Option<String>,
}

/// Parse the extraction reply. Elements failing validation are dropped
/// individually; a reply that is not an array at all yields an empty list.
fn parse_findings(raw: &str) -> Vec<Finding> {
    let stripped = strip_code_fence(raw);

    let elements = match serde_json::from_str::<serde_json::Value>(stripped) {
        Ok(serde_json::Value::Array(elements)) => elements,
        // Some providers force an object at the top level in JSON mode;
        // accept a single wrapped array.
        Ok(serde_json::Value::Object(map)) => match map.into_iter().find_map(|(_, v)| match v {
            serde_json::Value::Array(elements) => Some(elements),
            _ => None,
        }) {
            Some(elements) => elements,
            None => {
                tracing::warn!("extraction reply held no array; no findings produced");
                return Vec::new();
            }
        },
        _ => {
            tracing::warn!("extraction reply was not valid JSON; no findings produced");
            return Vec::new();
        }
    };

    let total = elements.len();
    let findings: Vec<Finding> = elements.into_iter().filter_map(parse_one).collect();
    if findings.len() < total {
        tracing::warn!(
            dropped = total - findings.len(),
            "malformed finding elements dropped"
        );
    }
    findings
}

fn parse_one(value: serde_json::Value) -> Option<Finding> {
    let raw: RawFinding = serde_json::from_value(value).ok()?;
    let severity = raw.severity?;
    let source_quote = raw.source_quote.filter(|quote| !quote.trim().is_empty())?;
    let cited_rule = raw.cited_rule.filter(|rule| !rule.trim().is_empty())?;

    Some(Finding {
        // identity is ours, never the oracle's
        id: Uuid::new_v4().to_string(),
        severity,
        description: raw.description.unwrap_or_default(),
        source_quote,
        suggested_remedy: raw.suggested_remedy.unwrap_or_default(),
        cited_rule,
        precedent: raw.precedent.filter(|p| !p.trim().is_empty()),
        defense: None,
        ruling: None,
        ruling_confidence: None,
    })
}

fn format_precedents(hits: &[ScoredCandidate]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut context = String::from(
        "Historical violation precedents (compare the substance of the \
         violation, not the surface wording):\n",
    );
    for (idx, hit) in hits.iter().enumerate() {
        context.push_str(&format!(
            "{}. [{}] {}\n",
            idx + 1,
            hit.doc.tag.as_deref().unwrap_or("uncategorised"),
            hit.doc.title
        ));
        context.push_str(&format!(
            "   Facts: {}\n",
            truncate_at_boundary(&hit.doc.body, 300)
        ));
        if let Some(detail) = &hit.doc.detail {
            context.push_str(&format!("   Violating element: {detail}\n"));
        }
        if let Some(outcome) = &hit.doc.outcome {
            context.push_str(&format!("   Outcome: {outcome}\n"));
        }
    }
    context
}

fn format_rules(hits: &[ScoredCandidate]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut context = String::from(
        "Applicable rules (cite the specific article in cited_rule):\n",
    );
    for (idx, hit) in hits.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", idx + 1, hit.doc.title));
        context.push_str(&format!(
            "   Text: {}\n",
            truncate_at_boundary(&hit.doc.body, 1_000)
        ));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;
    use crate::retrieval::config::RetrievalConfig;
    use crate::retrieval::store::{CandidateDoc, Embedder, InMemorySimilarityStore};
    use crate::retrieval::RetrievalError;

    struct FixedEmbedder;

    impl Embedder for FixedEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    fn candidate(id: &str, title: &str) -> ScoredCandidate {
        ScoredCandidate {
            doc: CandidateDoc {
                id: id.to_string(),
                title: title.to_string(),
                body: "case facts".to_string(),
                tag: Some("geographic restriction".to_string()),
                outcome: Some("ordered corrected".to_string()),
                detail: None,
            },
            score: 0.8,
            matched_query: None,
            source_fragment: None,
        }
    }

    #[test]
    fn parse_keeps_valid_elements_and_drops_malformed() {
        let raw = r#"[
            {"severity": "High", "description": "geographic restriction",
             "source_quote": "bidders must hold local business registration",
             "suggested_remedy": "delete the clause",
             "cited_rule": "Review Regulation art. 10"},
            {"severity": "Critical", "description": "bad severity",
             "source_quote": "q", "cited_rule": "r"},
            {"severity": "Low", "description": "missing quote",
             "source_quote": "", "cited_rule": "r"},
            {"severity": "Medium", "description": "missing rule",
             "source_quote": "some quote"}
        ]"#;

        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].source_quote.contains("local business registration"));
    }

    #[test]
    fn parse_total_failure_yields_empty() {
        assert!(parse_findings("I found three problems with the document.").is_empty());
        assert!(parse_findings("{\"not\": \"an array\"}").is_empty());
    }

    #[test]
    fn parse_accepts_wrapped_array() {
        let raw = r#"{"findings": [
            {"severity": "Low", "description": "d", "source_quote": "q",
             "suggested_remedy": "s", "cited_rule": "r"}
        ]}"#;
        assert_eq!(parse_findings(raw).len(), 1);
    }

    #[test]
    fn parse_assigns_fresh_identity_ignoring_oracle_ids() {
        let raw = r#"[
            {"id": "risk_1", "severity": "High", "description": "d",
             "source_quote": "q", "cited_rule": "r"},
            {"id": "risk_1", "severity": "High", "description": "d2",
             "source_quote": "q2", "cited_rule": "r2"}
        ]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 2);
        assert_ne!(findings[0].id, "risk_1");
        assert_ne!(findings[0].id, findings[1].id);
    }

    #[test]
    fn extraction_produces_high_finding_for_local_registration_clause() {
        // Scenario: a procurement notice requiring local registration yields
        // at least one High finding quoting the offending clause.
        let clause = "bidders must hold local business registration";
        let oracle = MockOracle::new().respond_when(
            "compliance auditor",
            &format!(
                r#"[{{"severity": "High",
                     "description": "Geographic restriction: the tender excludes non-local bidders",
                     "source_quote": "{clause}",
                     "suggested_remedy": "remove the registration requirement",
                     "cited_rule": "Fair Competition Review Regulation art. 10"}}]"#
            ),
        );
        let embedder = FixedEmbedder;
        let agent = RetrievalAgent::new(RetrievalConfig::default(), &oracle, &embedder, "m");
        let precedents = InMemorySimilarityStore::new();
        let rules = InMemorySimilarityStore::new();

        let document = format!(
            "Tender notice: {clause} within the municipality before submitting offers."
        );
        let findings = extract_findings(
            &oracle,
            &agent,
            &precedents,
            &rules,
            Category::Bidding,
            &document,
            "",
            "m",
        );

        assert!(!findings.is_empty());
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].source_quote.contains(clause));
    }

    #[test]
    fn oracle_failure_fails_open_to_no_findings() {
        let oracle = MockOracle::new().fail_when("compliance auditor");
        let embedder = FixedEmbedder;
        let agent = RetrievalAgent::new(RetrievalConfig::default(), &oracle, &embedder, "m");
        let precedents = InMemorySimilarityStore::new();
        let rules = InMemorySimilarityStore::new();

        let findings = extract_findings(
            &oracle,
            &agent,
            &precedents,
            &rules,
            Category::Policy,
            "short document",
            "",
            "m",
        );

        assert!(findings.is_empty());
    }

    #[test]
    fn short_document_skips_retrieval_entirely() {
        let oracle = MockOracle::new().respond_when("compliance auditor", "[]");
        let embedder = FixedEmbedder;
        let agent = RetrievalAgent::new(RetrievalConfig::default(), &oracle, &embedder, "m");
        let precedents = InMemorySimilarityStore::new();
        let rules = InMemorySimilarityStore::new();

        extract_findings(
            &oracle,
            &agent,
            &precedents,
            &rules,
            Category::Policy,
            "under one hundred characters",
            "",
            "m",
        );

        // only the extraction call itself — no rewrite calls were made
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn precedent_context_carries_tag_and_outcome() {
        let context = format_precedents(&[candidate("c1", "Earlier tender case")]);
        assert!(context.contains("[geographic restriction] Earlier tender case"));
        assert!(context.contains("Outcome: ordered corrected"));
    }

    #[test]
    fn empty_hits_produce_empty_context() {
        assert!(format_precedents(&[]).is_empty());
        assert!(format_rules(&[]).is_empty());
    }
}
