//! Two-tier guidance assembly for the extractor.
//!
//! Tier one fetches the primary ruleset for the document's category. Tier
//! two shows the oracle a titles-only index of the expert Q&A corpus and
//! fetches the bodies of the 3-5 fragments it selects. Guidance is always
//! best-effort: every failure path collapses to an empty string so the
//! extractor still runs, just with weaker authority behind it.

use regex::Regex;

use crate::oracle::GenerationOracle;
use crate::review::types::Category;
use crate::text_util::{truncate_at_boundary, GUIDANCE_EXCERPT};

use super::{CorpusDoc, IndexEntry, KnowledgeStore};

/// Upper bound on oracle-selected fragments.
const MAX_SELECTED: usize = 5;

const SELECTION_SYSTEM_PROMPT: &str =
    "You are a precise retrieval assistant. Reply with a JSON array of numeric ids and nothing else.";

/// Assemble guidance text for a document. Never fails — an unreachable
/// corpus or an unusable selection yields an empty string.
pub fn load_guidance(
    oracle: &dyn GenerationOracle,
    store: &dyn KnowledgeStore,
    document_text: &str,
    category: Category,
    model: &str,
) -> String {
    let mut guidance = String::new();

    match store.fetch_primary(category) {
        Ok(Some(ruleset)) => {
            guidance.push_str(&format!(
                "PRIMARY RULESET — {}\n{}\n\n",
                ruleset.title, ruleset.body
            ));
        }
        Ok(None) => {
            tracing::debug!(category = ?category, "no primary ruleset for category");
        }
        Err(e) => {
            tracing::warn!(error = %e, "primary ruleset fetch failed; continuing without it");
        }
    }

    guidance.push_str(&select_expert_rules(oracle, store, document_text, model));
    guidance
}

/// Oracle-assisted selection over the Q&A fragment corpus.
fn select_expert_rules(
    oracle: &dyn GenerationOracle,
    store: &dyn KnowledgeStore,
    document_text: &str,
    model: &str,
) -> String {
    let index = match store.list_index() {
        Ok(index) if !index.is_empty() => index,
        Ok(_) => {
            tracing::debug!("expert Q&A corpus is empty");
            return String::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "expert Q&A index unavailable");
            return String::new();
        }
    };

    let prompt = build_selection_prompt(document_text, &index);
    let raw = match oracle.generate(SELECTION_SYSTEM_PROMPT, &prompt, true, model) {
        Ok(Some(raw)) => raw,
        Ok(None) => return String::new(),
        Err(e) => {
            tracing::warn!(error = %e, "expert rule selection failed");
            return String::new();
        }
    };

    let mut ids = parse_selected_ids(&raw);
    ids.truncate(MAX_SELECTED);
    if ids.is_empty() {
        tracing::debug!("oracle selected no relevant expert rules");
        return String::new();
    }

    let selected = match store.fetch_by_ids(&ids) {
        Ok(selected) if !selected.is_empty() => selected,
        Ok(_) => return String::new(),
        Err(e) => {
            tracing::warn!(error = %e, "selected expert rules could not be fetched");
            return String::new();
        }
    };

    tracing::info!(selected = selected.len(), "expert rules loaded");
    format_expert_rules(&selected)
}

fn build_selection_prompt(document_text: &str, index: &[IndexEntry]) -> String {
    let summary = truncate_at_boundary(document_text, GUIDANCE_EXCERPT);
    let listing: String = index
        .iter()
        .map(|entry| format!("[ID:{}] {}\n", entry.id, entry.title))
        .collect();

    format!(
        r#"A government document is under fair-competition review. Summary of its content:

"""
{summary}
"""

The knowledge base holds these authoritative review rulings (Q&A):
{listing}
Which of these rulings could apply to the document? Select the 3-5 most
relevant question ids. If none apply, select none.

Reply with a JSON array of numeric ids, e.g. [129, 135, 140]. No other text."#
    )
}

/// Parse the selection reply; a malformed array is salvaged by scraping
/// digit runs before giving up.
fn parse_selected_ids(raw: &str) -> Vec<u64> {
    let stripped = crate::text_util::strip_code_fence(raw);

    if let Ok(ids) = serde_json::from_str::<Vec<u64>>(stripped) {
        return ids;
    }

    let digits = Regex::new(r"\d+").expect("static pattern");
    digits
        .find_iter(stripped)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn format_expert_rules(selected: &[CorpusDoc]) -> String {
    let mut text = String::from(
        "AUTHORITATIVE REVIEW RULINGS (highest priority — apply strictly):\n",
    );
    for (idx, doc) in selected.iter().enumerate() {
        text.push_str(&format!("\n[Rule {}] {}\n", idx + 1, doc.title));
        text.push_str(&format!("Official standard: {}\n", doc.body));
    }
    text.push_str(
        "\n(These rulings come from the supervising authority's published \
         practice and take precedence; content that violates one of them is a \
         violation outright.)\n",
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::InMemoryKnowledgeStore;
    use crate::oracle::MockOracle;

    fn populated_store() -> InMemoryKnowledgeStore {
        let mut store = InMemoryKnowledgeStore::new();
        store.set_primary(
            Category::Bidding,
            CorpusDoc {
                id: 1,
                title: "Bidding ruleset".into(),
                body: "Tenders must not restrict non-local bidders.".into(),
            },
        );
        for id in 10..14 {
            store.add_fragment(CorpusDoc {
                id,
                title: format!("Ruling question {id}"),
                body: format!("Ruling answer {id}"),
            });
        }
        store
    }

    #[test]
    fn guidance_includes_primary_and_selected_rules() {
        let store = populated_store();
        let oracle = MockOracle::new().respond_with("[10, 12]");

        let guidance = load_guidance(&oracle, &store, "tender notice text", Category::Bidding, "m");

        assert!(guidance.contains("PRIMARY RULESET"));
        assert!(guidance.contains("Bidding ruleset"));
        assert!(guidance.contains("Ruling question 10"));
        assert!(guidance.contains("Ruling question 12"));
        assert!(!guidance.contains("Ruling question 11"));
    }

    #[test]
    fn empty_corpus_yields_empty_guidance_without_oracle_calls() {
        let store = InMemoryKnowledgeStore::new();
        let oracle = MockOracle::new();

        let guidance = load_guidance(&oracle, &store, "any text", Category::Policy, "m");

        assert!(guidance.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn oracle_failure_degrades_to_primary_only() {
        let store = populated_store();
        let oracle = MockOracle::new().fail_next();

        let guidance = load_guidance(&oracle, &store, "text", Category::Bidding, "m");

        assert!(guidance.contains("PRIMARY RULESET"));
        assert!(!guidance.contains("AUTHORITATIVE REVIEW RULINGS"));
    }

    #[test]
    fn malformed_selection_is_salvaged_by_digit_scrape() {
        let store = populated_store();
        let oracle = MockOracle::new().respond_with("The relevant ids are 11 and 13.");

        let guidance = load_guidance(&oracle, &store, "text", Category::Bidding, "m");

        assert!(guidance.contains("Ruling question 11"));
        assert!(guidance.contains("Ruling question 13"));
    }

    #[test]
    fn selection_is_capped_at_five() {
        let mut store = InMemoryKnowledgeStore::new();
        for id in 1..=10 {
            store.add_fragment(CorpusDoc {
                id,
                title: format!("Q{id}"),
                body: format!("A{id}"),
            });
        }
        let oracle = MockOracle::new().respond_with("[1,2,3,4,5,6,7,8]");

        let guidance = load_guidance(&oracle, &store, "text", Category::Policy, "m");

        assert!(guidance.contains("[Rule 5]"));
        assert!(!guidance.contains("[Rule 6]"));
    }

    #[test]
    fn empty_selection_yields_empty_guidance() {
        let store = {
            let mut s = InMemoryKnowledgeStore::new();
            s.add_fragment(CorpusDoc {
                id: 7,
                title: "Q7".into(),
                body: "A7".into(),
            });
            s
        };
        let oracle = MockOracle::new().respond_with("[]");

        let guidance = load_guidance(&oracle, &store, "text", Category::Policy, "m");
        assert!(guidance.is_empty());
    }

    #[test]
    fn selection_prompt_shows_titles_not_bodies() {
        let index = vec![IndexEntry {
            id: 3,
            title: "Visible title".into(),
        }];
        let prompt = build_selection_prompt("summary", &index);
        assert!(prompt.contains("[ID:3] Visible title"));
        assert!(prompt.contains("summary"));
    }
}
