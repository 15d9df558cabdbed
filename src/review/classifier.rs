//! Screening classifier ("gatekeeper").
//!
//! First stage of the pipeline: one oracle call applying the three-test
//! elimination encoded in the screening prompt. The failure direction is
//! fixed — when anything goes wrong the document is routed INTO review
//! under a default category, so an infrastructure fault can never silently
//! skip a review.

use crate::oracle::GenerationOracle;
use crate::text_util::{strip_code_fence, truncate_at_boundary, SCREENING_EXCERPT};

use super::prompts::SCREENING_SYSTEM_PROMPT;
use super::types::{Category, Screening};

pub fn screen_document(
    oracle: &dyn GenerationOracle,
    document_label: &str,
    document_text: &str,
    model: &str,
) -> Screening {
    let summary = truncate_at_boundary(document_text, SCREENING_EXCERPT);
    let user = format!("Document label: {document_label}\nDocument summary:\n{summary}");

    let raw = match oracle.generate(SCREENING_SYSTEM_PROMPT, &user, true, model) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!("screening oracle returned no content");
            return fail_safe("the oracle returned no content");
        }
        Err(e) => {
            tracing::warn!(error = %e, "screening oracle call failed");
            return fail_safe("the oracle call failed");
        }
    };

    match serde_json::from_str::<Screening>(strip_code_fence(&raw)) {
        Ok(screening) => {
            tracing::info!(
                needs_review = screening.needs_review,
                category = screening.category.as_str(),
                "document screened"
            );
            screening
        }
        Err(e) => {
            tracing::warn!(error = %e, "screening reply was not valid JSON");
            fail_safe("the oracle reply was not valid JSON")
        }
    }
}

fn fail_safe(cause: &str) -> Screening {
    Screening {
        needs_review: true,
        category: Category::Policy,
        reason: format!("Screening degraded ({cause}); document routed to human review."),
    }
}
