//! Shared text truncation and windowing utilities.
//!
//! Every stage sees a different slice of the document: the screening
//! classifier only needs the opening to judge scope, the extractor needs as
//! much as the context window allows, the debate needs enough surrounding
//! text to locate exemption clauses. The budgets live here so the stages
//! stay consistent.

/// Excerpt budget for the screening classifier, in characters.
pub const SCREENING_EXCERPT: usize = 2_000;
/// Excerpt budget for the risk extractor.
pub const EXTRACTION_EXCERPT: usize = 15_000;
/// Excerpt budget for the defender during debate.
pub const DEBATE_EXCERPT: usize = 5_000;
/// Summary budget shown to the knowledge loader's selection step.
pub const GUIDANCE_EXCERPT: usize = 3_000;

/// Truncate to at most `max_chars` characters, preferring to end on a
/// sentence or line break when one falls in the back half of the cut.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();

    match cut.rfind(|c| matches!(c, '.' | '!' | '?' | '\n')) {
        Some(pos) if pos + 1 >= cut.len() / 2 => cut[..pos + 1].to_string(),
        _ => cut,
    }
}

/// Fixed-size overlapping windows over the document, used to drive retrieval
/// across the full text. Tail windows shorter than 100 characters are
/// dropped.
pub fn sliding_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
    const MIN_WINDOW: usize = 100;

    let chars: Vec<char> = text.chars().collect();
    let step = window.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        if end - start < MIN_WINDOW {
            break;
        }
        windows.push(chars[start..end].iter().collect());
        start += step;
    }

    windows
}

/// Strip a ``` fenced block if the model wrapped its output in one.
/// Returns the input unchanged when no fence is present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}
