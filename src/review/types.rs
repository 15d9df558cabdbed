use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review category assigned by the screening classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Industry support, subsidies, market access, pricing measures.
    Policy,
    /// Tender documents, procurement notices, scoring methods.
    Bidding,
    /// Government-enterprise investment or cooperation agreements.
    Agreement,
    /// Outside review scope.
    Ignore,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Policy => "POLICY",
            Category::Bidding => "BIDDING",
            Category::Agreement => "AGREEMENT",
            Category::Ignore => "IGNORE",
        }
    }
}

/// Finding severity. Ordered so that `max` picks the graver of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Screening decision from the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screening {
    pub needs_review: bool,
    pub category: Category,
    pub reason: String,
}

/// One compliance-risk finding.
///
/// Identity is assigned by the extractor and survives adjudication; the
/// Judge may replace severity, description and suggested remedy but never
/// the id or the source quote. The trailing optional fields are filled in
/// by the debate for findings that were argued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    pub source_quote: String,
    pub suggested_remedy: String,
    pub cited_rule: String,
    #[serde(default)]
    pub precedent: Option<String>,
    #[serde(default)]
    pub defense: Option<String>,
    #[serde(default)]
    pub ruling: Option<String>,
    #[serde(default)]
    pub ruling_confidence: Option<u8>,
}

/// Defender output: either a substantive argument or an explicit signal
/// that no mitigating argument exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defense {
    Argument(String),
    NoArgument,
}

/// Judge decision over a contested finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Maintain,
    Downgrade,
    Dismiss,
}

/// Field replacements accompanying a MAINTAIN or DOWNGRADE ruling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevisedFinding {
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggested_remedy: Option<String>,
}

/// Adjudicated verdict for one finding. Produced once, consumed immediately.
#[derive(Debug, Clone)]
pub struct DebateVerdict {
    pub decision: Decision,
    pub confidence: u8,
    pub ruling: Option<String>,
    pub revised: Option<RevisedFinding>,
}

/// Alert level for systemic-risk warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    High,
    Medium,
}

/// Cross-cutting systemic-risk alert from the radar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarAlert {
    pub level: AlertLevel,
    pub title: String,
    pub description: String,
}

/// What the hosting workflow receives: the validated findings and, when the
/// radar fired, a single systemic alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub findings: Vec<Finding>,
    pub meta_alert: Option<RadarAlert>,
}

/// Result of the full screening-to-debate flow.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub screening: Screening,
    pub guidance_used: bool,
    pub outcome: ReviewOutcome,
    pub reviewed_at: DateTime<Utc>,
}
