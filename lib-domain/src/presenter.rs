use pd_dto::res::ComparisonResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityLabel {
    NearIdentical,
    MinorDifferences,
    NotableDifferences,
    SignificantDifferences,
}
impl SimilarityLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityLabel::NearIdentical => "near-identical",
            SimilarityLabel::MinorDifferences => "minor differences",
            SimilarityLabel::NotableDifferences => "notable differences",
            SimilarityLabel::SignificantDifferences => "significant differences",
        }
    }
}

impl std::fmt::Display for SimilarityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    Elevated,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub label: SimilarityLabel,
    pub severity: Severity,
}

/// Inclusive lower bounds, checked top-down
const THRESHOLDS: [(f64, SimilarityLabel, Severity); 3] = [
    (95.0, SimilarityLabel::NearIdentical, Severity::Low),
    (85.0, SimilarityLabel::MinorDifferences, Severity::Moderate),
    (70.0, SimilarityLabel::NotableDifferences, Severity::Elevated),
];

/// Classify a similarity percentage. Total: anything below every bound,
/// NaN included, is a significant difference.
pub fn classify(similarity_percentage: f64) -> Classification {
    THRESHOLDS
        .iter()
        .find(|(bound, ..)| similarity_percentage >= *bound)
        .map(|&(_, label, severity)| Classification {
            label,
            severity,
        })
        .unwrap_or(Classification {
            label: SimilarityLabel::SignificantDifferences,
            severity: Severity::High,
        })
}

/// Display figures of a finished comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub similarity_percentage: f64,
    /// Thousands, no decimals
    pub total_kilo_pixels: String,
    /// Thousands, one decimal
    pub different_kilo_pixels: String,
    pub classification: Classification,
    pub diff_filename: String,
}

pub fn summarize(result: &ComparisonResult) -> ResultSummary {
    ResultSummary {
        similarity_percentage: result.similarity_percentage,
        total_kilo_pixels: format!("{:.0}", result.total_pixels as f64 / 1000.0),
        different_kilo_pixels: format!("{:.1}", result.different_pixels as f64 / 1000.0),
        classification: classify(result.similarity_percentage),
        diff_filename: result.diff_filename.clone(),
    }
}
