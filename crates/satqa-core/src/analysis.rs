use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Verdict for a single category of image-quality issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Whether this specific issue is present.
    pub detected: bool,
    /// Confidence score between 0.0 and 1.0.
    pub confidence: f64,
    /// A concise explanation of the visual evidence found.
    pub reason: String,
}

/// The four-category verdict returned by the Inspection Service.
///
/// Field names are the wire keys; the model is constrained to produce exactly
/// this shape, so nothing here repairs or defaults missing categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub has_clouds: Assessment,
    pub has_snow: Assessment,
    pub has_color_issues: Assessment,
    pub has_other_issues: Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    Clouds,
    Snow,
    ColorIssues,
    OtherIssues,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 4] = [
        IssueCategory::Clouds,
        IssueCategory::Snow,
        IssueCategory::ColorIssues,
        IssueCategory::OtherIssues,
    ];

    /// JSON key of this category inside an [`AnalysisResult`].
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            IssueCategory::Clouds => "has_clouds",
            IssueCategory::Snow => "has_snow",
            IssueCategory::ColorIssues => "has_color_issues",
            IssueCategory::OtherIssues => "has_other_issues",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            IssueCategory::Clouds => "clouds",
            IssueCategory::Snow => "snow",
            IssueCategory::ColorIssues => "color issues",
            IssueCategory::OtherIssues => "other issues",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl AnalysisResult {
    #[must_use]
    pub fn get(&self, category: IssueCategory) -> &Assessment {
        match category {
            IssueCategory::Clouds => &self.has_clouds,
            IssueCategory::Snow => &self.has_snow,
            IssueCategory::ColorIssues => &self.has_color_issues,
            IssueCategory::OtherIssues => &self.has_other_issues,
        }
    }

    /// Iterates the assessments in the fixed category order.
    pub fn assessments(&self) -> impl Iterator<Item = (IssueCategory, &Assessment)> {
        IssueCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Categories the model flagged as present.
    #[must_use]
    pub fn detected(&self) -> Vec<IssueCategory> {
        self.assessments()
            .filter(|(_, a)| a.detected)
            .map(|(c, _)| c)
            .collect()
    }

    /// Range-checks every confidence score.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfidenceOutOfRange`] for the first category whose
    /// confidence is not a finite value in `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (category, assessment) in self.assessments() {
            let value = assessment.confidence;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(CoreError::ConfidenceOutOfRange { category, value });
            }
        }
        Ok(())
    }
}
