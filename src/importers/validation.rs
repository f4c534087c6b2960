//! Record-level validation issues
//!
//! Problems found while extracting rows are collected instead of failing
//! the batch, so an import reports every skipped row and mismatched value
//! in one pass.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Row dropped: no identifying key after merge
    MissingRequiredField,
    /// Value kept as text: it did not match the configured date format
    DateFormatMismatch,
    /// CNPJ kept, but it is not 14 (or 11 for CPF) digits
    SuspiciousCnpj,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingRequiredField => "missing_required_field",
            IssueKind::DateFormatMismatch => "date_format_mismatch",
            IssueKind::SuspiciousCnpj => "suspicious_cnpj",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation issue found during extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Row number in the source sheet (1-indexed for user display)
    pub row: usize,
    pub kind: IssueKind,
    pub field: String,
    pub value: String,
    pub reason: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        row: usize,
        kind: IssueKind,
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            row,
            kind,
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Issue for a recoverable pipeline error; structural errors return None.
    pub fn from_error(row: usize, err: &PipelineError) -> Option<Self> {
        match err {
            PipelineError::MissingRequiredField { field, .. } => Some(
                Self::new(
                    row,
                    IssueKind::MissingRequiredField,
                    field.as_str(),
                    "",
                    err.to_string(),
                )
                .with_suggestion(format!("Fill '{}' in the source sheet", field)),
            ),
            PipelineError::DateFormatMismatch { field, raw, format } => Some(
                Self::new(
                    row,
                    IssueKind::DateFormatMismatch,
                    field.as_str(),
                    raw.as_str(),
                    err.to_string(),
                )
                .with_suggestion(format!("Use the {} format or adjust date_formats", format)),
            ),
            _ => None,
        }
    }
}

/// Issues collected over one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Count issues by kind for summary reporting
    pub fn issue_summary(&self) -> BTreeMap<IssueKind, usize> {
        let mut summary = BTreeMap::new();
        for issue in &self.issues {
            *summary.entry(issue.kind).or_insert(0) += 1;
        }
        summary
    }
}

/// Flag CNPJs that do not have a plausible digit count.
pub fn check_cnpj(row: usize, digits: &str) -> Option<ValidationIssue> {
    if matches!(digits.len(), 11 | 14) {
        return None;
    }
    Some(
        ValidationIssue::new(
            row,
            IssueKind::SuspiciousCnpj,
            "cnpj",
            digits,
            format!("CNPJ has {} digits", digits.len()),
        )
        .with_suggestion("Expected 14 digits (or 11 for CPF)"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_maps_recoverable_kinds() {
        let missing = PipelineError::MissingRequiredField {
            row: 7,
            field: "cnpj".to_string(),
        };
        let issue = ValidationIssue::from_error(7, &missing).unwrap();
        assert_eq!(issue.kind, IssueKind::MissingRequiredField);
        assert_eq!(issue.field, "cnpj");
        assert!(issue.suggestion.is_some());

        let mismatch = PipelineError::DateFormatMismatch {
            field: "inicio_contrato".to_string(),
            raw: "2025-13-01".to_string(),
            format: "YYYY-MM-DD".to_string(),
        };
        let issue = ValidationIssue::from_error(3, &mismatch).unwrap();
        assert_eq!(issue.value, "2025-13-01");

        assert!(ValidationIssue::from_error(1, &PipelineError::SyncInProgress).is_none());
    }

    #[test]
    fn test_summary_counts_by_kind() {
        let mut result = ValidationResult::default();
        assert!(!result.has_issues());
        result.push(ValidationIssue::new(1, IssueKind::DateFormatMismatch, "a", "x", "r"));
        result.push(ValidationIssue::new(2, IssueKind::DateFormatMismatch, "b", "y", "r"));
        result.extend(check_cnpj(3, "123"));

        let summary = result.issue_summary();
        assert_eq!(summary.get(&IssueKind::DateFormatMismatch), Some(&2));
        assert_eq!(result.count(IssueKind::SuspiciousCnpj), 1);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_check_cnpj_accepts_cnpj_and_cpf_lengths() {
        assert!(check_cnpj(1, "12345678000190").is_none());
        assert!(check_cnpj(1, "12345678901").is_none());
        assert!(check_cnpj(1, "1234567800019").is_some());
    }
}
