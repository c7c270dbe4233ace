use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::property::PropertyId;

/// Weight of one validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Valid but flagged
    Warning,
    /// Invalid
    Error,
}

/// Aggregate outcome of a validation pass
///
/// Ordered by badness, so the aggregate of a set of findings is their
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidityLevel {
    Valid,
    Warning,
    Error,
}

/// One finding reported against a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub severity: Severity,
    pub message: String,
}

/// Per-property aggregation of validation findings
///
/// Serializes via serde for host-side reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRegistry {
    entries: BTreeMap<PropertyId, Vec<ValidationError>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error-severity finding
    pub fn add_error(&mut self, property: PropertyId, message: impl Into<String>) {
        self.add(
            property,
            ValidationError {
                severity: Severity::Error,
                message: message.into(),
            },
        );
    }

    /// Record a warning-severity finding
    pub fn add_warning(&mut self, property: PropertyId, message: impl Into<String>) {
        self.add(
            property,
            ValidationError {
                severity: Severity::Warning,
                message: message.into(),
            },
        );
    }

    /// Record a finding
    pub fn add(&mut self, property: PropertyId, error: ValidationError) {
        self.entries.entry(property).or_default().push(error);
    }

    /// The findings recorded against one property, in report order
    pub fn errors(&self, property: PropertyId) -> &[ValidationError] {
        self.entries
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All findings in ascending property order
    pub fn all(&self) -> impl Iterator<Item = (PropertyId, &[ValidationError])> {
        self.entries
            .iter()
            .map(|(property, errors)| (*property, errors.as_slice()))
    }

    /// Whether any finding is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of properties with findings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append every finding of `other`, keeping its report order
    pub fn merge(&mut self, other: &ErrorRegistry) {
        for (property, errors) in &other.entries {
            self.entries
                .entry(*property)
                .or_default()
                .extend(errors.iter().cloned());
        }
    }

    /// The aggregate level over every recorded finding
    pub fn level(&self) -> ValidityLevel {
        let mut level = ValidityLevel::Valid;
        for errors in self.entries.values() {
            for error in errors {
                let found = match error.severity {
                    Severity::Warning => ValidityLevel::Warning,
                    Severity::Error => ValidityLevel::Error,
                };
                if found > level {
                    level = found;
                }
            }
        }
        level
    }
}
