use std::fmt;

use serde::{Serialize, Serializer};

/// Recoverable conditions reported while converting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    DuplicatedSuccess2xx,
    DuplicatedSuccess202,
    DuplicatedSuccess204,
    DuplicatedRedirect,
    MissingStatusCodes,
    DuplicateBodyTypes,
    UnsupportedType,
    UnionNull,
    UnionUnsupported,
    UnsupportedStatusCodeRange,
    MissingHostParameter,
    UnexpectedVerb,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DuplicatedSuccess2xx => "duplicated-success-2xx",
            DiagnosticCode::DuplicatedSuccess202 => "duplicated-success-202",
            DiagnosticCode::DuplicatedSuccess204 => "duplicated-success-204",
            DiagnosticCode::DuplicatedRedirect => "duplicated-redirect",
            DiagnosticCode::MissingStatusCodes => "missing-status-codes",
            DiagnosticCode::DuplicateBodyTypes => "duplicate-body-types",
            DiagnosticCode::UnsupportedType => "unsupported-type",
            DiagnosticCode::UnionNull => "union-null",
            DiagnosticCode::UnionUnsupported => "union-unsupported",
            DiagnosticCode::UnsupportedStatusCodeRange => "unsupported-status-code-range",
            DiagnosticCode::MissingHostParameter => "missing-host-parameter",
            DiagnosticCode::UnexpectedVerb => "unexpected-verb",
        }
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    /// Operation or type the diagnostic is attached to.
    pub target: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.target, self.message)
    }
}

/// Collector for recoverable diagnostics. Every report is also logged at warn level.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        code: DiagnosticCode,
        target: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            code,
            message: message.into(),
            target: target.into(),
        };
        log::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.items.iter().any(|d| d.code == code)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_are_collected_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticCode::UnionNull, "Widget.color", "union only contains null");
        diagnostics.report(DiagnosticCode::MissingStatusCodes, "Widgets_Get", "response has no status");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.has(DiagnosticCode::UnionNull));
        assert!(!diagnostics.has(DiagnosticCode::DuplicatedRedirect));
        assert_eq!(
            diagnostics.items()[1].to_string(),
            "[missing-status-codes] Widgets_Get: response has no status"
        );
    }

    #[test]
    fn codes_serialize_as_their_display_name() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticCode::DuplicatedSuccess2xx, "Widgets_Put", "2xx bodies disagree");
        assert_eq!(
            serde_json::to_value(&diagnostics.items()[0]).unwrap(),
            serde_json::json!({
                "code": "duplicated-success-2xx",
                "message": "2xx bodies disagree",
                "target": "Widgets_Put"
            })
        );
    }
}
