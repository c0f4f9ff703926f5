use crate::language::span::Span;
use miette::SourceSpan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic produced by module resolution or expression checking.
///
/// Diagnostics never abort a walk; each pass accumulates as many as it can
/// surface in a single run.
#[derive(Clone, Debug)]
pub struct AnalysisError {
    pub span: Span,
    pub message: String,
    pub label: String,
    pub code: Option<String>,
    pub help: Option<String>,
    pub severity: Severity,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        let message = message.into();
        Self {
            span,
            label: message.clone(),
            message,
            code: None,
            help: None,
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        let mut err = Self::new(message, span);
        err.severity = Severity::Warning;
        err
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn display_message(&self) -> String {
        if let Some(code) = &self.code {
            format!("[{code}] {}", self.message)
        } else {
            self.message.clone()
        }
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.to_source_span()
    }
}
