use crate::language::errors::{AnalysisError, Severity};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct AnalysisDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl AnalysisDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &AnalysisError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.display_message(),
            label: err.label.clone(),
        }
    }
}

pub fn emit_analysis_errors(name: &str, source: &str, errors: &[AnalysisError]) {
    let src = NamedSource::new(name, source.to_string());
    for err in errors {
        let diagnostic = AnalysisDiagnostic::from_error(src.clone(), err);
        match err.severity {
            Severity::Error => eprintln!("{:?}", Report::new(diagnostic)),
            Severity::Warning => eprintln!("warning: {:?}", Report::new(diagnostic)),
        }
    }
}
