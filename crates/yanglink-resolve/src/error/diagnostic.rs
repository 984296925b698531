//! The core diagnostic type.
//!
//! A [`Diagnostic`] is a single error or warning with an optional error
//! code, labeled source locations, the name of the offending construct and
//! help text.

use std::fmt;

use yanglink_core::{SourceLocation, TreeError};

use crate::error::{ErrorCode, ErrorKind, Label, Severity};

/// A structured error record.
///
/// # Example
///
/// ```text
/// error[E100]: duplicate identifier `x`
///   --> a.yang:10:5 (container `top`)
///   --> a.yang:5:5 first defined here
///    = help: rename one of the nodes
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    construct: Option<String>,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use yanglink_resolve::error::{Diagnostic, ErrorCode};
    /// # use yanglink_core::SourceLocation;
    ///
    /// let diag = Diagnostic::error("typedef `percent` not found")
    ///     .with_code(ErrorCode::E101)
    ///     .with_label(SourceLocation::new("a.yang", 4, 3), "referenced here")
    ///     .with_help("check the prefix and the imports");
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// The error kind, derived from the code.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.code.map(|code| code.kind())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The name of the offending construct, if any.
    pub fn construct(&self) -> Option<&str> {
        self.construct.as_deref()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Location of the first primary label.
    pub fn location(&self) -> Option<SourceLocation> {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .map(Label::location)
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_construct(mut self, construct: impl Into<String>) -> Self {
        self.construct = Some(construct.into());
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(location, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(location, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            construct: None,
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(location) = self.location() {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<TreeError> for Diagnostic {
    fn from(err: TreeError) -> Self {
        let code = match err {
            TreeError::StaleHandle(_) => ErrorCode::E002,
            _ => ErrorCode::E001,
        };
        Diagnostic::error(err.to_string()).with_code(code)
    }
}
