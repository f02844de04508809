//! Error types for reference resolution.

use std::fmt;

/// The primary error type for all reference resolution operations.
#[derive(Debug)]
pub enum Error {
    /// Malformed lookup template or expression, or a bad positional index
    Binding(BindingError),
    /// No mapping metadata for the declared target type
    UnknownTargetType(UnknownTargetTypeError),
    /// A lazy reference resolved to nothing and was then used as present
    NullTarget(NullTargetError),
    /// Failure reported by the loader, passed through untouched
    Fetch(FetchError),
    /// Conversion or cardinality errors while materializing a reference
    Mapping(MappingError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct BindingError {
    pub kind: BindingErrorKind,
    pub template: Option<String>,
    pub message: String,
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// Template or expression text could not be parsed
    Syntax,
    /// Positional placeholder outside the bound values
    Positional,
    /// Expression evaluation failed
    Evaluation,
    /// A bound value had the wrong shape for where it was used
    Type,
}

#[derive(Debug, Clone)]
pub struct UnknownTargetTypeError {
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct NullTargetError {
    pub property: String,
}

#[derive(Debug)]
pub struct FetchError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    pub property: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// The converter could not turn a raw document into the target type
    Conversion,
    /// Singular access on a collection reference or vice versa
    Cardinality,
    /// The property carries no reference configuration
    NotAReference,
    /// Entity metadata names no collection for the target type
    MissingCollection,
}

impl BindingError {
    /// Create a binding error of the given kind.
    pub fn new(kind: BindingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            template: None,
            message: message.into(),
            position: None,
        }
    }

    /// Attach the template text that failed to bind.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Attach the character offset of the failure.
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl FetchError {
    /// Wrap a loader failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a loader failure, keeping the underlying error as source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl MappingError {
    /// Create a mapping error for a property.
    pub fn new(kind: MappingErrorKind, property: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            property: Some(property.to_string()),
            message: message.into(),
            source: None,
        }
    }

    /// Keep the underlying conversion error as source.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl Error {
    /// Is this a mapping-configuration defect rather than a runtime data condition?
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Binding(_) | Error::UnknownTargetType(_) => true,
            Error::Mapping(m) => matches!(
                m.kind,
                MappingErrorKind::NotAReference | MappingErrorKind::MissingCollection
            ),
            _ => false,
        }
    }

    /// Did this error originate in the loader?
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }

    /// Get the property the error is attributed to, if known.
    pub fn property(&self) -> Option<&str> {
        match self {
            Error::NullTarget(e) => Some(e.property.as_str()),
            Error::Mapping(e) => e.property.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Binding(e) => write!(f, "Binding error: {}", e),
            Error::UnknownTargetType(e) => write!(f, "Unknown target type: {}", e),
            Error::NullTarget(e) => write!(f, "Null target: {}", e),
            Error::Fetch(e) => write!(f, "Fetch error: {}", e.message),
            Error::Mapping(e) => write!(f, "Mapping error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fetch(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Mapping(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(position) = self.position {
            write!(f, " at offset {}", position)?;
        }
        if let Some(template) = &self.template {
            write!(f, " in '{}'", template)?;
        }
        Ok(())
    }
}

impl fmt::Display for UnknownTargetTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no mapping metadata registered for '{}'", self.type_name)
    }
}

impl fmt::Display for NullTargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reference '{}' resolved to nothing and cannot be dereferenced",
            self.property
        )
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(property) = &self.property {
            write!(f, "property '{}': {}", property, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for BindingError {}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::Binding(err)
    }
}

impl From<UnknownTargetTypeError> for Error {
    fn from(err: UnknownTargetTypeError) -> Self {
        Error::UnknownTargetType(err)
    }
}

impl From<NullTargetError> for Error {
    fn from(err: NullTargetError) -> Self {
        Error::NullTarget(err)
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::Fetch(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

/// Result type alias for reference resolution operations.
pub type Result<T> = std::result::Result<T, Error>;
