//! Error types for the derived-quantity pipeline.
//!
//! Errors carry an [`ErrorContext`] describing the operation and the upstream
//! variable involved, so a warning emitted for a skipped product names exactly
//! what was missing or malformed.

use std::fmt;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Structured context for pipeline errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "resample", "pitch_angle_centroid")
    pub operation: Option<String>,
    /// The upstream variable name, if one is involved
    pub variable: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the variable name.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref variable) = self.variable {
            parts.push(format!("variable={}", variable));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required named variable is absent from the upstream source.
    /// Recovered by the caller: the dependent product is skipped.
    #[error("Missing input: {message} {context}")]
    MissingInput {
        message: String,
        context: ErrorContext,
    },

    /// An index or axis length does not fit the data's shape.
    #[error("Shape mismatch: {message} {context}")]
    ShapeMismatch {
        message: String,
        context: ErrorContext,
    },

    /// Input arrays violate a structural precondition (ordering, lengths).
    #[error("Invalid input: {message} {context}")]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Cache(#[from] crate::db::cache::CacheError),
}

impl PipelineError {
    /// Create a missing-input error for a named variable.
    pub fn missing(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self::MissingInput {
            message: format!("variable '{}' not found", variable),
            context: ErrorContext::default().with_variable(variable),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Attach or replace the context of a contextual error.
    ///
    /// Fields already set on the existing context are kept unless the new
    /// context provides them.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        fn merge(old: ErrorContext, new: ErrorContext) -> ErrorContext {
            ErrorContext {
                operation: new.operation.or(old.operation),
                variable: new.variable.or(old.variable),
                details: new.details.or(old.details),
            }
        }

        match self {
            Self::MissingInput { message, context } => Self::MissingInput {
                message,
                context: merge(context, ctx),
            },
            Self::ShapeMismatch { message, context } => Self::ShapeMismatch {
                message,
                context: merge(context, ctx),
            },
            Self::InvalidInput { message, context } => Self::InvalidInput {
                message,
                context: merge(context, ctx),
            },
            other => other,
        }
    }

    /// Get the error context if available.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::MissingInput { context, .. }
            | Self::ShapeMismatch { context, .. }
            | Self::InvalidInput { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether a derived-product run may skip this error and carry on with
    /// independent products.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::ShapeMismatch { .. } | Self::InvalidInput { .. }
        )
    }
}
