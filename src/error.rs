use std::sync::Arc;

use thiserror::Error;

use crate::model::{Fault, LoaderId, MethodId, TypeToken};

macro_rules! config_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Configuration {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Configuration {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into four groups with different recovery rules:
///
/// ## Setup errors (never retried)
/// - [`Error::Configuration`] - Malformed pointcut text, unresolvable types, count mismatches
/// - [`Error::AmbiguousBinding`] - Advice parameters could be bound in more than one way
/// - [`Error::IncompleteBinding`] - Advice parameters left without a role
///
/// ## Recoverable matching errors
/// - [`Error::Resolution`] - A type was not visible from the loader an expression was built
///   against. The matcher retries with a loader-scoped fallback expression and treats a
///   persisting failure as a non-match.
///
/// ## Internal consistency defects
/// - [`Error::InvocationMismatch`] - The binder filled fewer or more slots than the advice
///   declares
///
/// ## Call-time outcomes
/// - [`Error::Thrown`] - A failure raised by the intercepted operation or by an advice body
/// - [`Error::InvalidArguments`] - A resumable join point was proceeded with the wrong arity
///
/// # Examples
///
/// ```rust
/// use aspectscope::Error;
///
/// fn describe(error: &Error) -> &'static str {
///     match error {
///         Error::Configuration { .. } => "fix the aspect definition",
///         Error::AmbiguousBinding(_) | Error::IncompleteBinding(_) => "declare argument names",
///         Error::Thrown(_) => "the intercepted operation failed",
///         _ => "internal failure",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The aspect definition is invalid and can not be used.
    ///
    /// Includes the source location where the problem was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the problem
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Configuration - {file}:{line}: {message}")]
    Configuration {
        /// The message to be printed for the Configuration error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// More than one advice parameter qualifies for the same binding.
    #[error("Ambiguous binding - {0}")]
    AmbiguousBinding(String),

    /// Some advice parameters could not be assigned a binding.
    #[error("Incomplete binding - {0}")]
    IncompleteBinding(String),

    /// A type could not be resolved from the code loading context a pointcut was built for.
    #[error("Type '{type_name}' is not visible from loader {loader}")]
    Resolution {
        /// Fully qualified name of the offending type
        type_name: String,
        /// The loader the lookup was performed against
        loader: LoaderId,
    },

    /// The number of bound advice arguments does not match the declared parameter count.
    ///
    /// This is never a user error - it indicates the binder and the matcher disagree about
    /// which variables a call provides.
    #[error("Required to bind {expected} arguments, but only bound {bound} (join point match {})", if *.matched { "WAS" } else { "was NOT" })]
    InvocationMismatch {
        /// Number of parameters declared by the advice method
        expected: usize,
        /// Number of slots actually filled
        bound: usize,
        /// Whether a join point match was present in the call context
        matched: bool,
    },

    /// A failure raised by the intercepted operation or an advice body.
    #[error("{0}")]
    Thrown(Arc<Fault>),

    /// Arguments supplied to a resumable join point do not fit the operation.
    #[error("{0}")]
    InvalidArguments(String),

    /// Failed to find type in `TypeRegistry`.
    #[error("Failed to find type in TypeRegistry - {0}")]
    TypeNotFound(TypeToken),

    /// Failed to find method in `TypeRegistry`.
    #[error("Failed to find method in TypeRegistry - {0}")]
    MethodNotFound(MethodId),
}

impl Error {
    /// Returns `true` for the errors a lenient discoverer converts into "no result".
    #[must_use]
    pub fn is_binding_failure(&self) -> bool {
        matches!(self, Error::AmbiguousBinding(_) | Error::IncompleteBinding(_))
    }

    /// Returns `true` if this error was caused by a code-loading-context mismatch.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }

    /// Returns the fault if this error carries a failure raised at call time.
    #[must_use]
    pub fn as_fault(&self) -> Option<&Arc<Fault>> {
        match self {
            Error::Thrown(fault) => Some(fault),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Builtin;

    #[test]
    fn test_error_groups() {
        assert!(Error::AmbiguousBinding("x".to_string()).is_binding_failure());
        assert!(!config_error!("bad").is_binding_failure());

        let resolution = Error::Resolution {
            type_name: "app.Payload".to_string(),
            loader: LoaderId::BOOTSTRAP,
        };
        assert!(resolution.is_resolution_failure());
        assert!(resolution.as_fault().is_none());

        let fault = Arc::new(Fault::new(Builtin::RuntimeException.token(), "boom"));
        let thrown = Error::Thrown(fault.clone());
        assert!(thrown.as_fault().is_some_and(|raised| Arc::ptr_eq(raised, &fault)));
    }

    #[test]
    fn test_configuration_location() {
        match config_error!("Unknown designator '{}'", "foo") {
            Error::Configuration { message, file, .. } => {
                assert_eq!(message, "Unknown designator 'foo'");
                assert!(file.ends_with("error.rs"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
