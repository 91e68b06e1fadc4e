//! Engine configuration
//!
//! This module provides the switches that govern how strictly advice parameters are discovered,
//! whether expressions fall back to the target's code loading context, and how advisor chains
//! are assembled.

/// Configuration for pointcut matching and advice binding
///
/// The defaults reproduce the behaviour of a classic proxy-based interception layer:
/// the heuristic parameter discoverer is strict, fallback expressions are enabled and
/// advisor prefiltering runs in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AspectConfig {
    /// Raise ambiguous or incomplete bindings as errors instead of handing over to the next
    /// discoverer in the chain
    pub strict_parameter_discovery: bool,

    /// Consult parameter names recorded on the advice method before running the heuristic
    pub use_declared_parameter_names: bool,

    /// Retry a failed type resolution with an expression compiled against the target's loader
    pub enable_fallback_expression: bool,

    /// Prefilter advisors on the rayon thread pool
    pub parallel_advisor_filtering: bool,

    /// Maximum expansion depth for named pointcut references (default: 32)
    pub max_reference_depth: usize,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            strict_parameter_discovery: true,
            use_declared_parameter_names: true,
            enable_fallback_expression: true,
            parallel_advisor_filtering: true,
            max_reference_depth: 32,
        }
    }
}

impl AspectConfig {
    /// Creates a configuration where the heuristic discoverer returns "no result" instead of
    /// failing, so a later discoverer may still supply names
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            strict_parameter_discovery: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that relies on the heuristic alone
    ///
    /// Recorded parameter names are ignored; every advice must be resolvable from its
    /// pointcut text and parameter types.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_parameter_discovery: true,
            use_declared_parameter_names: false,
            enable_fallback_expression: true,
            parallel_advisor_filtering: true,
            max_reference_depth: 32,
        }
    }

    /// Creates a minimal configuration for single-loader, single-threaded setups
    ///
    /// Disables the fallback expression and parallel prefiltering. Nested named pointcut
    /// references are limited to a shallow depth.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            strict_parameter_discovery: true,
            use_declared_parameter_names: true,
            enable_fallback_expression: false,
            parallel_advisor_filtering: false,
            max_reference_depth: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AspectConfig::default();
        assert!(config.strict_parameter_discovery);
        assert!(config.use_declared_parameter_names);
        assert!(config.enable_fallback_expression);
        assert!(config.parallel_advisor_filtering);
        assert_eq!(config.max_reference_depth, 32);
    }

    #[test]
    fn test_lenient_config() {
        let config = AspectConfig::lenient();
        assert!(!config.strict_parameter_discovery);
        assert!(config.enable_fallback_expression);
    }

    #[test]
    fn test_strict_config() {
        let config = AspectConfig::strict();
        assert!(config.strict_parameter_discovery);
        assert!(!config.use_declared_parameter_names);
    }

    #[test]
    fn test_minimal_config() {
        let config = AspectConfig::minimal();
        assert!(!config.enable_fallback_expression);
        assert!(!config.parallel_advisor_filtering);
        assert_eq!(config.max_reference_depth, 4);
    }
}
