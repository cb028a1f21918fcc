//! Error types for model construction and time stepping

use std::fmt;

/// Errors raised by the urban climate model.
///
/// Both variants are fatal for the run that produced them: the model is a
/// stiff time-marching system and there is no valid state to resume from.
#[derive(Debug, Clone, PartialEq)]
pub enum UwgError {
    /// Static geometry, grid or parameter input is invalid.
    /// Raised at construction, before any timestep executes.
    Configuration {
        /// Name of the offending parameter
        parameter: &'static str,
        /// What is wrong with it
        message: String,
    },
    /// A timestep produced a non-finite or non-physical intermediate value.
    Numerical {
        /// Name of the quantity that went bad
        quantity: &'static str,
        /// Timestep on which it happened, once known
        timestep: Option<usize>,
        /// The offending value
        value: f64,
    },
}

impl UwgError {
    /// Create a configuration error
    pub fn configuration(parameter: &'static str, message: impl Into<String>) -> Self {
        UwgError::Configuration {
            parameter,
            message: message.into(),
        }
    }

    /// Create a numerical error without timestep information
    pub fn numerical(quantity: &'static str, value: f64) -> Self {
        UwgError::Numerical {
            quantity,
            timestep: None,
            value,
        }
    }

    /// Attach the failing timestep to a numerical error that does not carry one yet
    #[must_use]
    pub fn at_timestep(self, step: usize) -> Self {
        match self {
            UwgError::Numerical {
                quantity,
                timestep: None,
                value,
            } => UwgError::Numerical {
                quantity,
                timestep: Some(step),
                value,
            },
            other => other,
        }
    }

    /// Whether this error was raised at construction time
    pub fn is_configuration(&self) -> bool {
        matches!(self, UwgError::Configuration { .. })
    }
}

impl fmt::Display for UwgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UwgError::Configuration { parameter, message } => {
                write!(f, "Invalid configuration '{parameter}': {message}")
            }
            UwgError::Numerical {
                quantity,
                timestep: Some(step),
                value,
            } => write!(f, "Non-physical {quantity} = {value} at timestep {step}"),
            UwgError::Numerical {
                quantity,
                timestep: None,
                value,
            } => write!(f, "Non-physical {quantity} = {value}"),
        }
    }
}

impl std::error::Error for UwgError {}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, UwgError>;

/// Reject NaN and infinities, naming the quantity in the error.
#[inline]
pub(crate) fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(UwgError::numerical(quantity, value))
    }
}

/// Check every entry of a profile, reporting the first non-finite one.
pub(crate) fn ensure_all_finite(quantity: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&bad) => Err(UwgError::numerical(quantity, bad)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestep_attached_once() {
        let err = UwgError::numerical("ubl temperature", f64::NAN)
            .at_timestep(12)
            .at_timestep(40);
        match err {
            UwgError::Numerical { timestep, .. } => assert_eq!(timestep, Some(12)),
            UwgError::Configuration { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_display_names_quantity_and_step() {
        let err = UwgError::numerical("aerodynamic conductance", -1.0).at_timestep(3);
        let msg = err.to_string();
        assert!(msg.contains("aerodynamic conductance"));
        assert!(msg.contains("timestep 3"));
    }

    #[test]
    fn test_configuration_untouched_by_timestep() {
        let err = UwgError::configuration("grid.growth_ratio", "must be positive").at_timestep(5);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("x", 2.5), Ok(2.5));
        assert!(ensure_finite("x", f64::INFINITY).is_err());
        assert!(ensure_all_finite("profile", &[1.0, f64::NAN, 3.0]).is_err());
        assert!(ensure_all_finite("profile", &[1.0, 2.0]).is_ok());
    }
}
