pub type Result<T> = std::result::Result<T, ManipulationError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ManipulationError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("timestamp {timestamp} is earlier than the previous timestamp {previous}")]
    InvalidTimestamp { timestamp: i64, previous: i64 },

    #[error("`{0}` cannot be changed while inertia is running")]
    CannotChangeWhileRunning(&'static str),
}

impl ManipulationError {
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Rejects `timestamp` if it runs backwards from `previous`.
///
/// Timestamps are compared with a wrapping subtraction so a tick counter that
/// rolls over `i64::MAX` still counts as moving forward.
pub fn check_timestamp(timestamp: i64, previous: i64) -> Result<()> {
    if timestamp.wrapping_sub(previous) < 0 {
        return Err(ManipulationError::InvalidTimestamp {
            timestamp,
            previous,
        });
    }
    Ok(())
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ManipulationError::invalid_argument(
            name,
            format!("must be finite, got {value}"),
        ));
    }
    Ok(())
}

pub(crate) fn require_finite_non_negative(name: &'static str, value: f64) -> Result<()> {
    require_finite(name, value)?;
    if value < 0.0 {
        return Err(ManipulationError::invalid_argument(
            name,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(())
}
