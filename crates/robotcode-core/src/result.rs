use crate::error::RobotCodeError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RobotCodeError>;
