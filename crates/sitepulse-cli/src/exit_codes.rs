//! Unified exit codes. Part of the public contract: scripts branch on these.

use sitepulse_core::CoreError;
use sitepulse_influx::InfluxError;

pub const SUCCESS: i32 = 0;
pub const NO_DATA: i32 = 1; // Requested run has no points
pub const USAGE_ERROR: i32 = 2; // Bad request shape or configuration
pub const STORE_ERROR: i32 = 3; // Point store unreachable or failing

pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return match core {
            CoreError::RunNotFound { .. } => NO_DATA,
            CoreError::InvalidComparison { .. } | CoreError::ResultsNotFound { .. } => USAGE_ERROR,
            CoreError::Store { .. } => STORE_ERROR,
        };
    }
    if let Some(influx) = err.downcast_ref::<InfluxError>() {
        return match influx {
            InfluxError::Config { .. } => USAGE_ERROR,
            _ => STORE_ERROR,
        };
    }
    USAGE_ERROR
}
