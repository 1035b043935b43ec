//! Process exit codes
//!
//! Distinguishes "could not run" classes from "ran but failed". In a batch
//! the most severe code wins.

use feedrun_core::domain::execution::FinalStatus;
use feedrun_runner::RunError;
use feedrun_runner::scheduler::JobReport;

pub const SUCCESS: u8 = 0;
pub const FAILED: u8 = 1;
pub const NOT_FOUND: u8 = 2;
pub const DISABLED: u8 = 3;
pub const MISCONFIGURED: u8 = 4;
pub const FATAL: u8 = 5;
pub const INTERRUPTED: u8 = 130;

pub fn for_status(status: FinalStatus) -> u8 {
    match status {
        FinalStatus::Succeeded => SUCCESS,
        FinalStatus::Failed | FinalStatus::TimedOut => FAILED,
        FinalStatus::Misconfigured => MISCONFIGURED,
    }
}

pub fn for_error(err: &RunError) -> u8 {
    match err {
        RunError::NotFound(_) => NOT_FOUND,
        RunError::Disabled(_) => DISABLED,
        RunError::Misconfigured { .. } => MISCONFIGURED,
    }
}

pub fn for_result(result: &Result<JobReport, RunError>) -> u8 {
    match result {
        Ok(report) => for_status(report.outcome.final_status),
        Err(err) => for_error(err),
    }
}

fn severity(code: u8) -> u8 {
    match code {
        MISCONFIGURED => 4,
        NOT_FOUND => 3,
        DISABLED => 2,
        FAILED => 1,
        _ => 0,
    }
}

/// Most severe of several job codes
pub fn combine(codes: impl IntoIterator<Item = u8>) -> u8 {
    codes
        .into_iter()
        .max_by_key(|code| severity(*code))
        .unwrap_or(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedrun_core::error::ValidationError;

    #[test]
    fn test_error_codes() {
        assert_eq!(for_error(&RunError::NotFound("x".to_string())), NOT_FOUND);
        assert_eq!(for_error(&RunError::Disabled("x".to_string())), DISABLED);
        assert_eq!(
            for_error(&RunError::Misconfigured {
                id: "x".to_string(),
                error: ValidationError::InvalidTimeout,
            }),
            MISCONFIGURED
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(for_status(FinalStatus::Succeeded), SUCCESS);
        assert_eq!(for_status(FinalStatus::Failed), FAILED);
        assert_eq!(for_status(FinalStatus::TimedOut), FAILED);
        assert_eq!(for_status(FinalStatus::Misconfigured), MISCONFIGURED);
    }

    #[test]
    fn test_combine_prefers_configuration_errors() {
        assert_eq!(combine([SUCCESS, FAILED, SUCCESS]), FAILED);
        assert_eq!(combine([FAILED, MISCONFIGURED, NOT_FOUND]), MISCONFIGURED);
        assert_eq!(combine([SUCCESS]), SUCCESS);
        assert_eq!(combine(Vec::<u8>::new()), SUCCESS);
    }
}
