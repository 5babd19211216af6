//! Call outcome classification.

use serde::{Deserialize, Serialize};

use crate::call::CallStatus;

/// Outcome of one call attempt, as reported by the telephony bridge.
///
/// Codes split into retryable (the callee might pick up next time) and
/// terminal. Codes we do not recognize finalize the call as failed rather
/// than retrying it, so a bridge upgrade can never put a call into an
/// endless retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Completed,
    Failed,
    NoAnswer,
    Busy,
    /// The call connected but hung up almost immediately
    ShortCall,
    /// Unrecognized code, preserved verbatim for diagnostics
    #[serde(untagged)]
    Other(String),
}

impl CallOutcome {
    /// Classify a raw outcome code from a bridge report.
    pub fn from_report(code: &str) -> Self {
        match code {
            "completed" => CallOutcome::Completed,
            "failed" => CallOutcome::Failed,
            "no_answer" => CallOutcome::NoAnswer,
            "busy" => CallOutcome::Busy,
            "short_call" => CallOutcome::ShortCall,
            other => CallOutcome::Other(other.to_string()),
        }
    }

    /// True when the outcome warrants another attempt (subject to the
    /// attempt ceiling).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallOutcome::NoAnswer | CallOutcome::Busy | CallOutcome::ShortCall
        )
    }

    /// Terminal status for a non-retryable outcome, or when retries are
    /// exhausted.
    pub fn final_status(&self) -> CallStatus {
        match self {
            CallOutcome::Completed => CallStatus::Completed,
            _ => CallStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallOutcome::Completed => "completed",
            CallOutcome::Failed => "failed",
            CallOutcome::NoAnswer => "no_answer",
            CallOutcome::Busy => "busy",
            CallOutcome::ShortCall => "short_call",
            CallOutcome::Other(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(CallOutcome::from_report("no_answer"), CallOutcome::NoAnswer);
        assert_eq!(CallOutcome::from_report("busy"), CallOutcome::Busy);
        assert_eq!(
            CallOutcome::from_report("completed"),
            CallOutcome::Completed
        );
    }

    #[test]
    fn retryable_split() {
        assert!(CallOutcome::NoAnswer.is_retryable());
        assert!(CallOutcome::Busy.is_retryable());
        assert!(CallOutcome::ShortCall.is_retryable());
        assert!(!CallOutcome::Completed.is_retryable());
        assert!(!CallOutcome::Failed.is_retryable());
    }

    #[test]
    fn unknown_codes_are_terminal() {
        let outcome = CallOutcome::from_report("carrier_glitch");
        assert_eq!(outcome, CallOutcome::Other("carrier_glitch".to_string()));
        assert!(!outcome.is_retryable());
        assert_eq!(outcome.final_status(), CallStatus::Failed);
    }

    #[test]
    fn completed_maps_to_completed() {
        assert_eq!(CallOutcome::Completed.final_status(), CallStatus::Completed);
        assert_eq!(CallOutcome::NoAnswer.final_status(), CallStatus::Failed);
    }
}
