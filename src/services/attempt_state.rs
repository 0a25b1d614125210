use thiserror::Error;

use crate::db::types::{CompletionReason, SubmissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptState {
    NotStarted,
    InProgress,
    Completed(CompletionReason),
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptEvent {
    Start,
    AnswerAccepted,
    Complete(CompletionReason),
    Abandon,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TransitionError {
    #[error("attempt has not been started")]
    NotStarted,
    #[error("attempt is already in progress")]
    AlreadyStarted,
    #[error("attempt is already {0}")]
    Finished(&'static str),
}

impl AttemptState {
    pub(crate) fn from_status(status: SubmissionStatus, reason: Option<CompletionReason>) -> Self {
        match status {
            SubmissionStatus::InProgress => Self::InProgress,
            SubmissionStatus::Completed => {
                Self::Completed(reason.unwrap_or(CompletionReason::ManualSubmit))
            }
            SubmissionStatus::Abandoned => Self::Abandoned,
        }
    }

    pub(crate) fn status(self) -> Option<SubmissionStatus> {
        match self {
            Self::NotStarted => None,
            Self::InProgress => Some(SubmissionStatus::InProgress),
            Self::Completed(_) => Some(SubmissionStatus::Completed),
            Self::Abandoned => Some(SubmissionStatus::Abandoned),
        }
    }

    pub(crate) fn completion_reason(self) -> Option<CompletionReason> {
        match self {
            Self::Completed(reason) => Some(reason),
            Self::Abandoned => Some(CompletionReason::GaveUp),
            Self::NotStarted | Self::InProgress => None,
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Completed(_) | Self::Abandoned)
    }

    /// Finished attempts never change again.
    pub(crate) fn apply(self, event: AttemptEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Completed(_), _) => Err(TransitionError::Finished("completed")),
            (Self::Abandoned, _) => Err(TransitionError::Finished("abandoned")),
            (Self::NotStarted, AttemptEvent::Start) => Ok(Self::InProgress),
            (Self::NotStarted, _) => Err(TransitionError::NotStarted),
            (Self::InProgress, AttemptEvent::Start) => Err(TransitionError::AlreadyStarted),
            (Self::InProgress, AttemptEvent::AnswerAccepted) => Ok(Self::InProgress),
            (Self::InProgress, AttemptEvent::Complete(CompletionReason::GaveUp))
            | (Self::InProgress, AttemptEvent::Abandon) => Ok(Self::Abandoned),
            (Self::InProgress, AttemptEvent::Complete(reason)) => Ok(Self::Completed(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_completed() {
        let state = AttemptState::NotStarted
            .apply(AttemptEvent::Start)
            .and_then(|s| s.apply(AttemptEvent::AnswerAccepted))
            .and_then(|s| s.apply(AttemptEvent::AnswerAccepted))
            .and_then(|s| s.apply(AttemptEvent::Complete(CompletionReason::SelectorExhausted)))
            .expect("valid transitions");

        assert_eq!(state, AttemptState::Completed(CompletionReason::SelectorExhausted));
        assert_eq!(state.status(), Some(SubmissionStatus::Completed));
        assert!(state.is_terminal());
    }

    #[test]
    fn time_limit_completes_rather_than_abandons() {
        let state = AttemptState::InProgress
            .apply(AttemptEvent::Complete(CompletionReason::TimeLimitElapsed))
            .expect("complete");
        assert_eq!(state.status(), Some(SubmissionStatus::Completed));
        assert_eq!(state.completion_reason(), Some(CompletionReason::TimeLimitElapsed));
    }

    #[test]
    fn abandon_is_terminal() {
        let state = AttemptState::InProgress.apply(AttemptEvent::Abandon).expect("abandon");
        assert_eq!(state, AttemptState::Abandoned);
        assert_eq!(state.completion_reason(), Some(CompletionReason::GaveUp));
        assert_eq!(
            state.apply(AttemptEvent::AnswerAccepted),
            Err(TransitionError::Finished("abandoned"))
        );
    }

    #[test]
    fn finished_attempt_rejects_every_event() {
        let done = AttemptState::Completed(CompletionReason::ManualSubmit);
        for event in [
            AttemptEvent::Start,
            AttemptEvent::AnswerAccepted,
            AttemptEvent::Complete(CompletionReason::ManualSubmit),
            AttemptEvent::Abandon,
        ] {
            assert_eq!(done.apply(event), Err(TransitionError::Finished("completed")));
        }
    }

    #[test]
    fn answers_require_a_started_attempt() {
        assert_eq!(
            AttemptState::NotStarted.apply(AttemptEvent::AnswerAccepted),
            Err(TransitionError::NotStarted)
        );
        assert_eq!(
            AttemptState::InProgress.apply(AttemptEvent::Start),
            Err(TransitionError::AlreadyStarted)
        );
    }

    #[test]
    fn status_roundtrips_through_storage() {
        let stored = AttemptState::from_status(
            SubmissionStatus::Completed,
            Some(CompletionReason::TimeLimitElapsed),
        );
        assert_eq!(stored, AttemptState::Completed(CompletionReason::TimeLimitElapsed));
        assert_eq!(
            AttemptState::from_status(SubmissionStatus::InProgress, None),
            AttemptState::InProgress
        );
    }
}
