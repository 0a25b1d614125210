use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Role carried in the bearer token; there is no local users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Instructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "assessmenttype", rename_all = "lowercase")]
pub(crate) enum AssessmentType {
    Quiz,
    Test,
    Assignment,
    Project,
    Practical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
    Code,
    DragDrop,
    FillBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submissionstatus", rename_all = "snake_case")]
pub(crate) enum SubmissionStatus {
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "completionreason", rename_all = "snake_case")]
pub(crate) enum CompletionReason {
    SelectorExhausted,
    ManualSubmit,
    TimeLimitElapsed,
    GaveUp,
}

impl CompletionReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::SelectorExhausted => "selector_exhausted",
            Self::ManualSubmit => "manual_submit",
            Self::TimeLimitElapsed => "time_limit_elapsed",
            Self::GaveUp => "gave_up",
        }
    }
}
