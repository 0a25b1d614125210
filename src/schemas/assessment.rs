use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{AssessmentType, QuestionType};

fn default_difficulty() -> i32 {
    5
}

fn default_passing_score() -> f64 {
    70.0
}

fn default_max_attempts() -> i32 {
    3
}

fn default_assessment_type() -> AssessmentType {
    AssessmentType::Quiz
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionType", alias = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(alias = "question")]
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: serde_json::Value,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default = "default_difficulty")]
    #[validate(range(min = 1, max = 10, message = "difficulty must be between 1 and 10"))]
    pub(crate) difficulty: i32,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
    #[serde(default)]
    #[serde(alias = "adaptiveWeight")]
    #[validate(range(exclusive_min = 0.0, message = "adaptive_weight must be positive"))]
    pub(crate) adaptive_weight: Option<f64>,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentCreate {
    #[serde(alias = "lessonId")]
    #[validate(length(min = 1, message = "lesson_id must not be empty"))]
    pub(crate) lesson_id: String,
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default = "default_assessment_type")]
    #[serde(alias = "type")]
    pub(crate) assessment_type: AssessmentType,
    #[serde(default = "default_passing_score")]
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0.0, max = 100.0, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: f64,
    #[serde(default = "default_max_attempts")]
    #[serde(alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: i32,
    #[serde(default)]
    #[serde(alias = "timeLimit", alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default)]
    #[serde(alias = "isAdaptive")]
    pub(crate) is_adaptive: bool,
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentListQuery {
    #[serde(default)]
    pub(crate) lesson_id: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

/// Question as shown to an instructor. Answer keys are omitted for students.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: Option<i32>,
    pub(crate) tags: Vec<String>,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) order_index: i32,
}

/// Question payload handed to a test-taker mid-attempt.
#[derive(Debug, Serialize)]
pub(crate) struct PublicQuestion {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) difficulty: Option<i32>,
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResponse {
    pub(crate) id: String,
    pub(crate) lesson_id: String,
    pub(crate) title: String,
    pub(crate) assessment_type: AssessmentType,
    pub(crate) passing_score: f64,
    pub(crate) max_attempts: i32,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_adaptive: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) questions: Option<Vec<QuestionResponse>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreBandCount {
    pub(crate) range: &'static str,
    pub(crate) count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummary {
    pub(crate) attempt_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) time_spent_seconds: i32,
    pub(crate) completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionAnalytics {
    pub(crate) question_id: String,
    pub(crate) prompt: String,
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: Option<i32>,
    pub(crate) total_attempts: i64,
    pub(crate) correct_answers: i64,
    pub(crate) success_rate: f64,
}

/// Author-facing statistics. Score figures are percentages over completed attempts.
#[derive(Debug, Serialize)]
pub(crate) struct AssessmentAnalytics {
    pub(crate) assessment_id: String,
    pub(crate) title: String,
    pub(crate) passing_score: f64,
    pub(crate) total_submissions: i64,
    pub(crate) completed_submissions: i64,
    pub(crate) in_progress_submissions: i64,
    pub(crate) abandoned_submissions: i64,
    pub(crate) passed_submissions: usize,
    pub(crate) pass_rate: f64,
    pub(crate) average_score: f64,
    pub(crate) min_score: f64,
    pub(crate) max_score: f64,
    pub(crate) average_time_spent_seconds: f64,
    pub(crate) score_distribution: Vec<ScoreBandCount>,
    pub(crate) recent_submissions: Vec<AttemptSummary>,
    pub(crate) top_performers: Vec<AttemptSummary>,
    pub(crate) struggling_students: Vec<AttemptSummary>,
    pub(crate) question_analysis: Vec<QuestionAnalytics>,
}
