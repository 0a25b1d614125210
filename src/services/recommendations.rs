use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::services::attempt_history::AnsweredQuestion;
use crate::services::score_aggregate::ScoreSummary;

const STRUGGLING_BELOW: f64 = 60.0;
const DEVELOPING_BELOW: f64 = 80.0;
const WEAK_TAG_ACCURACY: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct TagStats {
    pub(crate) correct: u32,
    pub(crate) total: u32,
}

impl TagStats {
    fn accuracy(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionFeedback {
    pub(crate) question_id: String,
    pub(crate) correct: bool,
    pub(crate) difficulty: i32,
}

/// Stored as the submission's `feedback` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AttemptFeedback {
    pub(crate) percentage: f64,
    pub(crate) recommendations: Vec<String>,
    pub(crate) weak_tags: Vec<String>,
    pub(crate) tag_stats: BTreeMap<String, TagStats>,
    pub(crate) questions: Vec<QuestionFeedback>,
}

pub(crate) fn tag_stats(history: &[AnsweredQuestion]) -> BTreeMap<String, TagStats> {
    let mut stats: BTreeMap<String, TagStats> = BTreeMap::new();
    for item in history {
        for tag in &item.tags {
            let entry = stats.entry(tag.clone()).or_insert(TagStats { correct: 0, total: 0 });
            entry.total += 1;
            if item.correct {
                entry.correct += 1;
            }
        }
    }
    stats
}

pub(crate) fn build_feedback(history: &[AnsweredQuestion], summary: &ScoreSummary) -> AttemptFeedback {
    let percentage = summary.percentage();
    let tag_stats = tag_stats(history);
    let weak_tags: Vec<String> = tag_stats
        .iter()
        .filter(|(_, stats)| stats.accuracy() < WEAK_TAG_ACCURACY)
        .map(|(tag, _)| tag.clone())
        .collect();

    let mut recommendations: Vec<String> = if percentage < STRUGGLING_BELOW {
        vec![
            "Review the lesson material before retrying this assessment".to_string(),
            "Focus on fundamental concepts and practice with easier questions first".to_string(),
        ]
    } else if percentage < DEVELOPING_BELOW {
        vec![
            "Good progress; review the questions you missed".to_string(),
            "Try practice exercises to reinforce your understanding".to_string(),
        ]
    } else {
        vec![
            "Excellent work; you are ready for more advanced topics".to_string(),
            "Explore supplementary materials to deepen your knowledge".to_string(),
        ]
    };

    if !weak_tags.is_empty() {
        recommendations.push(format!("Focus on improving these topics: {}", weak_tags.join(", ")));
    }

    let questions = history
        .iter()
        .map(|item| QuestionFeedback {
            question_id: item.question_id.clone(),
            correct: item.correct,
            difficulty: item.difficulty,
        })
        .collect();

    AttemptFeedback { percentage, recommendations, weak_tags, tag_stats, questions }
}
