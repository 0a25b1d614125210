use serde_json::Value;

use crate::db::types::QuestionType;

/// Server-side correctness check. Free-form answers (essay, code) need a
/// human reviewer and always grade as incorrect here.
///
/// For multiple choice, `options` lets a key stored as an option index match
/// an answer given as the option text, and the other way round.
pub(crate) fn is_correct(
    question_type: QuestionType,
    options: &[String],
    expected: &Value,
    given: &Value,
) -> bool {
    match question_type {
        QuestionType::MultipleChoice => {
            if expected == given {
                return true;
            }
            match (choice_index(options, expected), choice_index(options, given)) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            }
        }
        QuestionType::TrueFalse => match (as_bool(expected), as_bool(given)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
        QuestionType::ShortAnswer => text_matches(expected, given),
        QuestionType::FillBlank => match (expected, given) {
            (Value::Array(expected), Value::Array(given)) => {
                expected.len() == given.len()
                    && expected.iter().zip(given).all(|(left, right)| text_matches(left, right))
            }
            _ => text_matches(expected, given),
        },
        QuestionType::DragDrop => match (expected, given) {
            (Value::Array(_), Value::Array(_)) => expected == given,
            _ => false,
        },
        QuestionType::Essay | QuestionType::Code => false,
    }
}

pub(crate) fn is_auto_gradable(question_type: QuestionType) -> bool {
    !matches!(question_type, QuestionType::Essay | QuestionType::Code)
}

fn choice_index(options: &[String], value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => {
            number.as_u64().and_then(|index| usize::try_from(index).ok()).filter(|index| {
                *index < options.len()
            })
        }
        Value::String(text) => options.iter().position(|option| option == text),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn normalized_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_lowercase()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn text_matches(expected: &Value, given: &Value) -> bool {
    match (normalized_text(expected), normalized_text(given)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
