// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::POINTS_PER_QUESTION;

pub const QUIZ_STATUS_DRAFT: &str = "draft";
pub const QUIZ_STATUS_ACTIVE: &str = "active";
pub const QUIZ_STATUS_COMPLETED: &str = "completed";

/// Supported question kinds. Grading semantics differ per kind, see `scoring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    MultipleChoice,
    FreeText,
    TrueFalse,
    Numeric,
    Checkbox,
}

/// An answer value as submitted by a student or stored as the answer key.
///
/// Single-valued question types carry `One`, checkbox questions carry `Many`.
/// Untagged so the wire form stays a plain string or array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    One(String),
    Many(Vec<String>),
}

/// A single question embedded in a quiz. Stored inside the quiz row as JSONB,
/// answer key included, so it must never be serialized to students directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the owning quiz.
    pub id: i64,
    pub text: String,
    pub question_type: QuestionType,
    /// Choices for MultipleChoice/Checkbox questions. Empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub topic: String,
    pub description: String,
    pub questions: Json<Vec<Question>>,
    pub created_by: Option<i64>,

    /// Lifecycle status: 'draft', 'active' or 'completed'.
    /// Only active quizzes are visible to students.
    pub status: String,

    pub availability_start: Option<DateTime<Utc>>,
    pub availability_end: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<i64>,

    /// User ids the quiz is assigned to. Empty means assigned to everyone.
    pub assigned_to: Json<Vec<i64>>,

    /// Always 10 points per question. Recomputed whenever the question
    /// list changes, never trusted from the client.
    pub total_points: i64,

    pub created_at: Option<DateTime<Utc>>,
}

/// Derives a quiz's total points from its question count.
pub fn total_points_for(question_count: usize) -> i64 {
    question_count as i64 * POINTS_PER_QUESTION
}

/// DTO for a question served to students (answer key stripped).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
}

/// DTO for a quiz being taken by a student (answer keys stripped).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub topic: String,
    pub description: String,
    pub time_limit_minutes: Option<i64>,
    pub total_points: i64,
    pub questions: Vec<PublicQuestion>,
}

impl PublicQuiz {
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            topic: quiz.topic.clone(),
            description: quiz.description.clone(),
            time_limit_minutes: quiz.time_limit_minutes,
            total_points: quiz.total_points,
            questions: quiz
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    text: q.text.clone(),
                    question_type: q.question_type,
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

/// DTO for quiz listings (no question bodies at all).
#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub topic: String,
    pub description: String,
    pub status: String,
    pub time_limit_minutes: Option<i64>,
    pub total_points: i64,
    pub question_count: usize,
    pub availability_start: Option<DateTime<Utc>>,
    pub availability_end: Option<DateTime<Utc>>,
}

impl QuizSummary {
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            topic: quiz.topic.clone(),
            description: quiz.description.clone(),
            status: quiz.status.clone(),
            time_limit_minutes: quiz.time_limit_minutes,
            total_points: quiz.total_points,
            question_count: quiz.questions.len(),
            availability_start: quiz.availability_start,
            availability_end: quiz.availability_end,
        }
    }
}

/// DTO for a question inside a create/update quiz request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
}

/// DTO for creating a quiz. Questions arrive already materialized.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<QuestionInput>,
    pub availability_start: Option<DateTime<Utc>>,
    pub availability_end: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<i64>,
    #[serde(default)]
    pub assigned_to: Vec<i64>,
    pub status: Option<String>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub topic: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<QuestionInput>>,
    pub availability_start: Option<DateTime<Utc>>,
    pub availability_end: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<i64>,
    pub assigned_to: Option<Vec<i64>>,
    pub status: Option<String>,
}

pub fn validate_questions(questions: &[QuestionInput]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }

    for q in questions {
        if q.text.trim().is_empty() {
            return Err(validator::ValidationError::new("question_text_empty"));
        }
        if q.text.len() > 2000 {
            return Err(validator::ValidationError::new("question_text_too_long"));
        }

        match q.question_type {
            QuestionType::MultipleChoice | QuestionType::Checkbox => {
                if q.options.len() < 2 {
                    return Err(validator::ValidationError::new("options_required"));
                }
                for opt in &q.options {
                    if opt.is_empty() || opt.len() > 500 {
                        return Err(validator::ValidationError::new("option_invalid"));
                    }
                }
            }
            _ => {}
        }

        // The answer key must only reference strings present in the options
        // when options exist.
        if !q.options.is_empty() {
            let referenced: Vec<&String> = match &q.correct_answer {
                AnswerValue::One(v) => vec![v],
                AnswerValue::Many(vs) => vs.iter().collect(),
            };
            if referenced.is_empty() {
                return Err(validator::ValidationError::new("answer_key_empty"));
            }
            for value in referenced {
                if !q.options.contains(value) {
                    return Err(validator::ValidationError::new("answer_not_in_options"));
                }
            }
        }

        // Single-valued question types need a single-valued answer key.
        if !matches!(q.question_type, QuestionType::Checkbox)
            && matches!(q.correct_answer, AnswerValue::Many(_))
        {
            return Err(validator::ValidationError::new("answer_key_shape"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(options: &[&str], correct: &str) -> QuestionInput {
        QuestionInput {
            text: "Pick one".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: AnswerValue::One(correct.to_string()),
        }
    }

    #[test]
    fn total_points_is_ten_per_question() {
        assert_eq!(total_points_for(0), 0);
        assert_eq!(total_points_for(3), 30);
        assert_eq!(total_points_for(10), 100);
    }

    #[test]
    fn validate_rejects_empty_question_list() {
        assert!(validate_questions(&[]).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_mcq() {
        let questions = vec![mcq(&["Paris", "London"], "Paris")];
        assert!(validate_questions(&questions).is_ok());
    }

    #[test]
    fn validate_rejects_answer_missing_from_options() {
        let questions = vec![mcq(&["Paris", "London"], "Berlin")];
        assert!(validate_questions(&questions).is_err());
    }

    #[test]
    fn validate_rejects_checkbox_answer_outside_options() {
        let questions = vec![QuestionInput {
            text: "Select all primes".to_string(),
            question_type: QuestionType::Checkbox,
            options: vec!["2".to_string(), "3".to_string(), "4".to_string()],
            correct_answer: AnswerValue::Many(vec!["2".to_string(), "5".to_string()]),
        }];
        assert!(validate_questions(&questions).is_err());
    }

    #[test]
    fn validate_rejects_set_answer_for_single_valued_type() {
        let questions = vec![QuestionInput {
            text: "True or false?".to_string(),
            question_type: QuestionType::TrueFalse,
            options: vec![],
            correct_answer: AnswerValue::Many(vec!["True".to_string()]),
        }];
        assert!(validate_questions(&questions).is_err());
    }

    #[test]
    fn answer_value_deserializes_untagged() {
        let one: AnswerValue = serde_json::from_str("\"Paris\"").unwrap();
        assert_eq!(one, AnswerValue::One("Paris".to_string()));

        let many: AnswerValue = serde_json::from_str("[\"A\",\"C\"]").unwrap();
        assert_eq!(
            many,
            AnswerValue::Many(vec!["A".to_string(), "C".to_string()])
        );
    }
}
