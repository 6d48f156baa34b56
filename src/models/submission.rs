// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::quiz::AnswerValue;

pub const SUBMISSION_STATUS_IN_PROGRESS: &str = "in-progress";
pub const SUBMISSION_STATUS_COMPLETED: &str = "completed";

/// Per-question grading record embedded in a submission.
/// `answer` is None when the student never answered the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: i64,
    pub answer: Option<AnswerValue>,
    pub is_correct: bool,
    pub points: i64,
}

/// Represents the 'submissions' table in the database.
/// At most one row exists per (user, quiz), enforced by a unique constraint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub answers: Json<Vec<AnswerRecord>>,
    pub score: i64,

    /// Snapshot of the quiz total at submission time. Never recomputed, so
    /// historical scores stay stable if the quiz is edited afterwards.
    pub total_possible: i64,

    pub percentage: i64,

    /// 'in-progress' or 'completed'. Completed is terminal.
    pub status: String,

    pub time_taken_seconds: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One answer as submitted by the client. Answers are matched to questions
/// by position; `question_id` is carried for the client's benefit only.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Option<i64>,
    pub answer: AnswerValue,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub quiz_id: Option<i64>,
    pub answers: Option<Vec<SubmittedAnswer>>,
    pub time_taken_seconds: Option<i64>,
}

/// Redacted result returned to the submitting student. The per-answer
/// correctness trail is reserved for the admin detail view.
#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub score: i64,
    pub total_possible: i64,
    pub percentage: i64,
    pub time_taken_seconds: i64,
}

/// Listing row joined with user email and quiz topic.
#[derive(Debug, Serialize, FromRow)]
pub struct SubmissionOverview {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub quiz_id: i64,
    pub quiz_topic: String,
    pub score: i64,
    pub total_possible: i64,
    pub percentage: i64,
    pub status: String,
    pub time_taken_seconds: i64,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Full submission detail for the admin read path, including the per-answer
/// correctness trail.
#[derive(Debug, Serialize, FromRow)]
pub struct SubmissionDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub quiz_id: i64,
    pub quiz_topic: String,
    pub answers: Json<Vec<AnswerRecord>>,
    pub score: i64,
    pub total_possible: i64,
    pub percentage: i64,
    pub status: String,
    pub time_taken_seconds: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A student's own submission, without the per-answer trail.
#[derive(Debug, Serialize, FromRow)]
pub struct OwnSubmission {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_topic: String,
    pub score: i64,
    pub total_possible: i64,
    pub percentage: i64,
    pub status: String,
    pub time_taken_seconds: i64,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Aggregate statistics over the submissions of one quiz.
#[derive(Debug, PartialEq, Serialize)]
pub struct QuizStatistics {
    pub total_submissions: usize,
    pub average_score: i64,
    pub highest_score: i64,
    pub lowest_score: i64,
}

impl QuizStatistics {
    /// Computes statistics over submission percentages. All values are 0 when
    /// there are no submissions.
    pub fn from_percentages(percentages: &[i64]) -> Self {
        if percentages.is_empty() {
            return Self {
                total_submissions: 0,
                average_score: 0,
                highest_score: 0,
                lowest_score: 0,
            };
        }

        let sum: i64 = percentages.iter().sum();
        let average = (sum as f64 / percentages.len() as f64).round() as i64;

        Self {
            total_submissions: percentages.len(),
            average_score: average,
            highest_score: *percentages.iter().max().unwrap(),
            lowest_score: *percentages.iter().min().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_for_empty_set_are_zero() {
        let stats = QuizStatistics::from_percentages(&[]);
        assert_eq!(
            stats,
            QuizStatistics {
                total_submissions: 0,
                average_score: 0,
                highest_score: 0,
                lowest_score: 0,
            }
        );
    }

    #[test]
    fn statistics_round_the_average() {
        let stats = QuizStatistics::from_percentages(&[100, 67, 33]);
        assert_eq!(stats.total_submissions, 3);
        // (100 + 67 + 33) / 3 = 66.67
        assert_eq!(stats.average_score, 67);
        assert_eq!(stats.highest_score, 100);
        assert_eq!(stats.lowest_score, 33);
    }
}
