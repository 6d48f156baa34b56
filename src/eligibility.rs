// src/eligibility.rs
//
// Decides whether a user may currently take a quiz. Pure: callers load the
// quiz and any existing submission and pass the current time in.

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::quiz::Quiz;
use crate::models::submission::{SUBMISSION_STATUS_COMPLETED, Submission};

/// Why a user may not take a quiz right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotAssigned,
    NotYetAvailable,
    NoLongerAvailable,
    AlreadyCompleted,
}

impl Denial {
    pub fn message(&self) -> &'static str {
        match self {
            Denial::NotAssigned => "You are not assigned to this quiz",
            Denial::NotYetAvailable => "Quiz is not available yet",
            Denial::NoLongerAvailable => "Quiz is no longer available",
            Denial::AlreadyCompleted => "You have already completed this quiz",
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NotAssigned | Denial::NotYetAvailable | Denial::NoLongerAvailable => {
                AppError::Forbidden(denial.message().to_string())
            }
            Denial::AlreadyCompleted => AppError::Conflict(denial.message().to_string()),
        }
    }
}

/// Checks, in order: assignment, availability window, prior completion.
/// The first failing check wins. Quiz lifecycle status is filtered upstream
/// (students only ever see active quizzes), not here.
pub fn check_eligibility(
    user_id: i64,
    quiz: &Quiz,
    existing: Option<&Submission>,
    now: DateTime<Utc>,
) -> Result<(), Denial> {
    // An empty assignment list means the quiz is open to everyone.
    if !quiz.assigned_to.is_empty() && !quiz.assigned_to.contains(&user_id) {
        return Err(Denial::NotAssigned);
    }

    if let Some(start) = quiz.availability_start {
        if now < start {
            return Err(Denial::NotYetAvailable);
        }
    }

    if let Some(end) = quiz.availability_end {
        if now > end {
            return Err(Denial::NoLongerAvailable);
        }
    }

    if let Some(submission) = existing {
        if submission.status == SUBMISSION_STATUS_COMPLETED {
            return Err(Denial::AlreadyCompleted);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::SUBMISSION_STATUS_IN_PROGRESS;
    use chrono::TimeZone;
    use sqlx::types::Json;

    fn quiz() -> Quiz {
        Quiz {
            id: 1,
            topic: "Geography".to_string(),
            description: String::new(),
            questions: Json(vec![]),
            created_by: None,
            status: "active".to_string(),
            availability_start: None,
            availability_end: None,
            time_limit_minutes: None,
            assigned_to: Json(vec![]),
            total_points: 0,
            created_at: None,
        }
    }

    fn submission(status: &str) -> Submission {
        Submission {
            id: 1,
            user_id: 7,
            quiz_id: 1,
            answers: Json(vec![]),
            score: 0,
            total_possible: 0,
            percentage: 0,
            status: status.to_string(),
            time_taken_seconds: 0,
            started_at: None,
            submitted_at: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn open_quiz_is_eligible_for_anyone() {
        assert_eq!(check_eligibility(7, &quiz(), None, at(12)), Ok(()));
    }

    #[test]
    fn assigned_quiz_rejects_other_users() {
        let mut q = quiz();
        q.assigned_to = Json(vec![42]);

        assert_eq!(
            check_eligibility(7, &q, None, at(12)),
            Err(Denial::NotAssigned)
        );
        assert_eq!(check_eligibility(42, &q, None, at(12)), Ok(()));
    }

    #[test]
    fn quiz_before_window_is_not_yet_available() {
        let mut q = quiz();
        q.availability_start = Some(at(14));

        assert_eq!(
            check_eligibility(7, &q, None, at(12)),
            Err(Denial::NotYetAvailable)
        );
        assert_eq!(check_eligibility(7, &q, None, at(14)), Ok(()));
    }

    #[test]
    fn quiz_after_window_is_no_longer_available() {
        let mut q = quiz();
        q.availability_end = Some(at(10));

        assert_eq!(
            check_eligibility(7, &q, None, at(12)),
            Err(Denial::NoLongerAvailable)
        );
        assert_eq!(check_eligibility(7, &q, None, at(10)), Ok(()));
    }

    #[test]
    fn completed_submission_blocks_retake() {
        let existing = submission(SUBMISSION_STATUS_COMPLETED);
        assert_eq!(
            check_eligibility(7, &quiz(), Some(&existing), at(12)),
            Err(Denial::AlreadyCompleted)
        );
    }

    #[test]
    fn in_progress_submission_does_not_block() {
        let existing = submission(SUBMISSION_STATUS_IN_PROGRESS);
        assert_eq!(
            check_eligibility(7, &quiz(), Some(&existing), at(12)),
            Ok(())
        );
    }

    #[test]
    fn assignment_is_checked_before_availability_and_completion() {
        let mut q = quiz();
        q.assigned_to = Json(vec![42]);
        q.availability_start = Some(at(14));
        let existing = submission(SUBMISSION_STATUS_COMPLETED);

        // All three checks would fail; assignment is reported first.
        assert_eq!(
            check_eligibility(7, &q, Some(&existing), at(12)),
            Err(Denial::NotAssigned)
        );
    }

    #[test]
    fn availability_is_checked_before_completion() {
        let mut q = quiz();
        q.availability_start = Some(at(14));
        let existing = submission(SUBMISSION_STATUS_COMPLETED);

        assert_eq!(
            check_eligibility(7, &q, Some(&existing), at(12)),
            Err(Denial::NotYetAvailable)
        );
    }
}
