// src/handlers/quiz.rs
//
// Student-facing quiz surface: listing, taking, submitting.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use sqlx::types::Json as SqlJson;

use crate::{
    eligibility::{Denial, check_eligibility},
    error::AppError,
    handlers::auth::ensure_user,
    models::{
        quiz::{PublicQuiz, QUIZ_STATUS_ACTIVE, Quiz, QuizSummary},
        submission::{
            OwnSubmission, SUBMISSION_STATUS_COMPLETED, SubmitQuizRequest, SubmitQuizResponse,
            Submission,
        },
    },
    scoring::score_quiz,
    utils::jwt::Claims,
};

async fn load_quiz(pool: &PgPool, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, topic, description, questions, created_by, status,
               availability_start, availability_end, time_limit_minutes,
               assigned_to, total_points, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    Ok(quiz)
}

async fn load_submission(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
) -> Result<Option<Submission>, AppError> {
    let submission = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, user_id, quiz_id, answers, score, total_possible,
               percentage, status, time_taken_seconds, started_at, submitted_at
        FROM submissions
        WHERE user_id = $1 AND quiz_id = $2
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    Ok(submission)
}

/// Lists active quizzes the caller may currently take: assigned to them (or
/// to everyone) and inside the availability window.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = ensure_user(&pool, &claims).await?;

    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, topic, description, questions, created_by, status,
               availability_start, availability_end, time_limit_minutes,
               assigned_to, total_points, created_at
        FROM quizzes
        WHERE status = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(QUIZ_STATUS_ACTIVE)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let now = Utc::now();
    let available: Vec<QuizSummary> = quizzes
        .iter()
        .filter(|quiz| {
            let assigned = quiz.assigned_to.is_empty() || quiz.assigned_to.contains(&user.id);
            let started = quiz.availability_start.is_none_or(|start| now >= start);
            let not_ended = quiz.availability_end.is_none_or(|end| now <= end);
            assigned && started && not_ended
        })
        .map(QuizSummary::from_quiz)
        .collect();

    Ok(Json(available))
}

/// Fetches a single quiz for taking, with answer keys stripped.
///
/// Gated on assignment, availability window and prior completion. Quizzes
/// that are not active are invisible to students (404).
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = ensure_user(&pool, &claims).await?;

    let quiz = load_quiz(&pool, quiz_id)
        .await?
        .filter(|q| q.status == QUIZ_STATUS_ACTIVE)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let existing = load_submission(&pool, user.id, quiz.id).await?;

    check_eligibility(user.id, &quiz, existing.as_ref(), Utc::now())?;

    Ok(Json(PublicQuiz::from_quiz(&quiz)))
}

/// Submits a quiz attempt: validates the request, grades every answer,
/// and commits the completed submission.
///
/// * Answers are graded positionally against the quiz's question list.
/// * The write is a single upsert keyed on (user_id, quiz_id). An existing
///   in-progress attempt is updated in place, so retries are idempotent.
///   If a completed record already holds the slot (including one committed
///   by a concurrent request), the upsert writes nothing and the call is
///   rejected as already completed.
/// * The response never contains the per-answer correctness trail.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Fail fast on malformed requests before any scoring work.
    let quiz_id = req
        .quiz_id
        .ok_or(AppError::BadRequest("Quiz ID is required".to_string()))?;
    let submitted = req
        .answers
        .ok_or(AppError::BadRequest("Answers array is required".to_string()))?;
    let time_taken_seconds = match req.time_taken_seconds {
        Some(t) if t > 0 => t,
        _ => return Err(AppError::BadRequest("Time taken is required".to_string())),
    };

    let user = ensure_user(&pool, &claims).await?;

    let quiz = load_quiz(&pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let existing = load_submission(&pool, user.id, quiz.id).await?;
    if let Some(existing) = &existing {
        if existing.status == SUBMISSION_STATUS_COMPLETED {
            return Err(Denial::AlreadyCompleted.into());
        }
    }

    let values: Vec<_> = submitted.into_iter().map(|a| a.answer).collect();
    let outcome = score_quiz(&quiz, &values);

    let now = Utc::now();

    // Single commit point. The unique (user_id, quiz_id) constraint makes
    // concurrent submits converge on one row; the WHERE clause keeps a
    // completed record terminal, so the losing writer gets no row back.
    let committed: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO submissions
            (user_id, quiz_id, answers, score, total_possible, percentage,
             status, time_taken_seconds, started_at, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        ON CONFLICT (user_id, quiz_id) DO UPDATE SET
            answers = EXCLUDED.answers,
            score = EXCLUDED.score,
            total_possible = EXCLUDED.total_possible,
            percentage = EXCLUDED.percentage,
            status = EXCLUDED.status,
            time_taken_seconds = EXCLUDED.time_taken_seconds,
            submitted_at = EXCLUDED.submitted_at
        WHERE submissions.status <> $7
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(quiz.id)
    .bind(SqlJson(&outcome.answers))
    .bind(outcome.score)
    .bind(outcome.total_possible)
    .bind(outcome.percentage)
    .bind(SUBMISSION_STATUS_COMPLETED)
    .bind(time_taken_seconds)
    .bind(now)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if committed.is_none() {
        return Err(Denial::AlreadyCompleted.into());
    }

    tracing::info!(
        user_id = user.id,
        quiz_id = quiz.id,
        score = outcome.score,
        percentage = outcome.percentage,
        "quiz submitted"
    );

    Ok(Json(SubmitQuizResponse {
        score: outcome.score,
        total_possible: outcome.total_possible,
        percentage: outcome.percentage,
        time_taken_seconds,
    }))
}

/// Lists the caller's own submissions, newest first. No per-answer trail.
pub async fn my_submissions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = ensure_user(&pool, &claims).await?;

    let submissions = sqlx::query_as::<_, OwnSubmission>(
        r#"
        SELECT s.id, s.quiz_id, q.topic AS quiz_topic, s.score,
               s.total_possible, s.percentage, s.status,
               s.time_taken_seconds, s.submitted_at
        FROM submissions s
        JOIN quizzes q ON s.quiz_id = q.id
        WHERE s.user_id = $1
        ORDER BY s.submitted_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}
