// src/handlers/admin.rs
//
// Admin surface: quiz management and submission read paths.
// All routes sit behind auth + admin middleware.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::auth::ensure_user,
    models::{
        quiz::{
            CreateQuizRequest, QUIZ_STATUS_ACTIVE, QUIZ_STATUS_COMPLETED, QUIZ_STATUS_DRAFT,
            Question, QuestionInput, Quiz, QuizSummary, UpdateQuizRequest, total_points_for,
            validate_questions,
        },
        submission::{QuizStatistics, SubmissionDetail, SubmissionOverview},
    },
    utils::{html::clean_html, jwt::Claims},
};

fn is_valid_status(status: &str) -> bool {
    matches!(
        status,
        QUIZ_STATUS_DRAFT | QUIZ_STATUS_ACTIVE | QUIZ_STATUS_COMPLETED
    )
}

/// Builds the persisted question list from request input: ids are assigned
/// positionally within the quiz and question text is sanitized.
fn materialize_questions(inputs: &[QuestionInput]) -> Vec<Question> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: (i + 1) as i64,
            text: clean_html(&q.text),
            question_type: q.question_type,
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
        })
        .collect()
}

/// Creates a quiz. Questions arrive already materialized (question
/// generation happens elsewhere); the point total is always derived from the
/// question count, never taken from the client.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let status = payload
        .status
        .clone()
        .unwrap_or_else(|| QUIZ_STATUS_ACTIVE.to_string());
    if !is_valid_status(&status) {
        return Err(AppError::BadRequest(format!(
            "Invalid quiz status '{}'",
            status
        )));
    }

    let user = ensure_user(&pool, &claims).await?;

    let questions = materialize_questions(&payload.questions);
    let total_points = total_points_for(questions.len());

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes
            (topic, description, questions, created_by, status,
             availability_start, availability_end, time_limit_minutes,
             assigned_to, total_points)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, topic, description, questions, created_by, status,
                  availability_start, availability_end, time_limit_minutes,
                  assigned_to, total_points, created_at
        "#,
    )
    .bind(clean_html(&payload.topic))
    .bind(clean_html(&payload.description))
    .bind(SqlJson(&questions))
    .bind(user.id)
    .bind(&status)
    .bind(payload.availability_start)
    .bind(payload.availability_end)
    .bind(payload.time_limit_minutes)
    .bind(SqlJson(&payload.assigned_to))
    .bind(total_points)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists all quizzes, newest first.
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, topic, description, questions, created_by, status,
               availability_start, availability_end, time_limit_minutes,
               assigned_to, total_points, created_at
        FROM quizzes
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let summaries: Vec<QuizSummary> = quizzes.iter().map(QuizSummary::from_quiz).collect();

    Ok(Json(summaries))
}

/// Updates quiz fields. Replacing the question list recomputes the point
/// total in the same statement.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(topic) = payload.topic {
        sqlx::query("UPDATE quizzes SET topic = $1 WHERE id = $2")
            .bind(clean_html(&topic))
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(description) = payload.description {
        sqlx::query("UPDATE quizzes SET description = $1 WHERE id = $2")
            .bind(clean_html(&description))
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(inputs) = payload.questions {
        if let Err(e) = validate_questions(&inputs) {
            return Err(AppError::BadRequest(e.to_string()));
        }
        let questions = materialize_questions(&inputs);
        let total_points = total_points_for(questions.len());

        sqlx::query("UPDATE quizzes SET questions = $1, total_points = $2 WHERE id = $3")
            .bind(SqlJson(&questions))
            .bind(total_points)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(status) = payload.status {
        if !is_valid_status(&status) {
            return Err(AppError::BadRequest(format!(
                "Invalid quiz status '{}'",
                status
            )));
        }
        sqlx::query("UPDATE quizzes SET status = $1 WHERE id = $2")
            .bind(&status)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(assigned_to) = payload.assigned_to {
        sqlx::query("UPDATE quizzes SET assigned_to = $1 WHERE id = $2")
            .bind(SqlJson(&assigned_to))
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if payload.availability_start.is_some() || payload.availability_end.is_some() {
        sqlx::query(
            "UPDATE quizzes SET
                availability_start = COALESCE($1, availability_start),
                availability_end = COALESCE($2, availability_end)
             WHERE id = $3",
        )
        .bind(payload.availability_start)
        .bind(payload.availability_end)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(time_limit_minutes) = payload.time_limit_minutes {
        sqlx::query("UPDATE quizzes SET time_limit_minutes = $1 WHERE id = $2")
            .bind(time_limit_minutes)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, topic, description, questions, created_by, status,
               availability_start, availability_end, time_limit_minutes,
               assigned_to, total_points, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(quiz))
}

const SUBMISSION_OVERVIEW_COLUMNS: &str = r#"
        SELECT s.id, s.user_id, u.email AS user_email, s.quiz_id,
               q.topic AS quiz_topic, s.score, s.total_possible, s.percentage,
               s.status, s.time_taken_seconds, s.submitted_at
        FROM submissions s
        JOIN users u ON s.user_id = u.id
        JOIN quizzes q ON s.quiz_id = q.id
"#;

/// Lists every submission, newest first.
pub async fn list_submissions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, SubmissionOverview>(&format!(
        "{} ORDER BY s.submitted_at DESC",
        SUBMISSION_OVERVIEW_COLUMNS
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}

/// Detailed view of one submission, per-answer correctness included.
/// This is the only read path that exposes the grading trail.
pub async fn submission_detail(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, SubmissionDetail>(
        r#"
        SELECT s.id, s.user_id, u.email AS user_email, s.quiz_id,
               q.topic AS quiz_topic, s.answers, s.score, s.total_possible,
               s.percentage, s.status, s.time_taken_seconds, s.started_at,
               s.submitted_at
        FROM submissions s
        JOIN users u ON s.user_id = u.id
        JOIN quizzes q ON s.quiz_id = q.id
        WHERE s.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch submission {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(submission))
}

/// Lists submissions for one quiz together with aggregate statistics.
pub async fn quiz_submissions(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let submissions = sqlx::query_as::<_, SubmissionOverview>(&format!(
        "{} WHERE s.quiz_id = $1 ORDER BY s.submitted_at DESC",
        SUBMISSION_OVERVIEW_COLUMNS
    ))
    .bind(quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let percentages: Vec<i64> = submissions.iter().map(|s| s.percentage).collect();
    let statistics = QuizStatistics::from_percentages(&percentages);

    Ok(Json(serde_json::json!({
        "submissions": submissions,
        "statistics": statistics,
    })))
}

/// Lists one student's submissions, newest first.
pub async fn student_submissions(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, SubmissionOverview>(&format!(
        "{} WHERE s.user_id = $1 ORDER BY s.submitted_at DESC",
        SUBMISSION_OVERVIEW_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch student submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}
