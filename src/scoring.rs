// src/scoring.rs
//
// Pure grading logic: no database access, no side effects.

use std::collections::HashSet;

use crate::config::POINTS_PER_QUESTION;
use crate::models::quiz::{AnswerValue, Question, Quiz, QuestionType};
use crate::models::submission::AnswerRecord;

/// Aggregate result of grading one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub score: i64,
    pub total_possible: i64,
    pub percentage: i64,
    /// One record per quiz question, in quiz order.
    pub answers: Vec<AnswerRecord>,
}

/// Grades a single answer against its question.
/// Returns (is_correct, points awarded). No partial credit.
pub fn grade(question: &Question, submitted: &AnswerValue) -> (bool, i64) {
    let is_correct = match question.question_type {
        // Exact equality, case-sensitive and untrimmed.
        QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::Numeric => {
            match (&question.correct_answer, submitted) {
                (AnswerValue::One(correct), AnswerValue::One(given)) => given == correct,
                _ => false,
            }
        }
        // Free text is forgiving about case and surrounding whitespace.
        QuestionType::FreeText => match (&question.correct_answer, submitted) {
            (AnswerValue::One(correct), AnswerValue::One(given)) => {
                given.trim().to_lowercase() == correct.trim().to_lowercase()
            }
            _ => false,
        },
        // Symmetric set equality: every correct option selected and nothing
        // else. Single values coerce to one-element sets.
        QuestionType::Checkbox => as_set(submitted) == as_set(&question.correct_answer),
    };

    let points = if is_correct { POINTS_PER_QUESTION } else { 0 };
    (is_correct, points)
}

fn as_set(value: &AnswerValue) -> HashSet<&str> {
    match value {
        AnswerValue::One(v) => HashSet::from([v.as_str()]),
        AnswerValue::Many(vs) => vs.iter().map(String::as_str).collect(),
    }
}

/// Grades every question of a quiz against the submitted answers.
///
/// Answers are matched to questions by position: answers[i] is graded against
/// questions[i]. A question with no submitted answer scores 0 and stays in
/// the trail; extra trailing answers are ignored. The total is the quiz's
/// stored point total, so the outcome is a stable snapshot even if the quiz
/// is edited later.
pub fn score_quiz(quiz: &Quiz, submitted: &[AnswerValue]) -> ScoreOutcome {
    let mut score = 0;
    let mut answers = Vec::with_capacity(quiz.questions.len());

    for (i, question) in quiz.questions.iter().enumerate() {
        let record = match submitted.get(i) {
            Some(value) => {
                let (is_correct, points) = grade(question, value);
                score += points;
                AnswerRecord {
                    question_id: question.id,
                    answer: Some(value.clone()),
                    is_correct,
                    points,
                }
            }
            None => AnswerRecord {
                question_id: question.id,
                answer: None,
                is_correct: false,
                points: 0,
            },
        };
        answers.push(record);
    }

    let total_possible = quiz.total_points;

    ScoreOutcome {
        score,
        total_possible,
        percentage: percentage(score, total_possible),
        answers,
    }
}

/// Rounded percentage, defined as 0 when the total is 0.
pub fn percentage(score: i64, total_possible: i64) -> i64 {
    if total_possible <= 0 {
        return 0;
    }
    ((score as f64 / total_possible as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(question_type: QuestionType, correct: AnswerValue) -> Question {
        Question {
            id: 1,
            text: "What is the capital of France?".to_string(),
            question_type,
            options: vec![],
            correct_answer: correct,
        }
    }

    fn one(s: &str) -> AnswerValue {
        AnswerValue::One(s.to_string())
    }

    fn many(values: &[&str]) -> AnswerValue {
        AnswerValue::Many(values.iter().map(|s| s.to_string()).collect())
    }

    fn quiz_with(questions: Vec<Question>) -> Quiz {
        let total_points = crate::models::quiz::total_points_for(questions.len());
        Quiz {
            id: 1,
            topic: "Geography".to_string(),
            description: String::new(),
            questions: Json(questions),
            created_by: None,
            status: "active".to_string(),
            availability_start: None,
            availability_end: None,
            time_limit_minutes: None,
            assigned_to: Json(vec![]),
            total_points,
            created_at: None,
        }
    }

    #[test]
    fn multiple_choice_is_case_sensitive() {
        let q = question(QuestionType::MultipleChoice, one("Paris"));
        assert_eq!(grade(&q, &one("Paris")), (true, 10));
        assert_eq!(grade(&q, &one("paris")), (false, 0));
    }

    #[test]
    fn true_false_requires_exact_match() {
        let q = question(QuestionType::TrueFalse, one("True"));
        assert_eq!(grade(&q, &one("True")), (true, 10));
        assert_eq!(grade(&q, &one("true")), (false, 0));
        assert_eq!(grade(&q, &one("False")), (false, 0));
    }

    #[test]
    fn free_text_trims_and_ignores_case() {
        let q = question(QuestionType::FreeText, one("Paris"));
        assert_eq!(grade(&q, &one("  paris ")), (true, 10));
        assert_eq!(grade(&q, &one("PARIS")), (true, 10));
        assert_eq!(grade(&q, &one("Lyon")), (false, 0));
    }

    #[test]
    fn numeric_matches_exactly() {
        let q = question(QuestionType::Numeric, one("42"));
        assert_eq!(grade(&q, &one("42")), (true, 10));
        assert_eq!(grade(&q, &one("42.0")), (false, 0));
    }

    #[test]
    fn checkbox_is_order_independent_set_equality() {
        let q = question(QuestionType::Checkbox, many(&["A", "C"]));
        assert_eq!(grade(&q, &many(&["C", "A"])), (true, 10));
        // Missing C.
        assert_eq!(grade(&q, &many(&["A"])), (false, 0));
        // Extra B.
        assert_eq!(grade(&q, &many(&["A", "B", "C"])), (false, 0));
    }

    #[test]
    fn checkbox_coerces_single_values_to_sets() {
        let q = question(QuestionType::Checkbox, one("A"));
        assert_eq!(grade(&q, &many(&["A"])), (true, 10));
        assert_eq!(grade(&q, &one("A")), (true, 10));
    }

    #[test]
    fn shape_mismatch_grades_incorrect() {
        let q = question(QuestionType::MultipleChoice, one("Paris"));
        assert_eq!(grade(&q, &many(&["Paris"])), (false, 0));
    }

    #[test]
    fn score_quiz_aggregates_and_rounds_percentage() {
        let quiz = quiz_with(vec![
            question(QuestionType::MultipleChoice, one("Paris")),
            question(QuestionType::FreeText, one("Berlin")),
            question(QuestionType::TrueFalse, one("True")),
        ]);

        let outcome = score_quiz(&quiz, &[one("Paris"), one("berlin "), one("False")]);
        assert_eq!(outcome.score, 20);
        assert_eq!(outcome.total_possible, 30);
        // 20/30 = 66.67, rounded.
        assert_eq!(outcome.percentage, 67);
        assert_eq!(outcome.answers.len(), 3);
        assert!(outcome.answers[0].is_correct);
        assert!(outcome.answers[1].is_correct);
        assert!(!outcome.answers[2].is_correct);
    }

    #[test]
    fn missing_trailing_answers_score_zero_without_aborting() {
        let quiz = quiz_with(vec![
            question(QuestionType::MultipleChoice, one("Paris")),
            question(QuestionType::MultipleChoice, one("Berlin")),
            question(QuestionType::MultipleChoice, one("Madrid")),
        ]);

        let outcome = score_quiz(&quiz, &[one("Paris")]);
        assert_eq!(outcome.score, 10);
        assert_eq!(outcome.answers.len(), 3);
        assert_eq!(outcome.answers[1].answer, None);
        assert!(!outcome.answers[1].is_correct);
        assert_eq!(outcome.answers[2].points, 0);
    }

    #[test]
    fn extra_answers_are_ignored() {
        let quiz = quiz_with(vec![question(QuestionType::MultipleChoice, one("Paris"))]);

        let outcome = score_quiz(&quiz, &[one("Paris"), one("Berlin"), one("Madrid")]);
        assert_eq!(outcome.score, 10);
        assert_eq!(outcome.answers.len(), 1);
    }

    #[test]
    fn empty_quiz_has_zero_percentage() {
        let quiz = quiz_with(vec![]);
        let outcome = score_quiz(&quiz, &[]);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.total_possible, 0);
        assert_eq!(outcome.percentage, 0);
    }

    #[test]
    fn percentage_guards_against_zero_total() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(10, 0), 0);
        assert_eq!(percentage(20, 30), 67);
        assert_eq!(percentage(30, 30), 100);
    }
}
