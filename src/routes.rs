use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{engine::Engine, error::Result, models::*, store::Store};

pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/health/ready", get(ready))
        // enrollment
        .route("/api/enrollments", post(enroll))
        .route("/api/learners/:learner_id/enrollments", get(list_enrollments))
        // lesson progress
        .route("/api/courses/:course_id/lessons/:lesson_id/complete", post(mark_complete))
        .route("/api/courses/:course_id/lessons/:lesson_id/incomplete", post(mark_incomplete))
        .route("/api/courses/:course_id/lessons/:lesson_id/toggle", post(toggle))
        .route("/api/courses/:course_id/lessons/:lesson_id/responses", get(lesson_responses))
        // quiz
        .route("/api/questions/:question_id/responses", post(submit_response))
        // aggregate + certificates
        .route("/api/courses/:course_id/progress", get(get_progress))
        .route(
            "/api/courses/:course_id/certificate",
            post(ensure_certificate).get(get_certificate),
        )
        .route("/api/certificates/:code", get(verify_certificate))
        .with_state(engine)
}

async fn ready(State(engine): State<Engine>) -> Result<&'static str> {
    engine.store().ping().await?;
    Ok("ok")
}

async fn enroll(State(engine): State<Engine>, Json(req): Json<EnrollReq>) -> Result<Json<Enrollment>> {
    let enrollment = engine.enroll(&req.learner_id, req.course_id).await?;
    Ok(Json(enrollment))
}

async fn list_enrollments(
    State(engine): State<Engine>,
    Path(learner_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>> {
    Ok(Json(engine.list_enrollments(&learner_id).await?))
}

async fn mark_complete(
    State(engine): State<Engine>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<LearnerReq>,
) -> Result<Json<LessonProgress>> {
    let row = engine.mark_complete(&req.learner_id, course_id, lesson_id).await?;
    Ok(Json(row))
}

async fn mark_incomplete(
    State(engine): State<Engine>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<LearnerReq>,
) -> Result<Json<LessonProgress>> {
    let row = engine.mark_incomplete(&req.learner_id, course_id, lesson_id).await?;
    Ok(Json(row))
}

async fn toggle(
    State(engine): State<Engine>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<LearnerReq>,
) -> Result<Json<LessonProgress>> {
    let row = engine.toggle(&req.learner_id, course_id, lesson_id).await?;
    Ok(Json(row))
}

async fn lesson_responses(
    State(engine): State<Engine>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Query(q): Query<LearnerReq>,
) -> Result<Json<Vec<QuizResponse>>> {
    let rows = engine.lesson_responses(&q.learner_id, course_id, lesson_id).await?;
    Ok(Json(rows))
}

async fn submit_response(
    State(engine): State<Engine>,
    Path(question_id): Path<Uuid>,
    Json(req): Json<SubmitResponseReq>,
) -> Result<Json<SubmitOutcome>> {
    let outcome = engine
        .submit_response(&req.learner_id, question_id, &req.raw_response)
        .await?;
    Ok(Json(outcome))
}

async fn get_progress(
    State(engine): State<Engine>,
    Path(course_id): Path<Uuid>,
    Query(q): Query<LearnerReq>,
) -> Result<Json<CourseProgress>> {
    Ok(Json(engine.get_progress(&q.learner_id, course_id).await?))
}

async fn ensure_certificate(
    State(engine): State<Engine>,
    Path(course_id): Path<Uuid>,
    Json(req): Json<LearnerReq>,
) -> Result<Json<CertificateIssue>> {
    Ok(Json(engine.ensure_certificate(&req.learner_id, course_id).await?))
}

async fn get_certificate(
    State(engine): State<Engine>,
    Path(course_id): Path<Uuid>,
    Query(q): Query<LearnerReq>,
) -> Result<Json<Certificate>> {
    Ok(Json(engine.get_certificate(&q.learner_id, course_id).await?))
}

async fn verify_certificate(
    State(engine): State<Engine>,
    Path(code): Path<String>,
) -> Result<Json<Certificate>> {
    Ok(Json(engine.verify_certificate(&code).await?))
}
