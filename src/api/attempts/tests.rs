use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use time::Duration;
use tower::ServiceExt;

use crate::core::config::Settings;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support::{self, QuestionSeed};

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn start(app: &Router, assessment_id: &str, token: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/v1/assessments/{assessment_id}/start"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    body["id"].as_str().expect("attempt id").to_string()
}

fn ladder() -> Vec<QuestionSeed> {
    (1..=6)
        .map(|difficulty| QuestionSeed::short(&format!("a{difficulty}"), difficulty, "core"))
        .collect()
}

#[tokio::test]
async fn attempt_routes_require_token() {
    let _guard = test_support::env_lock().await;
    test_support::set_test_env();
    let (_state, app) = test_support::lazy_app(Settings::load().expect("settings"));

    for (method, uri) in [
        (Method::POST, "/api/v1/assessments/a1/start"),
        (Method::POST, "/api/v1/attempts/x1/next-question"),
        (Method::POST, "/api/v1/attempts/x1/submit"),
        (Method::GET, "/api/v1/attempts/x1/result"),
        (Method::GET, "/api/v1/attempts/mine"),
    ] {
        let response = app
            .clone()
            .oneshot(test_support::json_request(method, uri, None, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn instructors_cannot_start_attempts() {
    let _guard = test_support::env_lock().await;
    test_support::set_test_env();
    let (state, app) = test_support::lazy_app(Settings::load().expect("settings"));
    let token = test_support::bearer_token("teacher-1", UserRole::Instructor, state.settings());

    let (status, body) =
        call(&app, Method::POST, "/api/v1/assessments/a1/start", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Student access required");
}

#[tokio::test]
async fn answer_payload_is_validated_before_storage() {
    let _guard = test_support::env_lock().await;
    test_support::set_test_env();
    let (state, app) = test_support::lazy_app(Settings::load().expect("settings"));
    let token = test_support::bearer_token("student-1", UserRole::Student, state.settings());

    for body in [
        json!({"question_id": "", "answer": "x"}),
        json!({"question_id": "q1", "answer": "x", "time_spent_seconds": -5}),
    ] {
        let (status, response) =
            call(&app, Method::POST, "/api/v1/attempts/x1/answer", &token, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {response}");
    }
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let _guard = test_support::env_lock().await;
    test_support::set_test_env();
    let (_state, app) = test_support::lazy_app(Settings::load().expect("settings"));

    let response = app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/attempts/mine",
            Some("not-a-jwt"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn adaptive_attempt_runs_until_pool_is_exhausted() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", true, Some(30), ladder()).await;
    let token = test_support::bearer_token("student-1", UserRole::Student, ctx.state.settings());
    let attempt_id = start(&ctx.app, &assessment.id, &token).await;
    let next_uri = format!("/api/v1/attempts/{attempt_id}/next-question");
    let answer_uri = format!("/api/v1/attempts/{attempt_id}/answer");

    let (status, first) = call(&ctx.app, Method::POST, &next_uri, &token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {first}");
    assert_eq!(first["status"], "question");
    assert_eq!(first["adaptive"]["reason"], "Starting at baseline difficulty");
    assert_eq!(first["question"]["difficulty"], 5);
    let first_id = first["question"]["id"].as_str().expect("question id").to_string();
    assert!(first["question"].get("correct_answer").is_none());

    // Asking again before answering re-issues the same question.
    let (_, again) = call(&ctx.app, Method::POST, &next_uri, &token, None).await;
    assert_eq!(again["question"]["id"], first_id.as_str());

    let (status, _) = call(
        &ctx.app,
        Method::POST,
        &answer_uri,
        &token,
        Some(json!({"question_id": "someone-else", "answer": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut seen = vec![first_id.clone()];
    let mut current = first;
    loop {
        let question_id = current["question"]["id"].as_str().expect("question id").to_string();
        let difficulty = current["question"]["difficulty"].as_i64().expect("difficulty");
        let answer = format!("a{difficulty}");
        let (status, recorded) = call(
            &ctx.app,
            Method::POST,
            &answer_uri,
            &token,
            Some(json!({"question_id": question_id, "answer": answer, "time_spent_seconds": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "response: {recorded}");
        assert_eq!(recorded["status"], "recorded");
        assert_eq!(recorded["correct"], true);

        let (_, next) = call(&ctx.app, Method::POST, &next_uri, &token, None).await;
        if next["status"] == "completed" {
            let result = &next["result"];
            assert_eq!(result["status"], "completed");
            assert_eq!(result["completion_reason"], "selector_exhausted");
            assert_eq!(result["passed"], true);
            assert_eq!(result["percentage"], 100.0);
            assert_eq!(result["answers"].as_object().expect("answers").len(), 6);
            break;
        }
        let next_id = next["question"]["id"].as_str().expect("question id").to_string();
        assert!(!seen.contains(&next_id), "question {next_id} issued twice");
        seen.push(next_id);
        current = next;
    }
    assert_eq!(seen.len(), 6);

    let (status, _) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/submit"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn manual_submit_scores_and_builds_feedback() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", false, None, ladder()).await;
    let token = test_support::bearer_token("student-1", UserRole::Student, ctx.state.settings());
    let attempt_id = start(&ctx.app, &assessment.id, &token).await;

    let (_, next) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/next-question"),
        &token,
        None,
    )
    .await;
    assert!(next["adaptive"].is_null());
    let question_id = next["question"]["id"].as_str().expect("question id");
    assert!(question_id.ends_with("-q0"));

    let (_, recorded) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/answer"),
        &token,
        Some(json!({"question_id": question_id, "answer": "wrong"})),
    )
    .await;
    assert_eq!(recorded["correct"], false);
    assert_eq!(recorded["explanation"], "Because");

    let (status, result) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/submit"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {result}");
    assert_eq!(result["completion_reason"], "manual_submit");
    assert_eq!(result["score"], 0.0);
    assert_eq!(result["passed"], false);
    assert_eq!(result["feedback"]["weak_tags"], json!(["core"]));

    let teacher = test_support::bearer_token("teacher-1", UserRole::Instructor, ctx.state.settings());
    let (status, _) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/attempts/{attempt_id}/result"),
        &teacher,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stranger = test_support::bearer_token("student-2", UserRole::Student, ctx.state.settings());
    let (status, _) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/attempts/{attempt_id}/result"),
        &stranger,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn start_reuses_open_attempt_and_enforces_max_attempts() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", true, None, ladder()).await;
    let token = test_support::bearer_token("student-1", UserRole::Student, ctx.state.settings());

    let first = start(&ctx.app, &assessment.id, &token).await;
    let (status, reused) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/assessments/{}/start", assessment.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reused["id"], first.as_str());

    let (status, abandoned) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/attempts/{first}/abandon"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(abandoned["status"], "abandoned");
    assert_eq!(abandoned["completion_reason"], "gave_up");
    assert_eq!(abandoned["passed"], false);

    let second = start(&ctx.app, &assessment.id, &token).await;
    assert_ne!(second, first);
    call(&ctx.app, Method::POST, &format!("/api/v1/attempts/{second}/submit"), &token, None).await;

    let (status, body) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/assessments/{}/start", assessment.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Maximum attempts reached");

    let (_, mine) = call(&ctx.app, Method::GET, "/api/v1/attempts/mine", &token, None).await;
    assert_eq!(mine.as_array().expect("attempts").len(), 2);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn overdue_attempt_is_closed_on_next_request() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", true, Some(5), ladder()).await;
    let started = primitive_now_utc() - Duration::minutes(30);
    repositories::submissions::create(
        ctx.state.db(),
        repositories::submissions::CreateSubmission {
            id: "overdue-attempt",
            user_id: "student-1",
            assessment_id: &assessment.id,
            attempt_number: 1,
            started_at: started,
            created_at: started,
            updated_at: started,
        },
    )
    .await
    .expect("insert attempt");
    let token = test_support::bearer_token("student-1", UserRole::Student, ctx.state.settings());

    let (status, body) = call(
        &ctx.app,
        Method::POST,
        "/api/v1/attempts/overdue-attempt/next-question",
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["completion_reason"], "time_limit_elapsed");
    // Wall clock is capped at the five minute deadline.
    assert_eq!(body["result"]["time_spent_seconds"], 300);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn sweeper_closes_overdue_attempts() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", false, Some(1), ladder()).await;
    let started = primitive_now_utc() - Duration::hours(1);
    repositories::submissions::create(
        ctx.state.db(),
        repositories::submissions::CreateSubmission {
            id: "stale",
            user_id: "student-9",
            assessment_id: &assessment.id,
            attempt_number: 1,
            started_at: started,
            created_at: started,
            updated_at: started,
        },
    )
    .await
    .expect("insert attempt");

    let closed = crate::tasks::expiry::close_overdue_attempts(&ctx.state).await.expect("sweep");
    assert_eq!(closed, 1);

    let stored = repositories::submissions::find_by_id(ctx.state.db(), "stale")
        .await
        .expect("fetch")
        .expect("attempt");
    assert_eq!(stored.status, crate::db::types::SubmissionStatus::Completed);
    assert_eq!(
        stored.completion_reason,
        Some(crate::db::types::CompletionReason::TimeLimitElapsed)
    );
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL test database"]
async fn sweeper_skips_a_failing_attempt_and_closes_the_rest() {
    let ctx = test_support::setup_test_context().await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), "teacher-1", false, Some(1), ladder()).await;

    for (id, user_id, hours) in [("broken", "student-8", 3), ("stale", "student-9", 2)] {
        let started = primitive_now_utc() - Duration::hours(hours);
        repositories::submissions::create(
            ctx.state.db(),
            repositories::submissions::CreateSubmission {
                id,
                user_id,
                assessment_id: &assessment.id,
                attempt_number: 1,
                started_at: started,
                created_at: started,
                updated_at: started,
            },
        )
        .await
        .expect("insert attempt");
    }

    // The oldest overdue row cannot be finalized, so it is listed first on every sweep.
    sqlx::query(
        "CREATE FUNCTION reject_broken_finish() RETURNS trigger AS $$
         BEGIN
             IF NEW.id = 'broken' AND NEW.status <> OLD.status THEN
                 RAISE EXCEPTION 'finish rejected';
             END IF;
             RETURN NEW;
         END;
         $$ LANGUAGE plpgsql",
    )
    .execute(ctx.state.db())
    .await
    .expect("create function");
    sqlx::query(
        "CREATE TRIGGER reject_broken_finish BEFORE UPDATE ON submissions
         FOR EACH ROW EXECUTE FUNCTION reject_broken_finish()",
    )
    .execute(ctx.state.db())
    .await
    .expect("create trigger");

    let closed = crate::tasks::expiry::close_overdue_attempts(&ctx.state).await.expect("sweep");
    assert_eq!(closed, 1);

    let stale = repositories::submissions::find_by_id(ctx.state.db(), "stale")
        .await
        .expect("fetch")
        .expect("attempt");
    assert_eq!(stale.status, crate::db::types::SubmissionStatus::Completed);

    let broken = repositories::submissions::find_by_id(ctx.state.db(), "broken")
        .await
        .expect("fetch")
        .expect("attempt");
    assert_eq!(broken.status, crate::db::types::SubmissionStatus::InProgress);
    assert!(broken.completed_at.is_none());
}
