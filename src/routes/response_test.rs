use axum::body::to_bytes;

use super::*;

#[tokio::test]
async fn api_error_renders_failure_envelope() {
    let response = ApiError::conflict("You are already registered for this workshop").into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "You are already registered for this workshop");
    assert_eq!(body["detail"], body["message"]);
}

#[test]
fn internal_error_hides_cause() {
    let err = ApiError::internal("connection refused");
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "Internal server error");
}

#[test]
fn api_response_ok_sets_success() {
    let Json(resp) = ApiResponse::ok("done", serde_json::json!({"n": 1}));
    assert!(resp.success);
    assert_eq!(resp.message, "done");
    assert_eq!(resp.data["n"], 1);
}
