//! 预测 API 处理器

use axum::{
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::router::PredictionState;
use super::types::{ErrorResponse, HealthResponse, LogsQuery, PredictRequestBody, PredictResponse};

fn invalid_request(message: String) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("invalid_request_error", message)),
    )
        .into_response()
}

/// POST /predict
pub async fn predict(
    State(state): State<PredictionState>,
    payload: Result<Json<PredictRequestBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!("无效的预测请求体: {}", rejection.body_text());
            return invalid_request(format!("请求体无效: {}", rejection.body_text()));
        }
    };

    // 日志写入失败不影响状态码
    match state.service.predict_body(body).await {
        Ok(prediction) => Json(PredictResponse::from(prediction)).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// GET /logs
pub async fn get_logs(
    State(state): State<PredictionState>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return invalid_request(format!("查询参数无效: {}", rejection.body_text()));
        }
    };

    match state.service.recent_logs(query.limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("查询预测记录失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    format!("查询失败: {}", e),
                )),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn health(State(state): State<PredictionState>) -> impl IntoResponse {
    match state.service.record_count().await {
        Ok(records) => Json(HealthResponse {
            status: "ok",
            records,
            persist_failures: state.service.persist_failures(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("健康检查失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    format!("日志库不可用: {}", e),
                )),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::response::Response;

    use super::*;
    use crate::prediction::service::PredictionService;
    use crate::prediction::service::tests::{FailingStore, MockScorer, sample_request};
    use crate::prediction::store::{LogStore, SqliteLogStore};

    fn state(scorer: MockScorer, store: Arc<dyn LogStore>) -> PredictionState {
        PredictionState {
            service: Arc::new(PredictionService::new(Arc::new(scorer), store, 100)),
        }
    }

    fn body(json: &str) -> Result<Json<PredictRequestBody>, JsonRejection> {
        Ok(Json(serde_json::from_str(json).unwrap()))
    }

    async fn json_of(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const VALID: &str = r#"{"bandwidth": "50", "latency": 30, "packet_loss": 0.5, "resolution": "1080p", "bitrate": 5000}"#;

    #[tokio::test]
    async fn test_predict_ok() {
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = state(MockScorer::output("4.8"), store.clone());

        let response = predict(State(state), body(VALID)).await.into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["score"], 4.8);
        assert_eq!(json["display_score"], 4.8);
        assert_eq!(json["label"], "Excellent");
        assert_eq!(json["persisted"], true);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_predict_store_failure_keeps_ok_status() {
        let state = state(MockScorer::output("3.0"), Arc::new(FailingStore));

        let response = predict(State(state), body(VALID)).await.into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["score"], 3.0);
        assert_eq!(json["label"], "Fair");
        assert_eq!(json["persisted"], false);
    }

    #[tokio::test]
    async fn test_predict_scoring_failure() {
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = state(MockScorer::exit(1, "ERROR: bad input"), store.clone());

        let response = predict(State(state), body(VALID)).await.into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["type"], "scoring_error");
        assert_eq!(json["error"]["details"], "ERROR: bad input");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_predict_validation_failure() {
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = state(MockScorer::output("4.0"), store);

        let response = predict(
            State(state),
            body(r#"{"bandwidth": 50, "latency": 30, "packet_loss": 0.5, "resolution": "2160i", "bitrate": 5000}"#),
        )
        .await
        .into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_predict_forwards_out_of_range_values() {
        let scorer = Arc::new(MockScorer::output("2.0"));
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = PredictionState {
            service: Arc::new(PredictionService::new(scorer.clone(), store, 100)),
        };

        for json in [
            r#"{"bandwidth": -5, "latency": 30, "packet_loss": 0.5, "resolution": "1080p", "bitrate": 5000}"#,
            r#"{"bandwidth": 50, "latency": 30, "packet_loss": 150, "resolution": "1080p", "bitrate": 5000}"#,
        ] {
            let response = predict(State(state.clone()), body(json)).await.into_response();
            let (status, json) = json_of(response).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["label"], "Poor");
        }
        assert_eq!(scorer.calls(), 2);
    }

    #[tokio::test]
    async fn test_logs_newest_first_without_label() {
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = state(MockScorer::output("7.3"), store);

        for _ in 0..3 {
            state.service.predict(sample_request()).await.unwrap();
        }

        let response = get_logs(State(state.clone()), Ok(Query(LogsQuery { limit: Some(2) })))
            .await
            .into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["score"], 7.3);
        assert_eq!(records[0]["resolution"], "1080p");
        assert!(records[0].get("label").is_none());
        assert!(records[0]["timestamp"].as_str().unwrap() >= records[1]["timestamp"].as_str().unwrap());

        let response = get_logs(State(state), Ok(Query(LogsQuery::default())))
            .await
            .into_response();
        let (_, json) = json_of(response).await;
        assert_eq!(json.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_logs_store_failure() {
        let state = state(MockScorer::output("1.0"), Arc::new(FailingStore));

        let response = get_logs(State(state), Ok(Query(LogsQuery::default())))
            .await
            .into_response();
        let (status, json) = json_of(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["type"], "internal_error");
    }

    #[tokio::test]
    async fn test_health() {
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());
        let state = state(MockScorer::output("2.0"), store);
        state.service.predict(sample_request()).await.unwrap();

        let (status, json) = json_of(health(State(state)).await.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["records"], 1);
        assert_eq!(json["persist_failures"], 0);
    }
}
