//! 预测 API 路由

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{get_logs, health, predict};
use super::service::PredictionService;

/// 预测 API 状态
#[derive(Clone)]
pub struct PredictionState {
    pub service: Arc<PredictionService>,
}

/// 创建预测 API 路由
///
/// # 端点
/// - `POST /predict` - 评分并返回质量等级
/// - `GET /logs` - 最近的预测记录（`?limit=N`）
/// - `GET /health` - 日志库状态
pub fn create_prediction_router(service: Arc<PredictionService>) -> Router {
    let state = PredictionState { service };

    Router::new()
        .route("/predict", post(predict))
        .route("/logs", get(get_logs))
        .route("/health", get(health))
        .with_state(state)
}

/// 创建完整应用：根路径与 `/api` 前缀下提供相同的端点
pub fn create_app(service: Arc<PredictionService>, cors_allow_any_origin: bool) -> Router {
    let api = create_prediction_router(service);
    let app = Router::new().merge(api.clone()).nest("/api", api);

    if cors_allow_any_origin {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
