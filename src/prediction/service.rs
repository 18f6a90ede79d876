//! 预测业务逻辑
//!
//! 校验 → 评分 → 写日志（尽力而为）→ 分级

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::StatusCode;
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::model::{PredictionRecord, PredictionRequest};
use super::quality::{QualityLabel, classify, display_score};
use super::scorer::{Scorer, ScoringError};
use super::store::{LogStore, StoreError};
use super::types::{ErrorResponse, PredictRequestBody, PredictResponse};

/// 用户可见的预测错误
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("请求参数无效: {0}")]
    ValidationFailed(String),

    #[error("{0}")]
    ScoringFailed(#[from] ScoringError),
}

impl PredictionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::ScoringFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> ErrorResponse {
        match self {
            Self::ValidationFailed(msg) => {
                ErrorResponse::new("invalid_request_error", format!("请求参数无效: {}", msg))
            }
            Self::ScoringFailed(e) => {
                let response = ErrorResponse::new("scoring_error", e.to_string());
                match e.diagnostics() {
                    Some(details) => response.with_details(details),
                    None => response,
                }
            }
        }
    }
}

/// 一次成功的预测
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub score: f64,
    pub display_score: f64,
    pub label: QualityLabel,
    /// 日志写入失败时为 false，不影响预测结果
    pub persisted: bool,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            score: p.score,
            display_score: p.display_score,
            label: p.label,
            persisted: p.persisted,
        }
    }
}

/// 预测服务
pub struct PredictionService {
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn LogStore>,
    logs_limit: usize,
    persist_failures: AtomicUsize,
}

impl PredictionService {
    pub fn new(scorer: Arc<dyn Scorer>, store: Arc<dyn LogStore>, logs_limit: usize) -> Self {
        Self {
            scorer,
            store,
            logs_limit: logs_limit.max(1),
            persist_failures: AtomicUsize::new(0),
        }
    }

    /// 校验原始请求体后预测
    pub async fn predict_body(&self, body: PredictRequestBody) -> Result<Prediction, PredictionError> {
        let request =
            PredictionRequest::try_from(body).map_err(PredictionError::ValidationFailed)?;
        self.predict(request).await
    }

    /// 评分并记录一次预测
    pub async fn predict(&self, request: PredictionRequest) -> Result<Prediction, PredictionError> {
        let span = tracing::info_span!("predict", request_id = %Uuid::new_v4());
        self.predict_inner(request).instrument(span).await
    }

    async fn predict_inner(&self, request: PredictionRequest) -> Result<Prediction, PredictionError> {
        tracing::info!(
            "收到预测请求: bandwidth={}, latency={}, packet_loss={}, resolution={}, bitrate={}",
            request.bandwidth,
            request.latency,
            request.packet_loss,
            request.resolution,
            request.bitrate
        );

        let score = match self.scorer.score(&request).await {
            Ok(score) => score,
            Err(e) => {
                tracing::error!("评分失败: {}", e);
                return Err(e.into());
            }
        };

        let record = PredictionRecord::new(&request, score, Utc::now());
        let persisted = match self.store.insert(record).await {
            Ok(()) => true,
            Err(e) => {
                self.persist_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!("预测记录写入失败（仍返回预测结果）: {}", e);
                false
            }
        };

        let label = classify(score);
        tracing::info!("预测结果: score={}, label={}", score, label);

        Ok(Prediction {
            score,
            display_score: display_score(score),
            label,
            persisted,
        })
    }

    /// 最近的预测记录，`limit` 截断到 [1, 上限]，缺省取上限
    pub async fn recent_logs(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<PredictionRecord>, StoreError> {
        let limit = limit.unwrap_or(self.logs_limit).clamp(1, self.logs_limit);
        self.store.recent(limit).await
    }

    /// 日志记录总数
    pub async fn record_count(&self) -> Result<u64, StoreError> {
        self.store.count().await
    }

    /// 进程启动以来日志写入失败的次数
    pub fn persist_failures(&self) -> usize {
        self.persist_failures.load(Ordering::Relaxed)
    }
}
