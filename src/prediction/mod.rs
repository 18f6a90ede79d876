//! 视频质量预测模块
//!
//! 调用外部评分模型、记录预测日志并提供查询接口

pub mod model;
pub mod quality;
pub mod scorer;
pub mod service;
pub mod store;
mod handlers;
mod router;
mod types;

pub use router::create_app;
pub use scorer::ProcessScorer;
pub use service::PredictionService;
pub use store::SqliteLogStore;
