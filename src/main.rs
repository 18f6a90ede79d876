mod common;
mod model;
mod prediction;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use model::arg::Args;
use model::config::Config;
use prediction::{PredictionService, ProcessScorer, SqliteLogStore, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;
    if let Some(path) = config.config_path() {
        tracing::info!("配置文件: {}", path.display());
    }

    // 日志库在启动时打开一次，注入到服务中
    let store = SqliteLogStore::open(&config.db_path)
        .with_context(|| format!("打开预测日志库失败: {}", config.db_path))?;
    tracing::info!("预测日志库: {}", config.db_path);

    let scorer = ProcessScorer::from_config(&config);
    tracing::info!(
        "评分程序: {} {:?}（超时 {}s）",
        config.scorer_program,
        config.scorer_args,
        config.scorer_timeout_secs
    );

    let service = Arc::new(PredictionService::new(
        Arc::new(scorer),
        Arc::new(store),
        config.logs_limit,
    ));
    let app = create_app(service, config.cors_allow_any_origin);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听 {} 失败", addr))?;
    tracing::info!("服务已启动: http://{}", addr);
    tracing::info!("可用 API:");
    tracing::info!("  POST /predict  (/api/predict)");
    tracing::info!("  GET  /logs     (/api/logs)");
    tracing::info!("  GET  /health   (/api/health)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，正在关闭");
}
