//! 外部评分程序适配
//!
//! 每次预测启动一个评分进程，五个输入按位置传入，
//! 进程退出码为 0 时将 stdout 解析为一个浮点数

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::common::truncate_diagnostic;
use crate::model::config::Config;

use super::model::PredictionRequest;

/// 评分失败原因
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("无法启动评分程序 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("等待评分程序退出失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("评分程序异常退出（{}）", exit_code_text(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error("评分程序输出无法解析为数值: '{output}'")]
    MalformedOutput { output: String },

    #[error("评分程序超时（{}s）", .0.as_secs_f64())]
    Timeout(Duration),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("退出码 {}", code),
        None => "被信号终止".to_string(),
    }
}

impl ScoringError {
    /// 附带给调用方的诊断信息
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            Self::MalformedOutput { output } => Some(output),
            _ => None,
        }
    }
}

/// 评分器 trait
#[async_trait::async_trait]
pub trait Scorer: Send + Sync {
    /// 对一组输入评分，返回未截断的原始分数
    async fn score(&self, request: &PredictionRequest) -> Result<f64, ScoringError>;
}

/// 通过子进程调用外部模型的评分器
#[derive(Debug, Clone)]
pub struct ProcessScorer {
    program: String,
    prefix_args: Vec<String>,
    timeout: Duration,
    diagnostic_max_bytes: usize,
}

impl ProcessScorer {
    pub fn new(program: impl Into<String>, prefix_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            timeout,
            diagnostic_max_bytes: 4096,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.scorer_program.clone(),
            config.scorer_args.clone(),
            config.scorer_timeout(),
        )
        .with_diagnostic_max_bytes(config.diagnostic_max_bytes)
    }

    pub fn with_diagnostic_max_bytes(mut self, max_bytes: usize) -> Self {
        self.diagnostic_max_bytes = max_bytes;
        self
    }
}

/// 解析评分输出：去除首尾空白后必须是一个有限浮点数
pub fn parse_score(stdout: &str) -> Result<f64, ScoringError> {
    let text = stdout.trim();
    match text.parse::<f64>() {
        Ok(score) if score.is_finite() => Ok(score),
        _ => Err(ScoringError::MalformedOutput {
            output: text.to_string(),
        }),
    }
}

#[async_trait::async_trait]
impl Scorer for ProcessScorer {
    async fn score(&self, request: &PredictionRequest) -> Result<f64, ScoringError> {
        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(request.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScoringError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // 超时后 future 被丢弃，kill_on_drop 负责结束子进程
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!("评分程序超时，已终止: {}s", self.timeout.as_secs_f64());
                return Err(ScoringError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            if line.contains("ERROR:") {
                tracing::error!("评分程序错误: {}", line);
            } else {
                tracing::debug!("评分程序 stderr: {}", line);
            }
        }
        tracing::debug!(
            "评分程序退出: status={}, stdout={:?}, 耗时 {}ms",
            output.status,
            stdout.trim(),
            started.elapsed().as_millis()
        );

        if !output.status.success() {
            return Err(ScoringError::Failed {
                code: output.status.code(),
                stderr: truncate_diagnostic(&stderr, self.diagnostic_max_bytes),
            });
        }

        parse_score(&stdout)
    }
}
