use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 评分程序（可执行文件或解释器）
    #[serde(default = "default_scorer_program")]
    pub scorer_program: String,

    /// 固定前缀参数，位于五个输入参数之前（例如模型脚本路径）
    #[serde(default = "default_scorer_args")]
    pub scorer_args: Vec<String>,

    /// 单次评分超时（秒）
    #[serde(default = "default_scorer_timeout_secs")]
    pub scorer_timeout_secs: u64,

    /// 评分失败时附带的 stderr 最大字节数
    #[serde(default = "default_diagnostic_max_bytes")]
    pub diagnostic_max_bytes: usize,

    /// SQLite 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// GET /logs 返回的最大记录数
    #[serde(default = "default_logs_limit")]
    pub logs_limit: usize,

    /// 是否允许任意来源跨域访问
    #[serde(default = "default_cors_allow_any_origin")]
    pub cors_allow_any_origin: bool,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_scorer_program() -> String {
    "python3".to_string()
}

fn default_scorer_args() -> Vec<String> {
    vec!["ml_model/predict.py".to_string()]
}

fn default_scorer_timeout_secs() -> u64 {
    30
}

fn default_diagnostic_max_bytes() -> usize {
    4096
}

fn default_db_path() -> String {
    "predictions.db".to_string()
}

fn default_logs_limit() -> usize {
    100
}

fn default_cors_allow_any_origin() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scorer_program: default_scorer_program(),
            scorer_args: default_scorer_args(),
            scorer_timeout_secs: default_scorer_timeout_secs(),
            diagnostic_max_bytes: default_diagnostic_max_bytes(),
            db_path: default_db_path(),
            logs_limit: default_logs_limit(),
            cors_allow_any_origin: default_cors_allow_any_origin(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 评分超时
    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_secs(self.scorer_timeout_secs)
    }

    /// 校验配置取值
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scorer_program.trim().is_empty() {
            anyhow::bail!("scorerProgram 不能为空");
        }
        if self.scorer_timeout_secs == 0 {
            anyhow::bail!("scorerTimeoutSecs 必须大于 0");
        }
        if self.logs_limit == 0 {
            anyhow::bail!("logsLimit 必须大于 0");
        }
        Ok(())
    }
}
