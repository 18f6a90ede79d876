//! 预测数据模型

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 视频分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Resolution {
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "4K")]
    Uhd4k,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Self::P480,
        Self::P720,
        Self::P1080,
        Self::P1440,
        Self::Uhd4k,
    ];

    /// 模型训练时使用的类别名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P1440 => "1440p",
            Self::Uhd4k => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// 忽略大小写和首尾空白（"4k" 与 "4K" 等价）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "未知分辨率 '{}'，可选值: 480p, 720p, 1080p, 1440p, 4K",
                    s
                )
            })
    }
}

/// 一次预测请求的五个输入参数（已校验）
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    /// 带宽（Mbps）
    pub bandwidth: f64,
    /// 延迟（ms）
    pub latency: f64,
    /// 丢包率（%）
    pub packet_loss: f64,
    pub resolution: Resolution,
    /// 码率（kbps）
    pub bitrate: f64,
}

impl PredictionRequest {
    /// 按评分程序约定的顺序生成位置参数
    pub fn to_args(&self) -> [String; 5] {
        [
            self.bandwidth.to_string(),
            self.latency.to_string(),
            self.packet_loss.to_string(),
            self.resolution.to_string(),
            self.bitrate.to_string(),
        ]
    }
}

/// 持久化的预测记录
///
/// 写入后不可修改；`score` 为评分程序的原始输出，不做截断
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub bandwidth: f64,
    pub latency: f64,
    pub packet_loss: f64,
    pub resolution: Resolution,
    pub bitrate: f64,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(request: &PredictionRequest, score: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            bandwidth: request.bandwidth,
            latency: request.latency,
            packet_loss: request.packet_loss,
            resolution: request.resolution,
            bitrate: request.bitrate,
            score,
            timestamp,
        }
    }
}
