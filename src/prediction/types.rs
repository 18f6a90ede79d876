//! 预测 API 请求/响应类型

use serde::{Deserialize, Serialize};

use super::model::{PredictionRequest, Resolution};
use super::quality::QualityLabel;

/// 数值字段：表单可能以字符串提交
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// POST /predict 请求体（未校验）
#[derive(Debug, Default, Deserialize)]
pub struct PredictRequestBody {
    pub bandwidth: Option<NumberOrText>,
    pub latency: Option<NumberOrText>,
    pub packet_loss: Option<NumberOrText>,
    pub resolution: Option<String>,
    pub bitrate: Option<NumberOrText>,
}

/// 取出数值字段：必须存在、可解析且有限；取值范围交给评分程序判断
fn required_number(name: &str, value: Option<NumberOrText>) -> Result<f64, String> {
    let n = match value {
        None => return Err(format!("缺少字段 {}", name)),
        Some(NumberOrText::Number(n)) => n,
        Some(NumberOrText::Text(t)) => t
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("字段 {} 不是有效数字: '{}'", name, t))?,
    };
    if !n.is_finite() {
        return Err(format!("字段 {} 必须是有限数值", name));
    }
    Ok(n)
}

impl TryFrom<PredictRequestBody> for PredictionRequest {
    type Error = String;

    fn try_from(body: PredictRequestBody) -> Result<Self, Self::Error> {
        let bandwidth = required_number("bandwidth", body.bandwidth)?;
        let latency = required_number("latency", body.latency)?;
        let packet_loss = required_number("packet_loss", body.packet_loss)?;
        let resolution: Resolution = body
            .resolution
            .ok_or_else(|| "缺少字段 resolution".to_string())?
            .parse()?;
        let bitrate = required_number("bitrate", body.bitrate)?;

        Ok(Self {
            bandwidth,
            latency,
            packet_loss,
            resolution,
            bitrate,
        })
    }
}

/// POST /predict 成功响应
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// 原始分数
    pub score: f64,
    /// 截断到 [0, 5] 的展示分数
    pub display_score: f64,
    pub label: QualityLabel,
    /// 记录是否已写入日志库
    pub persisted: bool,
}

/// GET /logs 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// GET /health 响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 日志记录总数
    pub records: u64,
    /// 启动以来日志写入失败次数
    pub persist_failures: usize,
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                error_type: error_type.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.error.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<PredictionRequest, String> {
        let body: PredictRequestBody = serde_json::from_str(json).unwrap();
        PredictionRequest::try_from(body)
    }

    #[test]
    fn test_numbers_and_text_accepted() {
        let request = parse(
            r#"{"bandwidth": 50, "latency": "20", "packet_loss": " 0.5 ", "resolution": "1080p", "bitrate": "5000"}"#,
        )
        .unwrap();
        assert_eq!(request.bandwidth, 50.0);
        assert_eq!(request.latency, 20.0);
        assert_eq!(request.packet_loss, 0.5);
        assert_eq!(request.resolution, Resolution::P1080);
        assert_eq!(request.bitrate, 5000.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = parse(r#"{"bandwidth": 50, "latency": 20, "packet_loss": 0.5, "resolution": "1080p"}"#)
            .unwrap_err();
        assert!(err.contains("bitrate"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = parse(
            r#"{"bandwidth": "fast", "latency": 20, "packet_loss": 0.5, "resolution": "1080p", "bitrate": 1}"#,
        )
        .unwrap_err();
        assert!(err.contains("bandwidth"));

        let err = parse(
            r#"{"bandwidth": 1, "latency": "inf", "packet_loss": 1, "resolution": "1080p", "bitrate": 1}"#,
        )
        .unwrap_err();
        assert!(err.contains("latency"));

        let err = parse(
            r#"{"bandwidth": 1, "latency": 1, "packet_loss": 1, "resolution": "8K", "bitrate": 1}"#,
        )
        .unwrap_err();
        assert!(err.contains("8K"));
    }

    #[test]
    fn test_out_of_range_values_passed_through() {
        let request = parse(
            r#"{"bandwidth": -1, "latency": 20, "packet_loss": 120, "resolution": "1080p", "bitrate": "-3"}"#,
        )
        .unwrap();
        assert_eq!(request.bandwidth, -1.0);
        assert_eq!(request.packet_loss, 120.0);
        assert_eq!(request.bitrate, -3.0);
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::new("scoring_error", "评分失败").with_details("ERROR: boom");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["type"], "scoring_error");
        assert_eq!(json["error"]["details"], "ERROR: boom");

        let json = serde_json::to_value(ErrorResponse::new("internal_error", "x")).unwrap();
        assert!(json["error"].get("details").is_none());
    }
}
