//! 质量等级划分

use std::fmt;

use serde::Serialize;

/// 展示分数的上下界
pub const DISPLAY_MIN: f64 = 0.0;
pub const DISPLAY_MAX: f64 = 5.0;

/// 质量等级（由分数推导，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityLabel {
    Bad,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Bad => "Bad",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 将原始分数截断到 [0, 5]，仅用于展示和分级
///
/// NaN 视为 0
pub fn display_score(score: f64) -> f64 {
    if score.is_nan() {
        return DISPLAY_MIN;
    }
    score.clamp(DISPLAY_MIN, DISPLAY_MAX)
}

/// 按展示分数自上而下匹配第一个阈值
pub fn classify(score: f64) -> QualityLabel {
    let s = display_score(score);
    if s >= 4.5 {
        QualityLabel::Excellent
    } else if s >= 3.5 {
        QualityLabel::Good
    } else if s >= 2.5 {
        QualityLabel::Fair
    } else if s >= 1.5 {
        QualityLabel::Poor
    } else {
        QualityLabel::Bad
    }
}
