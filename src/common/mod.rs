//! 公共工具模块

/// 截断到不超过 `max_bytes` 字节的最长有效 UTF-8 前缀
pub fn truncate_str_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// 截断诊断输出（如评分进程的 stderr），并标注被丢弃的字节数
pub fn truncate_diagnostic(s: &str, max_bytes: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let kept = truncate_str_safe(s, max_bytes);
    format!("{}...(已截断 {} 字节)", kept, s.len() - kept.len())
}
