use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::llm::client::types::GenerationError;

/// 匹配 "try again in 7.5s"、"Please try again in 1m30.2s"、"retry after 20 seconds" 等提示
static RETRY_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:try again|retry)\s+(?:after|in)\s+(?:(?P<min>\d+)\s*m(?:in(?:utes?)?)?\s*)?(?P<sec>\d+(?:\.\d+)?)\s*(?:s|secs?|seconds?)\b",
    )
    .expect("retry hint pattern is valid")
});

const RATE_LIMIT_MARKERS: [&str; 6] = [
    "429",
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "resource_exhausted",
];

/// 从错误文本中解析等待提示，无法识别时返回None
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let captures = RETRY_HINT.captures(message)?;

    let minutes = captures
        .name("min")
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let seconds = captures.name("sec")?.as_str().parse::<f64>().ok()?;

    Duration::try_from_secs_f64(minutes * 60.0 + seconds).ok()
}

/// 把provider返回的错误文本归类为限流或普通请求错误
pub fn classify_provider_error(message: &str) -> GenerationError {
    let lowered = message.to_lowercase();
    if RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return GenerationError::RateLimited {
            retry_after: parse_retry_after(message),
            message: message.to_string(),
        };
    }
    GenerationError::Request(message.to_string())
}
