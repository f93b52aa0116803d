//! Logging Infrastructure
//!
//! 基于 tracing-subscriber 的结构化日志：
//! - `RUST_LOG` 优先于 `LOG_LEVEL`
//! - 可选 JSON 格式
//! - 可选按天滚动的文件输出 (tracing-appender)

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// 日志文件名前缀
const LOG_FILE_PREFIX: &str = "relay-server";

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("relay_server={log_level},shared={log_level},tower_http=info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logger with optional JSON format and file output
///
/// 重复初始化 (例如测试中) 会被忽略。
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let filter = build_filter(log_level.unwrap_or("info"));
    let json = json.unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // 目录不存在时尝试创建, 失败则退回 stdout
    let file_dir = log_dir.filter(|dir| {
        let path = Path::new(dir);
        path.exists() || std::fs::create_dir_all(path).is_ok()
    });

    let result = match (file_dir, json) {
        (Some(dir), true) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            builder.json().with_writer(appender).try_init()
        }
        (Some(dir), false) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            builder.with_ansi(false).with_writer(appender).try_init()
        }
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        init_logger_with_file(Some("debug"), Some(false), log_dir.to_str());
        init_logger();
        assert!(log_dir.exists());
    }
}
