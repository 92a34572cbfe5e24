use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::logging::init_log_file;

/// 初始化日志
///
/// 控制台始终输出；给出 `log_file` 时额外写一份到文件（先写文件头）。
/// 默认级别 info，可用 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init(log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            init_log_file(path)?;
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    Ok(())
}
