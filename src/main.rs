use anyhow::Result;
use bulk_grader::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logger::init(Some(&config.output_log_file))?;

    // 初始化并运行应用
    let _result = App::initialize(config).await?.run().await?;

    Ok(())
}
