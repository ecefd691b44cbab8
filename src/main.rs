use anyhow::{Context, Result};
use callmetrics::app::{App, Cli};
use callmetrics::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("无法加载配置文件 {}", cli.config.display()))?
    } else {
        eprintln!("配置文件 {} 不存在，使用默认配置", cli.config.display());
        Config::default()
    };
    config.apply_env_overrides().context("环境变量配置无效")?;

    #[cfg(feature = "logging")]
    {
        let log_config = callmetrics::logging::LogConfig::from_settings(&config.log)?;
        callmetrics::logging::init_logging(log_config)?;
    }

    let app = App::new(config)?;

    let cancel = app.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n收到中断信号，正在停止...");
            cancel.cancel();
        }
    });

    app.execute(cli.command).await?;
    Ok(())
}
