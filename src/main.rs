use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use defi_lending_client::blockchain::{connect, RpcConnection};
use defi_lending_client::cli::{self, Cli};
use defi_lending_client::config::Config;
use defi_lending_client::core::{execute, preflight, DepositProgress, ProgressSink};

#[tokio::main]
async fn main() {
    // 사용법 에러는 네트워크 접근 전에 끝난다
    let cli = match cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let code = cli::exit_code(&e);
            let _ = e.print();
            process::exit(code);
        }
    };

    dotenvy::dotenv().ok();

    if let Err(e) = run(cli).await {
        error!("❌ {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.global.config.as_deref())
        .await
        .context("설정 로드 실패")?;

    let log_level = cli.global.log_level.as_deref().unwrap_or(config.monitoring.log_level.as_str());
    init_tracing(log_level);
    info!("✅ 설정 로드 완료 (pool {:?}, token {:?})", config.contracts.lending_pool, config.contracts.token);

    preflight(&cli.command, &config)?;

    // 예치 단계 결과는 일어나는 즉시 stdout으로
    let progress: ProgressSink = Arc::new(|event: &DepositProgress| println!("{}", event));

    let output = match connect(&config.network).await? {
        RpcConnection::Http(client) => execute(&client, &config, cli.command, Some(progress)).await?,
        RpcConnection::Ws(client) => execute(&client, &config, cli.command, Some(progress)).await?,
    };

    if !output.streamed() {
        println!("{}", output);
    }
    Ok(())
}

/// 로깅 초기화 (stderr)
///
/// `RUST_LOG`가 있으면 그것을, 없으면 주어진 레벨을 쓴다.
fn init_tracing(log_level: &str) {
    let log_filter = match log_level {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
