use clap::Parser;
use wardrobe_pairing::utils::error::ErrorSeverity;
use wardrobe_pairing::utils::{logger, validation::Validate};
use wardrobe_pairing::{CliConfig, PairingError, PairingServer};

fn exit_code(e: &PairingError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: PairingError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e).max(1));
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 合併設定檔與命令列參數
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(exit_code(&e).max(1));
        }
    };

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting wardrobe-pairing");
    tracing::debug!("Resolved config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(e);
    }

    let server = match PairingServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => fail(e),
    };

    match config.bind_timeout_seconds {
        0 => tracing::info!("⏳ Bind long-polls wait until a scan or disconnect"),
        secs => tracing::info!("⏳ Bind long-polls time out after {}s", secs),
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match server.run(shutdown).await {
        Ok(()) => tracing::info!("✅ Server stopped"),
        Err(e) => fail(e),
    }
}
