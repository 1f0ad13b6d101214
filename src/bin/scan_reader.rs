use clap::Parser;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use wardrobe_pairing::core::{BindResponse, ScanOutcome};
use wardrobe_pairing::utils::{error::Result, logger};
use wardrobe_pairing::ReaderClient;

#[derive(Parser)]
#[command(name = "scan-reader")]
#[command(about = "Send RFID/NFC tag scans to the pairing API")]
struct Args {
    /// Base URL of the pairing API
    #[arg(short, long, default_value = "http://127.0.0.1:5080")]
    server: String,

    /// Long-poll a bind for this item instead of sending scans
    #[arg(long)]
    bind: Option<String>,

    /// Milliseconds to wait between two scans
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Tags to send; read one per line from stdin when empty
    tags: Vec<String>,
}

fn describe(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::AssociationComplete(association) => {
            format!("✅ association complete: {:?}", association)
        }
        ScanOutcome::WaitingForHanger { item_id } => {
            format!("👕 item {} found, scan its hanger", item_id)
        }
        ScanOutcome::WaitingForItem { hanger_id } => {
            format!("🪝 hanger {} found, scan an item", hanger_id)
        }
        ScanOutcome::Unrecognized { tag_id } => {
            format!("❓ tag {} is unknown, create the item and bind it", tag_id)
        }
    }
}

async fn send_scans(client: &ReaderClient, args: &Args) -> Result<()> {
    let delay = Duration::from_millis(args.delay_ms);

    if !args.tags.is_empty() {
        for tag in &args.tags {
            let outcome = client.report_scan(tag).await?;
            println!("{} -> {}", tag, describe(&outcome));
            tokio::time::sleep(delay).await;
        }
        return Ok(());
    }

    // 逐行讀取讀卡機輸出
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let tag = line.trim();
        if tag.is_empty() {
            continue;
        }
        let outcome = client.report_scan(tag).await?;
        println!("{} -> {}", tag, describe(&outcome));
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

async fn await_bind(client: &ReaderClient, item_id: &str) -> Result<()> {
    println!("⏳ Waiting for a tag scan to bind to {}", item_id);
    match client.await_bind(item_id).await? {
        BindResponse::AssociationComplete { item_id, tag_id } => {
            println!("✅ Tag {} bound to {}", tag_id, item_id)
        }
        BindResponse::Superseded { item_id } => {
            println!("⚠️ Bind for {} was replaced by a newer request", item_id)
        }
        BindResponse::Cancelled { item_id } => println!("⚠️ Bind for {} was cancelled", item_id),
        BindResponse::Timeout { item_id } => println!("⌛ No scan arrived for {}", item_id),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let result = match ReaderClient::new(&args.server) {
        Ok(client) => match &args.bind {
            Some(item_id) => await_bind(&client, item_id).await,
            None => send_scans(&client, &args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }
}
