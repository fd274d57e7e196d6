use clap::Parser;
use tracing_subscriber::EnvFilter;

use asm_api::cli::Cli;

#[tokio::main]
async fn main() {
    // Load .env if present so DATABASE_URL, JWT_SECRET, etc. are visible
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asm_api=info,tower_http=info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = asm_api::cli::run(cli).await {
        match std::env::var("ASM_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
