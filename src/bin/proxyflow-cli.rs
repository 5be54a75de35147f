use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, PROXY_AUTHORIZATION};
use serde_json::Value;
use std::path::PathBuf;

use proxyflow::gateway::GatewayCredentials;
use proxyflow::model::{NewPoolEntry, ProxyType};
use proxyflow::pool::import::load_pool_file;

#[derive(Parser)]
#[command(name = "proxyflow-cli")]
#[command(about = "Operator CLI for the ProxyFlow admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[arg(short, long, env = "PROXYFLOW_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service status and counts
    Status,
    /// Manage the proxy pool
    #[command(subcommand)]
    Pool(PoolCommands),
    /// Pool utilization by type
    Stats,
    /// Report gateway traffic for a user
    Usage { user_id: u64, bytes: u64 },
    /// Look up which upstream a gateway credential maps to
    Resolve {
        username: String,
        vport: u16,
        api_key: String,
    },
}

#[derive(Subcommand)]
enum PoolCommands {
    /// List every pool entry
    List,
    /// Add a single entry
    Add {
        #[arg(long, value_parser = parse_proxy_type)]
        proxy_type: ProxyType,
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
        #[arg(long, default_value = "US")]
        country: String,
        #[arg(long)]
        city: Option<String>,
        #[arg(long, default_value_t = 10)]
        max_users: u32,
    },
    /// Add every entry from a TOML or JSON file, all or nothing
    Import { file: PathBuf },
    /// Enable or disable an entry
    Toggle {
        id: u64,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
}

fn parse_proxy_type(s: &str) -> Result<ProxyType, String> {
    s.parse::<ProxyType>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Stats => {
            client.get(format!("{}/admin/stats", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Pool(PoolCommands::List) => {
            client.get(format!("{}/admin/pool", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Pool(PoolCommands::Add { proxy_type, ip, port, country, city, max_users }) => {
            let entry = NewPoolEntry::new(proxy_type, ip, port)
                .with_location(country, city)
                .with_max_users(max_users);
            entry.validate()?;
            client.post(format!("{}/admin/pool", cli.url))
                .headers(headers)
                .json(&vec![entry])
                .send()
                .await?
        }
        Commands::Pool(PoolCommands::Import { file }) => {
            let entries = load_pool_file(&file)?;
            println!("Importing {} entries from {}", entries.len(), file.display());
            client.post(format!("{}/admin/pool", cli.url))
                .headers(headers)
                .json(&entries)
                .send()
                .await?
        }
        Commands::Pool(PoolCommands::Toggle { id, active }) => {
            client.post(format!("{}/admin/pool/{}/active", cli.url, id))
                .headers(headers)
                .json(&serde_json::json!({ "active": active }))
                .send()
                .await?
        }
        Commands::Usage { user_id, bytes } => {
            client.post(format!("{}/admin/usage", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "user_id": user_id, "bytes": bytes }))
                .send()
                .await?
        }
        Commands::Resolve { username, vport, api_key } => {
            let creds = GatewayCredentials { username, api_key, vport };
            headers.insert(PROXY_AUTHORIZATION, HeaderValue::from_str(&creds.to_basic_header())?);
            client.get(format!("{}/admin/gateway/resolve", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
