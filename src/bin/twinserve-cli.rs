use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "twinserve-cli")]
#[command(about = "Manage proxy rules of a running twinserve", long_about = None)]
struct Cli {
    /// Base URL of the server
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RuleArgs {
    /// Path prefix to claim on the shared endpoint (e.g. /api)
    #[arg(long)]
    prefix: Option<String>,

    /// Port to claim with a dedicated listener
    #[arg(long)]
    port: Option<u16>,

    /// Target base URL (e.g. http://localhost:3000)
    #[arg(long)]
    target: String,

    /// Remove the prefix before forwarding
    #[arg(long)]
    strip: bool,
}

impl RuleArgs {
    fn body(&self, id: Option<&str>) -> Value {
        json!({
            "id": id.unwrap_or_default(),
            "path_prefix": self.prefix.clone().unwrap_or_default(),
            "port": self.port.unwrap_or_default(),
            "target_url": self.target,
            "strip_prefix": self.strip,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List proxy rules
    List,
    /// Add a proxy rule
    Add {
        /// Explicit rule id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Replace a proxy rule
    Update {
        id: String,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Delete a proxy rule
    Delete { id: String },
    /// Show current settings
    Settings,
    /// Export settings to a file (stdout when omitted)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a settings document
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/admin/api", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::List => {
            let res = client.get(format!("{api}/proxies")).send().await?;
            print_response(res).await?;
        }
        Commands::Add { id, rule } => {
            let res = client
                .post(format!("{api}/proxies"))
                .json(&rule.body(id.as_deref()))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Update { id, rule } => {
            let res = client
                .put(format!("{api}/proxies/{id}"))
                .json(&rule.body(Some(&id)))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = client.delete(format!("{api}/proxies/{id}")).send().await?;
            print_response(res).await?;
        }
        Commands::Settings => {
            let res = client.get(format!("{api}/settings")).send().await?;
            print_response(res).await?;
        }
        Commands::Export { output } => {
            let res = client.get(format!("{api}/settings/export")).send().await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }
            let text = res.text().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("Settings written to {}", path.display());
                }
                None => println!("{text}"),
            }
        }
        Commands::Import { file } => {
            let document = std::fs::read(&file)?;
            let res = client
                .post(format!("{api}/settings/import"))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(document)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
