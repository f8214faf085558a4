use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the registry proxy", long_about = None)]
struct Cli {
    /// Base URI of the proxy, including any path base.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Registry endpoint path.
    #[arg(long, default_value = "/Api/1/Proxies")]
    admin_path: String,

    /// Response format requested from the proxy.
    #[arg(short, long, value_enum, default_value_t = Format::Siren)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Siren,
    Json,
    Xml,
}

impl Format {
    fn as_query(self) -> &'static str {
        match self {
            Format::Siren => "siren",
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered proxy
    List,
    /// Show the proxy registered at a path
    Show { path: String },
    /// Register a proxy, or refresh it if already registered
    Register { path: String, reverse_uri: String },
    /// Refresh a registered proxy (POST)
    Refresh { path: String, reverse_uri: String },
    /// Deregister and register anew (PUT)
    Replace { path: String, reverse_uri: String },
    /// Remove a proxy
    Deregister { path: String, reverse_uri: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!(
        "{}{}",
        cli.url.trim_end_matches('/'),
        cli.admin_path
    );

    let mut query = vec![("f", cli.format.as_query().to_string())];
    let method = match cli.command {
        Commands::List => Method::GET,
        Commands::Show { path } => {
            query.push(("path", path));
            Method::GET
        }
        Commands::Register { path, reverse_uri } => {
            query.push(("path", path));
            query.push(("reverseUri", reverse_uri));
            Method::GET
        }
        Commands::Refresh { path, reverse_uri } => {
            query.push(("path", path));
            query.push(("reverseUri", reverse_uri));
            Method::POST
        }
        Commands::Replace { path, reverse_uri } => {
            query.push(("path", path));
            query.push(("reverseUri", reverse_uri));
            Method::PUT
        }
        Commands::Deregister { path, reverse_uri } => {
            query.push(("path", path));
            query.push(("reverseUri", reverse_uri));
            Method::DELETE
        }
    };

    let res = client
        .request(method, &endpoint)
        .query(&query)
        .send()
        .await?;
    print_response(res, cli.format).await
}

async fn print_response(
    res: reqwest::Response,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match format {
        Format::Xml => text,
        Format::Siren | Format::Json => match serde_json::from_str::<Value>(&text) {
            Ok(json) => serde_json::to_string_pretty(&json)?,
            Err(_) => text,
        },
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: registry endpoint returned status {status}");
        eprintln!("{rendered}");
        std::process::exit(1);
    }
    Ok(())
}
