use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the BMC gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short = 'U', long)]
    user: Option<String>,

    #[arg(short, long, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a resource
    Get { path: String },
    /// Update properties of a resource with a JSON body
    Patch { path: String, body: String },
    /// Create a resource or run an action with a JSON body
    Post { path: String, body: String },
    /// Delete a resource
    Delete { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;
    let client = reqwest::Client::new();

    let request = match &cli.command {
        Commands::Get { path } => client.get(base.join(path)?),
        Commands::Patch { path, body } => client.patch(base.join(path)?).json(&parse_body(body)?),
        Commands::Post { path, body } => client.post(base.join(path)?).json(&parse_body(body)?),
        Commands::Delete { path } => client.delete(base.join(path)?),
    };
    let request = match &cli.user {
        Some(user) => request.basic_auth(user, Some(&cli.password)),
        None => request,
    };

    print_response(request.send().await?).await
}

fn parse_body(body: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(body)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(location) = res.headers().get(reqwest::header::LOCATION) {
        println!("Location: {}", location.to_str()?);
    }
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
