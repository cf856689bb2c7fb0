use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, SET_COOKIE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Smoke-test client for the portal gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Bearer token sent as `Authorization`.
    #[arg(short, long, env = "GATEWAY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// Resolve the token to the current user
    Verify,
    /// GET a resource through /api/proxy
    Get {
        /// Resource path, e.g. `courses/12`
        path: String,
    },
    /// Clear session cookies
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/healthz", base)).send().await?,
        Commands::Verify => {
            client
                .get(format!("{}/api/auth/verify", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Get { path } => {
            client
                .get(format!("{}/api/proxy/{}", base, path.trim_start_matches('/')))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Logout => {
            client
                .post(format!("{}/api/auth/logout", base))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    for cookie in res.headers().get_all(SET_COOKIE) {
        eprintln!("Set-Cookie: {}", cookie.to_str().unwrap_or("<binary>"));
    }

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
