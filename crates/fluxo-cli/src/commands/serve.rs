//! Web server command

use std::path::Path;

use anyhow::Result;
use fluxo_server::ServerConfig;

use super::open_db;

/// Environment variable holding comma-separated API keys
const API_KEYS_ENV: &str = "FLUXO_API_KEYS";

/// Environment variable holding comma-separated allowed CORS origins
const ALLOWED_ORIGINS_ENV: &str = "FLUXO_ALLOWED_ORIGINS";

fn parse_list_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_auth: bool) -> Result<()> {
    let db = open_db(db_path)?;

    let api_keys = parse_list_env(API_KEYS_ENV);
    if !no_auth && api_keys.is_empty() {
        println!("⚠️  No API keys configured ({} is empty).", API_KEYS_ENV);
        println!("   All requests will be rejected. Set {} or pass --no-auth for local dev.", API_KEYS_ENV);
    }

    let config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins: parse_list_env(ALLOWED_ORIGINS_ENV),
        api_keys,
    };

    println!("🚀 Starting Fluxo API at http://{}:{}", host, port);

    fluxo_server::serve_with_config(db, host, port, config).await
}
