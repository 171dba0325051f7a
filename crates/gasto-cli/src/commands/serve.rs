//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    println!("🚀 Starting gasto web server...");
    println!("   Database:  {}", db_path.display());
    println!("   Address:   http://{}:{}", host, port);

    let config = gasto_server::ServerConfig::from_env();

    if config.require_auth {
        println!(
            "   🔑 API keys: {} configured (GASTO_API_KEYS)",
            config.api_keys.len()
        );
    } else {
        println!("   ⚠️  Authentication DISABLED - set GASTO_API_KEYS to enable");
    }

    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;
    gasto_server::serve(db, host, port, config).await?;

    Ok(())
}
