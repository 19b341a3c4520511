//! Startup banner and URL display

use super::config::{AppConfig, is_all_interfaces};
use super::constants::{API_PREFIX, APP_NAME};
use crate::utils::terminal::terminal_link;

// Label column width
const W: usize = 12;

/// Print the startup banner with resource URLs
pub fn print_banner(config: &AppConfig) {
    // Use localhost for display when binding to all interfaces
    let host = config.server.host.as_str();
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };
    let base = format!("http://{}:{}{}", display_host, config.server.port, API_PREFIX);

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "API:",
        terminal_link(&base)
    );

    for resource in &config.resources {
        println!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}/{} \x1b[90m({})\x1b[0m",
            "Resource:", base, resource.name, resource.table
        );
    }

    let auth = if config.auth.api_key.is_some() {
        "API key required"
    } else {
        "open"
    };
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Auth:", auth);
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Database:", config.database.url);
    println!();
}
