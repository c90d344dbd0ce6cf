//! List configured gateway hosts

use anyhow::Result;
use url::Url;

use crate::config::ConfigLoader;

pub fn run() -> Result<()> {
    let config = ConfigLoader::load()?;

    if config.gateway.hosts.is_empty() {
        println!("No gateway hosts configured");
        return Ok(());
    }

    println!("Gateway hosts:");
    for (index, host) in config.gateway.hosts.iter().enumerate() {
        println!("  [{}] {}", index, describe_host(host));
    }
    Ok(())
}

/// Host with its effective port, as offered for selection
pub fn describe_host(host: &str) -> String {
    match Url::parse(host) {
        Ok(url) => match url.port_or_known_default() {
            Some(port) => format!("{} (port {})", host, port),
            None => host.to_string(),
        },
        Err(_) => format!("{} (invalid address)", host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_host_with_explicit_port() {
        assert_eq!(
            describe_host("http://localhost:3020"),
            "http://localhost:3020 (port 3020)"
        );
    }

    #[test]
    fn test_describe_host_with_default_port() {
        assert_eq!(
            describe_host("https://gw.example.com"),
            "https://gw.example.com (port 443)"
        );
    }

    #[test]
    fn test_describe_host_invalid() {
        assert!(describe_host("not a url").ends_with("(invalid address)"));
    }
}
