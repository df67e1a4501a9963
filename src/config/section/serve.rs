//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 2080                 # HTTP port number
//! open = false                # Open the site in a browser on start
//! ws_port = 35729             # Live reload WebSocket port
//!
//! [serve.routes]              # Extra URL prefixes mapped to directories
//! "/node_modules" = "node_modules"
//! ```

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Open the site in the default browser once the server is up.
    pub open: bool,

    /// WebSocket port for live reload (next free port is used if taken).
    pub ws_port: u16,

    /// URL prefix → directory (relative to the project root).
    pub routes: BTreeMap<String, PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 2080,
            open: false,
            ws_port: 35729,
            routes: BTreeMap::from([("/node_modules".to_string(), "node_modules".into())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 2080);
        assert!(!config.serve.open);
        assert_eq!(
            config.serve.routes.get("/node_modules"),
            Some(&PathBuf::from("node_modules"))
        );
    }

    #[test]
    fn test_serve_config_partial_override() {
        let config = test_parse_config("[serve]\nport = 8866\nopen = true");

        assert_eq!(config.serve.port, 8866);
        assert!(config.serve.open);
        assert_eq!(config.serve.ws_port, 35729);
    }

    #[test]
    fn test_serve_routes_replace_defaults() {
        let config = test_parse_config("[serve.routes]\n\"/vendor\" = \"third_party\"");
        assert_eq!(config.serve.routes.len(), 1);
        assert_eq!(
            config.serve.routes.get("/vendor"),
            Some(&PathBuf::from("third_party"))
        );
    }
}
