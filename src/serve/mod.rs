//! Static HTTP servers for `serve` and `start`.
//!
//! `serve` looks up files in `temp`, `src` and `public` (first hit wins)
//! plus the configured routes, and injects the reload client into HTML.
//! `start` serves `dist` as-is.

mod path;
mod response;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tiny_http::{Request, Server};

use crate::config::SiteConfig;
use crate::reload::CLIENT_SCRIPT_PATH;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Request handler threads.
const WORKERS: usize = 4;

/// Where requests are looked up.
#[derive(Debug, Clone, Default)]
pub struct ServeRoots {
    /// URL prefix and directory, longest prefix first.
    routes: Vec<(String, PathBuf)>,
    roots: Vec<PathBuf>,
    /// WebSocket port handed to the injected reload client.
    reload_port: Option<u16>,
}

impl ServeRoots {
    /// `temp`, `src`, `public` and the configured routes.
    pub fn dev(config: &SiteConfig, reload_port: Option<u16>) -> Self {
        let mut routes: Vec<_> = config
            .serve
            .routes
            .iter()
            .map(|(prefix, dir)| (prefix.clone(), dir.clone()))
            .collect();
        routes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

        Self {
            routes,
            roots: vec![
                config.build.temp.clone(),
                config.build.src.clone(),
                config.build.public.clone(),
            ],
            reload_port,
        }
    }

    /// The final output directory only.
    pub fn dist(config: &SiteConfig) -> Self {
        Self {
            roots: vec![config.build.dist.clone()],
            ..Self::default()
        }
    }

    /// Map a request URL to a file.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let rel = path::url_to_rel(url);

        for (prefix, dir) in &self.routes {
            if let Some(rest) = path::strip_route(&rel, prefix) {
                return path::resolve_in(dir, rest);
            }
        }
        self.roots
            .iter()
            .find_map(|root| path::resolve_in(root, &rel))
    }

    fn handle(&self, request: Request) -> Result<()> {
        let url = request.url().to_string();
        debug!("serve"; "{} {}", request.method(), url);

        if self.reload_port.is_some() && path::url_to_rel(&url) == CLIENT_SCRIPT_PATH.trim_matches('/') {
            return response::respond_client_script(request);
        }
        match self.resolve(&url) {
            Some(file) => response::respond_file(request, &file, self.reload_port),
            None => response::respond_not_found(request),
        }
    }
}

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                // Port 0 asks the OS for a free one
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(interface, port));
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Running HTTP server with its worker threads.
pub struct HttpServer {
    server: Arc<Server>,
    addr: SocketAddr,
    workers: Vec<JoinHandle<()>>,
}

impl HttpServer {
    pub fn start(interface: IpAddr, port: u16, roots: ServeRoots) -> Result<Self> {
        let (server, addr) = bind_with_retry(interface, port)?;
        let server = Arc::new(server);
        let roots = Arc::new(roots);

        let workers = (0..WORKERS)
            .map(|_| {
                let server = Arc::clone(&server);
                let roots = Arc::clone(&roots);
                thread::spawn(move || {
                    for request in server.incoming_requests() {
                        if let Err(e) = roots.handle(request) {
                            log!("serve"; "request error: {e}");
                        }
                    }
                })
            })
            .collect();

        Ok(Self {
            server,
            addr,
            workers,
        })
    }

    #[cfg(test)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Browser-facing URL; unspecified interfaces map to localhost.
    pub fn url(&self) -> String {
        if self.addr.ip().is_unspecified() {
            format!("http://localhost:{}", self.addr.port())
        } else {
            format!("http://{}", self.addr)
        }
    }

    /// Unblock every worker and wait for them (max 2 seconds).
    pub fn shutdown(self) {
        for _ in &self.workers {
            self.server.unblock();
        }
        for _ in 0..40 {
            if self.workers.iter().all(JoinHandle::is_finished) {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
        for worker in self.workers {
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use tempfile::TempDir;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let config = test_config_at(dir.path());
        for sub in ["temp", "src", "public", "node_modules/pkg"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        (dir, config)
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_resolve_order() {
        let (dir, config) = site();
        fs::write(dir.path().join("temp/index.html"), "built").unwrap();
        fs::write(dir.path().join("src/index.html"), "source").unwrap();
        fs::write(dir.path().join("public/favicon.ico"), "icon").unwrap();

        let roots = ServeRoots::dev(&config, None);
        let index = roots.resolve("/").unwrap();
        assert_eq!(fs::read_to_string(index).unwrap(), "built");
        assert!(roots.resolve("/favicon.ico").is_some());
        assert!(roots.resolve("/nope.css").is_none());
    }

    #[test]
    fn test_resolve_route() {
        let (dir, config) = site();
        fs::write(dir.path().join("node_modules/pkg/lib.js"), "lib").unwrap();

        let roots = ServeRoots::dev(&config, None);
        let file = roots.resolve("/node_modules/pkg/lib.js").unwrap();
        assert_eq!(fs::read_to_string(file).unwrap(), "lib");
    }

    #[test]
    fn test_dist_server_has_no_routes() {
        let (dir, config) = site();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/index.html"), "final").unwrap();
        fs::write(dir.path().join("node_modules/pkg/lib.js"), "lib").unwrap();

        let roots = ServeRoots::dist(&config);
        assert!(roots.resolve("/index.html").is_some());
        assert!(roots.resolve("/node_modules/pkg/lib.js").is_none());
    }

    #[test]
    fn test_serves_with_injected_script() {
        let (dir, config) = site();
        fs::write(dir.path().join("temp/index.html"), "<body>hi</body>").unwrap();

        let server = HttpServer::start(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
            ServeRoots::dev(&config, Some(35800)),
        )
        .unwrap();
        let addr = server.addr();

        let page = get(addr, "/");
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains(r#"data-port="35800""#));

        let script = get(addr, CLIENT_SCRIPT_PATH);
        assert!(script.contains("WebSocket"));

        let missing = get(addr, "/missing.html");
        assert!(missing.starts_with("HTTP/1.1 404"));

        server.shutdown();
    }
}
