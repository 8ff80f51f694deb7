//! Server management - spawning and health checking the dashboard server

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running dashboard server process
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the streamlens-web server
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let port = config.port.unwrap_or_else(find_free_port);
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning dashboard server on port {}", port);

        let mut cmd = Command::new(&config.binary_path);

        cmd.env("STREAMLENS_WEB_ADDR", format!("127.0.0.1:{}", port));

        if let Some(static_dir) = &config.static_dir {
            cmd.env("STREAMLENS_WEB_STATIC_DIR", static_dir);
        }

        // Test mode keeps rendering pixel-stable for visual comparisons
        if config.test_mode {
            cmd.env("STREAMLENS_E2E_TEST_MODE", "1");
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while the server binds
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping server (pid: {})", self.child.id());

        // Graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the streamlens-web binary
    pub binary_path: PathBuf,

    /// Optional on-disk UI directory override
    pub static_dir: Option<PathBuf>,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,

    /// Enable pixel-stable test mode
    pub test_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("target/debug/streamlens-web"),
            static_dir: None,
            port: None,
            startup_timeout: Duration::from_secs(30),
            test_mode: true,
        }
    }
}

/// Find a free port to use
fn find_free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to find free port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port();
        let port2 = find_free_port();

        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn spawn_failure_names_the_binary() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt
            .block_on(ServerHandle::spawn(ServerConfig {
                binary_path: PathBuf::from("/no/such/streamlens-web"),
                startup_timeout: Duration::from_millis(100),
                ..Default::default()
            }))
            .unwrap_err();

        match err {
            E2eError::ServerStartup(msg) => assert!(msg.contains("streamlens-web")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
