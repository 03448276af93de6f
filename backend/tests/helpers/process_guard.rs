use std::fmt;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use pm_agent_lib::client::ApiClient;
use pm_agent_lib::test_utils::assert_eventually;

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// RAII wrapper that ensures the server process is cleaned up.
pub struct ServerProcess {
    child: Child,
    data_dir: PathBuf,
    pub client: ApiClient,
}

impl ServerProcess {
    /// Start the compiled pm-agent-server against `data_dir` on a free port.
    pub async fn start(data_dir: &Path) -> Result<Self, ServerError> {
        let port = free_port().map_err(ServerError::NoPort)?;
        let addr = format!("127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_pm-agent-server"))
            .env("PM_AGENT_DIR", data_dir)
            .env("PM_AGENT_ADDR", &addr)
            .env("GEMINI_API_KEY", "")
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ServerError::SpawnFailed)?;

        let client = ApiClient::new(format!("http://{}", addr)).map_err(ServerError::Client)?;
        let server = Self {
            child,
            data_dir: data_dir.to_path_buf(),
            client,
        };

        println!(
            "Started pm-agent-server (pid {}) on {} in {}",
            server.pid(),
            addr,
            server.data_dir.display()
        );

        assert_eventually("pm-agent-server /health", READY_TIMEOUT, POLL_INTERVAL, || {
            server.client.health()
        })
        .await;

        Ok(server)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("pm-agent.pid")
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        if let Err(err) = self.child.kill() {
            eprintln!(
                "Failed to terminate pm-agent-server pid {}: {}",
                self.child.id(),
                err
            );
            return;
        }

        let _ = self.child.wait();
    }
}

/// Start the server and return a guard that will clean it up on drop.
pub async fn start_server_process(data_dir: &Path) -> Result<ServerProcess, ServerError> {
    ServerProcess::start(data_dir).await
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Errors that can occur when starting the server for tests.
#[derive(Debug)]
pub enum ServerError {
    NoPort(std::io::Error),
    SpawnFailed(std::io::Error),
    Client(anyhow::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPort(err) => write!(f, "failed to reserve a port: {}", err),
            Self::SpawnFailed(err) => write!(f, "failed to spawn pm-agent-server: {}", err),
            Self::Client(err) => write!(f, "failed to build API client: {}", err),
        }
    }
}

impl std::error::Error for ServerError {}
