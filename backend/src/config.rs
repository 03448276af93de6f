// Environment configuration for the server and CLI
// Resolves the data directory, bind address and plan-parser credentials

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder used when no Gemini key is configured
pub const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_API_KEY_MISSING_FROM_ENV";

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 20;

/// A person invited to triage meetings by default
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TeamLead {
    pub name: String,
    pub email: String,
}

/// Settings for the Gemini plan parser
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Whether a real key was supplied
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    fn from_env() -> Self {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            // Reported once by the server at startup
            _ => PLACEHOLDER_API_KEY.to_string(),
        };

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_GEMINI_TIMEOUT_SECS);

        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
        }
    }
}

/// Configuration for data paths and server settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding task.json, project_log.md, plan.json, reports/ and risk/
    pub data_dir: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Base URL the CLI talks to
    pub api_url: String,
    /// Default triage meeting attendees
    pub team_leads: Vec<TeamLead>,
    pub gemini: GeminiConfig,
}

impl Config {
    /// Create configuration rooted at `data_dir` with default settings
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let bind_addr: SocketAddr = DEFAULT_ADDR
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000)));
        Self {
            data_dir,
            api_url: format!("http://{}", bind_addr),
            bind_addr,
            team_leads: default_team_leads(),
            gemini: GeminiConfig::default(),
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        // Pick up a .env file in the working directory if present
        let _ = dotenv::dotenv();

        let data_dir = std::env::var("PM_AGENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_data_dir());

        let mut config = Self::with_data_dir(data_dir);

        if let Ok(addr) = std::env::var("PM_AGENT_ADDR") {
            match addr.parse() {
                Ok(parsed) => {
                    config.bind_addr = parsed;
                    config.api_url = format!("http://{}", parsed);
                }
                Err(e) => tracing::warn!("Ignoring invalid PM_AGENT_ADDR '{}': {}", addr, e),
            }
        }

        if let Ok(url) = std::env::var("PM_AGENT_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(leads) = std::env::var("PM_AGENT_TEAM_LEADS") {
            let parsed = parse_team_leads(&leads);
            if parsed.is_empty() {
                tracing::warn!("PM_AGENT_TEAM_LEADS is set but contains no valid entries");
            } else {
                config.team_leads = parsed;
            }
        }

        config.gemini = GeminiConfig::from_env();
        config
    }

    /// Get the default data directory
    fn default_data_dir() -> PathBuf {
        // All platforms: ~/.pm-agent/ (or /tmp/pm-agent if home unavailable)
        dirs::home_dir()
            .map(|h| h.join(".pm-agent"))
            .unwrap_or_else(|| PathBuf::from("/tmp/pm-agent"))
    }

    pub fn task_file(&self) -> PathBuf {
        self.data_dir.join("task.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("project_log.md")
    }

    pub fn plan_file(&self) -> PathBuf {
        self.data_dir.join("plan.json")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn risk_dir(&self) -> PathBuf {
        self.data_dir.join("risk")
    }

    /// Present once the legacy blocker migration has run
    pub fn migration_marker(&self) -> PathBuf {
        self.data_dir.join(".blockers_migrated")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("pm-agent.pid")
    }

    /// Ensure the data directory and its subdirectories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.reports_dir())?;
        std::fs::create_dir_all(self.risk_dir())?;
        Ok(())
    }

    /// Write the server PID to the PID file
    pub fn write_pid(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.pid_file(), std::process::id().to_string())
    }

    /// Read the server PID from the PID file
    pub fn read_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Remove the PID file
    pub fn remove_pid(&self) -> std::io::Result<()> {
        let pid_file = self.pid_file();
        if pid_file.exists() {
            std::fs::remove_file(pid_file)
        } else {
            Ok(())
        }
    }

    /// Check if a process with the stored PID is still running
    #[cfg(unix)]
    pub fn is_server_running(&self) -> bool {
        match self.read_pid() {
            // Our own PID means a stale file from a previous run in this process
            Some(pid) if pid == std::process::id() => false,
            // Check if process exists by sending signal 0
            Some(pid) => unsafe { libc::kill(pid as i32, 0) == 0 },
            None => false,
        }
    }

    // TODO(windows): Implement Windows process check
    #[cfg(not(unix))]
    pub fn is_server_running(&self) -> bool {
        false
    }
}

/// Parse `Name <email>` entries separated by `;`
pub fn parse_team_leads(raw: &str) -> Vec<TeamLead> {
    raw.split(';')
        .filter_map(|item| {
            let item = item.trim();
            let open = item.find('<')?;
            let close = item.rfind('>')?;
            if close <= open + 1 {
                return None;
            }
            let name = item[..open].trim();
            let email = item[open + 1..close].trim();
            if name.is_empty() || !email.contains('@') {
                return None;
            }
            Some(TeamLead {
                name: name.to_string(),
                email: email.to_string(),
            })
        })
        .collect()
}

fn default_team_leads() -> Vec<TeamLead> {
    [("Alice", "alice@example.com"), ("Bob", "bob@example.com"), ("Carol", "carol@example.com")]
        .into_iter()
        .map(|(name, email)| TeamLead {
            name: name.to_string(),
            email: email.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_use_data_dir() {
        let config = Config::with_data_dir(PathBuf::from("/test/data"));

        assert_eq!(config.task_file(), PathBuf::from("/test/data/task.json"));
        assert_eq!(config.log_file(), PathBuf::from("/test/data/project_log.md"));
        assert_eq!(config.plan_file(), PathBuf::from("/test/data/plan.json"));
        assert_eq!(config.reports_dir(), PathBuf::from("/test/data/reports"));
        assert_eq!(config.risk_dir(), PathBuf::from("/test/data/risk"));
        assert_eq!(
            config.migration_marker(),
            PathBuf::from("/test/data/.blockers_migrated")
        );
    }

    #[test]
    fn test_default_bind_addr() {
        let config = Config::with_data_dir(PathBuf::from("/test/data"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_pid_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path().to_path_buf());

        config.write_pid().unwrap();
        let pid = config.read_pid().unwrap();
        assert_eq!(pid, std::process::id());
        assert!(!config.is_server_running(), "own pid is treated as stale");

        config.remove_pid().unwrap();
        assert!(config.read_pid().is_none());
    }

    #[test]
    fn test_ensure_dirs_creates_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path().join("nested"));

        config.ensure_dirs().unwrap();

        assert!(config.data_dir.exists());
        assert!(config.reports_dir().exists());
        assert!(config.risk_dir().exists());
    }

    #[test]
    fn test_parse_team_leads() {
        let leads = parse_team_leads("Dana <dana@example.com>; Eve <eve@example.com>;junk; <x@y>");
        assert_eq!(
            leads,
            vec![
                TeamLead {
                    name: "Dana".to_string(),
                    email: "dana@example.com".to_string()
                },
                TeamLead {
                    name: "Eve".to_string(),
                    email: "eve@example.com".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_placeholder_key_is_not_a_key() {
        let gemini = GeminiConfig::default();
        assert!(!gemini.has_api_key());

        let gemini = GeminiConfig {
            api_key: "abc".to_string(),
            ..GeminiConfig::default()
        };
        assert!(gemini.has_api_key());
    }

    /// Shared buffer the test subscriber writes into
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_key_is_silent_when_loading_config() {
        std::env::remove_var("GEMINI_API_KEY");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();

        let gemini = tracing::subscriber::with_default(subscriber, GeminiConfig::from_env);

        assert!(!gemini.has_api_key());
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains("GEMINI_API_KEY"), "{}", output);
    }
}
