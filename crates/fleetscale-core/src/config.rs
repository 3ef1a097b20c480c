//! fleetscale.toml configuration parser.
//!
//! ```toml
//! [global]
//! min_servers = 2
//! max_servers = 20
//! min_cpu_utilization = 30
//! max_cpu_utilization = 80
//! time_threshold = 300
//!
//! [digitalocean]
//! token = "..."
//! server_prefix = "app"
//! region = "nyc1"
//! environment = "staging"
//! domain = "example.com"
//! size = "s-1vcpu-1gb"
//! image = "ubuntu-22-04-x64"
//! ```
//!
//! Every `[global]` field is required. Values are validated once at load
//! time and the resulting `FleetConfig` is never mutated afterwards.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::ProviderIdentity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub global: ScalingConfig,
    pub digitalocean: Option<DigitalOceanConfig>,
    #[serde(default)]
    pub state: StateConfig,
    pub balancer: Option<BalancerConfig>,
    #[serde(default)]
    pub intake: IntakeConfig,
}

/// Thresholds driving the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Scale-down floor: never shrink a fleet of this many or fewer.
    pub min_servers: u32,
    /// Upper fleet size. Validated but not enforced on scale-up.
    pub max_servers: u32,
    /// Utilization percent at or below which a host counts as underused.
    pub min_cpu_utilization: i64,
    /// Utilization percent at or above which a host counts as overloaded.
    pub max_cpu_utilization: i64,
    /// Dwell time in seconds a crossing must persist before acting.
    pub time_threshold: u64,
}

/// Parameters of the `{prefix}{NN}.{environment}.{region}.{domain}` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(rename = "server_prefix")]
    pub prefix: String,
    pub region: String,
    pub environment: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalOceanConfig {
    pub token: String,
    #[serde(flatten)]
    pub naming: NamingConfig,
    pub size: String,
    pub image: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default)]
    pub private_networking: bool,
    #[serde(default)]
    pub backups: bool,
    #[serde(default)]
    pub ipv6: bool,
    pub user_data: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Override of the API base URL (tests, proxies).
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Location of the debounce-state document.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Template rendered with the fleet's private addresses.
    pub template: PathBuf,
    /// Where the rendered configuration is written.
    pub output: PathBuf,
    /// Program and arguments run after the file is written.
    #[serde(default = "default_reload_command")]
    pub reload_command: Vec<String>,
    /// Seconds to wait for a new instance to come up before refreshing.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Telemetry events buffered ahead of the decision loop.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("scaling.json")
}

fn default_reload_command() -> Vec<String> {
    ["service", "haproxy", "restart"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_settle_secs() -> u64 {
    30
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9100))
}

fn default_queue_depth() -> usize {
    1024
}

impl FleetConfig {
    /// Read, parse, and validate a configuration file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        self.global.validate()?;

        if let Some(ref digitalocean) = self.digitalocean {
            if digitalocean.token.trim().is_empty() {
                return Err(ConfigError::Invalid("digitalocean.token is empty".into()));
            }
            digitalocean.naming.validate("digitalocean")?;
        }

        if let Some(ref balancer) = self.balancer
            && balancer.reload_command.is_empty()
        {
            return Err(ConfigError::Invalid(
                "balancer.reload_command must name a program".into(),
            ));
        }

        if self.intake.queue_depth == 0 {
            return Err(ConfigError::Invalid("intake.queue_depth must be > 0".into()));
        }

        Ok(())
    }

    /// Naming parameters for the given provider, failing if its section is absent.
    pub fn naming(&self, provider: ProviderIdentity) -> ConfigResult<&NamingConfig> {
        match provider {
            ProviderIdentity::DigitalOcean => Ok(&self.digitalocean(provider)?.naming),
        }
    }

    pub fn digitalocean(&self, provider: ProviderIdentity) -> ConfigResult<&DigitalOceanConfig> {
        self.digitalocean
            .as_ref()
            .ok_or(ConfigError::MissingProviderSection(provider.as_str()))
    }
}

impl ScalingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_servers >= self.max_servers {
            return Err(ConfigError::Invalid(format!(
                "global.min_servers ({}) must be below global.max_servers ({})",
                self.min_servers, self.max_servers
            )));
        }
        if self.min_cpu_utilization >= self.max_cpu_utilization {
            return Err(ConfigError::Invalid(format!(
                "global.min_cpu_utilization ({}) must be below global.max_cpu_utilization ({})",
                self.min_cpu_utilization, self.max_cpu_utilization
            )));
        }
        Ok(())
    }
}

impl NamingConfig {
    fn validate(&self, section: &str) -> ConfigResult<()> {
        let fields = [
            ("server_prefix", &self.prefix),
            ("environment", &self.environment),
            ("region", &self.region),
            ("domain", &self.domain),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{section}.{field} is empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[global]
min_servers = 2
max_servers = 20
min_cpu_utilization = 30
max_cpu_utilization = 80
time_threshold = 300

[digitalocean]
token = "secret"
server_prefix = "app"
region = "nyc1"
environment = "staging"
domain = "example.com"
size = "s-1vcpu-1gb"
image = "ubuntu-22-04-x64"
ssh_keys = ["12345"]
private_networking = true
"#;

    #[test]
    fn parses_full_document() {
        let config = FleetConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.global.min_servers, 2);
        assert_eq!(config.global.time_threshold, 300);

        let naming = config.naming(ProviderIdentity::DigitalOcean).unwrap();
        assert_eq!(naming.prefix, "app");
        assert_eq!(naming.domain, "example.com");

        let digitalocean = config.digitalocean.as_ref().unwrap();
        assert!(digitalocean.private_networking);
        assert_eq!(digitalocean.ssh_keys, vec!["12345".to_string()]);
    }

    #[test]
    fn optional_sections_take_defaults() {
        let config = FleetConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.state.path, PathBuf::from("scaling.json"));
        assert_eq!(config.intake.listen.port(), 9100);
        assert!(config.balancer.is_none());
    }

    #[test]
    fn balancer_defaults_reload_command() {
        let doc = format!(
            "{SAMPLE}\n[balancer]\ntemplate = \"haproxy.cfg.tmpl\"\noutput = \"/etc/haproxy/haproxy.cfg\"\n"
        );
        let config = FleetConfig::from_toml_str(&doc).unwrap();
        let balancer = config.balancer.unwrap();
        assert_eq!(balancer.reload_command, vec!["service", "haproxy", "restart"]);
        assert_eq!(balancer.settle_secs, 30);
    }

    #[test]
    fn missing_global_field_is_rejected() {
        let doc = SAMPLE.replace("time_threshold = 300\n", "");
        let err = FleetConfig::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_cpu_band_is_rejected() {
        let doc = SAMPLE.replace("max_cpu_utilization = 80", "max_cpu_utilization = 20");
        let err = FleetConfig::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn inverted_server_bounds_are_rejected() {
        let doc = SAMPLE.replace("max_servers = 20", "max_servers = 2");
        assert!(matches!(
            FleetConfig::from_toml_str(&doc),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_provider_section_is_reported() {
        let end = SAMPLE.find("[digitalocean]").unwrap();
        let config = FleetConfig::from_toml_str(&SAMPLE[..end]).unwrap();
        let err = config.naming(ProviderIdentity::DigitalOcean).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProviderSection("digitalocean")));
    }

    #[test]
    fn missing_file_is_distinct_error() {
        let err = FleetConfig::from_file(Path::new("/path/to/config")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert_eq!(err.to_string(), "/path/to/config does not exist");
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetscale.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = FleetConfig::from_file(&path).unwrap();
        assert_eq!(config.global.max_cpu_utilization, 80);
    }
}
