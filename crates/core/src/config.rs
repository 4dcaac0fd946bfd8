use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ATTRIB__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    /// Lookback window applied when a conversion does not specify one.
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,
    /// Hard cap on page sizes for touchpoint queries.
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: usize,
}

fn default_node_id() -> String {
    "attrib-node-1".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_lookback_days() -> u32 {
    30
}

fn default_max_query_limit() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            attribution: AttributionConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
            enabled: default_metrics_enabled(),
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: default_lookback_days(),
            max_query_limit: default_max_query_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment (`ATTRIB__API__HTTP_PORT` etc.).
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ATTRIB")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
