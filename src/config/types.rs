use serde::Deserialize;

/// Main configuration structure for waymirror
///
/// Every field has a default so a config file only needs to name the values
/// it changes; CLI flags override the file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// What to mirror and where to put it
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Domain to reconstruct (e.g. "example.com")
    #[serde(default)]
    pub domain: String,

    /// Output directory for the reconstructed site
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Earliest capture date to consider (any accepted date format)
    #[serde(rename = "start-date", default)]
    pub start_date: Option<String>,

    /// Latest capture date to consider
    #[serde(rename = "end-date", default)]
    pub end_date: Option<String>,

    /// Stop after this many captures
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<usize>,

    /// Keep every archived version of each URL (false: newest only)
    #[serde(rename = "all-versions", default = "default_true")]
    pub all_versions: bool,

    /// Detect the domain's earliest capture date when no start date is given
    #[serde(rename = "auto-detect-date", default = "default_true")]
    pub auto_detect_date: bool,
}

/// Network behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Maximum concurrent downloads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Capture-index (CDX) endpoint
    #[serde(rename = "cdx-url", default = "default_cdx_url")]
    pub cdx_url: String,

    /// Archive replay base path (raw-content fetches)
    #[serde(rename = "replay-url", default = "default_replay_url")]
    pub replay_url: String,
}

/// Disk cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether to cache fetched content on disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache database location
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// Size budget in bytes; oldest entries are evicted past this
    #[serde(rename = "size-limit-bytes", default = "default_cache_limit")]
    pub size_limit_bytes: u64,
}

/// Memory-backpressure configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Pause dispatching new work while system memory is above the threshold
    #[serde(rename = "safe", default)]
    pub safe: bool,

    /// Utilization percentage that triggers the pause
    #[serde(rename = "threshold-percent", default = "default_mem_threshold")]
    pub threshold_percent: f32,
}

/// Hard cap on worker count, matching what the archive tolerates politely.
pub const MAX_THREADS: usize = 12;

fn default_output_dir() -> String {
    "waymirror_out".to_string()
}

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    MAX_THREADS
}

fn default_timeout() -> u64 {
    30
}

fn default_cdx_url() -> String {
    "https://web.archive.org/cdx/search/cdx".to_string()
}

fn default_replay_url() -> String {
    "https://web.archive.org/web/".to_string()
}

fn default_cache_path() -> String {
    ".waymirror_cache".to_string()
}

fn default_cache_limit() -> u64 {
    10_000_000_000
}

fn default_mem_threshold() -> f32 {
    85.0
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            output_dir: default_output_dir(),
            start_date: None,
            end_date: None,
            max_pages: None,
            all_versions: true,
            auto_detect_date: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            timeout_secs: default_timeout(),
            cdx_url: default_cdx_url(),
            replay_url: default_replay_url(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            size_limit_bytes: default_cache_limit(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            safe: false,
            threshold_percent: default_mem_threshold(),
        }
    }
}
