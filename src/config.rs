//! Run configuration: command-line flags, an optional TOML file, and the
//! validated [`Settings`] built from both.
//!
//! Command-line values win over the file. Switches (`--embed-image`, ...)
//! are enabled when either source enables them; list options are
//! concatenated for tags and replaced for aspects.
use clap::Parser;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::feed::IngestOptions;
use crate::publish::{
    Audience, ContentMode, FormatOptions, PodCredentials, PublishOptions, DEFAULT_BRANDING, PUBLIC,
};

const DEFAULT_DATABASE: &str = "feed.db";
const DEFAULT_TIMEOUT_HOURS: u32 = 72;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Missing {0} (required unless --fetch-only is set)")]
    Missing(&'static str),

    #[error("--body and --summary are mutually exclusive")]
    ConflictingContentModes,

    #[error("aspect \"public\" cannot be combined with other aspects")]
    MixedAudience,
}

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser)]
#[command(
    name = "pod-feeder",
    version,
    about = "Publish RSS/Atom feed items to a diaspora* pod"
)]
pub struct Cli {
    /// An arbitrary identifier for this feed
    #[arg(long)]
    pub feed_id: String,

    /// The feed URL
    #[arg(long)]
    pub feed_url: String,

    /// Hashtag to add to all posts. May be repeated
    #[arg(long = "auto-tag", value_name = "TAG")]
    pub auto_tags: Vec<String>,

    /// Hashtag to filter out. May be repeated
    #[arg(long = "ignore-tag", value_name = "TAG")]
    pub ignore_tags: Vec<String>,

    /// Turn entry categories into hashtags
    #[arg(long)]
    pub category_tags: bool,

    /// Queue new items without publishing
    #[arg(long)]
    pub fetch_only: bool,

    /// Post at most N items per run (<= 0 means no limit)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Hours to keep retrying failed posts (default 72)
    #[arg(long, value_name = "HOURS")]
    pub timeout: Option<u32>,

    /// Post the body (full text) of each item
    #[arg(long, conflicts_with = "summary")]
    pub body: bool,

    /// Post the summary of each item
    #[arg(long)]
    pub summary: bool,

    /// Embed the item's image when one exists
    #[arg(long)]
    pub embed_image: bool,

    /// Post the raw link instead of hyperlinking the title
    #[arg(long)]
    pub post_raw_link: bool,

    /// Leave out the branding footer
    #[arg(long)]
    pub no_branding: bool,

    /// Footer text (default "posted by pod-feeder")
    #[arg(long, value_name = "TEXT")]
    pub branding: Option<String>,

    /// Aspect id to share with. May be repeated (default: public)
    #[arg(long = "aspect", value_name = "ASPECT")]
    pub aspects: Vec<String>,

    /// SQLite file holding the queue (default: feed.db)
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// The pod URL
    #[arg(long, value_name = "URL")]
    pub pod_url: Option<String>,

    /// API access token for the pod
    #[arg(long, env = "POD_FEEDER_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// TOML file with defaults for any of the options above
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debugging output
    #[arg(long)]
    pub debug: bool,
}

// ============================================================================
// Config File
// ============================================================================

/// Settings shared by several feeds, usually kept in a TOML file.
///
/// Custom Debug impl masks `access_token`.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub pod_url: Option<String>,
    pub access_token: Option<String>,
    pub aspects: Vec<String>,
    pub branding: Option<String>,
    pub no_branding: bool,
    pub timeout: Option<u32>,
    pub limit: Option<i64>,
    pub content: Option<ContentMode>,
    pub embed_image: bool,
    pub post_raw_link: bool,
    pub category_tags: bool,
    pub auto_tags: Vec<String>,
    pub ignore_tags: Vec<String>,
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("database", &self.database)
            .field("pod_url", &self.pod_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("aspects", &self.aspects)
            .field("branding", &self.branding)
            .field("no_branding", &self.no_branding)
            .field("timeout", &self.timeout)
            .field("limit", &self.limit)
            .field("content", &self.content)
            .field("embed_image", &self.embed_image)
            .field("post_raw_link", &self.post_raw_link)
            .field("category_tags", &self.category_tags)
            .field("auto_tags", &self.auto_tags)
            .field("ignore_tags", &self.ignore_tags)
            .finish()
    }
}

impl FileConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 14] = [
        "database",
        "pod_url",
        "access_token",
        "aspects",
        "branding",
        "no_branding",
        "timeout",
        "limit",
        "content",
        "embed_image",
        "post_raw_link",
        "category_tags",
        "auto_tags",
        "ignore_tags",
    ];

    /// Load a config file named on the command line.
    ///
    /// - Missing file → `Err(ConfigError::Io)`, it was asked for explicitly
    /// - Empty file → `Ok(FileConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: FileConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }
}

// ============================================================================
// Validated Settings
// ============================================================================

/// Whether a run publishes or only queues.
#[derive(Debug)]
pub enum RunMode {
    Publish(PodCredentials),
    FetchOnly,
}

/// Validated configuration for one run.
#[derive(Debug)]
pub struct Settings {
    pub feed_id: String,
    pub feed_url: Url,
    pub database: PathBuf,
    pub ingest: IngestOptions,
    pub publish: PublishOptions,
    /// Maximum posts per run; `None` is unbounded.
    pub limit: Option<u32>,
    /// Retry horizon in hours.
    pub timeout_hours: u32,
    pub run_mode: RunMode,
}

impl Settings {
    /// Merge command line and file values and validate the result.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let feed_url = parse_http_url("feed URL", &cli.feed_url)?;

        let content = match (cli.body, cli.summary) {
            (true, true) => return Err(ConfigError::ConflictingContentModes),
            (true, false) => ContentMode::Body,
            (false, true) => ContentMode::Summary,
            (false, false) => file.content.unwrap_or_default(),
        };

        let branding = if cli.no_branding || file.no_branding {
            None
        } else {
            Some(
                cli.branding
                    .or(file.branding)
                    .unwrap_or_else(|| DEFAULT_BRANDING.to_string()),
            )
        };

        let aspects = if cli.aspects.is_empty() {
            file.aspects
        } else {
            cli.aspects
        };
        if aspects.len() > 1 && aspects.iter().any(|a| a.eq_ignore_ascii_case(PUBLIC)) {
            return Err(ConfigError::MixedAudience);
        }

        let limit = cli.limit.or(file.limit).unwrap_or(-1);
        let limit = if limit > 0 {
            Some(u32::try_from(limit).unwrap_or(u32::MAX))
        } else {
            None
        };

        let run_mode = if cli.fetch_only {
            RunMode::FetchOnly
        } else {
            let pod_url = cli
                .pod_url
                .or(file.pod_url)
                .ok_or(ConfigError::Missing("--pod-url"))?;
            let access_token = cli
                .access_token
                .or(file.access_token)
                .filter(|t| !t.trim().is_empty())
                .ok_or(ConfigError::Missing("--access-token"))?;
            RunMode::Publish(PodCredentials {
                pod_url: parse_http_url("pod URL", &pod_url)?,
                access_token: SecretString::from(access_token),
            })
        };

        Ok(Self {
            feed_id: cli.feed_id,
            feed_url,
            database: cli
                .database
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            ingest: IngestOptions {
                category_tags: cli.category_tags || file.category_tags,
                auto_tags: file.auto_tags.into_iter().chain(cli.auto_tags).collect(),
                ignore_tags: file.ignore_tags.into_iter().chain(cli.ignore_tags).collect(),
            },
            publish: PublishOptions {
                format: FormatOptions {
                    content,
                    embed_image: cli.embed_image || file.embed_image,
                    post_raw_link: cli.post_raw_link || file.post_raw_link,
                    branding,
                },
                audience: Audience::new(aspects),
            },
            limit,
            timeout_hours: cli.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_HOURS),
            run_mode,
        })
    }

    /// Retry horizon in seconds.
    pub fn max_age_secs(&self) -> i64 {
        i64::from(self.timeout_hours) * 3600
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {} (only http/https allowed)", scheme),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
