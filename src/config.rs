use clap::Args;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::cluster::cluster::{BrokerConfig, ConsumerSettings, OffsetReset};
use crate::domain::topic::PlanEntry;
use crate::usecase::producer_loop::{ProduceMode, DEFAULT_PIPELINE_WINDOW};
use crate::Error;

pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_SETTLE_MS: u64 = 5000;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub broker: Option<BrokerConfig>,
    pub consumer: Option<ConsumerSettings>,
    pub poll_timeout_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub deadline_ms: Option<u64>,
    pub mode: Option<ProduceMode>,
    pub pipeline_window: Option<usize>,
    pub seed: Option<u64>,
    pub log_file: Option<String>,
    #[serde(default)]
    pub plan: Vec<PlanEntry>,
}

pub fn load_config(path: &str) -> Result<Config, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// Path to harness.toml
    #[arg(long, default_value = "harness.toml", env = "HARNESS_CONFIG")]
    pub config: String,

    /// Comma-separated bootstrap brokers (host:port)
    #[arg(long, env = "HARNESS_BROKERS")]
    pub brokers: Option<String>,

    /// Consumer group id
    #[arg(long)]
    pub group_id: Option<String>,

    /// Where a new consumer group starts: earliest or latest
    #[arg(long)]
    pub offset_reset: Option<OffsetReset>,

    /// Use a throwaway consumer group for this run
    #[arg(long)]
    pub fresh_group: bool,

    /// Upper bound on a single poll, in milliseconds
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    /// Give up consuming after this many seconds (unbounded if unset)
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Submit all records before draining acknowledgments
    #[arg(long)]
    pub pipelined: bool,

    /// Most unacknowledged records allowed in pipelined mode
    #[arg(long)]
    pub pipeline_window: Option<usize>,

    /// Seed for record generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also write diagnostic events to this file
    #[arg(long)]
    pub log_file: Option<String>,

    /// SASL password (falls back to the OS keyring)
    #[arg(long, env = "HARNESS_SASL_PASSWORD", hide_env_values = true)]
    pub sasl_password: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Result of merging harness.toml < env < CLI.
#[derive(Debug, Clone)]
pub struct Effective {
    pub broker: BrokerConfig,
    pub consumer: ConsumerSettings,
    pub poll_timeout: Duration,
    pub settle: Duration,
    pub deadline: Option<Duration>,
    pub mode: ProduceMode,
    pub pipeline_window: usize,
    pub seed: Option<u64>,
    pub log_file: Option<String>,
    pub plan: Vec<PlanEntry>,
    pub sasl_password: Option<String>,
}

impl Effective {
    pub fn new(args: &CommonArgs) -> Result<Self, Error> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(cfg, args)
    }

    pub fn merge(cfg: Config, args: &CommonArgs) -> Result<Self, Error> {
        let mut broker = cfg.broker.unwrap_or_default();
        if let Some(brokers) = &args.brokers {
            broker.brokers = brokers.clone();
        }
        if broker.brokers.trim().is_empty() {
            return Err(Error::Config("broker address must not be empty".into()));
        }

        let mut consumer = cfg.consumer.unwrap_or_default();
        if let Some(group_id) = &args.group_id {
            consumer.group_id = group_id.clone();
        }
        if let Some(offset_reset) = args.offset_reset {
            consumer.offset_reset = offset_reset;
        }
        consumer.fresh_group |= args.fresh_group;

        let poll_timeout_ms = args
            .poll_timeout_ms
            .or(cfg.poll_timeout_ms)
            .unwrap_or(DEFAULT_POLL_TIMEOUT_MS);
        if poll_timeout_ms == 0 {
            return Err(Error::Config("poll timeout must be positive".into()));
        }

        let deadline = args
            .deadline_secs
            .map(Duration::from_secs)
            .or(cfg.deadline_ms.map(Duration::from_millis));

        let mode = if args.pipelined {
            ProduceMode::Pipelined
        } else {
            cfg.mode.unwrap_or_default()
        };

        let pipeline_window = args
            .pipeline_window
            .or(cfg.pipeline_window)
            .unwrap_or(DEFAULT_PIPELINE_WINDOW);
        if pipeline_window == 0 {
            return Err(Error::Config("pipeline window must be positive".into()));
        }

        let plan = if cfg.plan.is_empty() {
            PlanEntry::default_plan()
        } else {
            cfg.plan
        };

        Ok(Self {
            broker,
            consumer,
            poll_timeout: Duration::from_millis(poll_timeout_ms),
            settle: Duration::from_millis(cfg.settle_ms.unwrap_or(DEFAULT_SETTLE_MS)),
            deadline,
            mode,
            pipeline_window,
            seed: args.seed.or(cfg.seed),
            log_file: args.log_file.clone().or(cfg.log_file),
            plan,
            sasl_password: args.sasl_password.clone(),
        })
    }
}
