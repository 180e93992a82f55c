use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use uuid_pool::{GeneratorConfig, Namespace};

/// Runtime configuration for the `uuid-pool` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uuid-pool",
    version,
    about = "Print UUIDs from a pre-filled, worker-backed pool"
)]
pub struct CliArgs {
    /// Namespace for deterministic (v5) identifiers.
    ///
    /// A textual UUID or one of `dns`, `url`, `oid`, `x500`. Empty means the
    /// nil namespace.
    ///
    /// Environment variable: `UUID_POOL_NAMESPACE`
    #[arg(long, env = "UUID_POOL_NAMESPACE", default_value_t = String::new())]
    pub namespace: String,

    /// Capacity of the pre-generated identifier buffer.
    ///
    /// Environment variable: `BUFFER_SIZE`
    #[arg(long, env = "BUFFER_SIZE", default_value_t = GeneratorConfig::DEFAULT_BUFFER_CAPACITY)]
    pub buffer_size: usize,

    /// Number of background workers filling the buffer.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = GeneratorConfig::DEFAULT_WORKERS)]
    pub num_workers: usize,

    /// Entropy health-check interval in seconds. Zero or negative disables
    /// the monitor.
    ///
    /// Environment variable: `HEALTH_CHECK_INTERVAL`
    #[arg(long, env = "HEALTH_CHECK_INTERVAL", default_value_t = 0, allow_negative_numbers = true)]
    pub health_check_interval: i64,

    /// Number of random (v4) identifiers to print.
    ///
    /// Environment variable: `COUNT`
    #[arg(short, long, env = "COUNT", default_value_t = 10)]
    pub count: usize,

    /// Names to print deterministic (v5) identifiers for.
    ///
    /// Environment variable: `NAME` (comma separated)
    #[arg(short, long, env = "NAME", value_delimiter = ',')]
    pub name: Vec<String>,

    /// Maximum wait for each random identifier, in milliseconds.
    ///
    /// Environment variable: `TIMEOUT_MS`
    #[arg(long, env = "TIMEOUT_MS", default_value_t = 5_000)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub generator: GeneratorConfig,
    pub count: usize,
    pub names: Vec<String>,
    pub timeout: Duration,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.count > 0 && args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0 to print random identifiers");
        }

        if args.count > 0 && args.buffer_size == 0 {
            bail!("BUFFER_SIZE must be greater than 0 to print random identifiers");
        }

        if args.timeout_ms == 0 {
            bail!("TIMEOUT_MS must be greater than 0");
        }

        // Fail early with the parse error rather than at generator startup.
        let namespace = Namespace::parse(&args.namespace)?;

        let mut generator = GeneratorConfig::default()
            .with_namespace_uuid(*namespace.as_uuid())
            .with_buffer_capacity(args.buffer_size)
            .with_workers(args.num_workers);

        match u64::try_from(args.health_check_interval) {
            Ok(secs) if secs > 0 => {
                generator = generator.with_health_check_interval(Duration::from_secs(secs));
            }
            _ => {}
        }

        generator.validate()?;

        Ok(Self {
            generator,
            count: args.count,
            names: args.name,
            timeout: Duration::from_millis(args.timeout_ms),
        })
    }
}
