//! System Stats - host metrics agent binary
//!
//! Reports CPU, memory and disk metrics to a statsd collector until
//! interrupted.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use system_stats::config::parse_interval;
use system_stats::{
    take_snapshot, AgentConfig, Collector, HostSnapshot, MetricSink, Namespaced, ProcSource,
    StatsdSink, DEFAULT_STATSD_ADDRESS,
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "system-stats")]
#[command(about = "Host metrics agent reporting to statsd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Samples CPU, memory and disk usage and reports them to a statsd collector")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// statsd address
    #[arg(long, default_value = DEFAULT_STATSD_ADDRESS)]
    statsd_address: String,

    /// Memory reporting interval
    #[arg(long, default_value = "10s", value_parser = parse_interval)]
    memory_interval: Duration,

    /// Disk reporting interval
    #[arg(long, default_value = "30s", value_parser = parse_interval)]
    disk_interval: Duration,

    /// CPU reporting interval
    #[arg(long, default_value = "5s", value_parser = parse_interval)]
    cpu_interval: Duration,

    /// Output additional extended metrics
    #[arg(long)]
    extended: bool,

    /// Node name, defaulting to the hostname
    #[arg(long, default_value = system_stats::config::HOSTNAME_PLACEHOLDER)]
    name: String,

    /// Directory to read kernel counters from
    #[arg(long, default_value = "/proc")]
    proc_root: PathBuf,

    /// fstab to discover monitored mount points from
    #[arg(long, default_value = "/etc/fstab")]
    fstab: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report metrics until interrupted (default)
    Run,

    /// Take a single reading of every subsystem and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

impl Cli {
    fn source(&self) -> ProcSource {
        ProcSource::new()
            .with_proc_root(&self.proc_root)
            .with_fstab(&self.fstab)
    }

    fn config(&self) -> AgentConfig {
        AgentConfig::default()
            .with_statsd_address(&self.statsd_address)
            .with_node_name(&self.name)
            .with_extended(self.extended)
            .with_cpu_interval(self.cpu_interval)
            .with_memory_interval(self.memory_interval)
            .with_disk_interval(self.disk_interval)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let result = match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, args).await,
        Some(Commands::Run) | None => run_command(&cli).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.config();
    config.validate().context("invalid configuration")?;

    info!("starting system-stats {}", env!("CARGO_PKG_VERSION"));

    let statsd = StatsdSink::dial(&config.statsd_address)
        .await
        .context("could not initialize statsd client")?;
    let node = config
        .resolve_node_name()
        .context("could not get hostname")?;
    info!(node = %node, address = %config.statsd_address, "statsd client ready");

    let sink: Arc<dyn MetricSink> = Arc::new(Namespaced::new(Arc::new(statsd), node));
    let mut collector = Collector::with_defaults(sink, Arc::new(cli.source()), &config);

    if let Err(e) = collector.start().await {
        // Resources started before the failure are still running.
        if let Err(stop_err) = collector.stop().await {
            warn!(error = %stop_err, "failed to stop collector after start failure");
        }
        return Err(e).context("could not start collector");
    }

    shutdown_signal().await?;
    info!("shutting down");

    collector.stop().await.context("could not stop collector")?;
    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

async fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let node = cli
        .config()
        .resolve_node_name()
        .context("could not get hostname")?;
    let snapshot = take_snapshot(&cli.source(), node).await?;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        "pretty" => print_pretty_snapshot(&snapshot),
        other => anyhow::bail!("unsupported format: {other}. Use 'json' or 'pretty'"),
    }

    Ok(())
}

fn print_pretty_snapshot(snapshot: &HostSnapshot) {
    println!(
        "System Snapshot for {} ({})",
        snapshot.node,
        snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!();

    let cpu = &snapshot.cpu;
    let (total, idle) = system_stats::metrics::cpu::jiffies(&cpu.times);
    println!("CPU:");
    println!("  Jiffies: {} total, {} idle", total, idle);
    println!("  Interrupts: {}", cpu.interrupts);
    println!("  Context switches: {}", cpu.context_switches);
    println!(
        "  Processes: {} running, {} blocked",
        cpu.procs_running, cpu.procs_blocked
    );
    println!();

    let memory = &snapshot.memory;
    println!("Memory:");
    println!("  Total: {:.1} GB", kb_to_gb(memory.total));
    println!(
        "  Used: {:.1} GB",
        kb_to_gb(system_stats::metrics::memory::used(memory))
    );
    println!("  Free: {:.1} GB", kb_to_gb(memory.free));
    println!(
        "  Swap: {:.1} GB of {:.1} GB free",
        kb_to_gb(memory.swap_free),
        kb_to_gb(memory.swap_total)
    );
    println!();

    if !snapshot.disks.is_empty() {
        println!("Disks:");
        for disk in &snapshot.disks {
            println!(
                "  {}: {:.1} GB total, {:.1} GB used",
                disk.path,
                disk.total as f64 / 1024.0 / 1024.0 / 1024.0,
                disk.used as f64 / 1024.0 / 1024.0 / 1024.0
            );
        }
    }
}

fn kb_to_gb(kb: u64) -> f64 {
    kb as f64 / 1024.0 / 1024.0
}
