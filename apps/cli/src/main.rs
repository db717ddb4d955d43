#![warn(clippy::all, clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use vantage::playground::{CachedCheck, MemoryPlaygroundStore, RedisPlaygroundStore};
use vantage::region::RegionFormat;
use vantage::{
    CheckResult, Header, HttpMethod, MultiRegionOrchestrator, OrchestratorConfig, PingRequest,
    PlaygroundStore, ProbeOutcome, ProberConfig, Region, RegionProber, RetryPolicy, run_playground,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Probe an HTTP endpoint from several regions", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a one-off check and cache the result
    Check(CheckArgs),
    /// Print a cached check
    Show {
        id: String,

        #[arg(long, env = "REDIS_URL")]
        redis_url: String,
    },
    /// List the region catalogue
    Regions,
}

#[derive(Args, Debug)]
struct CheckArgs {
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as `key:value`, may be repeated
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<Header>,

    #[arg(short, long)]
    body: Option<String>,

    /// Limit the check to these regions, may be repeated; needs `--checker-url`
    /// for anything but the local region
    #[arg(short, long = "region")]
    regions: Vec<Region>,

    /// Delegate probes to regional checkers behind this URL
    #[arg(long, env = "CHECKER_URL")]
    checker_url: Option<String>,

    /// Region reported for checks run from this machine without a checker
    #[arg(long, env = "VANTAGE_LOCAL_REGION", default_value = "ams")]
    local_region: Region,

    #[arg(long, env = "CHECKER_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Cache results in Redis instead of memory
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

fn parse_header(raw: &str) -> Result<Header, String> {
    let (key, value) = raw.split_once(':').ok_or_else(|| format!("expected key:value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("header name is empty in {raw:?}"));
    }
    Ok(Header::new(key, value.trim()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN });

    match cli.command {
        Command::Check(args) => check(args).await,
        Command::Show { id, redis_url } => show(&id, &redis_url).await,
        Command::Regions => {
            for region in Region::ALL {
                println!("{:<4} {:<14} {}", region.code(), region.continent(), region.format(RegionFormat::Long));
            }
            Ok(())
        }
    }
}

async fn check(args: CheckArgs) -> Result<()> {
    let method: HttpMethod = args.method.parse()?;
    let mut request = PingRequest::new(&args.url).with_method(method).with_timeout(args.timeout_ms);
    request.headers = args.headers;
    request.body = args.body;

    let config = OrchestratorConfig {
        retry: RetryPolicy::none(),
        default_timeout: Duration::from_millis(args.timeout_ms),
        ..OrchestratorConfig::default()
    };

    let mut orchestrator = match &args.checker_url {
        Some(url) => MultiRegionOrchestrator::remote(url, args.secret, config)?,
        None => {
            local_only(&args.regions, args.local_region)?;
            let prober_config = ProberConfig::builder()
                .region(args.local_region)
                .default_timeout(Duration::from_millis(args.timeout_ms))
                .build();
            MultiRegionOrchestrator::new(config).with_prober(Arc::new(RegionProber::new(prober_config)?))
        }
    };
    if !args.regions.is_empty() {
        orchestrator.retain(&args.regions);
    }

    let store: Box<dyn PlaygroundStore> = match &args.redis_url {
        Some(url) => Box::new(RedisPlaygroundStore::connect(url).await?),
        None => Box::new(MemoryPlaygroundStore::new()),
    };

    let run = run_playground(&orchestrator, store.as_ref(), &request).await?;

    println!("{} {}", request.method, request.url);
    for outcome in &run.outcomes {
        print_outcome(outcome);
    }
    println!();
    println!("Check id: {}", run.id);

    Ok(())
}

/// Without checkers every measurement comes from this machine, so only its
/// own region can be labelled truthfully
fn local_only(regions: &[Region], local: Region) -> Result<()> {
    if let Some(region) = regions.iter().find(|region| **region != local) {
        bail!(
            "Region {region} cannot be measured from this machine (local region is {local}), \
             pass --checker-url to check from regional checkers"
        );
    }
    Ok(())
}

async fn show(id: &str, redis_url: &str) -> Result<()> {
    let store = RedisPlaygroundStore::connect(redis_url).await?;
    let Some(cached) = store.get(id).await? else {
        bail!("No cached check with id {id}, it may have expired");
    };

    print_cached(&cached)
}

fn print_cached(cached: &CachedCheck) -> Result<()> {
    let started = chrono::DateTime::from_timestamp_millis(cached.time)
        .with_context(|| format!("Invalid check time {}", cached.time))?;

    println!("{} {} ({})", cached.method, cached.url, started.to_rfc3339());
    for check in &cached.checks {
        print_check(check);
    }
    Ok(())
}

fn print_outcome(outcome: &ProbeOutcome) {
    match outcome {
        ProbeOutcome::Success(check) => print_check(check),
        ProbeOutcome::Failure(error) => {
            println!("{:<8} {:<16} {}", error.region.format(RegionFormat::Short), error.kind, error.message);
        }
    }
}

fn print_check(check: &CheckResult) {
    let redirected = if check.redirected { " (redirected)" } else { "" };
    println!(
        "{:<8} {:<16} {} ms{}",
        check.region.format(RegionFormat::Short),
        check.status_code,
        check.latency,
        redirected
    );

    match (check.timing.phases(), check.timing.phase_widths()) {
        (Ok(phases), Ok(widths)) => {
            for (phase, width) in widths.iter() {
                println!("    {:<10} {:>6} ms {:>6.1}%", phase.name(), phases.get(phase), width.width);
            }
        }
        (Err(error), _) | (_, Err(error)) => println!("    timing unavailable: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-Api-Key: abc").unwrap(), Header::new("X-Api-Key", "abc"));
        assert_eq!(parse_header("Accept:a:b").unwrap(), Header::new("Accept", "a:b"));
        assert!(parse_header("no-separator").is_err());
        assert!(parse_header(" :value").is_err());
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from([
            "vantage",
            "check",
            "https://example.com",
            "-X",
            "post",
            "-H",
            "a:b",
            "--region",
            "ams",
            "--region",
            "syd",
        ])
        .unwrap();

        let Command::Check(args) = cli.command else {
            panic!("expected check subcommand");
        };
        assert_eq!(args.method, "post");
        assert_eq!(args.headers, vec![Header::new("a", "b")]);
        assert_eq!(args.regions, vec![Region::Ams, Region::Syd]);
    }

    #[test]
    fn test_local_region_defaults_to_ams() {
        let cli = Cli::try_parse_from(["vantage", "check", "https://example.com"]).unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check subcommand");
        };
        assert_eq!(args.local_region, Region::Ams);

        let cli = Cli::try_parse_from(["vantage", "check", "https://example.com", "--local-region", "gru"]).unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check subcommand");
        };
        assert_eq!(args.local_region, Region::Gru);
    }

    #[test]
    fn test_local_mode_refuses_remote_regions() {
        assert!(local_only(&[], Region::Ams).is_ok());
        assert!(local_only(&[Region::Syd, Region::Syd], Region::Syd).is_ok());

        let error = local_only(&[Region::Ams, Region::Iad], Region::Ams).unwrap_err();
        assert!(error.to_string().contains("iad"));
        assert!(error.to_string().contains("--checker-url"));
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        assert!(Cli::try_parse_from(["vantage", "check", "https://example.com", "-r", "xyz"]).is_err());
    }
}
