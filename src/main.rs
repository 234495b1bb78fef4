use anyhow::Result;
use clap::{Parser, Subcommand};
use proxy_keeper::{
    proxy::{checker::DEFAULT_CONCURRENCY, feed::DEFAULT_FEED_URL, geo::DEFAULT_GEO_URL},
    CheckerConfig, Config, FeedFilters, ProxyRecord, ProxyService, DEFAULT_STORE_PATH,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// A proxy store validated by geolocation and TCP reachability
#[derive(Parser)]
#[command(name = "proxy-keeper")]
#[command(about = "A proxy store validated by geolocation and TCP reachability")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Store file path
    #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Number of concurrent checks
    #[arg(short = 'n', long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// TCP connect timeout in seconds
    #[arg(long, default_value = "5")]
    probe_timeout: u64,

    /// Geolocation request timeout in seconds
    #[arg(long, default_value = "5")]
    geo_timeout: u64,

    /// Geolocation service base URL
    #[arg(long, default_value = DEFAULT_GEO_URL)]
    geo_url: String,

    /// MMDB file to geolocate from instead of the geolocation service
    #[arg(long)]
    mmdb: Option<PathBuf>,

    /// Proxy-list feed URL
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show stored proxies
    List,
    /// Re-probe every stored proxy
    Refresh,
    /// Replace the store with validated proxies from the feed
    FetchNew {
        /// Protocol filter (http, socks4, socks5, all)
        #[arg(long, default_value = "all")]
        protocol: String,
        /// Provider-side timeout in milliseconds
        #[arg(long, default_value = "10000")]
        timeout: u32,
        /// Country filter (ISO code or all)
        #[arg(long, default_value = "all")]
        country: String,
        /// SSL filter (yes, no, all)
        #[arg(long, default_value = "all")]
        ssl: String,
        /// Anonymity filter (elite, anonymous, transparent, all)
        #[arg(long, default_value = "all")]
        anonymity: String,
    },
    /// Export stored proxies as ip:port lines
    Export {
        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut checker = CheckerConfig::new()
        .with_concurrency(cli.concurrency)
        .with_probe_timeout(Duration::from_secs(cli.probe_timeout))
        .with_geo_timeout(Duration::from_secs(cli.geo_timeout))
        .with_geo_url(cli.geo_url);
    if let Some(path) = cli.mmdb {
        checker = checker.with_mmdb_path(path);
    }

    let config = Config::new()
        .with_store_path(cli.store)
        .with_feed_url(cli.feed_url)
        .with_checker(checker);

    let service = ProxyService::from_config(&config)?;

    match cli.command {
        Some(Commands::List) | None => {
            print_records(&service.list()?);
        }
        Some(Commands::Refresh) => {
            let records = service.refresh().await?;
            let failed = records.iter().filter(|r| r.speed.is_fail()).count();
            println!(
                "Refreshed {} proxies: {} responding, {} failed",
                records.len(),
                records.len() - failed,
                failed
            );
        }
        Some(Commands::FetchNew {
            protocol,
            timeout,
            country,
            ssl,
            anonymity,
        }) => {
            let filters = FeedFilters::new()
                .with_protocol(protocol)
                .with_timeout(timeout)
                .with_country(country)
                .with_ssl(ssl)
                .with_anonymity(anonymity);

            let records = service.fetch_new(&filters).await?;
            println!("Saved {} validated proxies to {:?}", records.len(), config.store_path);
        }
        Some(Commands::Export { output }) => {
            let content = service.export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Exported proxies to {:?}", path);
                }
                None => println!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).compact().init();
}

fn print_records(records: &[ProxyRecord]) {
    if records.is_empty() {
        println!("No proxies stored.");
        return;
    }

    println!("{:<22} {:<8} {:<20} {}", "PROXY", "COUNTRY", "CITY", "SPEED");
    for record in records {
        println!(
            "{:<22} {:<8} {:<20} {}",
            record.ip, record.country, record.city, record.speed
        );
    }
}
