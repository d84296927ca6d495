mod archive;
mod carrier;
mod config;
mod dates;
mod document;
mod error;
mod fields;
mod form_fill;
mod grouping;
mod normalize;
mod order;
mod order_api;
mod session;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::Config;
use form_fill::PdfTemplate;
use grouping::{ApplyTo, DisplayRow};
use order_api::{OrderFetcher, TeapplixClient};
use session::Session;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bol_builder", about = "Build Bill of Lading PDFs from open HD orders")]
struct Cli {
    #[arg(long, default_value = ".config/bolgen.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Payment-date window in days
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(i64).range(1..=7))]
    days: i64,
    /// Original transaction id to search for (repeatable)
    #[arg(long = "po")]
    pos: Vec<String>,
    /// File with one original transaction id per line
    #[arg(long)]
    po_file: Option<PathBuf>,
    /// Skip the date-window fetch and use only the PO search
    #[arg(long)]
    no_fetch: bool,
}

impl SourceArgs {
    fn ids(&self) -> Result<Vec<String>, std::io::Error> {
        let mut ids = self.pos.clone();
        if let Some(path) = &self.po_file {
            ids.extend(std::fs::read_to_string(path)?.lines().map(str::to_string));
        }
        Ok(order_api::normalize_ids(ids.as_slice()))
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ApplyToArg {
    Selected,
    All,
}

impl From<ApplyToArg> for ApplyTo {
    fn from(arg: ApplyToArg) -> Self {
        match arg {
            ApplyToArg::Selected => ApplyTo::Selected,
            ApplyToArg::All => ApplyTo::All,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the consolidated PO table
    List {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Fill one BOL per selected PO and zip them
    Generate {
        #[command(flatten)]
        source: SourceArgs,
        /// Warehouse key to bulk-assign, e.g. "NJ 08816"
        #[arg(long)]
        warehouse: Option<String>,
        #[arg(long, value_enum, default_value = "selected")]
        apply_to: ApplyToArg,
        /// Restrict the selection to these POs (repeatable)
        #[arg(long = "only")]
        only: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    // Install crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    let cli = Cli::parse();
    let cfg = if cli.config.is_file() {
        Config::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "No config file, using defaults");
        Config::default()
    };

    match cli.command {
        Command::List { source, json } => {
            let session = load_session(&cfg, &source).await?;
            let rows = session.rows(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_rows(&rows);
            }
        }
        Command::Generate {
            source,
            warehouse,
            apply_to,
            only,
        } => {
            let mut session = load_session(&cfg, &source).await?;
            if !session.has_orders() {
                info!("No orders to generate");
                return Ok(());
            }

            let only = order_api::normalize_ids(only.as_slice());
            if !only.is_empty() {
                let rows = session
                    .rows(&cfg)?
                    .into_iter()
                    .map(|mut r| {
                        r.select = only.contains(&r.original_txn_id);
                        r
                    })
                    .collect();
                session = session.with_rows(rows);
            }
            if let Some(key) = warehouse {
                session = session.apply_bulk_warehouse(&cfg, &key, apply_to.into())?;
            }

            let filler = PdfTemplate::new(&cfg.document.template);
            let report = session.generate(&cfg, &filler, OffsetDateTime::now_utc())?;

            for w in &report.warnings {
                println!("⚠ {w}");
            }
            for po in &report.skipped {
                println!("⚠ no orders left for {po}, skipped");
            }
            for po in &report.rejected {
                println!("⚠ unknown warehouse for {po}, rejected");
            }
            match &report.archive {
                Some(archive) => println!(
                    "Generated {} BOL(s) -> {}",
                    report.files.len(),
                    archive.display()
                ),
                None => println!("No BOLs generated."),
            }
        }
    }

    Ok(())
}

/// Date-window fetch (unless disabled) plus the PO search, as one session.
async fn load_session(cfg: &Config, source: &SourceArgs) -> Result<Session, Box<dyn std::error::Error>> {
    let client = TeapplixClient::new(&cfg.api, Config::api_token()?)?;
    let fetcher = OrderFetcher::new(&client, &cfg.api, cfg.zone.offset()?);
    let now = OffsetDateTime::now_utc();

    let mut session = Session::default();
    if !source.no_fetch {
        session = session.with_fetched(fetcher.fetch_by_days(source.days, now).await?);
    }
    let ids = source.ids()?;
    if !ids.is_empty() {
        session = session.with_searched(fetcher.fetch_by_ids(ids.as_slice(), now).await);
    }

    let groups = session.groups();
    if groups.is_empty() {
        warn!("No orders found");
    } else {
        info!(groups = groups.len(), "Orders consolidated by OriginalTxnId");
    }
    Ok(session)
}

fn print_rows(rows: &[DisplayRow]) {
    println!(
        "{:<6} {:<10} {:<20} {:<9} {:<8} {:<5} {:<8}",
        "Select", "Warehouse", "PO", "SKU", "SCAC", "State", "Date"
    );
    for r in rows {
        println!(
            "{:<6} {:<10} {:<20} {:<9} {:<8} {:<5} {:<8}",
            if r.select { "x" } else { "" },
            r.warehouse,
            r.original_txn_id,
            r.sku8,
            r.scac,
            r.to_state,
            r.order_date
        );
    }
    println!("{} row(s), merged by OriginalTxnId", rows.len());
}
