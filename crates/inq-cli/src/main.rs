use anyhow::Result;
use clap::{Parser, Subcommand};
use inq_config::ConfigMode;
use std::path::PathBuf;

mod commands;

use commands::{fiscal, report, CommandContext};

#[derive(Parser)]
#[command(name = "inq")]
#[command(about = "Inquiry case-stock reconciliation CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> site -> local)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Backlog reports (opening, entries, exits, closing)
    Report {
        #[command(subcommand)]
        cmd: ReportCmd,
    },

    /// Opening-stock resolution
    Stock {
        #[command(subcommand)]
        cmd: StockCmd,
    },

    /// Fiscal-year opening stock administration (database only)
    Fiscal {
        #[command(subcommand)]
        cmd: FiscalCmd,
    },

    /// Entry drill-down
    Entries {
        #[command(subcommand)]
        cmd: EntriesCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ReportCmd {
    /// Reconcile one calendar month for both categories.
    Month {
        /// Defaults to the current year in the configured timezone
        #[arg(long)]
        year: Option<i32>,

        /// 1..=12. Defaults to the current month in the configured timezone
        #[arg(long)]
        month: Option<u32>,

        /// Read cases.csv / registrations.csv / fiscal_years.csv from DIR instead of the database
        #[arg(long = "csv-dir")]
        csv_dir: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Month-by-month table for one year plus the year total.
    Year {
        #[arg(long)]
        year: i32,

        /// Last month included. Defaults to 12, or the current month for the current year
        #[arg(long = "through-month")]
        through_month: Option<u32>,

        #[arg(long = "csv-dir")]
        csv_dir: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StockCmd {
    /// Print the opening stock a report for YEAR starts from.
    Resolve {
        #[arg(long)]
        year: i32,

        /// ordinary | deprecated
        #[arg(long)]
        category: String,

        #[arg(long = "csv-dir")]
        csv_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FiscalCmd {
    /// Print the configured opening stock of one year.
    Show {
        #[arg(long)]
        year: i32,
    },

    /// Insert or replace one year's configured opening stock.
    Set {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        ordinary: i64,

        #[arg(long)]
        deprecated: i64,
    },

    /// Print every configured year.
    List,

    /// Write YEAR's closing stock as YEAR+1's opening stock.
    /// Guardrail: refuses to replace a nonzero configured value unless --yes
    /// or /rollover/allow_overwrite is set.
    Rollover {
        #[arg(long)]
        year: i32,

        /// Acknowledge replacing an already configured opening stock.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EntriesCmd {
    /// List the distinct identifiers counted as entries in [FROM, TO].
    List {
        /// YYYY-MM-DD, inclusive
        #[arg(long)]
        from: String,

        /// YYYY-MM-DD, inclusive
        #[arg(long)]
        to: String,

        /// ordinary | deprecated
        #[arg(long)]
        category: String,

        #[arg(long = "csv-dir")]
        csv_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // dev-time convenience; absent file is fine
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let ctx = CommandContext::load(&cli.config_paths, ConfigMode::Report)?;
            let pool = ctx.connect_db().await?;
            match cmd {
                DbCmd::Status => {
                    let s = inq_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_cases_table={} has_fiscal_years_table={} case_folding_ok={}",
                        s.ok, s.has_cases_table, s.has_fiscal_years_table, s.case_folding_ok
                    );
                }
                DbCmd::Migrate => {
                    inq_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = inq_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Report { cmd } => {
            let ctx = CommandContext::load(&cli.config_paths, ConfigMode::Report)?;
            match cmd {
                ReportCmd::Month {
                    year,
                    month,
                    csv_dir,
                    json,
                } => {
                    report::report_month(&ctx, year, month, csv_dir.as_deref(), json).await?;
                }
                ReportCmd::Year {
                    year,
                    through_month,
                    csv_dir,
                    json,
                } => {
                    report::report_year(&ctx, year, through_month, csv_dir.as_deref(), json)
                        .await?;
                }
            }
        }

        Commands::Stock { cmd } => {
            let ctx = CommandContext::load(&cli.config_paths, ConfigMode::Report)?;
            match cmd {
                StockCmd::Resolve {
                    year,
                    category,
                    csv_dir,
                } => {
                    report::stock_resolve(&ctx, year, &category, csv_dir.as_deref()).await?;
                }
            }
        }

        Commands::Fiscal { cmd } => {
            let ctx = CommandContext::load(&cli.config_paths, ConfigMode::Admin)?;
            match cmd {
                FiscalCmd::Show { year } => fiscal::fiscal_show(&ctx, year).await?,
                FiscalCmd::Set {
                    year,
                    ordinary,
                    deprecated,
                } => fiscal::fiscal_set(&ctx, year, ordinary, deprecated).await?,
                FiscalCmd::List => fiscal::fiscal_list(&ctx).await?,
                FiscalCmd::Rollover { year, yes } => {
                    fiscal::fiscal_rollover(&ctx, year, yes).await?
                }
            }
        }

        Commands::Entries { cmd } => {
            let ctx = CommandContext::load(&cli.config_paths, ConfigMode::Report)?;
            match cmd {
                EntriesCmd::List {
                    from,
                    to,
                    category,
                    csv_dir,
                } => {
                    report::entries_list(&ctx, &from, &to, &category, csv_dir.as_deref()).await?;
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only key=value / JSON output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
