use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod evaluate;
mod show;

#[derive(Debug, Parser)]
#[command(name = "levermann_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score symbols and persist accepted results.
    Evaluate {
        /// Symbol to evaluate (repeatable). Defaults to LEVERMANN_SYMBOLS.
        #[arg(long = "symbol")]
        symbols: Vec<String>,

        /// Evaluate even when the stored history is still fresh.
        #[arg(long)]
        force: bool,

        /// Do everything except reading from or writing to the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print stored scores. Defaults to every stored symbol.
    Show {
        #[arg(long = "symbol")]
        symbols: Vec<String>,

        /// Print the full per-criterion report.
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = levermann_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = match args.command {
        Command::Evaluate {
            symbols,
            force,
            dry_run,
        } => {
            let symbols = resolve_symbols(&symbols, &settings.symbols);
            anyhow::ensure!(
                !symbols.is_empty(),
                "no symbols given; pass --symbol or set LEVERMANN_SYMBOLS"
            );
            let pool = if dry_run {
                None
            } else {
                Some(connect(&settings).await?)
            };
            let opts = evaluate::Options { force, dry_run };
            evaluate::run(&settings, pool.as_ref(), &symbols, opts).await
        }
        Command::Show { symbols, verbose } => {
            let pool = connect(&settings).await?;
            show::run(&pool, &resolve_symbols(&symbols, &[]), verbose).await
        }
    };

    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
    }
    res
}

async fn connect(settings: &levermann_core::config::Settings) -> anyhow::Result<PgPool> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    levermann_core::storage::migrate(&pool).await?;
    Ok(pool)
}

fn init_sentry(settings: &levermann_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

/// CLI symbols win over configured ones; normalized to upper case, first occurrence kept.
fn resolve_symbols(cli: &[String], configured: &[String]) -> Vec<String> {
    let source = if cli.is_empty() { configured } else { cli };
    let mut out: Vec<String> = Vec::with_capacity(source.len());
    for symbol in source {
        let symbol = levermann_core::storage::results::normalize_symbol(symbol);
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}
