//! Read-only inspection CLI for a storefront store.
//!
//! # Responsibility
//! - Open a store file (or an empty in-memory store) and print repository
//!   results as JSON.
//! - Print the `{message, status}` error body and exit non-zero on failure.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use storefront_core::{
    CartRepository, CouponRepository, DatabaseLocation, ErrorBody, ItemRepository, LogLevel,
    RepoError, SqliteCartRepository, SqliteCouponRepository, SqliteItemRepository, StoreConfig,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Inspect storefront items, coupons and carts", version)]
struct CliArgs {
    /// SQLite store file. An empty in-memory store is used when omitted.
    #[arg(long = "db", value_name = "path")]
    db: Option<PathBuf>,
    /// Log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "level", value_parser = parse_log_level)]
    log_level: Option<LogLevel>,
    /// Absolute directory for rolling log files.
    #[arg(long = "log-dir", value_name = "dir")]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage info.
    Ping,
    /// List items, newest first.
    Items,
    /// List item slugs.
    Slugs,
    /// Show one item by id or slug.
    Item { id_or_slug: String },
    /// List coupons, newest first.
    Coupons,
    /// List coupon codes.
    Codes,
    /// Show one coupon by id or code.
    Coupon { id_or_code: String },
    /// List carts with lines and coupons resolved.
    Carts,
    /// Show one cart with lines and coupon resolved.
    Cart { id: Uuid },
}

#[derive(Debug)]
enum CliError {
    Setup(String),
    Repo(RepoError),
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(CliError::Setup(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Repo(err)) => {
            log::error!(
                "event=cli_command module=cli status=error error_code={} error={}",
                err.kind().as_str(),
                err
            );
            let body: ErrorBody = err.into();
            match to_json(&body) {
                Ok(output) => println!("{output}"),
                Err(_) => eprintln!("error: {} ({})", body.message, body.status),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<String, CliError> {
    let mut config = StoreConfig {
        database: args
            .db
            .map_or(DatabaseLocation::Memory, DatabaseLocation::File),
        log_dir: args.log_dir,
        ..StoreConfig::default()
    };
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    config
        .init_logging()
        .map_err(|err| CliError::Setup(err.to_string()))?;
    let conn = config
        .open()
        .map_err(|err| CliError::Setup(err.to_string()))?;
    let setup = |err: storefront_core::db::DbError| CliError::Setup(err.to_string());

    let output = match args.command {
        Command::Ping => serde_json::json!({
            "ping": storefront_core::ping(),
            "version": storefront_core::core_version(),
        }),
        Command::Items => to_value(
            SqliteItemRepository::try_new(&conn)
                .map_err(setup)?
                .get_all()?,
        )?,
        Command::Slugs => to_value(
            SqliteItemRepository::try_new(&conn)
                .map_err(setup)?
                .get_all_slugs()?,
        )?,
        Command::Item { id_or_slug } => to_value(
            SqliteItemRepository::try_new(&conn)
                .map_err(setup)?
                .get(&id_or_slug)?,
        )?,
        Command::Coupons => to_value(
            SqliteCouponRepository::try_new(&conn)
                .map_err(setup)?
                .get_all()?,
        )?,
        Command::Codes => to_value(
            SqliteCouponRepository::try_new(&conn)
                .map_err(setup)?
                .get_all_codes()?,
        )?,
        Command::Coupon { id_or_code } => to_value(
            SqliteCouponRepository::try_new(&conn)
                .map_err(setup)?
                .get(&id_or_code)?,
        )?,
        Command::Carts => to_value(
            SqliteCartRepository::try_new(&conn)
                .map_err(setup)?
                .get_all()?,
        )?,
        Command::Cart { id } => to_value(
            SqliteCartRepository::try_new(&conn)
                .map_err(setup)?
                .get(id)?,
        )?,
    };

    to_json(&output)
}

fn parse_log_level(raw: &str) -> Result<LogLevel, String> {
    raw.parse::<LogLevel>().map_err(|err| err.to_string())
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Setup(err.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|err| CliError::Setup(err.to_string()))
}
