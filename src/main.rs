//! `credstore`: register, log in, and inspect a local credential database.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use credstore::auth::{
    CredentialStore, LoginFlow, LoginOutcome, Notice, NoticeLevel, PasswordRule, RegisterFlow,
    RegisterOutcome, SessionContext,
};
use credstore::{report, Config};

#[derive(Parser, Debug)]
#[command(name = "credstore")]
#[command(version)]
#[command(about = "Local SQLite-backed username/password store")]
struct Cli {
    /// Config file (default: ~/.credstore/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the users table if it does not exist
    Init,
    /// Register a new user
    Register {
        name: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a username and password
    Login {
        name: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Print whether a username is registered
    Exists { name: String },
    /// Dump database tables as `column: value` lines
    Report {
        /// Table to include (repeatable; default from config)
        #[arg(long = "table")]
        tables: Vec<String>,
    },
    /// Check a candidate password against the registration rule
    PasswordRule { password: String },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "credstore=debug"
    } else {
        "credstore=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("{}", notice.message),
        NoticeLevel::Error => eprintln!("{}", notice.message),
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn resolve_password(given: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.allow_empty_password(true).interact()?)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    let store = CredentialStore::from_config(&config.database);
    store.ensure_schema()?;

    match cli.command {
        Command::Init => {
            println!("{}", store.db_path().display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Register { name, password } => {
            let password = resolve_password(password, true)?;
            let flow = RegisterFlow::new(&store, PasswordRule::new(config.auth.min_password_len));
            let outcome = flow.submit(&name, &password)?;
            if let Some(notice) = outcome.notice() {
                print_notice(notice);
            }
            Ok(exit_code(matches!(outcome, RegisterOutcome::Registered { .. })))
        }
        Command::Login { name, password } => {
            let password = resolve_password(password, false)?;
            let session = SessionContext::new();
            let flow = LoginFlow::new(&store, &session, config.scenes.after_login.clone());
            let outcome = flow.submit(&name, &password)?;
            if let Some(notice) = outcome.notice() {
                print_notice(notice);
            }
            if let LoginOutcome::Accepted { next_scene, .. } = &outcome {
                println!("next scene: {next_scene}");
            }
            Ok(exit_code(matches!(outcome, LoginOutcome::Accepted { .. })))
        }
        Command::Exists { name } => {
            let found = store.exists(&name)?;
            println!("{found}");
            Ok(exit_code(found))
        }
        Command::Report { tables } => {
            let tables = if tables.is_empty() {
                config.report.tables.clone()
            } else {
                tables
            };
            for table in report::collect(&store, &tables)? {
                println!("== {}", table.table);
                print!("{}", table.render());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::PasswordRule { password } => {
            let check = PasswordRule::new(config.auth.min_password_len).check(&password);
            println!(
                "{} [{}]",
                check.label,
                if check.satisfied { "ok" } else { "not met" }
            );
            Ok(exit_code(check.satisfied))
        }
    }
}
