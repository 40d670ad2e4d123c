//! gymlog - CLI for recording and browsing gym sessions
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/gymlog/gymlog.db (~/.local/share/gymlog/gymlog.db)
//! - Logs: $XDG_STATE_HOME/gymlog/ (~/.local/state/gymlog/)
//! - Config: $XDG_CONFIG_HOME/gymlog/config.toml (~/.config/gymlog/config.toml)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gymlog_core::{Config, GymLog, GymLogRepository, User};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gymlog")]
#[command(about = "Record and browse gym sessions")]
#[command(version)]
struct Args {
    /// Use this database file instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user
    AddUser {
        username: String,
        password: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },
    /// Record an exercise for a user
    Log {
        username: String,
        exercise: String,
        weight: f64,
        reps: i32,
    },
    /// List logs, optionally for one user
    Logs {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List users
    Users,
    /// Print a user's logs every time they change (Ctrl-C to stop)
    Watch { username: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(db) = args.db {
        config.database.path = Some(db);
    }

    let _log_guard =
        gymlog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let repo = GymLogRepository::shared(&config)
        .await
        .context("failed to open database")?;

    match args.command {
        Command::AddUser {
            username,
            password,
            admin,
        } => {
            let mut user = User::new(&username, password);
            user.is_admin = admin;
            let id = repo
                .insert_user(user)
                .await
                .with_context(|| format!("failed to add user {username}"))?;
            println!("Added user {username} (id {id})");
        }
        Command::Log {
            username,
            exercise,
            weight,
            reps,
        } => {
            let user = repo.require_user(&username).await?;
            let id = repo
                .insert_gym_log(GymLog::new(user.id, exercise, weight, reps))
                .await
                .context("failed to record log")?;
            println!("Logged entry {id} for {username}");
        }
        Command::Logs { user: None } => {
            print_logs(&repo.all_logs().await?);
        }
        Command::Logs {
            user: Some(username),
        } => {
            let user = repo.require_user(&username).await?;
            let logs = repo.observe_logs_by_user_id(user.id).await?.get();
            print_logs(&logs);
        }
        Command::Users => {
            for user in repo.all_users().await? {
                let role = if user.is_admin { " (admin)" } else { "" };
                println!("{:>4}  {}{}", user.id, user.username, role);
            }
        }
        Command::Watch { username } => {
            let user = repo.require_user(&username).await?;
            let mut logs = repo.observe_logs_by_user_id(user.id).await?;
            print_logs(&logs.get());

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    next = logs.changed() => {
                        println!("--");
                        print_logs(&next?);
                    }
                }
            }
            tracing::info!(username = %username, "Watch stopped");
        }
    }

    Ok(())
}

fn print_logs(logs: &[GymLog]) {
    if logs.is_empty() {
        println!("No logs");
        return;
    }
    for log in logs {
        println!("{log}");
    }
}
