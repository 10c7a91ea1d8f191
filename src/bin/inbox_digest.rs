use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

use inbox_digest::api::{DigestApi, DigestClient};
use inbox_digest::auth::SessionToken;
use inbox_digest::auth::session_manager::SessionManager;
use inbox_digest::config::{Config, load_config, load_config_from, log_path, resolve_db_path};
use inbox_digest::domain::digest::{Digest, DigestItem, SummarizeOutcome};
use inbox_digest::store::repo::{HistoryRepository, record_received};
use inbox_digest::store::sqlite::SqliteRepo;
use inbox_digest::terminal::events::Flow;
use inbox_digest::terminal::run_tui;

#[derive(Parser)]
#[command(name = "inbox_digest")]
#[command(about = "AI digest of your unread email (login + dashboard)", long_about = None)]
struct Cli {
    /// Use this config file instead of ~/.config/inbox_digest/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend URL from the config
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the backend's Google login in your browser
    Login,

    /// Forget the stored session
    Logout,

    /// Show whether a session is stored
    Status,

    /// Run the interactive dashboard
    Dashboard {
        /// Use this session token instead of the stored one
        #[arg(long)]
        session: Option<String>,

        /// Request a digest right away
        #[arg(long)]
        summarize: bool,
    },

    /// Print a digest of unread emails
    Summarize {
        #[arg(long)]
        session: Option<String>,

        /// Print the raw digest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print usage statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show digests received earlier
    History {
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Delete all but the newest N digests
        #[arg(long)]
        keep: Option<usize>,
    },
}

fn init_logging(to_file: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if to_file {
        // the dashboard owns the terminal
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path()?)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(p) => load_config_from(p),
        None => load_config(),
    }
    .map_err(|e| anyhow!("Configuration error: {e:#}"))?;
    if let Some(url) = &cli.backend {
        cfg.backend_url = url.clone();
    }
    Ok(cfg)
}

fn client(cfg: &Config, session: SessionToken) -> Result<DigestClient> {
    Ok(DigestClient::new(
        cfg.backend_url.clone(),
        session,
        Duration::from_secs(cfg.request_timeout_secs()),
    )?)
}

fn session(mgr: &SessionManager, explicit: Option<String>) -> Result<SessionToken> {
    match explicit {
        Some(s) => Ok(SessionToken::new(s)),
        None => mgr.get_session(),
    }
}

fn open_history(cfg: &Config) -> Option<SqliteRepo> {
    if !cfg.record_history() {
        return None;
    }
    let opened = resolve_db_path(cfg).and_then(|p| SqliteRepo::open(&p));
    match opened {
        Ok(repo) => Some(repo),
        Err(e) => {
            warn!("history disabled: {e}");
            None
        }
    }
}

fn format_epoch(epoch: i64) -> String {
    chrono::DateTime::from_timestamp(epoch, 0)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string()
        })
        .unwrap_or_else(|| epoch.to_string())
}

fn print_item(item: &DigestItem) {
    println!("\nFrom: {}", item.display_from());
    println!("Subject: {}", item.display_subject());
    println!("Summary: {}", item.summary);
    println!("Recommended Action: {}", item.recommended_action.as_str());
    if let Some(draft) = item.draft_reply() {
        println!("Draft Reply:\n{draft}");
    }
}

fn print_digest(digest: &Digest) {
    if let Some(briefing) = &digest.global_summary {
        println!("Daily Briefing:\n{briefing}\n");
    }

    let important = digest.important();
    println!("Action Needed ({})", important.len());
    if important.is_empty() {
        println!("  No important emails pending. You're doing great!");
    }
    important.into_iter().for_each(print_item);

    let junk = digest.junk();
    if !junk.is_empty() {
        println!("\nJunk & Promotions ({})", junk.len());
        junk.into_iter().for_each(print_item);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(matches!(cli.cmd, Command::Dashboard { .. }))?;

    let cfg = resolve_config(&cli)?;
    let mgr = SessionManager::from_config(&cfg);

    match cli.cmd {
        Command::Login => {
            mgr.login()?;
            println!("Signed in to {}", cfg.backend_url);
            Ok(())
        }

        Command::Logout => {
            mgr.logout()?;
            println!("Signed out of {}", cfg.backend_url);
            Ok(())
        }

        Command::Status => {
            match mgr.status()? {
                Some(meta) => println!(
                    "Signed in to {} since {}",
                    meta.backend_url,
                    format_epoch(meta.logged_in_at_epoch)
                ),
                None => println!("Not signed in to {}", cfg.backend_url),
            }
            Ok(())
        }

        Command::Dashboard {
            session: explicit,
            summarize,
        } => {
            let token = session(&mgr, explicit)?;
            let api = client(&cfg, token)?;
            let history = open_history(&cfg);
            let history_ref = history.as_ref().map(|h| h as &dyn HistoryRepository);

            match run_tui(&api, history_ref, summarize)? {
                Flow::Logout => {
                    mgr.logout()?;
                    println!("Signed out. Run `inbox_digest login` to sign in again.");
                }
                Flow::Quit | Flow::Continue => {}
            }
            Ok(())
        }

        Command::Summarize {
            session: explicit,
            json,
        } => {
            let token = session(&mgr, explicit)?;
            let api = client(&cfg, token)?;

            let outcome = api.summarize().map_err(|e| {
                if e.is_unauthorized() {
                    anyhow!("{e} Run `inbox_digest login`.")
                } else {
                    anyhow!(e)
                }
            })?;

            match outcome {
                SummarizeOutcome::Message(msg) => {
                    if json {
                        println!("{}", serde_json::json!({ "summary": msg }));
                    } else {
                        println!("All Caught Up! {msg}");
                    }
                }
                SummarizeOutcome::Digest(digest) => {
                    if let Some(repo) = open_history(&cfg) {
                        record_received(&repo, &digest);
                    }
                    if !digest.is_empty()
                        && let Err(e) = api.log_usage(digest.items.len())
                    {
                        warn!("could not log usage: {e}");
                    }

                    if json {
                        let out = serde_json::json!({
                            "emails": digest.items,
                            "global_summary": digest.global_summary,
                        });
                        println!("{}", serde_json::to_string_pretty(&out)?);
                    } else {
                        print_digest(&digest);
                    }
                }
            }
            Ok(())
        }

        Command::Stats { json } => {
            let api = DigestClient::without_session(
                cfg.backend_url.clone(),
                Duration::from_secs(cfg.request_timeout_secs()),
            )?;
            let stats = api.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!(
                "Time saved: {:.0} minutes ({:.1} hours)",
                stats.total_time_saved_minutes,
                stats.hours_saved()
            );
            println!("Emails processed: {}", stats.total_emails_processed);
            println!("Productivity score: {}", stats.productivity_score);
            println!("\nLast 7 days (minutes saved):");
            for (day, minutes) in stats.graph_data.points() {
                let bar = "#".repeat(minutes.max(0.0).round() as usize / 2);
                println!("  {day}  {minutes:>6.1}  {bar}");
            }
            Ok(())
        }

        Command::History { limit, keep } => {
            let path = resolve_db_path(&cfg)?;
            let repo = SqliteRepo::open(&path)?;
            if let Some(keep) = keep {
                repo.prune_keep_recent(keep)?;
            }
            let entries = repo.list_recent(limit)?;
            if entries.is_empty() {
                println!("No digests recorded yet.");
            }
            for entry in entries {
                println!("--- {} ---", format_epoch(entry.at_epoch));
                if let Some(briefing) = &entry.global_summary {
                    println!("{briefing}");
                }
                for item in &entry.items {
                    println!(
                        "  [{}] {} | {}",
                        item.recommended_action.as_str(),
                        item.display_from(),
                        item.display_subject()
                    );
                    println!("      {}", item.summary);
                }
                println!();
            }
            Ok(())
        }
    }
}
