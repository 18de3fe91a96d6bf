use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;

use sessionstore::Store;
use sessionstore::cli::{Cli, Command, default_store_path};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let store_path = cli.store.unwrap_or_else(default_store_path);
    let mut store = Store::open(&store_path).context("Failed to open session store")?;

    info!("sessionstore opened at {}", store.path().display());

    match cli.command {
        Command::Sessions => {
            let sessions = store.list_sessions()?;
            if sessions.is_empty() {
                println!("{}", "No sessions".dimmed());
            }
            for s in sessions {
                let updated = format_millis(s.updated_at);
                println!(
                    "{} {} {} {}",
                    s.identity.cyan(),
                    s.state.as_deref().unwrap_or("IDLE").yellow(),
                    s.mode.as_deref().unwrap_or("-"),
                    updated.dimmed()
                );
            }
        }
        Command::Show { identity } => {
            let session = store
                .get_session(&identity)?
                .ok_or_else(|| eyre!("No session for {}", identity))?;
            println!("{}: {}", "identity".bold(), session.identity.cyan());
            println!("{}: {}", "state".bold(), session.state.as_deref().unwrap_or("IDLE").yellow());
            println!("{}: {}", "mode".bold(), session.mode.as_deref().unwrap_or("-"));
            match serde_json::from_str::<serde_json::Value>(&session.data) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(e) => println!("{} {} ({})", "✗".red(), session.data, e),
            }
        }
        Command::Clear { identity } => {
            if store.delete_session(&identity)? {
                println!("{} Cleared session: {}", "✓".green(), identity.cyan());
            } else {
                println!("{} No session for {}", "-".dimmed(), identity);
            }
        }
        Command::Profile { identity, set } => {
            for assignment in &set {
                let (field, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| eyre!("Expected FIELD=VALUE, got {}", assignment))?;
                store.set_profile_field(&identity, field.trim(), value.trim())?;
                println!("{} {} = {}", "✓".green(), field.trim().yellow(), value.trim());
            }
            let profile = store.get_profile(&identity)?;
            for field in sessionstore::ProfileField::ALL {
                println!("{}: {}", format!("{:>14}", field.column()).bold(), profile.get(field).unwrap_or("-"));
            }
        }
        Command::Travellers => {
            let travellers = store.travellers()?;
            if travellers.is_empty() {
                println!("{}", "No itineraries".dimmed());
            }
            for t in travellers {
                println!(
                    "{} {} {} {}",
                    t.identity.cyan(),
                    t.name.as_deref().unwrap_or("-"),
                    format!("{} itinerary(s)", t.itineraries).yellow(),
                    format_millis(t.last_itinerary_at).dimmed()
                );
            }
        }
        Command::Itineraries { identity, full } => {
            let history = store.list_itineraries(&identity)?;
            if history.is_empty() {
                println!("{} No itineraries for {}", "-".dimmed(), identity);
            }
            for record in history {
                println!(
                    "{} {} {} {} {}",
                    format!("#{}", record.id).bold(),
                    record.destination.as_deref().unwrap_or("-").cyan(),
                    record.dates.as_deref().unwrap_or("-"),
                    record.budget.as_deref().unwrap_or("-").yellow(),
                    format_millis(record.created_at).dimmed()
                );
                if full {
                    println!("{}\n", record.itinerary);
                }
            }
        }
    }

    Ok(())
}
