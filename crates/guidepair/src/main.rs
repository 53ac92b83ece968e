//! `guidepair` - CLI for the athlete and guide pairing engine
//!
//! This binary manages events, people and sign-ups, and edits each event's
//! pairings through the same session the interactive screen uses.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use guidepair::cli::{
    Cli, Command, ConfigCommand, EventCommand, PairCommand, PairingsCommand, PersonCommand,
    RosterCommand, SelectCommand, SignupCommand,
};
use guidepair::{
    init_logging, pace, Config, Event, PairingSession, Person, PersonId, Removed, SignUp,
    Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Event(cmd) => handle_event(&open_storage(&config)?, cmd),
        Command::Person(cmd) => handle_person(&open_storage(&config)?, cmd),
        Command::Signup(cmd) => handle_signup(&open_storage(&config)?, &cmd),
        Command::Roster(cmd) => handle_roster(&open_storage(&config)?, &config, &cmd).await,
        Command::Pair(cmd) => handle_pair(&open_storage(&config)?, &config, &cmd).await,
        Command::Unpair(cmd) => handle_unpair(&open_storage(&config)?, &config, &cmd).await,
        Command::Select(cmd) => handle_select(&open_storage(&config)?, &config, cmd).await,
        Command::Pairings(cmd) => handle_pairings(&open_storage(&config)?, &cmd),
        Command::Status(cmd) => handle_status(&open_storage(&config)?, cmd.json),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok(storage.with_include_maybe(config.pairing.include_maybe))
}

async fn load_session(
    storage: &Storage,
    config: &Config,
    event_id: &str,
) -> anyhow::Result<PairingSession> {
    PairingSession::load(storage, event_id, config.session_settings())
        .await
        .with_context(|| format!("failed to load event '{event_id}'"))
}

async fn save_session(storage: &Storage, session: &mut PairingSession) -> anyhow::Result<()> {
    if !session.has_unsaved_changes() {
        println!("No changes to save.");
        return Ok(());
    }
    session
        .save(storage)
        .await
        .with_context(|| format!("failed to save pairings for '{}'", session.event_id()))?;
    println!("Saved.");
    Ok(())
}

fn handle_event(storage: &Storage, cmd: EventCommand) -> anyhow::Result<()> {
    match cmd {
        EventCommand::Add { id, name, date } => {
            storage.add_event(&Event::new(&id, &name, date))?;
            println!("Event '{id}' saved.");
        }
        EventCommand::List { json } => {
            let events = storage.list_events()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No events.");
            } else {
                for event in events {
                    let date = event.date.map_or_else(|| "-".to_string(), |d| d.to_string());
                    println!("{:<20} {:<12} {}", event.id, date, event.name);
                }
            }
        }
    }
    Ok(())
}

fn handle_person(storage: &Storage, cmd: PersonCommand) -> anyhow::Result<()> {
    match cmd {
        PersonCommand::Add {
            id,
            name,
            role,
            pace,
        } => {
            storage.add_person(&Person {
                id: PersonId::new(&id),
                display_name: name,
                role: role.into(),
                pace,
            })?;
            println!("Person '{id}' saved.");
        }
    }
    Ok(())
}

fn handle_signup(storage: &Storage, cmd: &SignupCommand) -> anyhow::Result<()> {
    storage.add_signup(&SignUp {
        event_id: cmd.event.clone(),
        person_id: PersonId::new(&cmd.person),
        role: cmd.role.into(),
        status: cmd.status.into(),
    })?;
    println!("{} signed up for {}.", cmd.person, cmd.event);
    Ok(())
}

async fn handle_roster(
    storage: &Storage,
    config: &Config,
    cmd: &RosterCommand,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(sort) = cmd.sort {
        config.pairing.default_sort = sort.into();
    }
    let session = load_session(storage, &config, &cmd.event).await?;
    let projection = session.projection();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&projection)?);
        return Ok(());
    }

    println!("Athletes ({}, {})", projection.athletes.len(), projection.sort);
    for row in &projection.athletes {
        println!("  {:<12} {}", row.id, row.label);
    }
    println!();
    println!("Unpaired guides ({})", projection.guides.len());
    for row in &projection.guides {
        println!("  {:<12} {}", row.id, row.label);
    }
    Ok(())
}

async fn handle_pair(storage: &Storage, config: &Config, cmd: &PairCommand) -> anyhow::Result<()> {
    let mut session = load_session(storage, config, &cmd.event).await?;
    let target = PersonId::new(&cmd.target);
    let candidate = PersonId::new(&cmd.candidate);

    if let Err(reason) = session.create_pairing(&target, &candidate) {
        bail!("Cannot pair: {reason}");
    }
    println!(
        "{} paired with {}",
        session.display_name(&target),
        session.display_name(&candidate)
    );
    save_session(storage, &mut session).await
}

async fn handle_unpair(
    storage: &Storage,
    config: &Config,
    cmd: &PairCommand,
) -> anyhow::Result<()> {
    let mut session = load_session(storage, config, &cmd.event).await?;
    let target = PersonId::new(&cmd.target);
    let candidate = PersonId::new(&cmd.candidate);

    let removed = session.remove_pairing(&target, &candidate);
    let (target_name, candidate_name) =
        (session.display_name(&target), session.display_name(&candidate));
    match removed {
        Removed::Nothing => {
            println!("{candidate_name} is not in {target_name}'s group.");
            return Ok(());
        }
        Removed::Guide | Removed::Athlete => {
            println!("{candidate_name} removed from {target_name}'s group");
        }
    }
    save_session(storage, &mut session).await
}

async fn handle_select(
    storage: &Storage,
    config: &Config,
    cmd: SelectCommand,
) -> anyhow::Result<()> {
    let mut session = load_session(storage, config, &cmd.event).await?;

    for click in cmd.clicks {
        let outcome = session.handle(click.into());
        println!("{}", session.announce(&outcome));
    }

    if cmd.dry_run {
        if session.has_unsaved_changes() {
            println!("Dry run: changes not saved.");
        }
        return Ok(());
    }
    save_session(storage, &mut session).await
}

fn handle_pairings(storage: &Storage, cmd: &PairingsCommand) -> anyhow::Result<()> {
    let event = storage
        .get_event(&cmd.event)?
        .with_context(|| format!("event not found: {}", cmd.event))?;
    let pairings = storage.pairings(&cmd.event)?;

    if cmd.json {
        println!("{}", pairings.to_json()?);
        return Ok(());
    }

    let roster = storage.roster(&cmd.event)?;
    let resolved = storage.pairing_names(&pairings, &roster)?;
    let name = |id: &PersonId| resolved.get(id).map_or_else(|| id.to_string(), Clone::clone);
    let names = |ids: &[PersonId]| ids.iter().map(&name).collect::<Vec<_>>().join(", ");

    println!("{} ({} groups)", event.name, pairings.group_count());
    for (head, entry) in pairings.entries().filter(|(_, entry)| !entry.is_empty()) {
        let pace = roster
            .get(head)
            .and_then(|m| pace::format(m.pace))
            .unwrap_or_else(|| "-".to_string());
        println!("  {} ({pace})", name(head));
        if !entry.guides.is_empty() {
            println!("    guides:   {}", names(&entry.guides));
        }
        if !entry.athletes.is_empty() {
            println!("    athletes: {}", names(&entry.athletes));
        }
    }
    if let Some(hash) = event.pairings_hash {
        println!();
        println!("Fingerprint: {hash}");
    }
    Ok(())
}

fn handle_status(storage: &Storage, json: bool) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("guidepair status");
        println!("----------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Events:        {} ({} with pairings)", stats.events, stats.events_with_pairings);
        println!("People:        {}", stats.people);
        println!("Sign-ups:      {}", stats.signups);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let s = &config.scoring;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Pairing]");
                println!("  Default sort:       {}", config.pairing.default_sort);
                println!("  Include maybe:      {}", config.pairing.include_maybe);
                println!();
                println!("[Scoring]");
                println!("  Regime cutoff:      {} min", s.regime_cutoff_minutes);
                println!("  Faster regime:      {} / {} min", s.fast_slight, s.fast_significant);
                println!("  Slower regime:      {} / {} min", s.slow_slight, s.slow_significant);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
