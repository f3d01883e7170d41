//! `guardctl` - CLI for guardian
//!
//! This binary manages accounts and emergency contacts and runs SOS alerts
//! against the simulated device adapters.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::Parser;

use guardian::cli::{
    Cli, Command, ConfigCommand, ContactsCommand, OutboxCommand, ProfileCommand, SosCommand,
};
use guardian::controller::{AlertState, Collaborators, SosController};
use guardian::device::{ConsoleFeedback, ConsoleIndicator, OutboxSender, ReplayLocationSource};
use guardian::directory::{DirectoryKind, PreferenceDirectory, StoreDirectory};
use guardian::identity::{Identity, LocalIdentity, UserId};
use guardian::storage::{self, SharedStorage};
use guardian::{init_logging, Config, Contact, ContactDirectory, LocationSource, Notifier, Storage};

/// Everything a command handler needs.
#[derive(Debug)]
struct Context {
    config: Config,
    storage: SharedStorage,
    identity: Arc<LocalIdentity>,
}

impl Context {
    fn open(config: Config) -> anyhow::Result<Self> {
        let storage = Storage::open(config.database_path())?.into_shared();
        let identity = Arc::new(LocalIdentity::restore(Arc::clone(&storage))?);
        Ok(Self {
            config,
            storage,
            identity,
        })
    }

    fn require_user(&self) -> anyhow::Result<UserId> {
        self.identity
            .current_user()
            .context("Please sign in first (guardctl login <email>)")
    }

    fn directory(&self, kind: DirectoryKind) -> Arc<dyn ContactDirectory> {
        match kind {
            DirectoryKind::Store => Arc::new(StoreDirectory::new(Arc::clone(&self.storage))),
            DirectoryKind::Preferences => {
                Arc::new(PreferenceDirectory::new(Arc::clone(&self.storage)))
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => run(Context::open(config)?, command).await,
    }
}

async fn run(ctx: Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register(cmd) => {
            let user = ctx.identity.register(&cmd.into()).await?;
            println!("Registered and signed in ({user}).");
            Ok(())
        }
        Command::Login(cmd) => {
            ctx.identity.sign_in(&cmd.email, &cmd.password).await?;
            println!("Signed in as {}.", cmd.email.trim().to_lowercase());
            Ok(())
        }
        Command::Logout => {
            ctx.identity.sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => handle_whoami(&ctx),
        Command::Profile(cmd) => handle_profile(&ctx, cmd),
        Command::Contacts(cmd) => handle_contacts(&ctx, cmd).await,
        Command::Sos(cmd) => handle_sos(&ctx, cmd).await,
        Command::Outbox(cmd) => handle_outbox(&ctx, cmd),
        Command::Status(cmd) => handle_status(&ctx, cmd.json),
        Command::Config(cmd) => handle_config(&ctx.config, cmd),
    }
}

fn handle_whoami(ctx: &Context) -> anyhow::Result<()> {
    let user = ctx.require_user()?;
    let profile = ctx.identity.load_profile()?;
    println!("{} ({user})", profile.email);
    Ok(())
}

fn handle_profile(ctx: &Context, cmd: ProfileCommand) -> anyhow::Result<()> {
    match cmd {
        ProfileCommand::Show { json } => {
            let profile = ctx.identity.load_profile()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                println!("Username:    {}", profile.username);
                println!("First name:  {}", profile.first_name);
                println!("Last name:   {}", profile.last_name);
                println!("Phone:       {}", profile.phone);
                println!("Email:       {}", profile.email);
            }
        }
        ProfileCommand::Set { field, value } => {
            ctx.identity.update_field(field, &value)?;
            println!("Profile updated.");
        }
    }
    Ok(())
}

async fn handle_contacts(ctx: &Context, cmd: ContactsCommand) -> anyhow::Result<()> {
    let store = StoreDirectory::new(Arc::clone(&ctx.storage));
    match cmd {
        ContactsCommand::List { source, json } => {
            let kind = source.map_or(ctx.config.contacts.source, DirectoryKind::from);
            let user = ctx.require_user()?;
            let contacts = ctx.directory(kind).contacts_for(&user).await?;
            print_contacts(&contacts, json)?;
        }
        ContactsCommand::Add { name, phone } => {
            let user = ctx.require_user()?;
            let contact = store.add(&user, Contact::new(name, phone))?;
            println!(
                "Added contact {} ({}).",
                contact.id.unwrap_or_default(),
                contact.name
            );
        }
        ContactsCommand::Update { id, name, phone } => {
            let user = ctx.require_user()?;
            let contact = store.update(&user, id, Contact::new(name, phone))?;
            println!(
                "Updated contact {id}: {} <{}>.",
                contact.name, contact.phone_number
            );
        }
        ContactsCommand::Remove { id } => {
            let user = ctx.require_user()?;
            if !store.remove(&user, id)? {
                bail!("contact {id} not found");
            }
            println!("Removed contact {id}.");
        }
        ContactsCommand::Slot { slot, phone, clear } => {
            let prefs = PreferenceDirectory::new(Arc::clone(&ctx.storage));
            let slot = usize::from(slot);
            match phone {
                Some(phone) if !clear => {
                    prefs.set_slot(slot, &phone)?;
                    println!("Stored emergency number {slot}.");
                }
                _ => {
                    prefs.clear_slot(slot)?;
                    println!("Cleared emergency number {slot}.");
                }
            }
        }
    }
    Ok(())
}

fn print_contacts(contacts: &[Contact], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(contacts)?);
        return Ok(());
    }
    if contacts.is_empty() {
        println!("No emergency contacts.");
        return Ok(());
    }
    for contact in contacts {
        match contact.id {
            Some(id) => println!("{id:>4}  {:<24} {}", contact.name, contact.phone_number),
            None => println!("   -  {:<24} {}", contact.name, contact.phone_number),
        }
    }
    Ok(())
}

fn location_source(ctx: &Context, cmd: &SosCommand) -> anyhow::Result<Arc<dyn LocationSource>> {
    let granted = ctx.config.device.location;
    if let Some(fix) = cmd.at {
        return Ok(Arc::new(ReplayLocationSource::stationary(fix, granted)));
    }
    if let Some(path) = cmd.track.as_ref().or(ctx.config.location.track_file.as_ref()) {
        let source = ReplayLocationSource::from_file(path, granted)
            .with_context(|| format!("loading track {}", path.display()))?;
        return Ok(Arc::new(source));
    }
    if let Some(fix) = ctx.config.fixed_position() {
        return Ok(Arc::new(ReplayLocationSource::stationary(fix, granted)));
    }
    bail!("no device position: pass --at LAT,LON or --track FILE, or set location.track_file")
}

async fn handle_sos(ctx: &Context, cmd: SosCommand) -> anyhow::Result<()> {
    ctx.require_user()?;

    let location = location_source(ctx, &cmd)?;
    let kind = cmd.source.map_or(ctx.config.contacts.source, DirectoryKind::from);
    let sender = Arc::new(OutboxSender::new(
        Arc::clone(&ctx.storage),
        ctx.config.device.messaging,
        ctx.config.storage.max_outbox_messages,
    ));
    let collab = Collaborators {
        identity: ctx.identity.clone(),
        directory: ctx.directory(kind),
        location,
        notifier: Notifier::with_wording(
            sender,
            ctx.config.alert.message_prefix.clone(),
            ctx.config.alert.map_url_base.clone(),
        ),
        indicator: Arc::new(ConsoleIndicator::new(ctx.config.device.notifications)),
        feedback: Arc::new(ConsoleFeedback),
    };

    let mut settings = ctx.config.controller_settings();
    if let Some(countdown) = cmd.countdown {
        settings.countdown = countdown;
    }

    let controller = SosController::new(collab, settings);
    let mut state_rx = controller.watch_state();
    controller.arm().await?;
    println!("SOS armed. Press Ctrl-C to cancel.");

    // Countdown: Ctrl-C cancels.
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                if controller.cancel().await.is_ok() {
                    println!("SOS cancelled. Nothing was sent.");
                    return Ok(());
                }
                // Expired while the signal was handled.
                break;
            }
            changed = state_rx.changed() => {
                changed?;
                let state = *state_rx.borrow_and_update();
                match state {
                    AlertState::ArmedCountdown { .. } => {}
                    AlertState::Active => break,
                    AlertState::Idle => return Ok(()),
                }
            }
        }
    }

    println!("SOS active. Press Ctrl-C to stop.");
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        () = wait_for(cmd.duration.map(Duration::from_secs)) => {}
    }

    if controller.state().await == AlertState::Active {
        controller.stop().await?;
    }
    let status = controller.status().await;
    println!(
        "SOS stopped after {} notification round(s).",
        status.notifications
    );
    if let Some(fix) = status.latest_fix {
        println!("Last shared position: {fix}");
    }
    Ok(())
}

async fn wait_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

fn handle_outbox(ctx: &Context, cmd: OutboxCommand) -> anyhow::Result<()> {
    let store = storage::lock(&ctx.storage)?;
    match cmd {
        OutboxCommand::List { limit, json } => {
            let messages = store.recent_outbound(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if messages.is_empty() {
                println!("Outbox is empty.");
            } else {
                for message in messages {
                    println!(
                        "{}  {:<15} {}",
                        message.sent_at.format("%Y-%m-%d %H:%M:%S"),
                        message.recipient,
                        message.body
                    );
                }
            }
        }
        OutboxCommand::Prune { keep } => {
            let removed = store.prune_outbox_keep_recent(keep)?;
            println!("Removed {removed} message(s).");
        }
    }
    Ok(())
}

fn handle_status(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let stats = storage::lock(&ctx.storage)?.stats()?;
    let user = ctx.identity.current_user();
    let email = ctx.identity.load_profile().ok().map(|p| p.email);
    let denied: Vec<String> = ctx
        .config
        .device
        .denied()
        .iter()
        .map(ToString::to_string)
        .collect();

    if json {
        let status = serde_json::json!({
            "signed_in": user.is_some(),
            "user_id": user.as_ref().map(UserId::as_str),
            "email": email,
            "contact_source": ctx.config.contacts.source,
            "database_path": ctx.config.database_path(),
            "storage": stats,
            "denied_permissions": denied,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("guardctl status");
        println!("---------------");
        match (&user, &email) {
            (Some(user), Some(email)) => println!("Signed in:     {email} ({user})"),
            (Some(user), None) => println!("Signed in:     {user}"),
            _ => println!("Signed in:     no"),
        }
        println!("Contacts from: {}", ctx.config.contacts.source);
        println!("Database:      {}", ctx.config.database_path().display());
        println!("Accounts:      {}", stats.total_users);
        println!("Contacts:      {}", stats.total_contacts);
        println!("Outbox:        {}", stats.total_outbox);
        if denied.is_empty() {
            println!("Permissions:   all granted");
        } else {
            println!("Denied:        {}", denied.join(", "));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Max outbox:         {}", config.storage.max_outbox_messages);
                println!();
                println!("[Alert]");
                println!("  Countdown (s):      {}", config.alert.countdown_secs);
                println!("  Map link base:      {}", config.alert.map_url_base);
                println!();
                println!("[Location]");
                println!("  Interval (ms):      {}", config.location.update_interval_ms);
                println!("  Min distance (m):   {}", config.location.min_distance_meters);
                if let Some(track) = &config.location.track_file {
                    println!("  Track file:         {}", track.display());
                }
                println!();
                println!("[Contacts]");
                println!("  Source:             {}", config.contacts.source);
                println!();
                println!("[Device]");
                println!("  Location:           {}", config.device.location);
                println!("  Messaging:          {}", config.device.messaging);
                println!("  Notifications:      {}", config.device.notifications);
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
