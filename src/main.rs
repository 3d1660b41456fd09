//! G-key macro CLI - profiles, macro resolution and key packet decoding.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use serde::Serialize;
use tracing::debug;

use gkm::cli::{self, Cli, Commands};
use gkm::device::DeviceInfo;
use gkm::device::mock::MockKeySource;
use gkm::engine::{EngineEvent, MacroEngine};
use gkm::error::{GkError, Result, ResultExt};
use gkm::input::{EventDispatcher, Receiver, ReceiverOptions, decode};
use gkm::keys::{KeySet, combination_key, parse_combination};
use gkm::logging::init_logging;
use gkm::output::{
    BankListing, Output, OutputMode, ProfileDetail, ProfileSummary, ReplaySummary, VersionInfo,
};
use gkm::paths;
use gkm::profile::{
    Bank, DEFAULT_PROFILE_ID, Macro, MacroAction, Profile, ProfileStore, ResolvedMacro,
    SchemaVersion, effective_macros, resolve, sorted_macros,
};
use gkm::settings::{self, SettingsStore, TomlSettingsStore};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

/// Everything a command needs: device, storage and output.
struct Context<'a> {
    device: DeviceInfo,
    store: Arc<ProfileStore>,
    settings: Arc<TomlSettingsStore>,
    out: &'a dyn Output,
}

impl<'a> Context<'a> {
    fn new(cli: &Cli, out: &'a dyn Output) -> Result<Self> {
        let config_dir = paths::config_dir(cli.config_dir.as_deref())?;
        debug!(config_dir = %config_dir.display(), "Using config directory");
        Ok(Self {
            device: cli.device_info(),
            store: Arc::new(ProfileStore::in_config_dir(&config_dir)),
            settings: Arc::new(TomlSettingsStore::in_config_dir(&config_dir)),
            out,
        })
    }

    fn active_id(&self) -> Result<u64> {
        Ok(self
            .settings
            .active_profile_id(&self.device.uid)?
            .unwrap_or(DEFAULT_PROFILE_ID))
    }

    /// The profile named on the command line, or the active one.
    fn profile(&self, id: Option<u64>) -> Result<Profile> {
        match id {
            Some(id) => self.store.load(&self.device, id),
            None => settings::active_profile(&self.store, self.settings.as_ref(), &self.device),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let out = OutputMode::from_cli(&cli).into_output();
    let result = Context::new(&cli, out.as_ref()).and_then(|ctx| run(&cli, &ctx));

    if let Err(e) = result {
        out.error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, ctx: &Context<'_>) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Profiles) => cmd_profiles(ctx),
        Some(Commands::Show(args)) => cmd_show(ctx, args),
        Some(Commands::Create(args)) => cmd_create(ctx, args),
        Some(Commands::Delete(args)) => cmd_delete(ctx, args),
        Some(Commands::Activate(args)) => cmd_activate(ctx, args),
        Some(Commands::Lock(args)) => cmd_lock(ctx, args),
        Some(Commands::AddMacro(args)) => cmd_add_macro(ctx, args),
        Some(Commands::RemoveMacro(args)) => cmd_remove_macro(ctx, args),
        Some(Commands::Resolve(args)) => cmd_resolve(ctx, args),
        Some(Commands::Decode(args)) => cmd_decode(ctx, args),
        Some(Commands::Replay(args)) => cmd_replay(ctx, args),
        Some(Commands::Export(args)) => cmd_export(ctx, args),
        Some(Commands::Import(args)) => cmd_import(ctx, args),
        Some(Commands::Version) => cmd_version(ctx),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Quick Start (Robot Mode Optimized) ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    profiles: [&'static str; 4],
    macros: [&'static str; 3],
    input: [&'static str; 2],
    output_modes: [&'static str; 3],
}

fn print_quick_start(cli: &Cli) -> Result<()> {
    let help = RobotQuickStart {
        tool: "gkm",
        version: build_info::VERSION,
        description: "Macro profiles and key decoding for G-series keyboards",
        profiles: [
            "gkm profiles",
            "gkm show [ID] --effective",
            "gkm create <NAME> --base <ID>",
            "gkm activate <ID>",
        ],
        macros: [
            "gkm add-macro <KEYS> --name <NAME> --type <TYPE> --payload <TEXT>",
            "gkm remove-macro <KEYS> --bank <1-3>",
            "gkm resolve <KEYS> --bank <1-3>",
        ],
        input: ["gkm decode <gm|nav|mm> <HEX>", "gkm replay <SCRIPT>"],
        output_modes: [
            "--format=text (default)",
            "--robot or --format=json",
            "--format=json-compact",
        ],
    };

    if cli.use_json() {
        println!("{}", serde_json::to_string_pretty(&help).map_err(json_error)?);
        return Ok(());
    }

    println!("gkm {} - {}\n", help.version, help.description);
    for (title, lines) in [
        ("PROFILES", &help.profiles[..]),
        ("MACROS", &help.macros[..]),
        ("KEY INPUT", &help.input[..]),
    ] {
        println!("{}", console::style(title).bold().underlined());
        for line in lines {
            println!("  {}", console::style(line).green());
        }
        println!();
    }
    println!("Run {} for full help", console::style("gkm --help").yellow());
    Ok(())
}

// === Command Implementations ===

fn cmd_profiles(ctx: &Context<'_>) -> Result<()> {
    let active = ctx.active_id()?;
    let summaries: Vec<ProfileSummary> = ctx
        .store
        .load_all(&ctx.device)?
        .iter()
        .map(|p| ProfileSummary::new(p, active))
        .collect();
    ctx.out.profile_list(&summaries);
    Ok(())
}

fn cmd_show(ctx: &Context<'_>, args: &cli::ShowArgs) -> Result<()> {
    let profile = ctx.profile(args.id)?;
    let lookup = ctx.store.lookup(&ctx.device);
    let banks: Vec<Bank> = args.bank.map_or_else(|| Bank::ALL.to_vec(), |b| vec![b]);

    let mut listings = Vec::with_capacity(banks.len());
    for bank in banks {
        let macros = if args.effective {
            effective_macros(&lookup, &profile, bank)?
        } else {
            sorted_macros(&profile, bank)
                .into_iter()
                .map(|m| ResolvedMacro {
                    profile_id: profile.id,
                    inherited: false,
                    definition: m.clone(),
                })
                .collect()
        };
        listings.push(BankListing {
            bank,
            backlight: profile.bank_color(bank),
            macros,
        });
    }

    ctx.out.profile_detail(&ProfileDetail {
        summary: ProfileSummary::new(&profile, ctx.active_id()?),
        author: profile.author.clone(),
        icon: profile.icon.clone(),
        banks: listings,
    });
    Ok(())
}

fn cmd_create(ctx: &Context<'_>, args: &cli::CreateArgs) -> Result<()> {
    let mut profile = Profile::new(ctx.device.clone(), args.name.clone());
    profile.base_profile = args.base;
    profile.activate_on_focus = args.activate_on_focus;
    if let Some(window) = &args.window {
        profile.window_name.clone_from(window);
    }
    if let Some(author) = &args.author {
        profile.author.clone_from(author);
    }
    if let Some(icon) = &args.icon {
        profile.icon = user_path(icon)?.to_string_lossy().into_owned();
    }
    if args.legacy {
        profile.version = SchemaVersion::Legacy;
    }
    if let Some(base) = args.base {
        if !ctx.store.exists(&ctx.device, base) {
            ctx.out
                .warning(&format!("Base profile {base} does not exist yet"));
        }
    }

    ctx.store.create(&mut profile)?;
    ctx.out.profile_saved(&profile, "created");
    Ok(())
}

fn cmd_delete(ctx: &Context<'_>, args: &cli::DeleteArgs) -> Result<()> {
    if args.id == DEFAULT_PROFILE_ID {
        return Err(GkError::Other(
            "The default profile cannot be deleted".to_string(),
        ));
    }
    ctx.store.delete(&ctx.device, args.id)?;
    ctx.out.success(&format!("Deleted profile {}", args.id));
    Ok(())
}

fn cmd_activate(ctx: &Context<'_>, args: &cli::ActivateArgs) -> Result<()> {
    let switched =
        settings::activate_profile(&ctx.store, ctx.settings.as_ref(), &ctx.device, args.id)?;
    ctx.out.profile_active(args.id, switched);
    Ok(())
}

fn cmd_lock(ctx: &Context<'_>, args: &cli::LockArgs) -> Result<()> {
    let locked = !args.off;
    ctx.settings.set_locked(&ctx.device.uid, locked)?;
    ctx.out.lock_state(&ctx.device.uid, locked);
    Ok(())
}

fn cmd_add_macro(ctx: &Context<'_>, args: &cli::AddMacroArgs) -> Result<()> {
    let mut profile = ctx.profile(args.profile)?;
    let keys = parse_keys(&args.keys)?;
    let action = MacroAction::from_parts(&args.kind, args.payload.clone())?;

    let mut m = Macro::new(args.bank, keys, args.name.clone(), action);
    m.repeat_mode = args.repeat_mode;
    if let Some(delay) = args.repeat_delay {
        m.repeat_delay = delay;
    }
    let saved = profile.add_macro(m)?.clone();
    ctx.store.save(&mut profile)?;
    ctx.out.macro_saved(args.bank, &saved);
    Ok(())
}

fn cmd_remove_macro(ctx: &Context<'_>, args: &cli::MacroKeysArgs) -> Result<()> {
    let mut profile = ctx.profile(args.profile)?;
    let keys: KeySet = parse_keys(&args.keys)?.into_iter().collect();
    let removed = ctx.store.delete_macro(&mut profile, args.bank, &keys)?;
    ctx.out.macro_removed(args.bank, &removed);
    Ok(())
}

fn cmd_resolve(ctx: &Context<'_>, args: &cli::MacroKeysArgs) -> Result<()> {
    let profile = ctx.profile(args.profile)?;
    let keys = parse_keys(&args.keys)?;
    let set: KeySet = keys.iter().copied().collect();
    let resolved = resolve(&ctx.store.lookup(&ctx.device), &profile, args.bank, &set)?;
    ctx.out
        .resolution(args.bank, &combination_key(&keys), resolved.as_ref());
    Ok(())
}

fn cmd_decode(ctx: &Context<'_>, args: &cli::DecodeArgs) -> Result<()> {
    let hex_text: String = args.hex.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(&hex_text).with_context(|| format!("Invalid hex '{hex_text}'"))?;
    let packet = decode(args.channel, &bytes)?;
    ctx.out.decoded(&packet);
    Ok(())
}

fn cmd_replay(ctx: &Context<'_>, args: &cli::ReplayArgs) -> Result<()> {
    let script = if args.script == Path::new("-") {
        io::read_to_string(io::stdin())?
    } else {
        std::fs::read_to_string(&args.script)
            .with_context(|| format!("Cannot read script {}", args.script.display()))?
    };
    let source = Arc::new(MockKeySource::from_script(&script)?);

    let events: Arc<Mutex<Vec<EngineEvent>>> = Arc::default();
    let sink_events = Arc::clone(&events);
    let engine = Arc::new(MacroEngine::new(
        ctx.device.clone(),
        Arc::clone(&ctx.store),
        ctx.settings.clone(),
        Arc::new(move |e: EngineEvent| {
            sink_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(e);
        }),
    ));

    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher.subscribe(engine.clone());
    let options = ReceiverOptions {
        multimedia_keys: !args.no_multimedia,
        ..ReceiverOptions::default()
    };
    let mut receiver = Receiver::with_options(Arc::clone(&source), dispatcher, options);

    let mut summary = ReplaySummary::default();
    loop {
        let stats = receiver.poll_once()?;
        summary.packets += stats.packets;
        summary.dispatched += stats.dispatched;
        summary.discarded += stats.discarded;

        let drained = std::mem::take(&mut *events.lock().unwrap_or_else(PoisonError::into_inner));
        for event in &drained {
            if matches!(event, EngineEvent::Activated { .. }) {
                summary.activations += 1;
            }
            ctx.out.engine_event(event);
        }
        if stats.packets == 0 {
            break;
        }
    }
    summary.final_bank = engine.bank().number();
    ctx.out.replay_summary(&summary);
    Ok(())
}

fn cmd_export(ctx: &Context<'_>, args: &cli::ExportArgs) -> Result<()> {
    let archive = user_path(&args.archive)?;
    ctx.store.export(&ctx.device, args.id, &archive)?;
    ctx.out.success(&format!(
        "Exported profile {} to {}",
        args.id,
        archive.display()
    ));
    Ok(())
}

fn cmd_import(ctx: &Context<'_>, args: &cli::ImportArgs) -> Result<()> {
    let archive = user_path(&args.archive)?;
    let profile = ctx.store.import(&ctx.device, &archive)?;
    ctx.out.profile_saved(&profile, "imported");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(ctx: &Context<'_>) -> Result<()> {
    ctx.out.version_info(&VersionInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty() == "true",
        build_timestamp: build_info::build_timestamp(),
        rustc_version: build_info::rustc_semver(),
        target: build_info::target(),
    });
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "gkm", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

/// Parse a key combination, rejecting repeated keys.
fn parse_keys(text: &str) -> Result<Vec<gkm::keys::Key>> {
    let keys = parse_combination(text)?;
    if keys.is_empty() {
        return Err(GkError::Other(format!("No keys in '{text}'")));
    }
    let unique: BTreeSet<_> = keys.iter().collect();
    if unique.len() != keys.len() {
        return Err(GkError::Other(format!("Key repeated in '{text}'")));
    }
    Ok(keys)
}

/// Resolve a path argument against the working directory.
fn user_path(path: &Path) -> Result<PathBuf> {
    paths::resolve_path(path, &std::env::current_dir()?)
}

fn json_error(e: serde_json::Error) -> GkError {
    GkError::Other(format!("JSON serialization failed: {e}"))
}
