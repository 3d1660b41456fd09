//! Human-friendly output using `console` styles.

use console::{Style, StyledObject};
use tracing::{debug, instrument, trace};

use crate::engine::EngineEvent;
use crate::error::GkError;
use crate::input::DecodedPacket;
use crate::keys::KeySet;
use crate::profile::{Bank, Macro, Profile, RepeatMode, ResolvedMacro};

use super::{Output, ProfileDetail, ProfileSummary, ReplaySummary, VersionInfo};

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    color: bool,
}

impl HumanOutput {
    pub fn new(color: bool) -> Self {
        debug!(color, "Creating HumanOutput");
        Self { color }
    }

    fn paint<D>(&self, value: D, s: &Style) -> StyledObject<D> {
        s.apply_to(value).force_styling(self.color)
    }

    fn label<D>(&self, value: D) -> StyledObject<D> {
        self.paint(value, &Style::new().bold())
    }

    fn accent<D>(&self, value: D) -> StyledObject<D> {
        self.paint(value, &Style::new().cyan())
    }

    fn muted<D>(&self, value: D) -> StyledObject<D> {
        self.paint(value, &Style::new().dim())
    }

    fn macro_line(&self, resolved: &ResolvedMacro) -> String {
        let m = &resolved.definition;
        let mut line = format!(
            "  {:<14} {:<20} {} {}",
            self.accent(m.combination()),
            if m.name.is_empty() { "(unnamed)" } else { m.name.as_str() },
            self.muted(m.action.type_name()),
            m.action.payload(),
        );
        if m.repeat_mode != RepeatMode::WhileHeld {
            line.push_str(&format!(" [{}]", m.repeat_mode));
        }
        if resolved.inherited {
            let from = resolved.profile_id.map_or_else(|| "?".to_string(), |id| id.to_string());
            line.push_str(&format!(" {}", self.muted(format!("(from {from})"))));
        }
        line
    }
}

fn key_list(keys: &KeySet) -> String {
    if keys.is_empty() {
        return "(none)".to_string();
    }
    keys.iter().map(|k| k.name()).collect::<Vec<_>>().join(" ")
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        println!("{} {message}", self.paint("[OK]", &Style::new().green().bold()));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &GkError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        eprintln!("{} {error}", self.paint("Error:", &Style::new().red().bold()));
        if let GkError::CyclicBaseProfile { chain, .. } = error {
            let chain: Vec<String> = chain.iter().map(u64::to_string).collect();
            eprintln!("  chain: {}", chain.join(" -> "));
        }
        if let Some(suggestion) = error.suggestion() {
            trace!(suggestion, "Adding suggestion");
            eprintln!("{} {suggestion}", self.paint("Hint:", &Style::new().yellow()));
        }
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {message}", self.paint("[WARN]", &Style::new().yellow().bold()));
    }

    #[instrument(skip(self, profiles), fields(count = profiles.len()))]
    fn profile_list(&self, profiles: &[ProfileSummary]) {
        if profiles.is_empty() {
            self.warning("No profiles found");
            return;
        }
        for p in profiles {
            let marker = if p.active { "*" } else { " " };
            let id = p.id.map_or_else(|| "-".to_string(), |id| id.to_string());
            let mut line = format!(
                "{marker} {:>10}  {}  {}",
                self.accent(id),
                self.label(&p.name),
                self.muted(format!("{} macros", p.macros)),
            );
            if let Some(base) = p.base_profile {
                line.push_str(&format!("  {}", self.muted(format!("base {base}"))));
            }
            println!("{line}");
        }
    }

    fn profile_detail(&self, detail: &ProfileDetail) {
        let p = &detail.summary;
        let id = p.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!("{} ({id}){}", self.label(&p.name), if p.active { " *active*" } else { "" });
        if let Some(base) = p.base_profile {
            println!("  Base profile: {base}");
        }
        if !p.window_name.is_empty() {
            println!("  Window: {}", p.window_name);
        }
        if !detail.author.is_empty() {
            println!("  Author: {}", detail.author);
        }
        println!("  Format: {}", p.version.as_str());

        for listing in &detail.banks {
            let color = listing
                .backlight
                .map(|c| format!(" backlight {c}"))
                .unwrap_or_default();
            println!();
            println!("{}{}", self.label(listing.bank.to_string()), self.muted(color));
            if listing.macros.is_empty() {
                println!("  {}", self.muted("(no macros)"));
            }
            for resolved in &listing.macros {
                println!("{}", self.macro_line(resolved));
            }
        }
    }

    fn profile_saved(&self, profile: &Profile, action: &str) {
        let id = profile.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        self.success(&format!("Profile '{}' {action} ({id})", profile.name));
    }

    fn profile_active(&self, id: u64, switched: bool) {
        if switched {
            self.success(&format!("Profile {id} is now active"));
        } else {
            self.warning(&format!("Profile switching is locked; {id} not activated"));
        }
    }

    fn lock_state(&self, device: &str, locked: bool) {
        let state = if locked { "locked" } else { "unlocked" };
        self.success(&format!("Profile switching {state} for {device}"));
    }

    fn macro_saved(&self, bank: Bank, m: &Macro) {
        self.success(&format!("Bound {} in {bank} to '{}'", m.combination(), m.name));
    }

    fn macro_removed(&self, bank: Bank, m: &Macro) {
        self.success(&format!("Removed {} from {bank}", m.combination()));
    }

    fn resolution(&self, bank: Bank, keys: &str, resolved: Option<&ResolvedMacro>) {
        match resolved {
            Some(r) => println!("{}", self.macro_line(r)),
            None => println!("No macro bound to {keys} in {bank}"),
        }
    }

    fn decoded(&self, packet: &DecodedPacket) {
        println!("{:?}: {}", packet.scope, key_list(&packet.keys));
    }

    fn engine_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Activated { bank, resolved } => {
                let sign = self.paint("+", &Style::new().green());
                println!("{sign} {bank} {}", self.macro_line(resolved).trim_start());
            }
            EngineEvent::Deactivated { bank, resolved } => {
                let sign = self.paint("-", &Style::new().red());
                println!("{sign} {bank} {}", self.macro_line(resolved).trim_start());
            }
            EngineEvent::BankChanged { bank } => {
                println!("{} {}", self.accent("bank"), bank);
            }
        }
    }

    fn replay_summary(&self, summary: &ReplaySummary) {
        println!(
            "{} packets, {} dispatched, {} discarded, {} activations, bank M{}",
            summary.packets,
            summary.dispatched,
            summary.discarded,
            summary.activations,
            summary.final_bank
        );
    }

    fn version_info(&self, info: &VersionInfo) {
        println!("gkm {}", info.version);
        println!(
            "git: {}{}",
            info.git_sha,
            if info.git_dirty { " (dirty)" } else { "" }
        );
        println!("built: {}", info.build_timestamp);
        println!("rustc: {}", info.rustc_version);
        println!("target: {}", info.target);
    }
}
