//! Robot mode JSON output implementation.

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::engine::EngineEvent;
use crate::error::GkError;
use crate::input::DecodedPacket;
use crate::profile::{Bank, Macro, Profile, ResolvedMacro};

use super::{Output, ProfileDetail, ProfileSummary, ReplaySummary, RobotFormat, VersionInfo};

/// JSON output implementation for AI agents and scripting.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        match json {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON serialized");
                println!("{json}");
            }
            Err(e) => warn!(error = %e, "JSON serialization failed"),
        }
    }

    /// Single-line JSON, for streamed events.
    fn output_json_line<T: Serialize>(&self, data: &T) {
        match serde_json::to_string(data) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!(error = %e, "JSON serialization failed"),
        }
    }
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "message": message
        }));
    }

    fn error(&self, error: &GkError) {
        debug!(error = %error, "Robot: error");
        let mut json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        if let GkError::CyclicBaseProfile { chain, .. } = error {
            json["chain"] = serde_json::json!(chain);
        }
        if let Ok(text) = serde_json::to_string_pretty(&json) {
            eprintln!("{text}");
        }
    }

    fn warning(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "ok": false,
            "warning": message
        }));
    }

    fn profile_list(&self, profiles: &[ProfileSummary]) {
        self.output_json(profiles);
    }

    fn profile_detail(&self, detail: &ProfileDetail) {
        self.output_json(detail);
    }

    fn profile_saved(&self, profile: &Profile, action: &str) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "action": action,
            "id": profile.id,
            "name": profile.name,
        }));
    }

    fn profile_active(&self, id: u64, switched: bool) {
        self.output_json(&serde_json::json!({
            "ok": switched,
            "active_profile": id,
            "locked": !switched,
        }));
    }

    fn lock_state(&self, device: &str, locked: bool) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "device": device,
            "locked": locked,
        }));
    }

    fn macro_saved(&self, bank: Bank, m: &Macro) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "bank": bank,
            "macro": m,
        }));
    }

    fn macro_removed(&self, bank: Bank, m: &Macro) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "bank": bank,
            "removed": m,
        }));
    }

    fn resolution(&self, bank: Bank, keys: &str, resolved: Option<&ResolvedMacro>) {
        self.output_json(&serde_json::json!({
            "bank": bank,
            "keys": keys,
            "found": resolved.is_some(),
            "resolved": resolved,
        }));
    }

    fn decoded(&self, packet: &DecodedPacket) {
        self.output_json(packet);
    }

    fn engine_event(&self, event: &EngineEvent) {
        self.output_json_line(event);
    }

    fn replay_summary(&self, summary: &ReplaySummary) {
        self.output_json_line(&serde_json::json!({ "summary": summary }));
    }

    fn version_info(&self, info: &VersionInfo) {
        self.output_json(info);
    }
}
