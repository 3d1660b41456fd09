//! Macro ordering and lookup, including base-profile inheritance.
//!
//! Ordering weighs every key of a combination and sorts by the sum:
//!
//! | Key | Weight |
//! |-----|--------|
//! | G*n* | *n* |
//! | M1-M3 | 50 + *n* |
//! | MR | 55 |
//! | L*n* | 100 + *n* |
//! | anything else | 200 + index in the device layout, 400 if absent |
//!
//! So G-keys come first in numeric order, then bank keys, then L-keys,
//! then the rest by physical position. Equal weights keep insertion order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::model::{Bank, Macro, Profile};
use crate::device::DeviceInfo;
use crate::error::{GkError, Result};
use crate::keys::{Key, KeySet};

/// Weight of a key absent from the device layout.
const UNKNOWN_KEY_WEIGHT: u32 = 400;

/// Source of base profiles during resolution.
pub trait ProfileLookup {
    /// Load the profile with `id`.
    fn lookup(&self, id: u64) -> Result<Profile>;
}

impl ProfileLookup for HashMap<u64, Profile> {
    fn lookup(&self, id: u64) -> Result<Profile> {
        self.get(&id).cloned().ok_or_else(|| GkError::ProfileNotFound {
            device: String::new(),
            id,
        })
    }
}

/// Ordering weight of one key on `device`.
pub fn key_weight(key: Key, device: &DeviceInfo) -> u32 {
    if let Some(n) = key.g_number() {
        return n;
    }
    if let Some(bank) = key.memory_bank() {
        return 50 + u32::from(bank);
    }
    if key == Key::Mr {
        return 55;
    }
    if let Some(n) = key.l_number() {
        return 100 + n;
    }
    device
        .key_index(key)
        .and_then(|i| u32::try_from(i).ok())
        .map_or(UNKNOWN_KEY_WEIGHT, |i| 200 + i)
}

/// Sum of key weights of a macro's combination.
pub fn macro_weight(m: &Macro, device: &DeviceInfo) -> u32 {
    m.keys().iter().map(|k| key_weight(*k, device)).sum()
}

/// Display order of two macros.
pub fn compare(a: &Macro, b: &Macro, device: &DeviceInfo) -> Ordering {
    macro_weight(a, device).cmp(&macro_weight(b, device))
}

/// A bank's macros in display order.
pub fn sorted_macros(profile: &Profile, bank: Bank) -> Vec<&Macro> {
    let mut macros: Vec<&Macro> = profile.macros(bank).iter().collect();
    // Stable, so equal weights stay in insertion order
    macros.sort_by_key(|m| macro_weight(m, &profile.device));
    macros
}

/// A macro found by resolution, with the profile that defines it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMacro {
    /// Profile the macro was found in
    pub profile_id: Option<u64>,
    /// True when found in a base profile
    pub inherited: bool,
    pub definition: Macro,
}

/// Follows base-profile links, refusing to visit a profile twice.
struct BaseChain<'a, L: ?Sized> {
    lookup: &'a L,
    visited: Vec<u64>,
}

impl<'a, L: ProfileLookup + ?Sized> BaseChain<'a, L> {
    fn new(lookup: &'a L, start: &Profile) -> Self {
        Self {
            lookup,
            visited: start.id.into_iter().collect(),
        }
    }

    /// Load the base of `profile`, if it has one that exists.
    fn next(&mut self, profile: &Profile) -> Result<Option<Profile>> {
        let Some(base) = profile.base_profile else {
            return Ok(None);
        };
        if self.visited.contains(&base) {
            let mut chain = self.visited.clone();
            chain.push(base);
            return Err(GkError::CyclicBaseProfile { id: base, chain });
        }
        self.visited.push(base);
        match self.lookup.lookup(base) {
            Ok(p) => {
                trace!(base, depth = self.visited.len(), "Following base profile");
                Ok(Some(p))
            }
            Err(GkError::ProfileNotFound { .. }) => {
                warn!(base, "Base profile does not exist, ignoring");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Find the macro bound to exactly `keys` in `bank`.
///
/// A local macro wins; otherwise base profiles are searched in turn.
pub fn resolve<L: ProfileLookup + ?Sized>(
    lookup: &L,
    profile: &Profile,
    bank: Bank,
    keys: &KeySet,
) -> Result<Option<ResolvedMacro>> {
    if let Some(m) = profile.get_macro(bank, keys) {
        return Ok(Some(ResolvedMacro {
            profile_id: profile.id,
            inherited: false,
            definition: m.clone(),
        }));
    }

    let mut chain = BaseChain::new(lookup, profile);
    let mut current = chain.next(profile)?;
    while let Some(base) = current {
        if let Some(m) = base.get_macro(bank, keys) {
            debug!(profile = ?profile.id, base = ?base.id, bank = %bank, "Resolved inherited macro");
            return Ok(Some(ResolvedMacro {
                profile_id: base.id,
                inherited: true,
                definition: m.clone(),
            }));
        }
        current = chain.next(&base)?;
    }
    Ok(None)
}

/// Every macro usable in `bank`: local ones plus inherited ones whose key
/// set is not already bound, in display order.
pub fn effective_macros<L: ProfileLookup + ?Sized>(
    lookup: &L,
    profile: &Profile,
    bank: Bank,
) -> Result<Vec<ResolvedMacro>> {
    let mut found: Vec<ResolvedMacro> = profile
        .macros(bank)
        .iter()
        .map(|m| ResolvedMacro {
            profile_id: profile.id,
            inherited: false,
            definition: m.clone(),
        })
        .collect();

    let mut chain = BaseChain::new(lookup, profile);
    let mut current = chain.next(profile)?;
    while let Some(base) = current {
        for m in base.macros(bank) {
            let keys = m.key_set();
            if !found.iter().any(|r| r.definition.matches(&keys)) {
                found.push(ResolvedMacro {
                    profile_id: base.id,
                    inherited: true,
                    definition: m.clone(),
                });
            }
        }
        current = chain.next(&base)?;
    }

    found.sort_by_key(|r| macro_weight(&r.definition, &profile.device));
    Ok(found)
}
