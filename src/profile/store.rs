//! File-backed profile storage.
//!
//! Layout: `<root>/<device uid>/<id>.macros`, where `<root>` is normally
//! `<config dir>/macro_profiles`. Every load returns a fresh [`Profile`];
//! nothing is cached between calls.
//!
//! Writes go to a temporary file in the destination directory, which is
//! then renamed over the profile, so readers never see a partial file.

use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use super::ini::IniDocument;
use super::model::{Bank, DEFAULT_PROFILE_ID, Macro, MacroAction, Profile};
use super::resolve::ProfileLookup;
use super::schema::{profile_from_document, profile_to_document};
use super::watch::{ChangeHub, ChangeKind, ProfileChange};
use crate::device::DeviceInfo;
use crate::error::{GkError, Result};
use crate::keys::{Key, KeySet};

/// Directory under the config dir holding every device's profiles.
pub const PROFILES_DIR: &str = "macro_profiles";

/// Extension of profile files.
pub const PROFILE_EXTENSION: &str = "macros";

/// Name given to the default profile.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Profile files on disk.
pub struct ProfileStore {
    root: PathBuf,
    changes: Option<Arc<ChangeHub>>,
}

impl ProfileStore {
    /// Store rooted at `root`, the directory holding per-device directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            changes: None,
        }
    }

    /// Store under a configuration directory.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(PROFILES_DIR))
    }

    /// Announce every write and delete on `hub`.
    pub fn with_change_hub(mut self, hub: Arc<ChangeHub>) -> Self {
        self.changes = Some(hub);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a device's profiles.
    pub fn device_dir(&self, device: &DeviceInfo) -> PathBuf {
        self.root.join(&device.uid)
    }

    /// Path of one profile file.
    pub fn profile_path(&self, device: &DeviceInfo, id: u64) -> PathBuf {
        self.device_dir(device).join(format!("{id}.{PROFILE_EXTENSION}"))
    }

    fn announce(&self, device: &DeviceInfo, id: u64, kind: ChangeKind) {
        if let Some(hub) = &self.changes {
            hub.notify(ProfileChange::new(device.uid.clone(), id, kind));
        }
    }

    /// Ids of every profile of a device, ascending.
    ///
    /// Only `<digits>.macros` files count; hidden and temporary files are
    /// skipped.
    #[instrument(skip(self, device), fields(device = %device.uid))]
    pub fn list(&self, device: &DeviceInfo) -> Result<Vec<u64>> {
        let dir = self.device_dir(device);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(change) = ProfileChange::from_path(&path, ChangeKind::Modified) {
                ids.push(change.profile_id);
            }
        }
        ids.sort_unstable();
        debug!(count = ids.len(), "Listed profiles");
        Ok(ids)
    }

    /// Load every profile of a device, in id order.
    pub fn load_all(&self, device: &DeviceInfo) -> Result<Vec<Profile>> {
        self.list(device)?
            .into_iter()
            .map(|id| self.load(device, id))
            .collect()
    }

    pub fn exists(&self, device: &DeviceInfo, id: u64) -> bool {
        self.profile_path(device, id).is_file()
    }

    /// Load a profile.
    #[instrument(skip(self, device), fields(device = %device.uid))]
    pub fn load(&self, device: &DeviceInfo, id: u64) -> Result<Profile> {
        let path = self.profile_path(device, id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GkError::ProfileNotFound {
                    device: device.uid.clone(),
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let document = IniDocument::parse_file_contents(&text, &path)?;
        let profile = profile_from_document(device.clone(), Some(id), document);
        debug!(name = %profile.name, macros = profile.macro_count(), "Loaded profile");
        Ok(profile)
    }

    /// Write a profile, assigning an id first if it has none.
    #[instrument(skip(self, profile), fields(device = %profile.device.uid, id = ?profile.id))]
    pub fn save(&self, profile: &mut Profile) -> Result<PathBuf> {
        let created = profile.id.is_none();
        let id = profile
            .id
            .unwrap_or_else(|| self.next_free_id(&profile.device));

        let document = profile_to_document(profile);
        let path = self.profile_path(&profile.device, id);
        write_atomic(&path, document.to_string().as_bytes())?;
        // Only a written profile gets its id
        profile.id = Some(id);
        profile.document = document;

        info!(id, name = %profile.name, path = %path.display(), "Saved profile");
        let kind = if created { ChangeKind::Created } else { ChangeKind::Modified };
        self.announce(&profile.device, id, kind);
        Ok(path)
    }

    /// Save a new profile under a fresh time-based id.
    pub fn create(&self, profile: &mut Profile) -> Result<u64> {
        self.save(profile)?;
        profile.require_id()
    }

    /// Load the default profile, creating it if missing.
    pub fn create_default(&self, device: &DeviceInfo) -> Result<Profile> {
        if self.exists(device, DEFAULT_PROFILE_ID) {
            return self.load(device, DEFAULT_PROFILE_ID);
        }
        info!(device = %device.uid, "Creating default profile");
        let mut profile = Profile::with_id(device.clone(), DEFAULT_PROFILE_ID, DEFAULT_PROFILE_NAME);
        profile.activate_on_focus = true;
        self.save(&mut profile)?;
        Ok(profile)
    }

    /// Remove a profile file.
    #[instrument(skip(self, device), fields(device = %device.uid))]
    pub fn delete(&self, device: &DeviceInfo, id: u64) -> Result<()> {
        let path = self.profile_path(device, id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(id, "Deleted profile");
                self.announce(device, id, ChangeKind::Deleted);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GkError::ProfileNotFound {
                device: device.uid.clone(),
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Seconds since the epoch, bumped past any id already on disk.
    fn next_free_id(&self, device: &DeviceInfo) -> u64 {
        let mut id = u64::try_from(Utc::now().timestamp()).unwrap_or(1).max(1);
        while self.exists(device, id) {
            id += 1;
        }
        id
    }

    // === Macro editing; each change is written immediately ===

    /// Add a macro and save.
    pub fn create_macro(
        &self,
        profile: &mut Profile,
        bank: Bank,
        keys: Vec<Key>,
        name: &str,
        action: MacroAction,
    ) -> Result<Macro> {
        let created = profile.create_macro(bank, keys, name, action)?.clone();
        self.save(profile)?;
        Ok(created)
    }

    /// Change the macro bound to `keys` and save.
    pub fn update_macro<F>(
        &self,
        profile: &mut Profile,
        bank: Bank,
        keys: &KeySet,
        edit: F,
    ) -> Result<Macro>
    where
        F: FnOnce(&mut Macro),
    {
        let m = profile
            .get_macro_mut(bank, keys)
            .ok_or_else(|| GkError::MacroNotFound {
                bank: bank.number(),
                keys: keys.iter().map(|k| k.name()).collect::<Vec<_>>().join("_"),
            })?;
        edit(m);
        let updated = m.clone();
        self.save(profile)?;
        Ok(updated)
    }

    /// Remove the macro bound to `keys` and save.
    pub fn delete_macro(&self, profile: &mut Profile, bank: Bank, keys: &KeySet) -> Result<Macro> {
        let removed = profile.delete_macro(bank, keys)?;
        self.save(profile)?;
        Ok(removed)
    }

    /// Move a macro to a new key combination and save.
    pub fn rebind_macro(
        &self,
        profile: &mut Profile,
        bank: Bank,
        from: &KeySet,
        to: Vec<Key>,
    ) -> Result<Macro> {
        let rebound = profile.rebind_macro(bank, from, to)?.clone();
        self.save(profile)?;
        Ok(rebound)
    }

    /// Base-profile lookup for one device.
    pub const fn lookup<'a>(&'a self, device: &'a DeviceInfo) -> DeviceProfiles<'a> {
        DeviceProfiles {
            store: self,
            device,
        }
    }

    // === Archives ===

    /// Write a profile and its icon and background images into a zip.
    ///
    /// Image paths inside the archived profile are rewritten to
    /// `<id>.resources/<file name>`.
    #[instrument(skip(self, device, archive), fields(device = %device.uid, archive = %archive.display()))]
    pub fn export(&self, device: &DeviceInfo, id: u64, archive: &Path) -> Result<()> {
        let mut copy = self.load(device, id)?;
        let file = fs::File::create(archive)?;
        let mut zip = zip::ZipWriter::new(file);

        for image in [&mut copy.icon, &mut copy.background] {
            let source = PathBuf::from(image.as_str());
            if image.is_empty() || !source.is_file() {
                continue;
            }
            let Some(name) = source.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let entry = format!("{id}.resources/{name}");
            zip.start_file(entry.as_str(), SimpleFileOptions::default()).map_err(archive_error)?;
            zip.write_all(&fs::read(&source)?)?;
            debug!(entry = %entry, "Archived resource");
            *image = entry;
        }

        let text = profile_to_document(&copy).to_string();
        zip.start_file(format!("{id}.{PROFILE_EXTENSION}"), SimpleFileOptions::default())
            .map_err(archive_error)?;
        zip.write_all(text.as_bytes())?;
        zip.finish().map_err(archive_error)?;
        info!(id, "Exported profile");
        Ok(())
    }

    /// Import a profile written by [`ProfileStore::export`].
    ///
    /// Resources are unpacked next to the profile and paths made absolute.
    /// The archived id is kept unless taken, in which case a fresh one is
    /// assigned.
    #[instrument(skip(self, device, archive), fields(device = %device.uid, archive = %archive.display()))]
    pub fn import(&self, device: &DeviceInfo, archive: &Path) -> Result<Profile> {
        let file = fs::File::open(archive)?;
        let mut zip = ZipArchive::new(file).map_err(archive_error)?;

        let (archived_id, text) = read_profile_entry(&mut zip)?;
        let entry_path = PathBuf::from(format!("{archived_id}.{PROFILE_EXTENSION}"));
        let document = IniDocument::parse_file_contents(&text, &entry_path)?;
        let mut profile = profile_from_document(device.clone(), None, document);

        let id = if self.exists(device, archived_id) {
            let fresh = self.next_free_id(device);
            warn!(archived_id, fresh, "Profile id taken, importing under a new id");
            fresh
        } else {
            archived_id
        };
        profile.id = Some(id);

        let resource_prefix = format!("{archived_id}.resources/");
        let resource_dir = self.device_dir(device).join(format!("{id}.resources"));
        for image in [&mut profile.icon, &mut profile.background] {
            let Some(name) = image.strip_prefix(&resource_prefix) else {
                continue;
            };
            // Only plain file names; never follow paths out of the resource dir
            let Some(name) = Path::new(name).file_name().map(|n| n.to_os_string()) else {
                continue;
            };
            let mut entry = zip
                .by_name(image.as_str())
                .map_err(|e| GkError::Archive(format!("Missing resource '{image}': {e}")))?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            drop(entry);

            let target = resource_dir.join(name);
            write_atomic(&target, &data)?;
            *image = target.to_string_lossy().into_owned();
        }

        self.save(&mut profile)?;
        info!(id, name = %profile.name, "Imported profile");
        Ok(profile)
    }
}

/// Profiles of one device, for base-profile resolution.
pub struct DeviceProfiles<'a> {
    store: &'a ProfileStore,
    device: &'a DeviceInfo,
}

impl ProfileLookup for DeviceProfiles<'_> {
    fn lookup(&self, id: u64) -> Result<Profile> {
        self.store.load(self.device, id)
    }
}

fn archive_error(e: zip::result::ZipError) -> GkError {
    GkError::Archive(e.to_string())
}

/// Find the single top-level `<id>.macros` entry.
fn read_profile_entry<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<(u64, String)> {
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(archive_error)?;
        let name = entry.name().to_string();
        let Some(stem) = name.strip_suffix(&format!(".{PROFILE_EXTENSION}")) else {
            continue;
        };
        let Ok(id) = stem.parse::<u64>() else {
            continue;
        };
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        return Ok((id, text));
    }
    Err(GkError::Archive("No profile found in archive".to_string()))
}

/// Replace `path` with `contents` in one step, then touch its mtime.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let failure = |reason: String| GkError::StorageWriteFailure {
        path: path.to_path_buf(),
        reason,
    };
    let dir = path
        .parent()
        .ok_or_else(|| failure("no parent directory".to_string()))?;
    fs::create_dir_all(dir).map_err(|e| failure(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failure(e.to_string()))?;
    tmp.write_all(contents).map_err(|e| failure(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| failure(e.to_string()))?;
    tmp.persist(path).map_err(|e| failure(e.error.to_string()))?;

    // The rename keeps the temp file's mtime; watchers key off a fresh one
    fs::File::options()
        .append(true)
        .open(path)
        .and_then(|f| f.set_modified(SystemTime::now()))
        .map_err(|e| failure(e.to_string()))?;
    Ok(())
}
