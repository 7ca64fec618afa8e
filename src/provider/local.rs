//! Local directory cache provider
//!
//! Each entry is a zstd-compressed tar archive plus a JSON metadata sidecar,
//! both named by the SHA256 of the (prefixed) key:
//!
//! ```text
//! <root>/<sha256>.tar.zst
//! <root>/<sha256>.json
//! ```
//!
//! Inside the archive, the top-level component `i` holds the i-th saved
//! path, so absolute and relative paths restore to where they came from.
//!
//! # Lookup
//!
//! Candidates are tried in order. An exact key match always wins; fallback
//! candidates also match any key they prefix, newest entry first. Only an
//! exact match on the first candidate counts as an exact hit.

use crate::error::{CacheError, CacheResult};
use crate::provider::{
    with_retries, CacheHit, CacheProvider, RestoreRequest, RestoreResult, SaveRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const ARCHIVE_EXT: &str = "tar.zst";
const META_EXT: &str = "json";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Metadata stored next to each archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Key the entry was saved under
    pub key: String,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Step that wrote the entry
    pub step_id: String,

    /// Saved paths as given by the caller, in archive order
    pub paths: Vec<String>,

    /// zstd level the archive was written with
    pub compression_level: i32,

    /// Compressed archive size
    pub size_bytes: u64,
}

/// Provider storing entries in a local directory
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
    retry_delay: Duration,
}

impl LocalProvider {
    /// Create a provider rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set the base delay between restore attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Default root: the platform cache directory
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bitrise-cache")
    }

    /// Read the metadata of every entry in the store
    pub fn entries(&self) -> CacheResult<Vec<EntryMeta>> {
        list_entries(&self.root)
    }
}

#[async_trait]
impl CacheProvider for LocalProvider {
    async fn restore(&self, request: &RestoreRequest) -> CacheResult<RestoreResult> {
        if request.keys.is_empty() {
            return Err(CacheError::Internal("no cache keys to look up".to_string()));
        }

        debug!(
            "Looking up {} key(s) in {}",
            request.keys.len(),
            self.root.display()
        );

        with_retries(request.retries, self.retry_delay, || {
            let root = self.root.clone();
            let keys = request.keys.clone();
            run_blocking(move || restore_entry(&root, &keys))
        })
        .await
    }

    async fn save(&self, request: &SaveRequest) -> CacheResult<()> {
        let root = self.root.clone();
        let request = request.clone();
        run_blocking(move || save_entry(&root, &request)).await
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}

async fn run_blocking<T, F>(f: F) -> CacheResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CacheResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))?
}

fn entry_id(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn archive_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{}.{}", entry_id(key), ARCHIVE_EXT))
}

fn meta_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{}.{}", entry_id(key), META_EXT))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if path == "~" {
        home()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn list_entries(root: &Path) -> CacheResult<Vec<EntryMeta>> {
    if !root.exists() {
        return Ok(vec![]);
    }

    let mut entries = vec![];
    let dir = fs::read_dir(root)
        .map_err(|e| CacheError::io(format!("reading cache directory {}", root.display()), e))?;

    for item in dir {
        let path = item
            .map_err(|e| CacheError::io("reading cache directory entry", e))?
            .path();
        if path.extension().is_none_or(|ext| ext != META_EXT) {
            continue;
        }

        let parsed = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<EntryMeta>(&content).ok());
        match parsed {
            Some(meta) => entries.push(meta),
            None => debug!("Skipping unreadable cache metadata {}", path.display()),
        }
    }

    Ok(entries)
}

/// Pick the entry for the first candidate that matches anything
fn find_match<'a>(entries: &'a [EntryMeta], keys: &[String]) -> Option<(usize, &'a EntryMeta)> {
    for (index, candidate) in keys.iter().enumerate() {
        if let Some(entry) = entries.iter().find(|e| e.key == *candidate) {
            return Some((index, entry));
        }

        if index == 0 {
            continue;
        }

        let newest = entries
            .iter()
            .filter(|e| e.key.starts_with(candidate.as_str()))
            .max_by_key(|e| e.created_at);
        if let Some(entry) = newest {
            return Some((index, entry));
        }
    }
    None
}

fn restore_entry(root: &Path, keys: &[String]) -> CacheResult<RestoreResult> {
    let entries = list_entries(root)?;
    let (index, meta) = find_match(&entries, keys).ok_or_else(|| CacheError::CacheNotFound {
        keys: keys.join(", "),
    })?;

    debug!(
        "Matched candidate {} with entry {} ({})",
        index,
        meta.key,
        format_bytes(meta.size_bytes)
    );

    let targets: Vec<PathBuf> = meta.paths.iter().map(|p| expand_home(p)).collect();
    unpack_archive(&archive_path(root, &meta.key), &targets)?;

    let hit = if index == 0 {
        CacheHit::Exact
    } else {
        CacheHit::Partial
    };

    Ok(RestoreResult {
        hit,
        matched_key: Some(meta.key.clone()),
    })
}

fn save_entry(root: &Path, request: &SaveRequest) -> CacheResult<()> {
    let meta_file = meta_path(root, &request.key);
    if request.is_key_unique && meta_file.exists() {
        info!(
            "Cache entry for key {} already exists, skipping upload",
            request.key
        );
        return Ok(());
    }

    let mut sources = vec![];
    for path in &request.paths {
        let resolved = expand_home(path);
        if fs::symlink_metadata(&resolved).is_ok() {
            sources.push((path.clone(), resolved));
        } else {
            warn!("Path does not exist, skipping: {}", path);
        }
    }

    if sources.is_empty() {
        return Err(CacheError::NoPathsFound(request.paths.join(", ")));
    }

    fs::create_dir_all(root)
        .map_err(|e| CacheError::io(format!("creating cache directory {}", root.display()), e))?;

    let archive = archive_path(root, &request.key);
    let staging_id = Uuid::new_v4();
    let staged_archive = root.join(format!(
        "{}.{}.tmp-{}",
        entry_id(&request.key),
        ARCHIVE_EXT,
        staging_id
    ));
    let staged_meta = root.join(format!(
        "{}.{}.tmp-{}",
        entry_id(&request.key),
        META_EXT,
        staging_id
    ));

    let staged = stage_entry(&staged_archive, &staged_meta, &sources, request);
    let meta = match staged {
        Ok(meta) => meta,
        Err(e) => {
            let _ = fs::remove_file(&staged_archive);
            let _ = fs::remove_file(&staged_meta);
            return Err(e);
        }
    };

    // Sidecar goes last; an archive without one is skipped by lookups
    match fs::remove_file(&meta_file) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CacheError::io(
                format!("removing {}", meta_file.display()),
                e,
            ))
        }
    }
    fs::rename(&staged_archive, &archive)
        .map_err(|e| CacheError::io(format!("moving archive into {}", archive.display()), e))?;
    fs::rename(&staged_meta, &meta_file)
        .map_err(|e| CacheError::io(format!("moving metadata into {}", meta_file.display()), e))?;

    info!(
        "Archived {} path(s) ({})",
        meta.paths.len(),
        format_bytes(meta.size_bytes)
    );
    Ok(())
}

/// Write archive and sidecar to their staging paths
fn stage_entry(
    archive: &Path,
    meta_file: &Path,
    sources: &[(String, PathBuf)],
    request: &SaveRequest,
) -> CacheResult<EntryMeta> {
    let resolved: Vec<&Path> = sources.iter().map(|(_, p)| p.as_path()).collect();
    write_archive(archive, &resolved, request.compression_level)?;

    let size_bytes = fs::metadata(archive)
        .map_err(|e| CacheError::io(format!("reading {}", archive.display()), e))?
        .len();

    let meta = EntryMeta {
        key: request.key.clone(),
        created_at: Utc::now(),
        step_id: request.step_id.clone(),
        paths: sources.iter().map(|(original, _)| original.clone()).collect(),
        compression_level: request.compression_level,
        size_bytes,
    };
    fs::write(meta_file, serde_json::to_string_pretty(&meta)?)
        .map_err(|e| CacheError::io(format!("writing {}", meta_file.display()), e))?;

    Ok(meta)
}

fn write_archive(dest: &Path, sources: &[&Path], level: i32) -> CacheResult<()> {
    let file = File::create(dest)
        .map_err(|e| CacheError::io(format!("creating {}", dest.display()), e))?;
    let encoder =
        zstd::Encoder::new(file, level).map_err(|e| CacheError::archive("creating zstd encoder", e))?;

    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for (index, source) in sources.iter().enumerate() {
        let name = index.to_string();
        let is_dir = fs::symlink_metadata(source)
            .map(|m| m.is_dir())
            .unwrap_or(false);

        let appended = if is_dir {
            builder.append_dir_all(&name, source)
        } else {
            builder.append_path_with_name(source, &name)
        };
        appended.map_err(|e| CacheError::archive(&format!("adding {}", source.display()), e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| CacheError::archive("finishing tar stream", e))?;
    encoder
        .finish()
        .map_err(|e| CacheError::archive("finishing zstd stream", e))?;

    Ok(())
}

fn unpack_archive(archive: &Path, targets: &[PathBuf]) -> CacheResult<()> {
    let file = File::open(archive)
        .map_err(|e| CacheError::io(format!("opening {}", archive.display()), e))?;
    let decoder =
        zstd::Decoder::new(file).map_err(|e| CacheError::archive("creating zstd decoder", e))?;
    let mut tar = tar::Archive::new(decoder);

    let entries = tar
        .entries()
        .map_err(|e| CacheError::archive("reading tar entries", e))?;

    let mut unpacked = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| CacheError::archive("reading tar entry", e))?;
        let entry_path = entry
            .path()
            .map_err(|e| CacheError::archive("reading entry path", e))?
            .into_owned();

        let (target, dest) = destination(&entry_path, targets)?;
        reject_symlinked_parents(&entry_path, target, &dest)?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(format!("creating {}", parent.display()), e))?;
        }

        entry
            .unpack(&dest)
            .map_err(|e| CacheError::archive(&format!("unpacking {}", dest.display()), e))?;
        unpacked += 1;
    }

    debug!("Unpacked {} archive entries", unpacked);
    Ok(())
}

/// Map an archive entry path (`<index>/<rest>`) onto its restore target,
/// returning the target root and the entry's destination under it
fn destination<'a>(
    entry_path: &Path,
    targets: &'a [PathBuf],
) -> CacheResult<(&'a Path, PathBuf)> {
    let invalid = |reason: &str| CacheError::EntryInvalid {
        path: entry_path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut components = entry_path.components();
    let index = match components.next() {
        Some(Component::Normal(first)) => first.to_str().and_then(|s| s.parse::<usize>().ok()),
        _ => None,
    };
    let target = index
        .and_then(|i| targets.get(i))
        .ok_or_else(|| invalid("entry does not belong to a saved path"))?;

    let rest = components.as_path();
    if rest
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(invalid("entry escapes its target directory"));
    }

    let dest = if rest.as_os_str().is_empty() {
        target.clone()
    } else {
        target.join(rest)
    };
    Ok((target.as_path(), dest))
}

/// Fail if a directory between `target` and `dest` is a symlink, so a link
/// unpacked earlier cannot redirect later entries outside the target.
fn reject_symlinked_parents(entry_path: &Path, target: &Path, dest: &Path) -> CacheResult<()> {
    let linked = dest
        .ancestors()
        .skip(1)
        .take_while(|dir| *dir != target && dir.starts_with(target))
        .find(|dir| fs::symlink_metadata(dir).is_ok_and(|m| m.file_type().is_symlink()));

    match linked {
        Some(dir) => Err(CacheError::EntryInvalid {
            path: entry_path.to_path_buf(),
            reason: format!("parent {} is a symlink", dir.display()),
        }),
        None => Ok(()),
    }
}
