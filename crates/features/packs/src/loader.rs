//! Pack discovery and loading.
//!
//! Packs are plain JSON or TOML documents. Each file is read and validated on its own task;
//! the loaded packs are then ordered by `(priority, id)`, which is the merge precedence.

use crate::error::{PackError, PackErrorExt};
use crate::validator::validate_pack;
use fxhash::FxHashMap;
use kreg_domain::Pack;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Serialization format of a pack document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackFormat {
    Json,
    Toml,
}

impl PackFormat {
    /// Picks the format from a file extension (`.json` / `.toml`, case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else {
            None
        }
    }
}

/// Parses and validates one pack document.
///
/// `origin` identifies the document in errors (usually its path) until the pack id is known.
pub fn parse_pack(source: &str, format: PackFormat, origin: &str) -> Result<Pack, PackError> {
    let pack: Pack = match format {
        PackFormat::Json => serde_json::from_str(source).context(origin.to_owned())?,
        PackFormat::Toml => toml::from_str(source).context(origin.to_owned())?,
    };

    validate_pack(&pack).map_err(|error| PackError::Invalid {
        pack: if pack.id.is_empty() { origin.to_owned() } else { pack.id.clone() },
        error,
        context: None,
    })?;

    Ok(pack)
}

/// Reads, parses and validates the pack at `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_pack(path: impl AsRef<Path>) -> Result<Pack, PackError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let format = PackFormat::from_path(path).ok_or_else(|| PackError::UnsupportedFormat {
        message: "expected a .json or .toml file".into(),
        context: Some(origin.clone().into()),
    })?;

    let source = tokio::fs::read_to_string(path).await.context(origin.clone())?;
    let pack = parse_pack(&source, format, &origin)?;
    debug!(pack = %pack.id, version = %pack.version, entities = pack.entity_count(), "Pack loaded");
    Ok(pack)
}

/// Collects every `.json` / `.toml` file below `dir`, sorted by path.
pub fn discover_packs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PackError> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.context(dir.display().to_string())?;
        if entry.file_type().is_file() && PackFormat::from_path(entry.path()).is_some() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads every pack below `dir` concurrently and returns them in merge order.
///
/// The first failing pack aborts the load; remaining tasks are cancelled.
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub async fn load_packs(dir: impl AsRef<Path>) -> Result<Vec<Pack>, PackError> {
    let paths = discover_packs(dir)?;
    let mut tasks = JoinSet::new();
    for path in paths {
        tasks.spawn(async move {
            let result = load_pack(&path).await;
            (path, result)
        });
    }

    let mut loaded = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (path, result) = joined.context("joining pack loader")?;
        loaded.push((path, result?));
    }

    let packs = order_packs(loaded)?;
    info!(count = packs.len(), "Packs loaded");
    Ok(packs)
}

/// Rejects duplicate ids and sorts by `(priority, id)`.
fn order_packs(loaded: Vec<(PathBuf, Pack)>) -> Result<Vec<Pack>, PackError> {
    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    let mut packs = Vec::with_capacity(loaded.len());
    for (path, pack) in loaded {
        if let Some(first) = seen.get(&pack.id) {
            let (a, b) = if *first < path { (first, &path) } else { (&path, first) };
            return Err(PackError::DuplicatePack {
                pack: pack.id,
                message: format!("declared by {} and {}", a.display(), b.display()).into(),
                context: None,
            });
        }
        seen.insert(pack.id.clone(), path);
        packs.push(pack);
    }
    packs.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    Ok(packs)
}
