use crate::grid::Grid;
use crate::model::Category;
use crate::planner::{PlannerState, Record, SnapshotSink, StoreKey};
use crate::registry::{Categories, Todos};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever a stored record changes shape. Records written with any
/// other version are ignored and replaced by defaults.
pub const DATA_VERSION: u32 = 1;

const PROJECT_DIR: &str = ".daysprint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

impl StoreLocation {
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", key))
    }
}

pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    location: StoreLocation,
}

impl FileStore {
    pub fn new(location: StoreLocation) -> Self {
        FileStore { location }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.location.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        Ok(Some(data))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.location.dir)
            .with_context(|| format!("creating {:?}", self.location.dir))?;
        let path = self.location.record_path(key);
        fs::write(&path, value).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Versioned<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct VersionedOwned<T> {
    data: T,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

pub fn encode_record(record: Record<'_>) -> Result<String> {
    let serialized = match record {
        Record::Categories(c) => serde_yaml::to_string(&Versioned {
            version: DATA_VERSION,
            data: c,
        }),
        Record::Todos(t) => serde_yaml::to_string(&Versioned {
            version: DATA_VERSION,
            data: t,
        }),
        Record::Grid(g) => serde_yaml::to_string(&Versioned {
            version: DATA_VERSION,
            data: g,
        }),
    };
    serialized.with_context(|| format!("serializing {}", record.key().name()))
}

fn decode_record<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    let version = match serde_yaml::from_str::<VersionHeader>(raw) {
        Ok(header) => header.version,
        Err(err) => {
            log::warn!("could not parse stored {}: {}; using defaults", key, err);
            return None;
        }
    };
    if version != Some(DATA_VERSION) {
        log::warn!(
            "stored {} has version {:?}, expected {}; using defaults",
            key,
            version,
            DATA_VERSION
        );
        return None;
    }
    match serde_yaml::from_str::<VersionedOwned<T>>(raw) {
        Ok(record) => Some(record.data),
        Err(err) => {
            log::warn!("could not parse stored {}: {}; using defaults", key, err);
            None
        }
    }
}

fn load_record<T: DeserializeOwned>(store: &dyn KeyValueStore, key: StoreKey) -> Option<T> {
    match store.read(key.name()) {
        Ok(Some(raw)) => decode_record(key.name(), &raw),
        Ok(None) => None,
        Err(err) => {
            log::warn!("storage unavailable for {}: {:#}", key.name(), err);
            None
        }
    }
}

pub fn load_state(store: &dyn KeyValueStore) -> PlannerState {
    let mut stale = Vec::new();
    let categories = match load_record::<Vec<Category>>(store, StoreKey::Categories)
        .and_then(Categories::from_vec)
    {
        Some(categories) => categories,
        None => {
            stale.push(StoreKey::Categories);
            Categories::default()
        }
    };
    let todos = match load_record::<Todos>(store, StoreKey::Todos) {
        Some(todos) => todos,
        None => {
            stale.push(StoreKey::Todos);
            Todos::default()
        }
    };
    let grid = load_record::<Grid>(store, StoreKey::Grid);
    PlannerState {
        categories,
        todos,
        grid,
        stale,
    }
}

pub struct StoreSink<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> StoreSink<S> {
    pub fn new(store: S) -> Self {
        StoreSink { store }
    }
}

impl<S: KeyValueStore> SnapshotSink for StoreSink<S> {
    fn persist(&mut self, record: Record<'_>) -> Result<()> {
        let encoded = encode_record(record)?;
        self.store.write(record.key().name(), &encoded)?;
        log::trace!("persisted {}", record.key().name());
        Ok(())
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).context("failed to create .daysprint directory")?;
    Ok(StoreLocation {
        dir,
        scope: StoreScope::Project,
    })
}

pub fn locate_store(start: &Path) -> Result<StoreLocation> {
    if let Some(dir) = find_project_store(start) {
        return Ok(StoreLocation {
            dir,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        dir: global_store_dir()?,
        scope: StoreScope::Global,
    })
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "daysprint").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
