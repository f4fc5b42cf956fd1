//! The state file: the only durable copy of write-once secrets.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::address::{Address, ResourceKind};
use crate::error::StateError;

pub const STATE_VERSION: u32 = 1;

/// One persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lineage: Option<Uuid>,
    #[serde(default)]
    serial: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(default)]
    resources: BTreeMap<Address, ResourceRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            lineage: None,
            serial: 0,
            updated_at: None,
            resources: BTreeMap::new(),
        }
    }
}

/// In-memory view of the state file, written back with [`StateStore::save`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    file: StateFile,
}

impl StateStore {
    /// Load the state at `path`. A missing file is an empty state.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let file = match fs::read(&path) {
            Ok(bytes) => {
                let file: StateFile =
                    serde_json::from_slice(&bytes).map_err(|error| StateError::Parse {
                        path: path.clone(),
                        error,
                    })?;
                if file.version != STATE_VERSION {
                    return Err(StateError::UnsupportedVersion {
                        found: file.version,
                        expected: STATE_VERSION,
                    });
                }
                file
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no state file, starting empty");
                StateFile::default()
            }
            Err(error) => return Err(StateError::Io { path, error }),
        };

        Ok(Self { path, file })
    }

    /// An empty state that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: StateFile::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lineage(&self) -> Option<Uuid> {
        self.file.lineage
    }

    pub fn serial(&self) -> u64 {
        self.file.serial
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.file.updated_at.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.file.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.file.resources.len()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.file.resources.contains_key(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.file.resources.keys()
    }

    pub fn addresses_of(&self, kind: ResourceKind) -> Vec<Address> {
        self.addresses().filter(|a| a.kind == kind).cloned().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = (&Address, &ResourceRecord)> {
        self.file.resources.iter()
    }

    pub fn attributes(&self, address: &Address) -> Option<&Value> {
        self.file.resources.get(address).map(|r| &r.attributes)
    }

    /// A single attribute of a recorded resource.
    pub fn attribute(&self, address: &Address, name: &str) -> Option<&Value> {
        self.attributes(address)?.get(name)
    }

    /// Typed view of a record.
    pub fn get<S: DeserializeOwned>(&self, address: &Address) -> Result<Option<S>, StateError> {
        self.attributes(address)
            .map(|attributes| {
                S::deserialize(attributes).map_err(|error| StateError::Decode {
                    address: address.clone(),
                    error,
                })
            })
            .transpose()
    }

    pub fn put<S: Serialize>(&mut self, address: &Address, state: &S) -> Result<(), StateError> {
        let attributes = serde_json::to_value(state).map_err(|error| StateError::Encode {
            address: address.clone(),
            error,
        })?;
        self.put_value(address, attributes);
        Ok(())
    }

    pub fn put_value(&mut self, address: &Address, attributes: Value) {
        self.file.resources.insert(
            address.clone(),
            ResourceRecord {
                kind: address.kind,
                attributes,
            },
        );
    }

    pub fn remove(&mut self, address: &Address) -> Option<ResourceRecord> {
        self.file.resources.remove(address)
    }

    /// Write the state to disk, bumping the serial.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so a crash never leaves a truncated state behind.
    pub fn save(&mut self) -> Result<(), StateError> {
        self.file.serial += 1;
        self.file.lineage.get_or_insert_with(Uuid::new_v4);
        self.file.updated_at = Some(OffsetDateTime::now_utc().format(&Rfc3339)?);

        let io = |error| StateError::Io {
            path: self.path.clone(),
            error,
        };

        let mut bytes = serde_json::to_vec_pretty(&self.file).map_err(|error| StateError::Parse {
            path: self.path.clone(),
            error,
        })?;
        bytes.push(b'\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io)?;
        }

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &bytes).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;

        tracing::debug!(
            path = %self.path.display(),
            serial = self.file.serial,
            resources = self.file.resources.len(),
            "state saved"
        );
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
