use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CharmError, ErrorContext, Result};

/// File extension of packed charm archives.
pub const CHARM_EXTENSION: &str = ".charm";

const METADATA_FILE: &str = "metadata.yaml";
const REVISION_FILE: &str = "revision";

/// Charm metadata as declared in `metadata.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Meta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<String>,
}

impl Meta {
    fn parse(content: &str, path: &Path) -> Result<Self> {
        let meta: Meta = serde_yaml::from_str(content).map_err(|err| {
            CharmError::InvalidMetadata {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;

        if meta.name.trim().is_empty() {
            return Err(CharmError::InvalidMetadata {
                path: path.to_path_buf(),
                reason: "charm name is empty".to_string(),
            });
        }

        Ok(meta)
    }
}

/// A charm read from disk, either unpacked or from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charm {
    meta: Meta,
    revision: i32,
    path: PathBuf,
}

impl Charm {
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn revision(&self) -> i32 {
        self.revision
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Location the charm was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_revision(content: Option<&str>, path: &Path) -> Result<i32> {
    let Some(content) = content else {
        return Ok(0);
    };

    content
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|rev| *rev >= 0)
        .ok_or_else(|| {
            CharmError::InvalidRevision {
                path: path.to_path_buf(),
                content: content.to_string(),
            }
        })
}

/// Reads an unpacked charm directory.
pub fn read_charm_dir<P: AsRef<Path>>(path: P) -> Result<Charm> {
    let path = path.as_ref();

    let meta_path = path.join(METADATA_FILE);
    let content = fs::read_to_string(&meta_path)
        .with_context(|| format!("reading {}", meta_path.display()))?;
    let meta = Meta::parse(&content, &meta_path)?;

    let revision_path = path.join(REVISION_FILE);
    let revision_content = match fs::read_to_string(&revision_path) {
        Ok(content) => Some(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(CharmError::IoError {
                action: format!("reading {}", revision_path.display()),
                source: err,
            })
        }
    };
    let revision = parse_revision(revision_content.as_deref(), &revision_path)?;

    Ok(Charm {
        meta,
        revision,
        path: path.to_path_buf(),
    })
}

/// Reads a packed `.charm` archive.
///
/// `metadata.yaml` and the optional `revision` file are expected at the root
/// of the zip archive.
pub fn read_charm_archive<P: AsRef<Path>>(path: P) -> Result<Charm> {
    let path = path.as_ref();
    let archive_err = |source| {
        CharmError::Archive {
            path: path.to_path_buf(),
            source,
        }
    };

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(archive_err)?;

    let meta_content = read_entry(&mut archive, METADATA_FILE, path)?.ok_or_else(|| {
        CharmError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: format!("archive has no {METADATA_FILE}"),
        }
    })?;
    let meta = Meta::parse(&meta_content, path)?;

    let revision_content = read_entry(&mut archive, REVISION_FILE, path)?;
    let revision = parse_revision(revision_content.as_deref(), path)?;

    Ok(Charm {
        meta,
        revision,
        path: path.to_path_buf(),
    })
}

fn read_entry(
    archive: &mut zip::ZipArchive<File>,
    name: &str,
    path: &Path,
) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(CharmError::Archive {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .with_context(|| format!("reading {name} from {}", path.display()))?;
    Ok(Some(content))
}

/// Reads a charm from `path`, which may be a directory or an archive.
pub fn read_charm<P: AsRef<Path>>(path: P) -> Result<Charm> {
    let path = path.as_ref();
    if path.is_dir() {
        read_charm_dir(path)
    } else {
        read_charm_archive(path)
    }
}
