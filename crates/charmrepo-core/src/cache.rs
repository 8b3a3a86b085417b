//! Verified on-disk cache of downloaded charm archives.
//!
//! Entries live in one flat directory and are named after the quoted
//! canonical id of the charm. Nothing besides the files themselves is
//! persisted: every read re-hashes the file against the digest and size the
//! store announces for that call.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use charmrepo_charm::{quote, CharmUrl, CHARM_EXTENSION};
use charmrepo_utils::{
    fs::ensure_dir_exists,
    hash::{copy_with_digest, verify_checksum},
};
use tempfile::Builder;
use tracing::{debug, trace};

use crate::error::{ErrorContext, IntegrityFailure, Result};

const TEMP_PREFIX: &str = "charm-download";

/// File name of the cache entry for a resolved charm id.
///
/// # Example
///
/// ```
/// use charmrepo_charm::CharmUrl;
/// use charmrepo_core::cache::entry_name;
///
/// let id = CharmUrl::parse("cs:trusty/wordpress-42").unwrap();
/// assert_eq!(entry_name(&id), "cs_3a_trusty_2f_wordpress-42.charm");
/// ```
pub fn entry_name(id: &CharmUrl) -> String {
    format!("{}{CHARM_EXTENSION}", quote(&id.to_string()))
}

/// Path of the cache entry for `id` inside `dir`.
pub fn entry_path(dir: &Path, id: &CharmUrl) -> PathBuf {
    dir.join(entry_name(id))
}

/// Reports whether the file at `path` has exactly `expected_size` bytes and
/// the SHA-384 digest `expected_hash`.
///
/// A missing or unreadable file counts as a mismatch.
pub fn lookup(path: &Path, expected_hash: &str, expected_size: u64) -> bool {
    match verify_checksum(path, expected_hash, expected_size) {
        Ok(true) => {
            trace!("cache entry {} matches sha384 {}", path.display(), expected_hash);
            true
        }
        Ok(false) => {
            debug!("cache entry {} failed verification", path.display());
            false
        }
        Err(err) => {
            debug!("cache entry {} not usable: {}", path.display(), err);
            false
        }
    }
}

/// Streams `reader` into the cache entry at `target`, verifying the size and
/// digest on the way.
///
/// The content is written to a temporary file next to `target` and renamed
/// into place only after it verified, so readers never see a partial entry.
/// On failure the temporary file is removed and any existing entry at
/// `target` is left untouched.
pub fn store<R: Read + ?Sized>(
    target: &Path,
    reader: &mut R,
    expected_hash: &str,
    expected_size: u64,
) -> Result<PathBuf> {
    let dir = target.parent().unwrap_or(Path::new("."));
    ensure_dir_exists(dir)?;

    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;

    let (digest, size) = copy_with_digest(reader, temp.as_file_mut())
        .with_context(|| format!("downloading into {}", temp.path().display()))?;

    if size != expected_size {
        return Err(IntegrityFailure::Size {
            expected: expected_size,
            actual: size,
        }
        .into());
    }

    let actual = digest.to_hex();
    if !actual.eq_ignore_ascii_case(expected_hash) {
        return Err(IntegrityFailure::Digest {
            expected: expected_hash.to_string(),
            actual,
        }
        .into());
    }

    temp.as_file()
        .sync_all()
        .with_context(|| format!("syncing {}", temp.path().display()))?;
    temp.persist(target)
        .map_err(|err| err.error)
        .with_context(|| format!("renaming download to {}", target.display()))?;

    trace!("stored {} ({} bytes, sha384 {})", target.display(), size, actual);
    Ok(target.to_path_buf())
}
