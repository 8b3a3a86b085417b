//! SHA-384 content fingerprints.
//!
//! The same digest is used to verify downloads against the store metadata and
//! to re-verify cached archives, so every hash in the workspace goes through
//! this module.

use std::{
    fmt,
    fs::File,
    io::{self, Read, Write},
    path::Path,
};

use sha2::{Digest, Sha384};

use crate::error::{FingerprintError, FingerprintResult, HashError, HashResult};

/// Length in bytes of a [`Fingerprint`].
pub const FINGERPRINT_SIZE: usize = 48;

const BUFFER_SIZE: usize = 8192;

/// A SHA-384 digest of some content.
///
/// The default value is the zero-value fingerprint: it holds no digest and is
/// rejected by [`Fingerprint::validate`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    raw: Option<[u8; FINGERPRINT_SIZE]>,
}

impl Fingerprint {
    /// Wraps a raw digest, copying it.
    ///
    /// # Errors
    ///
    /// * [`FingerprintError::InvalidSize`] if `raw` is not exactly
    ///   [`FINGERPRINT_SIZE`] bytes long.
    ///
    /// # Example
    ///
    /// ```
    /// use charmrepo_utils::hash::{Fingerprint, FINGERPRINT_SIZE};
    ///
    /// let fp = Fingerprint::new(&[7u8; FINGERPRINT_SIZE]).unwrap();
    /// assert_eq!(fp.bytes(), &[7u8; FINGERPRINT_SIZE][..]);
    /// assert!(Fingerprint::new(&[7u8; 12]).is_err());
    /// ```
    pub fn new(raw: &[u8]) -> FingerprintResult<Self> {
        if raw.len() < FINGERPRINT_SIZE {
            return Err(FingerprintError::InvalidSize {
                bound: "too small",
                len: raw.len(),
            });
        }
        if raw.len() > FINGERPRINT_SIZE {
            return Err(FingerprintError::InvalidSize {
                bound: "too big",
                len: raw.len(),
            });
        }

        let mut bytes = [0u8; FINGERPRINT_SIZE];
        bytes.copy_from_slice(raw);
        Ok(Self { raw: Some(bytes) })
    }

    /// Reads `reader` to the end and returns the fingerprint of everything read.
    ///
    /// # Errors
    ///
    /// * [`FingerprintError::ReadFailed`] if the reader fails. Nothing is
    ///   returned for the partially consumed input.
    pub fn generate<R: Read>(mut reader: R) -> FingerprintResult<Self> {
        let (digest, _) = copy_with_digest(&mut reader, &mut io::sink())
            .map_err(|source| FingerprintError::ReadFailed { source })?;
        Ok(digest)
    }

    /// Returns the raw digest, or an empty slice for the zero value.
    pub fn bytes(&self) -> &[u8] {
        match &self.raw {
            Some(raw) => raw,
            None => &[],
        }
    }

    /// Lowercase hex encoding of the digest, 96 characters for a valid
    /// fingerprint.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes())
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_none()
    }

    /// Checks that the fingerprint holds a digest.
    pub fn validate(&self) -> FingerprintResult<()> {
        if self.is_zero() {
            return Err(FingerprintError::Empty);
        }
        Ok(())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Copies `reader` into `writer` while hashing the bytes that pass through.
///
/// Returns the fingerprint of the copied content and the number of bytes
/// copied.
pub fn copy_with_digest<R, W>(reader: &mut R, writer: &mut W) -> io::Result<(Fingerprint, u64)>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut hasher = Sha384::new();
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }

    let digest = Fingerprint::new(&hasher.finalize()).map_err(io::Error::other)?;
    Ok((digest, copied))
}

/// Calculates the SHA-384 checksum of a file.
///
/// Returns the hex-encoded digest together with the number of bytes read.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
pub fn calculate_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<(String, u64)> {
    let file_path = file_path.as_ref();
    let read_failed = |source| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source,
        }
    };

    let mut file = File::open(file_path).map_err(read_failed)?;
    let (digest, size) = copy_with_digest(&mut file, &mut io::sink()).map_err(read_failed)?;
    Ok((digest.to_hex(), size))
}

/// Verifies a file against an expected hex digest and byte length.
///
/// The digest comparison is case-insensitive.
pub fn verify_checksum<P: AsRef<Path>>(
    file_path: P,
    expected: &str,
    expected_size: u64,
) -> HashResult<bool> {
    let (actual, size) = calculate_checksum(file_path)?;
    Ok(size == expected_size && actual.eq_ignore_ascii_case(expected))
}
