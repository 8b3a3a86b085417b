//! Charm URL parsing.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::{CharmError, Result};

static VALID_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-zA-Z0-9+.-]+$").expect("unable to compile user regex")
});

static VALID_SERIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+([a-z0-9]+)?$").expect("unable to compile series regex")
});

static VALID_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]*[a-z][a-z0-9]*)*$").expect("unable to compile name regex")
});

/// Series value marking a bundle rather than a charm.
pub const BUNDLE_SERIES: &str = "bundle";

/// Where a charm URL points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// The remote charm store.
    CharmStore,
    /// A local filesystem repository.
    Local,
}

impl Schema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::CharmStore => "cs",
            Schema::Local => "local",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A possibly partial reference to a charm or bundle.
///
/// An empty `series` means the series is unknown. A `revision` of `-1` means
/// "latest".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharmUrl {
    pub schema: Schema,
    pub user: Option<String>,
    pub series: String,
    pub name: String,
    pub revision: i32,
}

impl CharmUrl {
    /// Parses `[schema:][~user/][series/]name[-revision]`.
    ///
    /// The schema defaults to `cs`.
    ///
    /// # Example
    ///
    /// ```
    /// use charmrepo_charm::{CharmUrl, Schema};
    ///
    /// let url = CharmUrl::parse("cs:~bob/trusty/wordpress-42").unwrap();
    /// assert_eq!(url.schema, Schema::CharmStore);
    /// assert_eq!(url.user.as_deref(), Some("bob"));
    /// assert_eq!(url.series, "trusty");
    /// assert_eq!(url.name, "wordpress");
    /// assert_eq!(url.revision, 42);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            CharmError::InvalidUrl {
                url: input.to_string(),
                reason: reason.to_string(),
            }
        };

        let (schema, rest) = match input.split_once(':') {
            Some(("cs", rest)) => (Schema::CharmStore, rest),
            Some(("local", rest)) => (Schema::Local, rest),
            Some((other, _)) => return Err(invalid(&format!("schema {other:?} not valid"))),
            None => (Schema::CharmStore, input),
        };

        let mut parts: Vec<&str> = rest.split('/').collect();

        let user = match parts.first().copied() {
            Some(first) if first.starts_with('~') => {
                let user = &first[1..];
                if schema == Schema::Local {
                    return Err(invalid("local charm or bundle URL with user name"));
                }
                if !VALID_USER.is_match(user) {
                    return Err(invalid(&format!("user name {user:?} not valid")));
                }
                parts.remove(0);
                Some(user.to_string())
            }
            _ => None,
        };

        let (series, name) = match parts.as_slice() {
            [name] => ("", *name),
            [series, name] => (*series, *name),
            _ => return Err(invalid("charm or bundle URL has invalid form")),
        };

        if !series.is_empty() && !VALID_SERIES.is_match(series) {
            return Err(invalid(&format!("series name {series:?} not valid")));
        }

        let (name, revision) = split_revision(name);

        if !VALID_NAME.is_match(name) {
            return Err(invalid(&format!("name {name:?} not valid")));
        }

        Ok(Self {
            schema,
            user,
            series: series.to_string(),
            name: name.to_string(),
            revision,
        })
    }

    /// Returns a copy of the URL with the revision replaced.
    pub fn with_revision(&self, revision: i32) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    /// Returns a copy of the URL with the series replaced.
    pub fn with_series(&self, series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            ..self.clone()
        }
    }

    pub fn is_bundle(&self) -> bool {
        self.series == BUNDLE_SERIES
    }

    pub fn has_revision(&self) -> bool {
        self.revision >= 0
    }

    /// The URL without its `schema:` prefix, as used in store request paths.
    pub fn path(&self) -> String {
        let mut path = String::new();
        if let Some(user) = &self.user {
            path.push('~');
            path.push_str(user);
            path.push('/');
        }
        if !self.series.is_empty() {
            path.push_str(&self.series);
            path.push('/');
        }
        path.push_str(&self.name);
        if self.has_revision() {
            path.push('-');
            path.push_str(&self.revision.to_string());
        }
        path
    }
}

/// Splits a trailing `-N` revision off a name. Anything that is not all
/// digits after the last dash stays part of the name.
fn split_revision(name: &str) -> (&str, i32) {
    if let Some((base, rev)) = name.rsplit_once('-') {
        if !base.is_empty() && !rev.is_empty() && rev.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(revision) = rev.parse::<i32>() {
                return (base, revision);
            }
        }
    }
    (name, -1)
}

impl fmt::Display for CharmUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.path())
    }
}

impl FromStr for CharmUrl {
    type Err = CharmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Makes an arbitrary string safe for use as a single path component.
///
/// ASCII letters, digits, `.` and `-` are kept; every other byte is written
/// as `_xx_` with two lowercase hex digits.
///
/// # Example
///
/// ```
/// use charmrepo_charm::quote;
///
/// assert_eq!(quote("cs:trusty/wordpress-42"), "cs_3a_trusty_2f_wordpress-42");
/// ```
pub fn quote(unsafe_str: &str) -> String {
    let mut safe = String::with_capacity(unsafe_str.len() * 4);
    for b in unsafe_str.bytes() {
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' {
            safe.push(b as char);
        } else {
            safe.push_str(&format!("_{b:02x}_"));
        }
    }
    safe
}
