//! Charm references and charm archives.
//!
//! A charm is addressed by a [`CharmUrl`] such as `cs:~bob/trusty/wordpress-42`
//! and stored either as an unpacked directory or as a zip archive with the
//! `.charm` extension. Both layouts carry a `metadata.yaml` declaring the
//! charm name and an optional `revision` file.
//!
//! # Example
//!
//! ```no_run
//! use charmrepo_charm::{read_charm, CharmUrl};
//!
//! fn load() -> charmrepo_charm::Result<()> {
//!     let url = CharmUrl::parse("local:trusty/mysql")?;
//!     let charm = read_charm("/srv/charms/trusty/mysql")?;
//!     assert_eq!(charm.name(), url.name);
//!     Ok(())
//! }
//! ```

pub mod charm;
pub mod error;
pub mod url;

pub use charm::{read_charm, read_charm_archive, read_charm_dir, Charm, Meta, CHARM_EXTENSION};
pub use error::{CharmError, ErrorContext, Result};
pub use url::{quote, CharmUrl, Schema};
