mod cargo;
mod error;
mod kind;
mod npm;

pub use cargo::{read_cargo_version, read_document, write_cargo_version};
pub use error::ManifestError;
pub use kind::{ManifestKind, update_versions};
pub use npm::{read_npm_version, write_lockfile_version, write_package_version};
