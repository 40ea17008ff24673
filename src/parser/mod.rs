//! Parsers for the on-disk formats owned by Steam and the platform store.
//!
//! | Module | Format |
//! |--------|--------|
//! | [`text_block`] | Generic key/value lookup in brace-delimited text |
//! | [`acf`] | `appmanifest_<id>.acf` installation state |
//! | [`library_folders`] | `libraryfolders.vdf` library index |
//! | [`appx`] | `AppxManifest.xml` package manifest |
//!
//! All parsers are read-only and never write these formats back.

pub mod acf;
pub mod appx;
pub mod library_folders;
pub mod text_block;

pub use acf::{load_app_manifest, parse_app_manifest, AppManifest};
pub use appx::{find_manifest, load_package_manifest, parse_package_manifest, PackageManifest};
pub use library_folders::parse_library_folders;
pub use text_block::{extract_all, extract_value};
