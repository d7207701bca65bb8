//! # msikit-author
//!
//! Authoring layer over the msikit table store providing:
//! - Directory-tree serialization into flat Directory rows
//! - Component/feature binding with key-path file metadata
//! - Upgrade detection and blocking against the product's upgrade code
//! - Conditional custom-action sequencing, shortcuts, and post-install launch

pub mod author;
pub mod directories;
pub mod sequence;
pub mod upgrade;

pub use author::{Author, Component};
pub use directories::{serialize_directories, DirectoryTree};
pub use sequence::{ActionRequest, Script, ScriptKind};
pub use upgrade::{
    InstalledProduct, UpgradeScan, NEWER_VERSION_PROPERTY, OLDER_VERSION_PROPERTY,
};
