//! Component and feature binding
//!
//! [`Author`] wraps the open package handle together with the product's
//! upgrade code and carries the binder, upgrade-guard, and sequencer
//! operations. Components are the atomic install/uninstall unit: one owning
//! directory, one key-path file, and at least one feature association.

use std::path::{Path, PathBuf};

use tracing::debug;

use msikit_core::error::{Error, Result};
use msikit_core::tables::{
    self, FeatureComponents, File, ServiceInstall, SERVICE_AUTO_START, SERVICE_ERROR_NORMAL,
    SERVICE_WIN32_OWN_PROCESS,
};
use msikit_core::{Package, TableRow};

use crate::directories::{serialize_directories, DirectoryTree};

/// A component under construction: the identifier doubles as the key-path
/// file token, and the source directory is remembered at add time so the
/// packager can find the payload later.
#[derive(Debug, Clone)]
pub struct Component {
    feature: String,
    guid: String,
    key: String,
    directory: String,
    key_file: Option<String>,
    source_dir: Option<PathBuf>,
}

impl Component {
    /// Pure construction; nothing is inserted until
    /// [`Author::add_component`].
    ///
    /// `guid` must be globally unique and stable across versions of the same
    /// product. `key` names both the component and its key-path file row.
    pub fn new(
        feature_id: impl Into<String>,
        guid: impl Into<String>,
        key: impl Into<String>,
        directory_id: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature_id.into(),
            guid: guid.into(),
            key: key.into(),
            directory: directory_id.into(),
            key_file: None,
            source_dir: None,
        }
    }

    /// The component identifier (also the key-path file token)
    pub fn id(&self) -> &str {
        &self.key
    }

    /// The owning directory identifier
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// The feature this component was created under
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// The key-path file name, set once the component has been added
    pub fn key_file(&self) -> Option<&str> {
        self.key_file.as_deref()
    }

    /// Where the component's payload files live on disk
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }
}

/// One product authoring session over an open package
#[derive(Debug)]
pub struct Author {
    package: Package,
    upgrade_code: String,
}

impl Author {
    /// Wrap an open package handle with the product's upgrade code
    pub fn new(package: Package, upgrade_code: impl Into<String>) -> Self {
        Self {
            package,
            upgrade_code: upgrade_code.into(),
        }
    }

    /// The stable identifier shared by all versions of this product
    pub fn upgrade_code(&self) -> &str {
        &self.upgrade_code
    }

    /// Read access to the underlying package
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Write access for raw row operations the helpers do not cover
    pub fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    /// Give the package handle back, discarding the authoring wrapper
    pub fn into_package(self) -> Package {
        self.package
    }

    /// Commit the whole session
    pub fn commit(mut self) -> Result<Package> {
        self.package.commit()?;
        Ok(self.package)
    }

    /// Serialize a directory tree and batch-insert the rows.
    ///
    /// Returns the number of Directory rows inserted.
    pub fn insert_directories(&mut self, root: &DirectoryTree) -> Result<usize> {
        let rows = serialize_directories(root).collect::<Result<Vec<_>>>()?;
        let count = rows.len();
        self.package.insert(rows)?;
        debug!(count, root = %root.id, "inserted directory rows");
        Ok(count)
    }

    /// Insert the component, its key-path File row, and the feature
    /// association.
    ///
    /// The key file's size is read from `source_dir/key_file`; a missing
    /// source fails with [`Error::FileNotFound`] before any row lands.
    pub fn add_component(
        &mut self,
        component: &mut Component,
        source_dir: &Path,
        key_file: &str,
    ) -> Result<()> {
        let source = source_dir.join(key_file);
        let meta = std::fs::metadata(&source)
            .map_err(|_| Error::file_not_found(source.display().to_string()))?;
        if !meta.is_file() {
            return Err(Error::file_not_found(source.display().to_string()));
        }
        let file_size = i32::try_from(meta.len())
            .map_err(|_| Error::validation(format!("{key_file} exceeds the 2 GiB file limit")))?;

        // One batch: either the component lands with its key file and
        // feature association, or nothing does.
        self.package.insert([
            tables::Component {
                component: component.key.clone(),
                component_id: component.guid.clone(),
                directory: component.directory.clone(),
                attributes: 0,
                condition: None,
                key_path: Some(component.key.clone()),
            }
            .into_row(),
            File {
                file: component.key.clone(),
                component: component.key.clone(),
                file_name: key_file.to_string(),
                file_size,
                version: None,
                language: None,
                attributes: None,
                // Assigned when the cabinet is packed.
                sequence: 0,
            }
            .into_row(),
            FeatureComponents {
                feature: component.feature.clone(),
                component: component.key.clone(),
            }
            .into_row(),
        ])?;

        component.key_file = Some(key_file.to_string());
        component.source_dir = Some(source_dir.to_path_buf());
        debug!(component = %component.key, key_file, "added component");
        Ok(())
    }

    /// Insert a Windows service installation row tied to the component's key
    /// file, with auto-start and normal error control defaults.
    ///
    /// Fails with [`Error::Validation`] when the component has not been given
    /// a key file yet.
    pub fn add_service(
        &mut self,
        name: &str,
        description: &str,
        component: &Component,
    ) -> Result<()> {
        if component.key_file.is_none() {
            return Err(Error::validation(format!(
                "component {} has no key file; add_component must run first",
                component.key
            )));
        }

        self.package.insert([ServiceInstall {
            service_install: name.to_string(),
            name: name.to_string(),
            display_name: Some(name.to_string()),
            service_type: SERVICE_WIN32_OWN_PROCESS,
            start_type: SERVICE_AUTO_START,
            error_control: SERVICE_ERROR_NORMAL,
            load_order_group: None,
            dependencies: None,
            start_name: None,
            password: None,
            arguments: None,
            component: component.key.clone(),
            description: Some(description.to_string()),
        }
        .into_row()])?;
        debug!(service = name, component = %component.key, "added service install");
        Ok(())
    }
}
