//! Upgrade detection and blocking
//!
//! One guard pair per authoring session: a search for older installs of the
//! same upgrade code (migrated away before files land) and a detect-only
//! search for newer ones (install aborts via launch condition). Versions
//! compare field-wise numerically, never lexicographically.

use semver::Version;
use tracing::info;

use msikit_core::error::{Error, Result};
use msikit_core::tables::{
    InstallExecuteSequence, LaunchCondition, Upgrade, UPGRADE_ATTRIBUTES_ONLY_DETECT,
};
use msikit_core::{Row, TableRow, Value};

use crate::author::Author;

/// Property set when an older install of the same product is found
pub const OLDER_VERSION_PROPERTY: &str = "OLDER_VERSION_FOUND";

/// Property set when a newer install of the same product is found
pub const NEWER_VERSION_PROPERTY: &str = "NEWER_VERSION_FOUND";

/// Sequence position for removing the older product, strictly before the
/// file-installation phase (InstallFiles sits at 4000).
const REMOVE_EXISTING_PRODUCTS_SEQUENCE: i32 = 1525;

/// An installed product as the related-products scan would see it
#[derive(Debug, Clone)]
pub struct InstalledProduct {
    pub upgrade_code: String,
    pub version: String,
}

impl InstalledProduct {
    pub fn new(upgrade_code: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            upgrade_code: upgrade_code.into(),
            version: version.into(),
        }
    }
}

/// Outcome of applying the inserted upgrade guards to a machine state
#[derive(Debug, Clone, Default)]
pub struct UpgradeScan {
    properties: Vec<String>,
}

impl UpgradeScan {
    /// Whether the scan set the named action property
    pub fn property_set(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.as_str() == name)
    }

    /// An older install of the same product was found
    pub fn older_found(&self) -> bool {
        self.property_set(OLDER_VERSION_PROPERTY)
    }

    /// A newer install of the same product was found
    pub fn newer_found(&self) -> bool {
        self.property_set(NEWER_VERSION_PROPERTY)
    }
}

impl Author {
    /// Insert the upgrade guards for this product version.
    ///
    /// Two Upgrade rows are written against the session's upgrade code: one
    /// matching strictly older versions into [`OLDER_VERSION_PROPERTY`], one
    /// detect-only matching strictly newer versions into
    /// [`NEWER_VERSION_PROPERTY`]. A launch condition aborts installation
    /// when the newer guard fires, and removal of the older product is
    /// scheduled before the file-installation phase. An identical installed
    /// version matches neither bound; that is the repair path, and the
    /// guards take no action.
    pub fn block_old_version(&mut self, current_version: &str) -> Result<()> {
        let current = parse_version(current_version)?;
        let upgrade_code = self.upgrade_code().to_string();

        self.package_mut().insert([
            Upgrade {
                upgrade_code: upgrade_code.clone(),
                version_min: None,
                version_max: Some(current.to_string()),
                language: None,
                attributes: 0,
                remove: None,
                action_property: OLDER_VERSION_PROPERTY.to_string(),
            }
            .into_row(),
            Upgrade {
                upgrade_code: upgrade_code.clone(),
                version_min: Some(current.to_string()),
                version_max: None,
                language: None,
                attributes: UPGRADE_ATTRIBUTES_ONLY_DETECT,
                remove: None,
                action_property: NEWER_VERSION_PROPERTY.to_string(),
            }
            .into_row(),
            LaunchCondition {
                condition: format!("NOT {NEWER_VERSION_PROPERTY}"),
                description: "A newer version of this product is already installed.".to_string(),
            }
            .into_row(),
            InstallExecuteSequence {
                action: "RemoveExistingProducts".to_string(),
                condition: Some(OLDER_VERSION_PROPERTY.to_string()),
                sequence: REMOVE_EXISTING_PRODUCTS_SEQUENCE,
            }
            .into_row(),
        ])?;

        info!(upgrade_code = %upgrade_code, version = %current, "upgrade guards inserted");
        Ok(())
    }

    /// Apply the inserted Upgrade rows to a simulated machine state,
    /// reporting which action properties a related-products search would set.
    pub fn scan_related_products(&self, installed: &[InstalledProduct]) -> Result<UpgradeScan> {
        let mut scan = UpgradeScan::default();
        for row in self.package().rows("Upgrade")? {
            let code = text_field(row, "UpgradeCode")?;
            let min = optional_text(row, "VersionMin");
            let max = optional_text(row, "VersionMax");
            let property = text_field(row, "ActionProperty")?;

            for product in installed {
                if product.upgrade_code != code {
                    continue;
                }
                let version = parse_version(&product.version)?;
                // Bounds are exclusive unless an inclusivity attribute says
                // otherwise; the guards written here never set those bits.
                if let Some(min) = min {
                    if version <= parse_version(min)? {
                        continue;
                    }
                }
                if let Some(max) = max {
                    if version >= parse_version(max)? {
                        continue;
                    }
                }
                if !scan.properties.iter().any(|p| p.as_str() == property) {
                    scan.properties.push(property.to_string());
                }
            }
        }
        Ok(scan)
    }

    /// Whether a generated launch condition aborts the install under the
    /// given scan outcome.
    ///
    /// Conditions are opaque to the engine; only the `NOT <PROPERTY>` form
    /// that [`Author::block_old_version`] generates is recognized here.
    pub fn install_blocked(&self, scan: &UpgradeScan) -> Result<bool> {
        for row in self.package().rows("LaunchCondition")? {
            let condition = text_field(row, "Condition")?;
            if let Some(property) = condition.strip_prefix("NOT ") {
                if scan.property_set(property.trim()) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version)
        .map_err(|e| Error::validation(format!("invalid version {version}: {e}")))
}

fn text_field<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    row.get(column)
        .and_then(Value::as_text)
        .ok_or_else(|| Error::schema(format!("missing text column {column}")))
}

fn optional_text<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_text)
}
