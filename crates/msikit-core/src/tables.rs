//! Typed row structs for the builtin tables
//!
//! One plain struct per table, mirroring the installer column layout.
//! Optional columns are `Option<_>`; converting into a [`Row`] maps `None`
//! to `Null`. These are pure data carriers; all validation happens in the
//! store at insert time.

use crate::value::{Row, TableRow};
use uuid::Uuid;

/// Generate a fresh braced, uppercase GUID string
pub fn new_guid() -> String {
    format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase())
}

// Upgrade table attribute bits
pub const UPGRADE_ATTRIBUTES_MIGRATE_FEATURES: i32 = 0x001;
pub const UPGRADE_ATTRIBUTES_ONLY_DETECT: i32 = 0x002;
pub const UPGRADE_ATTRIBUTES_VERSION_MIN_INCLUSIVE: i32 = 0x100;
pub const UPGRADE_ATTRIBUTES_VERSION_MAX_INCLUSIVE: i32 = 0x200;

// Custom action base types and modifier flags
pub const CUSTOM_ACTION_TYPE_JSCRIPT: i32 = 5;
pub const CUSTOM_ACTION_TYPE_VBSCRIPT: i32 = 6;
/// Type 51: set the property named by `Source` to the literal in `Target`
pub const CUSTOM_ACTION_TYPE_PROPERTY: i32 = 51;
/// Queue the action into the deferred execution script
pub const CUSTOM_ACTION_TYPE_IN_SCRIPT: i32 = 1024;

// ServiceInstall fixed defaults
pub const SERVICE_WIN32_OWN_PROCESS: i32 = 0x10;
pub const SERVICE_AUTO_START: i32 = 2;
pub const SERVICE_ERROR_NORMAL: i32 = 1;

/// Runtime predicate: a fresh install that is not part of an upgrade or removal
pub const CONDITION_POST_CLEAN_INSTALL: &str = "NOT Installed AND NOT UPGRADE_FOUND AND NOT REMOVE";

#[derive(Debug, Clone, Default)]
pub struct Property {
    pub property: String,
    pub value: String,
}

impl TableRow for Property {
    const TABLE: &'static str = "Property";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Property", self.property)
            .set("Value", self.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub directory: String,
    pub directory_parent: Option<String>,
    pub default_dir: String,
}

impl TableRow for Directory {
    const TABLE: &'static str = "Directory";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Directory", self.directory)
            .set("Directory_Parent", self.directory_parent)
            .set("DefaultDir", self.default_dir)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Feature {
    pub feature: String,
    pub feature_parent: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub display: Option<i32>,
    pub level: i32,
    pub directory: Option<String>,
    pub attributes: i32,
}

impl TableRow for Feature {
    const TABLE: &'static str = "Feature";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Feature", self.feature)
            .set("Feature_Parent", self.feature_parent)
            .set("Title", self.title)
            .set("Description", self.description)
            .set("Display", self.display)
            .set("Level", self.level)
            .set("Directory_", self.directory)
            .set("Attributes", self.attributes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Component {
    pub component: String,
    pub component_id: String,
    pub directory: String,
    pub attributes: i32,
    pub condition: Option<String>,
    pub key_path: Option<String>,
}

impl TableRow for Component {
    const TABLE: &'static str = "Component";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Component", self.component)
            .set("ComponentId", self.component_id)
            .set("Directory_", self.directory)
            .set("Attributes", self.attributes)
            .set("Condition", self.condition)
            .set("KeyPath", self.key_path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureComponents {
    pub feature: String,
    pub component: String,
}

impl TableRow for FeatureComponents {
    const TABLE: &'static str = "FeatureComponents";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Feature_", self.feature)
            .set("Component_", self.component)
    }
}

#[derive(Debug, Clone, Default)]
pub struct File {
    pub file: String,
    pub component: String,
    pub file_name: String,
    pub file_size: i32,
    pub version: Option<String>,
    pub language: Option<String>,
    pub attributes: Option<i32>,
    pub sequence: i32,
}

impl TableRow for File {
    const TABLE: &'static str = "File";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("File", self.file)
            .set("Component_", self.component)
            .set("FileName", self.file_name)
            .set("FileSize", self.file_size)
            .set("Version", self.version)
            .set("Language", self.language)
            .set("Attributes", self.attributes)
            .set("Sequence", self.sequence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Media {
    pub disk_id: i32,
    pub last_sequence: i32,
    pub disk_prompt: Option<String>,
    pub cabinet: Option<String>,
    pub volume_label: Option<String>,
    pub source: Option<String>,
}

impl TableRow for Media {
    const TABLE: &'static str = "Media";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("DiskId", self.disk_id)
            .set("LastSequence", self.last_sequence)
            .set("DiskPrompt", self.disk_prompt)
            .set("Cabinet", self.cabinet)
            .set("VolumeLabel", self.volume_label)
            .set("Source", self.source)
    }
}

/// A named blob whose contents were read from disk at authoring time
#[derive(Debug, Clone, Default)]
pub struct Binary {
    pub name: String,
    pub data: Vec<u8>,
}

impl TableRow for Binary {
    const TABLE: &'static str = "Binary";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Name", self.name)
            .set("Data", self.data)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Icon {
    pub name: String,
    pub data: Vec<u8>,
}

impl TableRow for Icon {
    const TABLE: &'static str = "Icon";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Name", self.name)
            .set("Data", self.data)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Shortcut {
    pub shortcut: String,
    pub directory: String,
    pub name: String,
    pub component: String,
    pub target: String,
    pub arguments: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub icon_index: Option<i32>,
    pub wk_dir: Option<String>,
}

impl TableRow for Shortcut {
    const TABLE: &'static str = "Shortcut";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Shortcut", self.shortcut)
            .set("Directory_", self.directory)
            .set("Name", self.name)
            .set("Component_", self.component)
            .set("Target", self.target)
            .set("Arguments", self.arguments)
            .set("Description", self.description)
            .set("Icon_", self.icon)
            .set("IconIndex", self.icon_index)
            .set("WkDir", self.wk_dir)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceInstall {
    pub service_install: String,
    pub name: String,
    pub display_name: Option<String>,
    pub service_type: i32,
    pub start_type: i32,
    pub error_control: i32,
    pub load_order_group: Option<String>,
    pub dependencies: Option<String>,
    pub start_name: Option<String>,
    pub password: Option<String>,
    pub arguments: Option<String>,
    pub component: String,
    pub description: Option<String>,
}

impl TableRow for ServiceInstall {
    const TABLE: &'static str = "ServiceInstall";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("ServiceInstall", self.service_install)
            .set("Name", self.name)
            .set("DisplayName", self.display_name)
            .set("ServiceType", self.service_type)
            .set("StartType", self.start_type)
            .set("ErrorControl", self.error_control)
            .set("LoadOrderGroup", self.load_order_group)
            .set("Dependencies", self.dependencies)
            .set("StartName", self.start_name)
            .set("Password", self.password)
            .set("Arguments", self.arguments)
            .set("Component_", self.component)
            .set("Description", self.description)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomAction {
    pub action: String,
    pub action_type: i32,
    pub source: Option<String>,
    pub target: Option<String>,
}

impl TableRow for CustomAction {
    const TABLE: &'static str = "CustomAction";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Action", self.action)
            .set("Type", self.action_type)
            .set("Source", self.source)
            .set("Target", self.target)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallExecuteSequence {
    pub action: String,
    pub condition: Option<String>,
    pub sequence: i32,
}

impl TableRow for InstallExecuteSequence {
    const TABLE: &'static str = "InstallExecuteSequence";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Action", self.action)
            .set("Condition", self.condition)
            .set("Sequence", self.sequence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaunchCondition {
    pub condition: String,
    pub description: String,
}

impl TableRow for LaunchCondition {
    const TABLE: &'static str = "LaunchCondition";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("Condition", self.condition)
            .set("Description", self.description)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Upgrade {
    pub upgrade_code: String,
    pub version_min: Option<String>,
    pub version_max: Option<String>,
    pub language: Option<String>,
    pub attributes: i32,
    pub remove: Option<String>,
    pub action_property: String,
}

impl TableRow for Upgrade {
    const TABLE: &'static str = "Upgrade";

    fn into_row(self) -> Row {
        Row::new(Self::TABLE)
            .set("UpgradeCode", self.upgrade_code)
            .set("VersionMin", self.version_min)
            .set("VersionMax", self.version_max)
            .set("Language", self.language)
            .set("Attributes", self.attributes)
            .set("Remove", self.remove)
            .set("ActionProperty", self.action_property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::value::Value;

    #[test]
    fn test_new_guid_format() {
        let guid = new_guid();
        assert!(guid.starts_with('{') && guid.ends_with('}'));
        assert_eq!(guid.len(), 38);
        assert_eq!(guid, guid.to_uppercase());
    }

    #[test]
    fn test_optional_columns_become_null() {
        let row = Directory {
            directory: "TARGETDIR".into(),
            directory_parent: None,
            default_dir: "SourceDir".into(),
        }
        .into_row();
        assert_eq!(row.get("Directory_Parent"), Some(&Value::Null));
        assert_eq!(row.get("DefaultDir"), Some(&Value::Text("SourceDir".into())));
    }

    #[test]
    fn test_every_typed_row_matches_schema() {
        let rows: Vec<Row> = vec![
            Property::default().into_row(),
            Directory::default().into_row(),
            Feature::default().into_row(),
            Component::default().into_row(),
            FeatureComponents::default().into_row(),
            File::default().into_row(),
            Media::default().into_row(),
            Binary::default().into_row(),
            Icon::default().into_row(),
            Shortcut::default().into_row(),
            ServiceInstall::default().into_row(),
            CustomAction::default().into_row(),
            InstallExecuteSequence::default().into_row(),
            LaunchCondition::default().into_row(),
            Upgrade::default().into_row(),
        ];
        for row in rows {
            let def = schema::table(row.table()).expect("table declared in schema");
            for (name, _) in row.fields() {
                assert!(
                    def.column(name).is_some(),
                    "column {name} missing from {}",
                    def.name
                );
            }
        }
    }
}
