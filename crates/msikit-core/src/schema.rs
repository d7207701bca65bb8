//! The builtin installer table schema
//!
//! Every table the authoring engine writes is declared here with its typed,
//! keyed columns. Insert-time validation runs against these definitions;
//! unknown tables or columns are schema violations, never silently accepted.

use crate::value::Value;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Identifier or free text
    Text,
    /// 32-bit integer
    Integer,
    /// Embedded binary stream
    Stream,
}

impl ColumnKind {
    /// Whether a value is acceptable for this column type (ignoring nullability)
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Text, Value::Text(_))
                | (Self::Integer, Value::Int(_))
                | (Self::Stream, Value::Blob(_))
        )
    }
}

/// A single column declaration
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Part of the table's primary key
    pub key: bool,
    pub nullable: bool,
    /// Value must be unique across the table independently of the primary key
    pub unique: bool,
}

const fn key(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        key: true,
        nullable: false,
        unique: false,
    }
}

/// Key column that may be absent (the Upgrade table keys over nullable bounds)
const fn key_opt(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        key: true,
        nullable: true,
        unique: false,
    }
}

const fn req(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        key: false,
        nullable: false,
        unique: false,
    }
}

const fn opt(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        key: false,
        nullable: true,
        unique: false,
    }
}

const fn uniq(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        key: false,
        nullable: false,
        unique: true,
    }
}

/// A named table with its column layout
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// Column declaration by name
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns in declaration order
    pub fn key_columns(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|c| c.key)
    }

    /// Columns carrying a table-wide uniqueness constraint
    pub fn unique_columns(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|c| c.unique)
    }
}

use ColumnKind::{Integer, Stream, Text};

static BUILTIN: &[TableDef] = &[
    TableDef {
        name: "Property",
        columns: &[key("Property", Text), req("Value", Text)],
    },
    TableDef {
        name: "Directory",
        columns: &[
            key("Directory", Text),
            opt("Directory_Parent", Text),
            req("DefaultDir", Text),
        ],
    },
    TableDef {
        name: "Feature",
        columns: &[
            key("Feature", Text),
            opt("Feature_Parent", Text),
            opt("Title", Text),
            opt("Description", Text),
            opt("Display", Integer),
            req("Level", Integer),
            opt("Directory_", Text),
            req("Attributes", Integer),
        ],
    },
    TableDef {
        name: "Component",
        columns: &[
            key("Component", Text),
            req("ComponentId", Text),
            req("Directory_", Text),
            req("Attributes", Integer),
            opt("Condition", Text),
            opt("KeyPath", Text),
        ],
    },
    TableDef {
        name: "FeatureComponents",
        columns: &[key("Feature_", Text), key("Component_", Text)],
    },
    TableDef {
        name: "File",
        columns: &[
            key("File", Text),
            req("Component_", Text),
            req("FileName", Text),
            req("FileSize", Integer),
            opt("Version", Text),
            opt("Language", Text),
            opt("Attributes", Integer),
            req("Sequence", Integer),
        ],
    },
    TableDef {
        name: "Media",
        columns: &[
            key("DiskId", Integer),
            req("LastSequence", Integer),
            opt("DiskPrompt", Text),
            opt("Cabinet", Text),
            opt("VolumeLabel", Text),
            opt("Source", Text),
        ],
    },
    TableDef {
        name: "Binary",
        columns: &[key("Name", Text), req("Data", Stream)],
    },
    TableDef {
        name: "Icon",
        columns: &[key("Name", Text), req("Data", Stream)],
    },
    TableDef {
        name: "Shortcut",
        columns: &[
            key("Shortcut", Text),
            req("Directory_", Text),
            req("Name", Text),
            req("Component_", Text),
            req("Target", Text),
            opt("Arguments", Text),
            opt("Description", Text),
            opt("Icon_", Text),
            opt("IconIndex", Integer),
            opt("WkDir", Text),
        ],
    },
    TableDef {
        name: "ServiceInstall",
        columns: &[
            key("ServiceInstall", Text),
            req("Name", Text),
            opt("DisplayName", Text),
            req("ServiceType", Integer),
            req("StartType", Integer),
            req("ErrorControl", Integer),
            opt("LoadOrderGroup", Text),
            opt("Dependencies", Text),
            opt("StartName", Text),
            opt("Password", Text),
            opt("Arguments", Text),
            req("Component_", Text),
            opt("Description", Text),
        ],
    },
    TableDef {
        name: "CustomAction",
        columns: &[
            key("Action", Text),
            req("Type", Integer),
            opt("Source", Text),
            opt("Target", Text),
        ],
    },
    TableDef {
        name: "InstallExecuteSequence",
        columns: &[
            key("Action", Text),
            opt("Condition", Text),
            uniq("Sequence", Integer),
        ],
    },
    TableDef {
        name: "LaunchCondition",
        columns: &[key("Condition", Text), req("Description", Text)],
    },
    TableDef {
        name: "Upgrade",
        columns: &[
            key("UpgradeCode", Text),
            key_opt("VersionMin", Text),
            key_opt("VersionMax", Text),
            key_opt("Language", Text),
            key("Attributes", Integer),
            opt("Remove", Text),
            req("ActionProperty", Text),
        ],
    },
];

/// All builtin table definitions
pub fn builtin() -> &'static [TableDef] {
    BUILTIN
}

/// Look up a builtin table by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    BUILTIN.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_table() {
        let def = table("Directory").unwrap();
        assert_eq!(def.key_columns().count(), 1);
        assert!(def.column("DefaultDir").is_some());
        assert!(def.column("NoSuchColumn").is_none());
    }

    #[test]
    fn test_lookup_unknown_table() {
        assert!(table("Bogus").is_none());
    }

    #[test]
    fn test_sequence_table_unique_column() {
        let def = table("InstallExecuteSequence").unwrap();
        let unique: Vec<_> = def.unique_columns().map(|c| c.name).collect();
        assert_eq!(unique, vec!["Sequence"]);
    }

    #[test]
    fn test_upgrade_key_spans_bounds() {
        let def = table("Upgrade").unwrap();
        let keys: Vec<_> = def.key_columns().map(|c| c.name).collect();
        assert_eq!(
            keys,
            vec!["UpgradeCode", "VersionMin", "VersionMax", "Language", "Attributes"]
        );
    }

    #[test]
    fn test_column_kind_accepts() {
        assert!(ColumnKind::Text.accepts(&Value::Text("x".into())));
        assert!(!ColumnKind::Text.accepts(&Value::Int(1)));
        assert!(ColumnKind::Stream.accepts(&Value::Blob(vec![1])));
        assert!(!ColumnKind::Integer.accepts(&Value::Null));
    }
}
