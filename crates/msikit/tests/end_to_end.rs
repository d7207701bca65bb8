//! End-to-end authoring test
//!
//! Authors a complete product through the engine crates the same way the
//! build command does, commits, reopens the artifact read-only, and checks
//! every piece landed: feature, component, upgrade guards, deferred launch
//! action, and the cabinet media row.

use std::fs;

use tempfile::TempDir;

use msikit_author::{Author, Component, DirectoryTree, Script, ScriptKind};
use msikit_core::summary::{new_revision_token, SummaryPid, SummaryValue};
use msikit_core::tables::{new_guid, Feature, Property};
use msikit_core::{OpenMode, Package, Row, TableRow};

const UPGRADE_CODE: &str = "{7325E7C4-20B5-4E5F-9B1B-0A11D6EAC8F5}";

#[test]
fn test_author_commit_reopen_full_product() {
    let dir = TempDir::new().unwrap();
    let package_path = dir.path().join("product.msi");

    let source_dir = dir.path().join("resource");
    fs::create_dir_all(&source_dir).unwrap();
    fs::write(source_dir.join("service.exe"), b"service payload").unwrap();
    let script_path = dir.path().join("builtin.vbs");
    fs::write(&script_path, b"Function LaunchApplication()\nEnd Function\n").unwrap();

    // Author the product.
    let mut package = Package::create(&package_path);

    let mut summary = package.open_summary_information(1252);
    summary.set_property(SummaryPid::Subject, "Example Product");
    summary.set_property(SummaryPid::Author, "example");
    summary.set_property(SummaryPid::RevisionNumber, new_revision_token());
    package.persist_summary(summary).unwrap();

    package
        .insert([
            Property {
                property: "ProductName".into(),
                value: "Example Product".into(),
            },
            Property {
                property: "ProductVersion".into(),
                value: "1.0.0".into(),
            },
            Property {
                property: "ProductCode".into(),
                value: new_guid(),
            },
            Property {
                property: "UpgradeCode".into(),
                value: UPGRADE_CODE.into(),
            },
        ])
        .unwrap();

    let mut author = Author::new(package, UPGRADE_CODE);
    let tree = DirectoryTree::new("TARGETDIR", "SourceDir").with_child(
        DirectoryTree::new("ProgramFilesFolder", ".")
            .with_child(DirectoryTree::new("INSTALLDIR", "Example")),
    );
    assert_eq!(author.insert_directories(&tree).unwrap(), 3);

    author
        .package_mut()
        .insert([Feature {
            feature: "main".into(),
            feature_parent: None,
            title: Some("main title".into()),
            description: None,
            display: Some(2),
            level: 1,
            directory: Some("INSTALLDIR".into()),
            attributes: 0,
        }
        .into_row()])
        .unwrap();

    author.block_old_version("1.0.0").unwrap();

    let mut component = Component::new("main", new_guid(), "service", "INSTALLDIR");
    author
        .add_component(&mut component, &source_dir, "service.exe")
        .unwrap();
    author
        .add_service("ExampleService", "example service", &component)
        .unwrap();

    let script = Script::new("BIN_BUILTIN", &script_path, ScriptKind::VbScript);
    author
        .launch_app_post_install(&script, &component, "service.exe")
        .unwrap();

    let mut package = author.into_package();
    msikit_packer::pack_files(&mut package, "cabinet.cab", "cabinet", &[&component]).unwrap();
    package.commit().unwrap();

    // Reopen and verify everything landed.
    let reopened = Package::open(&package_path, OpenMode::ReadOnly).unwrap();

    let features = reopened.rows("Feature").unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].get("Feature").unwrap().as_text(), Some("main"));

    let components = reopened.rows("Component").unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(
        components[0].get("KeyPath").unwrap().as_text(),
        Some("service")
    );

    let launch_conditions = reopened.rows("LaunchCondition").unwrap();
    assert_eq!(launch_conditions.len(), 1);
    assert_eq!(
        launch_conditions[0].get("Condition").unwrap().as_text(),
        Some("NOT NEWER_VERSION_FOUND")
    );

    let launch_actions = reopened
        .query(Row::new("CustomAction").set("Action", "LaunchApp"))
        .unwrap();
    assert_eq!(launch_actions.len(), 1);
    let action_type = launch_actions[0].get("Type").unwrap().as_int().unwrap();
    assert_eq!(action_type & 1024, 1024, "LaunchApp must be deferred");

    let media = reopened.rows("Media").unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(
        media[0].get("Cabinet").unwrap().as_text(),
        Some("cabinet.cab")
    );
    assert!(dir.path().join("cabinet.cab").exists());

    let summary = reopened.open_summary_information(1252);
    assert_eq!(
        summary.property(SummaryPid::Subject),
        Some(&SummaryValue::Text("Example Product".into()))
    );
    assert!(matches!(
        summary.property(SummaryPid::RevisionNumber),
        Some(SummaryValue::Text(_))
    ));

    // The packed file got its sequence assigned inside the media range.
    let files = reopened.rows("File").unwrap();
    assert_eq!(files.len(), 1);
    let sequence = files[0].get("Sequence").unwrap().as_int().unwrap();
    let last = media[0].get("LastSequence").unwrap().as_int().unwrap();
    assert!(sequence >= 1 && sequence <= last);

    // Upgrade guards: two rows against the shared upgrade code.
    let upgrades = reopened
        .query(Row::new("Upgrade").set("UpgradeCode", UPGRADE_CODE))
        .unwrap();
    assert_eq!(upgrades.len(), 2);
    let properties: Vec<_> = upgrades
        .iter()
        .map(|row| row.get("ActionProperty").unwrap().as_text().unwrap())
        .collect();
    assert!(properties.contains(&"OLDER_VERSION_FOUND"));
    assert!(properties.contains(&"NEWER_VERSION_FOUND"));
}
