//! Build command: author a complete package
//!
//! Thin orchestration over the engine crates. Fail-fast: the first engine
//! error aborts the build with context, and since commit is all-or-nothing
//! an aborted build leaves no partially written artifact behind.

use anyhow::{Context, Result};
use tracing::info;

use msikit_author::{Author, Component, DirectoryTree, Script, ScriptKind};
use msikit_core::summary::{new_revision_token, SummaryPid};
use msikit_core::tables::{new_guid, Feature, Property};
use msikit_core::{Package, TableRow};

use crate::cli::BuildArgs;

const INSTALL_DIR: &str = "INSTALLDIR";
const FEATURE_ID: &str = "main";
const SCRIPT_BINARY_NAME: &str = "BIN_BUILTIN";
const CABINET_NAME: &str = "cabinet.cab";
const CABINET_TAG: &str = "cabinet";

pub fn run(args: BuildArgs) -> Result<()> {
    let upgrade_code = args.upgrade_code.clone().unwrap_or_else(new_guid);
    info!(output = %args.output.display(), product = %args.product_name, "authoring package");

    let mut package = Package::create(&args.output);
    write_summary(&mut package, &args)?;
    write_product_properties(&mut package, &args, &upgrade_code)?;

    let mut author = Author::new(package, &upgrade_code);
    author
        .insert_directories(&directory_layout(&args.product_name))
        .context("serializing directory layout")?;
    author
        .package_mut()
        .insert([Feature {
            feature: FEATURE_ID.to_string(),
            feature_parent: None,
            title: Some(args.product_name.clone()),
            description: None,
            display: Some(2),
            level: 1,
            directory: Some(INSTALL_DIR.to_string()),
            attributes: 0,
        }
        .into_row()])
        .context("inserting feature")?;

    author
        .block_old_version(&args.product_version)
        .context("inserting upgrade guards")?;

    let mut component = Component::new(FEATURE_ID, new_guid(), "service", INSTALL_DIR);
    author
        .add_component(&mut component, &args.source_dir, &args.key_file)
        .with_context(|| format!("adding component for {}", args.key_file))?;

    if let Some(service_name) = &args.service_name {
        author
            .add_service(service_name, &args.product_name, &component)
            .with_context(|| format!("registering service {service_name}"))?;
    }

    if let Some(script_path) = &args.script {
        let script = Script::new(SCRIPT_BINARY_NAME, script_path, ScriptKind::VbScript);
        if let Some(icon_path) = &args.icon {
            author.add_icon("icon.ico", icon_path).context("embedding icon")?;
            author
                .add_desktop_shortcut(&args.product_name, &new_guid(), &component, "icon.ico")
                .context("adding desktop shortcut")?;
            author
                .add_menu_shortcut(
                    &args.product_name,
                    &args.product_name,
                    &new_guid(),
                    &component,
                    "icon.ico",
                )
                .context("adding menu shortcut")?;
            author
                .script_shortcut_creation(
                    &script,
                    &component,
                    &args.key_file,
                    &args.product_name,
                    &args.product_name,
                )
                .context("scripting shortcut creation")?;
        }
        author
            .launch_app_post_install(&script, &component, &args.key_file)
            .context("scheduling post-install launch")?;
    }

    let mut package = author.into_package();
    msikit_packer::pack_files(&mut package, CABINET_NAME, CABINET_TAG, &[&component])
        .context("packing cabinet")?;

    package.commit().context("committing package")?;
    info!(output = %args.output.display(), "package committed");
    Ok(())
}

fn directory_layout(product_name: &str) -> DirectoryTree {
    DirectoryTree::new("TARGETDIR", "SourceDir").with_child(
        DirectoryTree::new("ProgramFilesFolder", ".")
            .with_child(DirectoryTree::new(INSTALL_DIR, product_name)),
    )
}

fn write_summary(package: &mut Package, args: &BuildArgs) -> Result<()> {
    let mut summary = package.open_summary_information(1252);
    summary.set_property(SummaryPid::Subject, args.product_name.as_str());
    summary.set_property(SummaryPid::Author, args.manufacturer.as_str());
    summary.set_property(SummaryPid::Title, "Installation Database");
    summary.set_property(SummaryPid::Comments, args.product_name.as_str());
    summary.set_property(SummaryPid::Keywords, "Installer");
    let template = if args.arch == "x64" { "x64;" } else { "Intel;" };
    summary.set_property(SummaryPid::Template, template);
    summary.set_property(SummaryPid::WordCount, 2);
    summary.set_property(SummaryPid::PageCount, 200);
    summary.set_property(SummaryPid::RevisionNumber, new_revision_token());
    package
        .persist_summary(summary)
        .context("persisting summary information")
}

fn write_product_properties(
    package: &mut Package,
    args: &BuildArgs,
    upgrade_code: &str,
) -> Result<()> {
    package
        .insert([
            Property {
                property: "Manufacturer".to_string(),
                value: args.manufacturer.clone(),
            },
            Property {
                property: "UpgradeCode".to_string(),
                value: upgrade_code.to_string(),
            },
            Property {
                property: "ProductName".to_string(),
                value: args.product_name.clone(),
            },
            Property {
                property: "ProductVersion".to_string(),
                value: args.product_version.clone(),
            },
            Property {
                property: "ProductCode".to_string(),
                value: new_guid(),
            },
        ])
        .context("inserting product properties")
}
