//! Conditional action sequencing
//!
//! Custom actions are rows in a sequence table: a unique name, a script
//! method, a fixed sequence position, and an opaque condition string the
//! installer runtime evaluates later. Deferred actions run at commit time;
//! each one that needs a parameter gets an immediate property-setting action
//! scheduled directly before it, so the deferred half always finds its data.

use std::path::{Path, PathBuf};

use tracing::debug;

use msikit_core::error::{Error, Result};
use msikit_core::tables::{
    Binary, CustomAction, Directory, Icon, InstallExecuteSequence, Shortcut,
    CONDITION_POST_CLEAN_INSTALL,
    CUSTOM_ACTION_TYPE_IN_SCRIPT, CUSTOM_ACTION_TYPE_JSCRIPT, CUSTOM_ACTION_TYPE_PROPERTY,
    CUSTOM_ACTION_TYPE_VBSCRIPT,
};
use msikit_core::{Row, TableRow};

use crate::author::{Author, Component};

// Scripted shortcut creation replaces the stock CreateShortcuts action with
// two deferred actions at fixed relative offsets.
const MENU_SHORTCUT_SEQUENCE: i32 = 4502;
const DESKTOP_SHORTCUT_SEQUENCE: i32 = 4504;

/// Post-install launch runs after the file-installation phase, just before
/// InstallFinalize (6600).
const LAUNCH_APP_SEQUENCE: i32 = 6590;

/// Script language of an embedded custom-action payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    VbScript,
    JScript,
}

impl ScriptKind {
    const fn action_type(self) -> i32 {
        match self {
            Self::VbScript => CUSTOM_ACTION_TYPE_VBSCRIPT,
            Self::JScript => CUSTOM_ACTION_TYPE_JSCRIPT,
        }
    }
}

/// An embedded script: a named Binary payload read from disk at insert time
#[derive(Debug, Clone)]
pub struct Script {
    pub binary_name: String,
    pub source: PathBuf,
    pub kind: ScriptKind,
}

impl Script {
    pub fn new(binary_name: impl Into<String>, source: impl Into<PathBuf>, kind: ScriptKind) -> Self {
        Self {
            binary_name: binary_name.into(),
            source: source.into(),
            kind,
        }
    }
}

/// One requested custom action backed by a script method
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub name: String,
    pub method: String,
    pub sequence: i32,
    pub deferred: bool,
    pub condition: Option<String>,
    pub parameter: String,
}

impl Author {
    /// Insert the script payload once, then one action row per request.
    ///
    /// Condition strings are stored verbatim; the engine guarantees only that
    /// the row is well-formed. A sequence collision fails that request with
    /// [`Error::DuplicateSequence`] and leaves earlier requests in place.
    pub fn add_script(&mut self, script: &Script, actions: &[ActionRequest]) -> Result<()> {
        self.insert_script_binary(script)?;
        for action in actions {
            self.insert_action(script, action)?;
        }
        Ok(())
    }

    /// Insert the script's Binary row, skipping when the payload is already
    /// present under the same name.
    fn insert_script_binary(&mut self, script: &Script) -> Result<()> {
        let existing = self
            .package()
            .query(Row::new("Binary").set("Name", script.binary_name.as_str()))?;
        if !existing.is_empty() {
            return Ok(());
        }
        let data = std::fs::read(&script.source)
            .map_err(|_| Error::file_not_found(script.source.display().to_string()))?;
        debug!(binary = %script.binary_name, bytes = data.len(), "embedding script payload");
        self.package_mut().insert([Binary {
            name: script.binary_name.clone(),
            data,
        }
        .into_row()])
    }

    fn insert_action(&mut self, script: &Script, action: &ActionRequest) -> Result<()> {
        if action.name.is_empty() {
            return Err(Error::validation("action name may not be empty"));
        }

        let mut action_type = script.kind.action_type();
        if action.deferred {
            action_type |= CUSTOM_ACTION_TYPE_IN_SCRIPT;
        }

        let mut rows = Vec::new();
        if action.deferred && !action.parameter.is_empty() {
            // The deferred script reads its parameter from the property named
            // after the action; set it with an immediate type-51 action
            // sequenced directly before.
            rows.push(
                CustomAction {
                    action: format!("Set{}", action.name),
                    action_type: CUSTOM_ACTION_TYPE_PROPERTY,
                    source: Some(action.name.clone()),
                    target: Some(action.parameter.clone()),
                }
                .into_row(),
            );
            rows.push(
                InstallExecuteSequence {
                    action: format!("Set{}", action.name),
                    condition: action.condition.clone(),
                    sequence: action.sequence - 1,
                }
                .into_row(),
            );
        }
        rows.push(
            CustomAction {
                action: action.name.clone(),
                action_type,
                source: Some(script.binary_name.clone()),
                target: Some(action.method.clone()),
            }
            .into_row(),
        );
        rows.push(
            InstallExecuteSequence {
                action: action.name.clone(),
                condition: action.condition.clone(),
                sequence: action.sequence,
            }
            .into_row(),
        );
        self.package_mut().insert(rows)?;
        debug!(action = %action.name, sequence = action.sequence, deferred = action.deferred, "sequenced action");
        Ok(())
    }

    /// Insert a named icon blob read from disk
    pub fn add_icon(&mut self, name: &str, source: &Path) -> Result<()> {
        let data = std::fs::read(source)
            .map_err(|_| Error::file_not_found(source.display().to_string()))?;
        self.package_mut().insert([Icon {
            name: name.to_string(),
            data,
        }
        .into_row()])
    }

    /// Insert a desktop shortcut to the component's key file
    pub fn add_desktop_shortcut(
        &mut self,
        name: &str,
        shortcut_id: &str,
        component: &Component,
        icon_name: &str,
    ) -> Result<()> {
        self.insert_shortcut(name, shortcut_id, "DesktopFolder", component, icon_name)
    }

    /// Insert a start-menu shortcut to the component's key file, placed in a
    /// per-product subfolder named `menu_folder` under the start menu.
    pub fn add_menu_shortcut(
        &mut self,
        name: &str,
        menu_folder: &str,
        shortcut_id: &str,
        component: &Component,
        icon_name: &str,
    ) -> Result<()> {
        let folder_id = self.ensure_menu_folder(menu_folder)?;
        self.insert_shortcut(name, shortcut_id, &folder_id, component, icon_name)
    }

    /// Insert the product's start-menu subfolder Directory row once; later
    /// calls reuse it regardless of the folder name they pass.
    fn ensure_menu_folder(&mut self, menu_folder: &str) -> Result<String> {
        const MENU_FOLDER_ID: &str = "ProductMenuFolder";
        let existing = self
            .package()
            .query(Row::new("Directory").set("Directory", MENU_FOLDER_ID))?;
        if existing.is_empty() {
            self.package_mut().insert([Directory {
                directory: MENU_FOLDER_ID.to_string(),
                directory_parent: Some("ProgramMenuFolder".to_string()),
                default_dir: menu_folder.to_string(),
            }
            .into_row()])?;
        }
        Ok(MENU_FOLDER_ID.to_string())
    }

    fn insert_shortcut(
        &mut self,
        name: &str,
        shortcut_id: &str,
        folder: &str,
        component: &Component,
        icon_name: &str,
    ) -> Result<()> {
        let key_file = component.key_file().ok_or_else(|| {
            Error::validation(format!(
                "component {} has no key file; add_component must run first",
                component.id()
            ))
        })?;
        self.package_mut().insert([Shortcut {
            shortcut: shortcut_id.to_string(),
            directory: folder.to_string(),
            name: name.to_string(),
            component: component.id().to_string(),
            target: format!("[{}]{key_file}", component.directory()),
            arguments: None,
            description: None,
            icon: Some(icon_name.to_string()),
            icon_index: None,
            wk_dir: Some(component.directory().to_string()),
        }
        .into_row()])
    }

    /// Replace stock shortcut creation with two deferred script actions.
    ///
    /// The conditions cover a fresh install as well as "the shortcut existed
    /// before an upgrade removed it", so shortcuts come back after upgrades.
    pub fn script_shortcut_creation(
        &mut self,
        script: &Script,
        component: &Component,
        target_file: &str,
        shortcut_name: &str,
        menu_folder: &str,
    ) -> Result<()> {
        // The stock action would duplicate what the script does; dropping it
        // is a documented no-op when the sequence never carried it.
        self.package_mut()
            .delete(Row::new("InstallExecuteSequence").set("Action", "CreateShortcuts"))?;

        let directory = component.directory().to_string();
        let actions = [
            ActionRequest {
                name: "CreateMenuShortcut".to_string(),
                method: "CreateShortcut".to_string(),
                sequence: MENU_SHORTCUT_SEQUENCE,
                deferred: true,
                condition: Some(format!(
                    "NOT NO_SHORTCUT AND (({CONDITION_POST_CLEAN_INSTALL}) OR (STARTMENU_SHORTCUT_EXIST AND UPGRADE_FOUND))"
                )),
                parameter: format!(
                    "[ProgramMenuFolder]{menu_folder}\n{shortcut_name}\n[{directory}]{target_file}\n[{directory}]"
                ),
            },
            ActionRequest {
                name: "CreateDesktopShortcut".to_string(),
                method: "CreateShortcut".to_string(),
                sequence: DESKTOP_SHORTCUT_SEQUENCE,
                deferred: true,
                condition: Some(format!(
                    "NOT NO_SHORTCUT AND (({CONDITION_POST_CLEAN_INSTALL}) OR (DESKTOP_SHORTCUT_EXIST AND UPGRADE_FOUND))"
                )),
                parameter: format!(
                    "[DesktopFolder]\n{shortcut_name}\n[{directory}]{target_file}\n[{directory}]"
                ),
            },
        ];
        self.add_script(script, &actions)
    }

    /// Schedule a single deferred action that launches the installed
    /// executable once files are on disk, on a successful non-remove install.
    pub fn launch_app_post_install(
        &mut self,
        script: &Script,
        component: &Component,
        exe_name: &str,
    ) -> Result<()> {
        let action = ActionRequest {
            name: "LaunchApp".to_string(),
            method: "LaunchApplication".to_string(),
            sequence: LAUNCH_APP_SEQUENCE,
            deferred: true,
            condition: Some("NOT Installed AND NOT REMOVE".to_string()),
            parameter: format!("[{}]{exe_name}", component.directory()),
        };
        self.add_script(script, std::slice::from_ref(&action))
    }
}
