/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::registry
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Interface with the platform package manager to enumerate
    installed packages, load their icons, and trigger launch
    and uninstall flows.

  Security / Safety Notes:
    Package identifiers are validated before they reach a
    command line. Commands run with the privileges of the
    configured shell prefix only.

  Dependencies:
    std::process for blocking command execution, chrono for
    install-time parsing.

  Operational Scope:
    Supplies the inventory builder with descriptors and the
    bridge with opaque launch/uninstall actions.

  Revision History:
    2026-10-19 COD  Crafted package manager integration layer.
    2026-10-19 COD  Packages uninstalled for the configured user
                    are dropped.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Structured parsing with clear failure modes
    - Reusable helpers for external command diagnostics
============================================================*/

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use chrono::NaiveDateTime;

use crate::apk::load_apk_icon;
use crate::config::DeviceConfig;
use crate::error::{AppListError, Result};
use crate::icon::IconSource;
use crate::package_info::{PackageDescriptor, PackageFlags};

const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";
const DELETE_ACTION: &str = "android.intent.action.DELETE";
const INSTALL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of installed-package metadata and icons.
pub trait PackageRegistry: Send + Sync {
    /// Every installed package, in the platform's enumeration order.
    fn installed_packages(&self) -> Result<Vec<PackageDescriptor>>;

    /// The package's launcher icon in whatever form the platform has it.
    fn load_icon(&self, package: &PackageDescriptor) -> Result<IconSource>;
}

/// Result of asking the platform to launch a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started,
    /// The package has no launcher entry point; nothing was started.
    NoLaunchEntry,
}

/// Opaque user-facing platform actions.
pub trait PlatformActions: Send + Sync {
    fn launch(&self, package_id: &str) -> Result<LaunchOutcome>;

    /// Start the platform's uninstall confirmation flow. Returns once the
    /// flow has been initiated; the user's decision is not observed.
    fn uninstall(&self, package_id: &str) -> Result<()>;
}

/// Registry backed by `dumpsys`, `cmd` and `am` on the device shell.
///
/// `dumpsys` carries no application label, so descriptors from this
/// registry use the package id as their label and `appName` will
/// usually equal `packageName`. Only packages installed for
/// `device.user_id` are listed.
#[derive(Debug, Clone)]
pub struct ShellRegistry {
    device: DeviceConfig,
}

impl ShellRegistry {
    pub fn new(device: DeviceConfig) -> Self {
        Self { device }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        let mut command = match self.device.shell_prefix.split_first() {
            Some((wrapper, wrapper_args)) => {
                let mut command = Command::new(wrapper);
                command.args(wrapper_args).arg(&command_line);
                command
            }
            None => {
                let mut command = Command::new(program);
                command.args(args);
                command
            }
        };
        let spawned = self
            .device
            .shell_prefix
            .first()
            .map_or(program, String::as_str);

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| map_spawn_error(err, spawned))?;

        if !output.status.success() {
            return Err(AppListError::CommandFailure {
                command: command_line,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|err| {
            AppListError::Serialization(format!("{command_line} emitted invalid UTF-8: {err}"))
        })
    }
}

impl PackageRegistry for ShellRegistry {
    fn installed_packages(&self) -> Result<Vec<PackageDescriptor>> {
        let stdout = self
            .run(&self.device.dumpsys_command, &["package", "packages"])
            .map_err(|err| AppListError::RegistryUnavailable(err.to_string()))?;
        let packages = parse_dumpsys_packages_for_user(&stdout, self.device.user_id);
        if packages.is_empty() {
            return Err(AppListError::RegistryUnavailable(
                "dumpsys reported no packages".into(),
            ));
        }
        Ok(packages)
    }

    fn load_icon(&self, package: &PackageDescriptor) -> Result<IconSource> {
        load_apk_icon(&package.apk_path)
    }
}

impl PlatformActions for ShellRegistry {
    fn launch(&self, package_id: &str) -> Result<LaunchOutcome> {
        validate_package_id(package_id)?;
        let stdout = self.run(
            &self.device.cmd_command,
            &[
                "package",
                "resolve-activity",
                "--brief",
                "-c",
                LAUNCHER_CATEGORY,
                package_id,
            ],
        )?;

        let Some(component) = parse_resolved_component(&stdout) else {
            return Ok(LaunchOutcome::NoLaunchEntry);
        };
        let started = self.run(&self.device.am_command, &["start", "-n", &component])?;
        ensure_am_started(&started, &component)?;
        Ok(LaunchOutcome::Started)
    }

    fn uninstall(&self, package_id: &str) -> Result<()> {
        validate_package_id(package_id)?;
        let target = format!("package:{package_id}");
        let started = self.run(
            &self.device.am_command,
            &["start", "-a", DELETE_ACTION, "-d", &target],
        )?;
        ensure_am_started(&started, &target)
    }
}

/// Reject identifiers that are not plain Java-style package names.
pub fn validate_package_id(package_id: &str) -> Result<()> {
    let well_formed = !package_id.is_empty()
        && package_id.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if well_formed {
        Ok(())
    } else {
        Err(AppListError::InvalidArgument(format!(
            "`{package_id}` is not a valid package name"
        )))
    }
}

/// Parse the `Packages:` section of `dumpsys package packages` for user 0.
pub fn parse_dumpsys_packages(stdout: &str) -> Vec<PackageDescriptor> {
    parse_dumpsys_packages_for_user(stdout, 0)
}

/// Parse the `Packages:` section, dropping packages whose `User N:` line
/// reports `installed=false` for `user_id`.
pub fn parse_dumpsys_packages_for_user(stdout: &str, user_id: u32) -> Vec<PackageDescriptor> {
    let mut packages = Vec::new();
    let mut in_section = false;
    let mut current: Option<DumpsysBlock> = None;

    for line in stdout.lines() {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if indent == 0 {
            if let Some(block) = current.take() {
                block.finish_into(&mut packages);
            }
            in_section = trimmed == "Packages:";
            continue;
        }
        if !in_section {
            continue;
        }

        if let Some(package_id) = package_header(trimmed) {
            if let Some(block) = current.take() {
                block.finish_into(&mut packages);
            }
            current = Some(DumpsysBlock::new(package_id, indent, user_id));
            continue;
        }

        if let Some(block) = current.as_mut() {
            block.absorb(indent, trimmed);
        }
    }

    if let Some(block) = current.take() {
        block.finish_into(&mut packages);
    }
    packages
}

fn package_header(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix("Package [")?;
    let (package_id, _) = rest.split_once(']')?;
    Some(package_id)
}

#[derive(Debug)]
struct DumpsysBlock {
    package_id: String,
    header_indent: usize,
    version_name: Option<String>,
    first_install_time: i64,
    flags: PackageFlags,
    code_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    permissions: Vec<String>,
    /// Indent of the `requested permissions:` label while inside that list.
    permission_indent: Option<usize>,
    user_id: u32,
    /// `installed=` from the `User N:` line matching `user_id`.
    installed: Option<bool>,
}

impl DumpsysBlock {
    fn new(package_id: &str, header_indent: usize, user_id: u32) -> Self {
        Self {
            package_id: package_id.to_string(),
            header_indent,
            version_name: None,
            first_install_time: 0,
            flags: PackageFlags::default(),
            code_path: None,
            data_dir: None,
            permissions: Vec::new(),
            permission_indent: None,
            user_id,
            installed: None,
        }
    }

    fn absorb(&mut self, indent: usize, trimmed: &str) {
        if indent <= self.header_indent {
            return;
        }
        if let Some(label_indent) = self.permission_indent {
            if indent > label_indent {
                let name = trimmed.split(':').next().unwrap_or(trimmed).trim();
                self.permissions.push(name.to_string());
                return;
            }
            self.permission_indent = None;
        }
        if trimmed == "requested permissions:" {
            self.permission_indent = Some(indent);
            return;
        }
        if let Some(state) = trimmed.strip_prefix("User ") {
            self.absorb_user_state(state);
            return;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            return;
        };
        let value = value.trim();
        match key.trim() {
            "versionName" => self.version_name = Some(value.to_string()),
            "firstInstallTime" => self.first_install_time = parse_install_time(value),
            "codePath" => self.code_path = Some(PathBuf::from(value)),
            "dataDir" => self.data_dir = Some(PathBuf::from(value)),
            // Older releases print pkgFlags, newer ones flags.
            "flags" | "pkgFlags" => {
                let tokens = value.trim_start_matches('[').trim_end_matches(']');
                self.flags = PackageFlags::from_tokens(tokens.split_whitespace());
            }
            _ => {}
        }
    }

    fn absorb_user_state(&mut self, state: &str) {
        let Some((user, fields)) = state.split_once(':') else {
            return;
        };
        if user.trim().parse::<u32>() != Ok(self.user_id) {
            return;
        }
        if let Some(installed) = fields
            .split_whitespace()
            .find_map(|field| field.strip_prefix("installed="))
        {
            self.installed = Some(installed == "true");
        }
    }

    /// Append the descriptor unless the package is uninstalled for the user.
    fn finish_into(self, packages: &mut Vec<PackageDescriptor>) {
        if self.installed == Some(false) {
            return;
        }
        packages.push(self.finish());
    }

    fn finish(self) -> PackageDescriptor {
        let apk_path = match self.code_path {
            Some(path) if path.extension().is_some_and(|ext| ext == "apk") => path,
            Some(path) => path.join("base.apk"),
            None => PathBuf::new(),
        };
        let data_dir = self
            .data_dir
            .unwrap_or_else(|| PathBuf::from("/data/data").join(&self.package_id));
        let cache_dir = data_dir.join("cache");

        PackageDescriptor {
            label: self.package_id.clone(),
            package_id: self.package_id,
            version_name: self.version_name.filter(|name| name != "null"),
            first_install_time: self.first_install_time,
            flags: self.flags,
            apk_path,
            data_dir,
            cache_dir,
            requested_permissions: self.permissions,
        }
    }
}

fn parse_install_time(value: &str) -> i64 {
    NaiveDateTime::parse_from_str(value, INSTALL_TIME_FORMAT)
        .map(|stamp| stamp.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Pull the `package/.Activity` component out of `resolve-activity --brief`.
pub fn parse_resolved_component(stdout: &str) -> Option<String> {
    let last = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;
    let looks_like_component =
        last.contains('/') && !last.contains(char::is_whitespace) && !last.contains('=');
    looks_like_component.then(|| last.to_string())
}

fn ensure_am_started(stdout: &str, target: &str) -> Result<()> {
    match stdout.lines().find(|line| line.trim_start().starts_with("Error")) {
        Some(line) => Err(AppListError::CommandFailure {
            command: format!("am start {target}"),
            status: 0,
            stderr: line.trim().to_string(),
        }),
        None => Ok(()),
    }
}

fn map_spawn_error(err: io::Error, command: &str) -> AppListError {
    if err.kind() == io::ErrorKind::NotFound {
        AppListError::CommandMissing {
            command: command.into(),
        }
    } else {
        AppListError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}
