/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::package_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing installed packages as the
    registry reports them and as the inventory emits them.

  Security / Safety Notes:
    Pure data containers; no I/O performed in this module.

  Dependencies:
    serde for the boundary representation of records.

  Operational Scope:
    Used by the registry, inventory builder and bridge.

  Revision History:
    2026-10-19 COD  Introduced descriptor and record types.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Field names on the wire match the UI layer's keys
============================================================*/

use std::path::PathBuf;

use serde::Serialize;

/// Label used when a package does not report a version name.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Application-info flags relevant to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFlags {
    pub system: bool,
    /// Every flag name the registry reported, verbatim.
    pub raw: Vec<String>,
}

impl PackageFlags {
    /// Build from flag tokens such as `SYSTEM HAS_CODE ALLOW_BACKUP`.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let raw: Vec<String> = tokens
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        let system = raw.iter().any(|flag| flag == "SYSTEM");
        Self { system, raw }
    }

    pub fn system() -> Self {
        Self::from_tokens(["SYSTEM"])
    }
}

/// A package as enumerated by the platform registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub package_id: String,
    pub label: String,
    pub version_name: Option<String>,
    /// First-install time, epoch milliseconds.
    pub first_install_time: i64,
    pub flags: PackageFlags,
    pub apk_path: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Requested permissions; carried but not part of any record.
    pub requested_permissions: Vec<String>,
}

impl PackageDescriptor {
    /// Version name, or the `Unknown` sentinel when absent or blank.
    pub fn version_label(&self) -> String {
        self.version_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_VERSION)
            .to_string()
    }
}

/// One installed, non-system application in an inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    #[serde(rename = "appName")]
    pub display_name: String,
    #[serde(rename = "packageName")]
    pub package_id: String,
    #[serde(rename = "versionName")]
    pub version_label: String,
    #[serde(rename = "installDate")]
    pub install_timestamp: i64,
    #[serde(rename = "appSize")]
    pub total_size_bytes: u64,
    #[serde(rename = "appIcon")]
    pub icon_image: Vec<u8>,
}
