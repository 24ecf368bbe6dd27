/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::inventory
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Build the installed-application inventory: filter system
    packages, measure storage footprints, normalise icons and
    assemble one record per package.

  Security / Safety Notes:
    Read-only against the filesystem and registry. Inventory
    documents are written only to operator-controlled paths.

  Dependencies:
    serde/serde_json for the inventory document, chrono for
    generation stamps.

  Operational Scope:
    Run on a blocking worker by the bridge, or directly by the
    `list` subcommand.

  Revision History:
    2026-10-19 COD  Authored inventory builder.
    2026-10-19 COD  Repeated package ids are skipped and counted.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Registry failure is the only build-fatal condition
    - Per-package degradation is logged, never silent
    - Registry enumeration order is preserved
============================================================*/

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{AppListError, Result};
use crate::icon::{encode_png, placeholder_icon, DEFAULT_ICON_SIZE};
use crate::logger::Logger;
use crate::package_info::{PackageDescriptor, PackageRecord};
use crate::registry::PackageRegistry;
use crate::walker::SizeWalker;

/// Knobs for a single build.
#[derive(Debug, Clone, Copy)]
pub struct InventoryOptions {
    pub placeholder_size: u32,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            placeholder_size: DEFAULT_ICON_SIZE,
        }
    }
}

/// Counters describing how a build went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub packages_seen: usize,
    pub system_excluded: usize,
    pub records: usize,
    pub icon_fallbacks: usize,
    /// Packages dropped because not even a placeholder icon could be made.
    pub records_dropped: usize,
    /// Repeat reports of an already-seen package id.
    pub duplicates_skipped: usize,
    pub walk_entries_skipped: u64,
    pub total_size_bytes: u64,
}

/// Result of one build.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub records: Vec<PackageRecord>,
    pub summary: InventorySummary,
}

/// Storage footprint of a single package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Footprint {
    pub apk: u64,
    pub data: u64,
    pub cache: u64,
    pub skipped: u64,
}

impl Footprint {
    pub fn total(&self) -> u64 {
        self.apk.saturating_add(self.data).saturating_add(self.cache)
    }
}

/// Enumerate the registry and produce records for every non-system package.
pub fn build_inventory(
    registry: &dyn PackageRegistry,
    options: &InventoryOptions,
    logger: &Logger,
) -> Result<Inventory> {
    let descriptors = registry.installed_packages()?;
    logger.info(
        "PACKAGES",
        format!("Registry reported {} installed packages", descriptors.len()),
    );

    let mut summary = InventorySummary {
        packages_seen: descriptors.len(),
        ..InventorySummary::default()
    };
    let mut records = Vec::with_capacity(descriptors.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(descriptors.len());

    for descriptor in &descriptors {
        if descriptor.flags.system {
            summary.system_excluded += 1;
            continue;
        }
        // First report wins; package ids are unique per snapshot.
        if !seen.insert(descriptor.package_id.as_str()) {
            logger.warn(
                "PACKAGES",
                format!("Skipping repeated package id {}", descriptor.package_id),
            );
            summary.duplicates_skipped += 1;
            continue;
        }

        let footprint = measure_footprint(descriptor, logger);
        summary.walk_entries_skipped += footprint.skipped;

        let (icon_image, fell_back) = match resolve_icon(registry, descriptor, options, logger) {
            Ok(resolved) => resolved,
            Err(err) => {
                logger.error(
                    "ICON",
                    format!("Dropping {}: {err}", descriptor.package_id),
                );
                summary.records_dropped += 1;
                continue;
            }
        };
        if fell_back {
            summary.icon_fallbacks += 1;
        }

        let total = footprint.total();
        summary.total_size_bytes = summary.total_size_bytes.saturating_add(total);
        logger.debug(
            "RECORD",
            format!(
                "{} apk={} data={} cache={} total={}",
                descriptor.package_id, footprint.apk, footprint.data, footprint.cache, total
            ),
        );

        records.push(PackageRecord {
            display_name: descriptor.label.clone(),
            package_id: descriptor.package_id.clone(),
            version_label: descriptor.version_label(),
            install_timestamp: descriptor.first_install_time,
            total_size_bytes: total,
            icon_image,
        });
    }

    summary.records = records.len();
    logger.info(
        "INVENTORY",
        format!(
            "records={} system_excluded={} duplicates={} icon_fallbacks={} skipped_entries={}",
            summary.records,
            summary.system_excluded,
            summary.duplicates_skipped,
            summary.icon_fallbacks,
            summary.walk_entries_skipped
        ),
    );

    Ok(Inventory { records, summary })
}

/// APK length plus data and cache walks. The cache root is pruned from
/// the data walk so a nested cache is only counted once.
pub fn measure_footprint(descriptor: &PackageDescriptor, logger: &Logger) -> Footprint {
    let apk = match fs::metadata(&descriptor.apk_path) {
        Ok(meta) => meta.len(),
        Err(err) => {
            logger.warn(
                "APK",
                format!(
                    "Cannot stat {} for {}: {err}",
                    descriptor.apk_path.display(),
                    descriptor.package_id
                ),
            );
            0
        }
    };

    let data = SizeWalker::new()
        .prune(&descriptor.cache_dir)
        .measure(&descriptor.data_dir);
    let cache = SizeWalker::new().measure(&descriptor.cache_dir);
    let skipped = data.skipped + cache.skipped;
    if skipped > 0 {
        logger.debug(
            "WALK",
            format!("{}: skipped {skipped} unreadable entries", descriptor.package_id),
        );
    }

    Footprint {
        apk,
        data: data.bytes,
        cache: cache.bytes,
        skipped,
    }
}

/// Encoded icon plus whether the placeholder had to be used.
fn resolve_icon(
    registry: &dyn PackageRegistry,
    descriptor: &PackageDescriptor,
    options: &InventoryOptions,
    logger: &Logger,
) -> Result<(Vec<u8>, bool)> {
    match registry.load_icon(descriptor).and_then(encode_png) {
        Ok(bytes) => Ok((bytes, false)),
        Err(err) => {
            logger.warn(
                "ICON",
                format!("Placeholder icon for {}: {err}", descriptor.package_id),
            );
            let bytes = placeholder_icon(&descriptor.package_id, options.placeholder_size)?;
            Ok((bytes, true))
        }
    }
}

/// Persisted inventory with generation metadata.
#[derive(Debug, Serialize)]
pub struct InventoryDocument<'a> {
    pub metadata: InventoryMetadata<'a>,
    pub packages: &'a [PackageRecord],
}

#[derive(Debug, Serialize)]
pub struct InventoryMetadata<'a> {
    pub generated_at: String,
    pub generated_by: &'static str,
    #[serde(flatten)]
    pub summary: &'a InventorySummary,
}

impl<'a> InventoryDocument<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self {
            metadata: InventoryMetadata {
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                generated_by: "applist_core",
                summary: &inventory.summary,
            },
            packages: &inventory.records,
        }
    }
}

/// Persist the inventory document to the given path.
pub fn write_inventory(document: &InventoryDocument<'_>, path: &Path, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppListError::Filesystem(format!(
                "Failed to create inventory directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        AppListError::Filesystem(format!(
            "Failed to create inventory file {}: {err}",
            path.display()
        ))
    })?;
    let written = if pretty {
        serde_json::to_writer_pretty(file, document)
    } else {
        serde_json::to_writer(file, document)
    };
    written.map_err(|err| {
        AppListError::Serialization(format!(
            "Failed to write inventory {}: {err}",
            path.display()
        ))
    })
}
