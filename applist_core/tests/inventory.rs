mod common;

use applist_core::error::AppListError;
use applist_core::inventory::{
    build_inventory, measure_footprint, write_inventory, InventoryDocument, InventoryOptions,
};
use applist_core::logger::Logger;

use common::{descriptor, write_file, FakeIcon, FakeRegistry};

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn system_packages_are_excluded() {
    let root = tempfile::tempdir().unwrap();
    let registry = FakeRegistry::default()
        .with(descriptor(root.path(), "com.example.notes", false), FakeIcon::Bitmap)
        .with(descriptor(root.path(), "com.android.settings", true), FakeIcon::Bitmap)
        .with(descriptor(root.path(), "org.sample.chat", false), FakeIcon::Adaptive);

    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();

    let ids: Vec<&str> = inventory
        .records
        .iter()
        .map(|record| record.package_id.as_str())
        .collect();
    assert_eq!(ids, ["com.example.notes", "org.sample.chat"]);
    assert_eq!(inventory.summary.packages_seen, 3);
    assert_eq!(inventory.summary.system_excluded, 1);
    assert_eq!(inventory.summary.records, 2);
}

#[test]
fn repeated_package_ids_yield_one_record() {
    let root = tempfile::tempdir().unwrap();
    let registry = FakeRegistry::default()
        .with(descriptor(root.path(), "com.example.notes", false), FakeIcon::Bitmap)
        .with(descriptor(root.path(), "org.sample.chat", false), FakeIcon::Bitmap)
        .with(descriptor(root.path(), "com.example.notes", false), FakeIcon::Bitmap);

    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();

    let ids: Vec<&str> = inventory
        .records
        .iter()
        .map(|record| record.package_id.as_str())
        .collect();
    assert_eq!(ids, ["com.example.notes", "org.sample.chat"]);
    assert_eq!(inventory.summary.packages_seen, 3);
    assert_eq!(inventory.summary.duplicates_skipped, 1);
    assert_eq!(inventory.summary.records, 2);
}

#[test]
fn total_size_is_apk_plus_data_plus_cache() {
    let root = tempfile::tempdir().unwrap();
    let package = descriptor(root.path(), "com.example.notes", false);
    write_file(&package.apk_path, 1000);
    write_file(&package.data_dir.join("files/a.bin"), 100);
    write_file(&package.data_dir.join("databases/b.db"), 250);
    write_file(&package.cache_dir.join("c.tmp"), 50);

    let registry = FakeRegistry::default().with(package, FakeIcon::Bitmap);
    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();

    assert_eq!(inventory.records.len(), 1);
    assert_eq!(inventory.records[0].total_size_bytes, 1400);
    assert_eq!(inventory.summary.total_size_bytes, 1400);
}

#[test]
fn nested_cache_is_counted_once() {
    let root = tempfile::tempdir().unwrap();
    let mut package = descriptor(root.path(), "com.example.notes", false);
    package.cache_dir = package.data_dir.join("cache");
    write_file(&package.apk_path, 1000);
    write_file(&package.data_dir.join("files/a.bin"), 350);
    write_file(&package.cache_dir.join("c.tmp"), 50);

    let footprint = measure_footprint(&package, &Logger::quiet());
    assert_eq!(footprint.apk, 1000);
    assert_eq!(footprint.data, 350);
    assert_eq!(footprint.cache, 50);
    assert_eq!(footprint.total(), 1400);
}

#[test]
fn missing_directories_and_apk_measure_zero() {
    let root = tempfile::tempdir().unwrap();
    let registry = FakeRegistry::default().with(
        descriptor(root.path(), "com.example.fresh", false),
        FakeIcon::Bitmap,
    );
    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();
    assert_eq!(inventory.records[0].total_size_bytes, 0);
}

#[test]
fn absent_version_becomes_unknown() {
    let root = tempfile::tempdir().unwrap();
    let mut package = descriptor(root.path(), "com.example.notes", false);
    package.version_name = None;
    let registry = FakeRegistry::default().with(package, FakeIcon::Bitmap);

    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();
    assert_eq!(inventory.records[0].version_label, "Unknown");
    assert_eq!(inventory.records[0].install_timestamp, 1_700_000_000_000);
    assert_eq!(inventory.records[0].display_name, "notes");
}

#[test]
fn every_icon_decodes_with_positive_dimensions() {
    let root = tempfile::tempdir().unwrap();
    let registry = FakeRegistry::default()
        .with(descriptor(root.path(), "a.bitmap", false), FakeIcon::Bitmap)
        .with(descriptor(root.path(), "b.adaptive", false), FakeIcon::Adaptive)
        .with(descriptor(root.path(), "c.zero", false), FakeIcon::ZeroSized)
        .with(descriptor(root.path(), "d.missing", false), FakeIcon::Missing);
    let options = InventoryOptions {
        placeholder_size: 32,
    };

    let inventory = build_inventory(&registry, &options, &Logger::quiet()).unwrap();
    assert_eq!(inventory.records.len(), 4);
    assert_eq!(inventory.summary.icon_fallbacks, 2);

    let dims: Vec<(u32, u32)> = inventory
        .records
        .iter()
        .map(|record| decode(&record.icon_image).dimensions())
        .collect();
    assert_eq!(dims, [(48, 48), (72, 72), (32, 32), (32, 32)]);
}

#[test]
fn registry_failure_aborts_the_build() {
    let err = build_inventory(
        &FakeRegistry::unavailable(),
        &InventoryOptions::default(),
        &Logger::quiet(),
    )
    .unwrap_err();
    assert!(matches!(err, AppListError::RegistryUnavailable(_)));
}

#[test]
fn inventory_document_is_written_with_metadata() {
    let root = tempfile::tempdir().unwrap();
    let registry = FakeRegistry::default().with(
        descriptor(root.path(), "com.example.notes", false),
        FakeIcon::Bitmap,
    );
    let inventory =
        build_inventory(&registry, &InventoryOptions::default(), &Logger::quiet()).unwrap();

    let path = root.path().join("out/inventory.json");
    write_inventory(&InventoryDocument::new(&inventory), &path, true).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["metadata"]["generated_by"], "applist_core");
    assert_eq!(value["metadata"]["records"], 1);
    assert_eq!(value["packages"][0]["packageName"], "com.example.notes");
    assert!(value["packages"][0]["appIcon"].as_array().unwrap().len() > 8);
}
