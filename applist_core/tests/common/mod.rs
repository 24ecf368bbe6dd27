#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use applist_core::error::{AppListError, Result};
use applist_core::icon::{IconSource, Layer, LayeredIcon, SolidColorIcon};
use applist_core::{LaunchOutcome, PackageDescriptor, PackageFlags, PackageRegistry, PlatformActions};
use image::{Rgba, RgbaImage};

/// How the fake registry answers `load_icon` for a package.
#[derive(Debug, Clone, Copy)]
pub enum FakeIcon {
    Bitmap,
    Adaptive,
    ZeroSized,
    Missing,
}

pub struct FakePackage {
    pub descriptor: PackageDescriptor,
    pub icon: FakeIcon,
}

/// In-memory registry rooted in a temp directory.
#[derive(Default)]
pub struct FakeRegistry {
    pub packages: Vec<FakePackage>,
    pub unavailable: bool,
    pub launchable: Vec<String>,
    pub actions: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, descriptor: PackageDescriptor, icon: FakeIcon) -> Self {
        self.packages.push(FakePackage { descriptor, icon });
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

impl PackageRegistry for FakeRegistry {
    fn installed_packages(&self) -> Result<Vec<PackageDescriptor>> {
        if self.unavailable {
            return Err(AppListError::RegistryUnavailable("service not running".into()));
        }
        Ok(self.packages.iter().map(|p| p.descriptor.clone()).collect())
    }

    fn load_icon(&self, package: &PackageDescriptor) -> Result<IconSource> {
        let icon = self
            .packages
            .iter()
            .find(|p| p.descriptor.package_id == package.package_id)
            .map(|p| p.icon)
            .unwrap_or(FakeIcon::Missing);
        match icon {
            FakeIcon::Bitmap => Ok(IconSource::DirectBitmap(RgbaImage::from_pixel(
                48,
                48,
                Rgba([10, 20, 30, 255]),
            ))),
            FakeIcon::Adaptive => Ok(IconSource::Rasterizable(Box::new(LayeredIcon {
                background: Layer::Solid(Rgba([255, 255, 255, 255])),
                foreground: Layer::Bitmap(RgbaImage::new(72, 72)),
            }))),
            FakeIcon::ZeroSized => Ok(IconSource::Rasterizable(Box::new(SolidColorIcon {
                color: Rgba([0, 0, 0, 255]),
                width: 0,
                height: 0,
            }))),
            FakeIcon::Missing => Err(AppListError::Icon("no icon".into())),
        }
    }
}

impl PlatformActions for FakeRegistry {
    fn launch(&self, package_id: &str) -> Result<LaunchOutcome> {
        if self.launchable.iter().any(|id| id == package_id) {
            self.actions.lock().unwrap().push(format!("launch {package_id}"));
            Ok(LaunchOutcome::Started)
        } else {
            Ok(LaunchOutcome::NoLaunchEntry)
        }
    }

    fn uninstall(&self, package_id: &str) -> Result<()> {
        self.actions.lock().unwrap().push(format!("uninstall {package_id}"));
        Ok(())
    }
}

pub fn write_file(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0xAB; len]).unwrap();
}

/// Descriptor whose APK, data and cache live under `root/<id>`.
pub fn descriptor(root: &Path, package_id: &str, system: bool) -> PackageDescriptor {
    let base = root.join(package_id);
    PackageDescriptor {
        package_id: package_id.to_string(),
        label: package_id.rsplit('.').next().unwrap_or(package_id).to_string(),
        version_name: Some("1.0.0".into()),
        first_install_time: 1_700_000_000_000,
        flags: if system {
            PackageFlags::system()
        } else {
            PackageFlags::default()
        },
        apk_path: base.join("app/base.apk"),
        data_dir: base.join("data"),
        cache_dir: base.join("cache"),
        requested_permissions: vec!["android.permission.INTERNET".into()],
    }
}

pub fn path_under(root: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(root.to_path_buf(), |acc, part| acc.join(part))
}
