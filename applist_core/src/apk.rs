/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::apk
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Locate launcher icon resources inside an installed APK and
    hand them to the icon normaliser as bitmap or layered
    sources.

  Security / Safety Notes:
    Opens APKs read-only; only image entries under res/ are
    decompressed, each capped at 16 MiB.

  Dependencies:
    zip for archive access, image for decoding PNG/WebP.

  Operational Scope:
    Used by the shell registry when loading package icons.

  Revision History:
    2026-10-19 COD  Authored APK icon extraction.
    2026-10-19 COD  Capped icon entry size; no header-sized
                    allocations.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic candidate ranking
    - Clear failure when no launcher artwork exists
============================================================*/

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use image::{Rgba, RgbaImage};
use zip::ZipArchive;

use crate::error::{AppListError, Result};
use crate::icon::{IconSource, Layer, LayeredIcon};

/// Which part of a launcher icon an archive entry provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Launcher,
    Foreground,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    name: u8,
    density: u8,
    size: u64,
}

#[derive(Debug)]
struct Candidate {
    rank: Rank,
    index: usize,
}

#[derive(Debug, Default)]
struct Candidates {
    launcher: Option<Candidate>,
    foreground: Option<Candidate>,
    background: Option<Candidate>,
}

impl Candidates {
    fn offer(&mut self, role: Role, candidate: Candidate) {
        let slot = match role {
            Role::Launcher => &mut self.launcher,
            Role::Foreground => &mut self.foreground,
            Role::Background => &mut self.background,
        };
        let better = slot
            .as_ref()
            .map_or(true, |current| candidate.rank > current.rank);
        if better {
            *slot = Some(candidate);
        }
    }
}

/// Load the launcher icon of the APK at `path`.
pub fn load_apk_icon(path: &Path) -> Result<IconSource> {
    let file = File::open(path).map_err(|err| {
        AppListError::Icon(format!("Failed to open APK {}: {err}", path.display()))
    })?;
    icon_from_archive(file)
}

/// Resolve the launcher icon from any seekable APK stream.
pub fn icon_from_archive<R: Read + Seek>(reader: R) -> Result<IconSource> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|err| AppListError::Icon(format!("Failed to read APK zip: {err}")))?;

    let mut candidates = Candidates::default();
    for index in 0..archive.len() {
        let Ok(entry) = archive.by_index(index) else {
            continue;
        };
        let Some((role, name_rank)) = classify(entry.name()) else {
            continue;
        };
        if entry.size() > MAX_ICON_BYTES {
            continue;
        }
        let rank = Rank {
            name: name_rank,
            density: density_rank(entry.name()),
            size: entry.size(),
        };
        candidates.offer(role, Candidate { rank, index });
    }

    let Candidates {
        launcher,
        foreground,
        background,
    } = candidates;
    match (launcher, foreground, background) {
        (_, Some(foreground), Some(background)) => {
            let icon = LayeredIcon {
                background: Layer::Bitmap(read_bitmap(&mut archive, background.index)?),
                foreground: Layer::Bitmap(read_bitmap(&mut archive, foreground.index)?),
            };
            Ok(IconSource::Rasterizable(Box::new(icon)))
        }
        (Some(launcher), _, _) => Ok(IconSource::DirectBitmap(read_bitmap(
            &mut archive,
            launcher.index,
        )?)),
        (None, Some(foreground), None) => {
            let icon = LayeredIcon {
                background: Layer::Solid(ADAPTIVE_FALLBACK_BACKGROUND),
                foreground: Layer::Bitmap(read_bitmap(&mut archive, foreground.index)?),
            };
            Ok(IconSource::Rasterizable(Box::new(icon)))
        }
        (None, None, _) => Err(AppListError::Icon(
            "APK carries no launcher bitmap".into(),
        )),
    }
}

/// Background painted behind a foreground layer that has no partner.
const ADAPTIVE_FALLBACK_BACKGROUND: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

/// Largest icon entry that will be decompressed.
const MAX_ICON_BYTES: u64 = 16 * 1024 * 1024;

fn read_bitmap<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<RgbaImage> {
    read_bitmap_within(archive, index, MAX_ICON_BYTES)
}

/// Decode one entry, refusing anything larger than `limit` bytes whether
/// declared in the header or actually inflated.
fn read_bitmap_within<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    limit: u64,
) -> Result<RgbaImage> {
    let mut entry = archive
        .by_index(index)
        .map_err(|err| AppListError::Icon(format!("Failed to read icon entry: {err}")))?;
    let name = entry.name().to_string();
    let too_large = || AppListError::Icon(format!("{name} exceeds {limit} bytes"));
    if entry.size() > limit {
        return Err(too_large());
    }

    // The header size is untrusted; never pre-size from it.
    let mut bytes = Vec::new();
    (&mut entry)
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| AppListError::Icon(format!("Failed to read {name}: {err}")))?;
    if bytes.len() as u64 > limit {
        return Err(too_large());
    }
    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| AppListError::Icon(format!("Failed to decode {name}: {err}")))?;
    Ok(decoded.to_rgba8())
}

fn classify(name: &str) -> Option<(Role, u8)> {
    let lower = name.to_ascii_lowercase();
    if !lower.starts_with("res/") {
        return None;
    }
    if !(lower.ends_with(".png") || lower.ends_with(".webp")) {
        return None;
    }
    if !(lower.contains("/mipmap") || lower.contains("/drawable")) {
        return None;
    }

    let stem = lower.rsplit('/').next().unwrap_or_default();
    if stem.contains("_foreground") {
        return stem.contains("launcher").then_some((Role::Foreground, 1));
    }
    if stem.contains("_background") {
        return stem.contains("launcher").then_some((Role::Background, 1));
    }

    let rank = if stem.starts_with("ic_launcher.") {
        7
    } else if stem.starts_with("ic_launcher_round.") {
        6
    } else if stem.contains("launcher") {
        5
    } else if stem.contains("app_icon") || stem.contains("appicon") {
        4
    } else if stem.starts_with("icon.") {
        2
    } else {
        return None;
    };
    Some((Role::Launcher, rank))
}

fn density_rank(name: &str) -> u8 {
    let lower = name.to_ascii_lowercase();
    // Longest qualifiers first; "xhdpi" also contains "hdpi".
    [
        ("xxxhdpi", 7),
        ("xxhdpi", 6),
        ("xhdpi", 5),
        ("hdpi", 4),
        ("mdpi", 3),
        ("ldpi", 2),
        ("anydpi", 1),
    ]
    .iter()
    .find(|(qualifier, _)| lower.contains(qualifier))
    .map_or(0, |(_, rank)| *rank)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::*;
    use crate::icon::encode_rgba;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        encode_rgba(&RgbaImage::from_pixel(width, height, Rgba(color))).unwrap()
    }

    fn apk(entries: &[(&str, Vec<u8>)]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn highest_density_launcher_bitmap_wins() {
        let archive = apk(&[
            ("AndroidManifest.xml", b"<manifest/>".to_vec()),
            ("res/mipmap-mdpi-v4/ic_launcher.png", png(48, 48, [1, 1, 1, 255])),
            ("res/mipmap-xxhdpi-v4/ic_launcher.png", png(144, 144, [2, 2, 2, 255])),
            ("res/mipmap-xxxhdpi-v4/ic_launcher_round.png", png(192, 192, [3, 3, 3, 255])),
            ("res/drawable/background_pattern.png", png(500, 500, [4, 4, 4, 255])),
        ]);

        match icon_from_archive(archive).unwrap() {
            IconSource::DirectBitmap(bitmap) => {
                assert_eq!(bitmap.dimensions(), (144, 144));
                assert_eq!(*bitmap.get_pixel(0, 0), Rgba([2, 2, 2, 255]));
            }
            other => panic!("expected bitmap, got {other:?}"),
        }
    }

    #[test]
    fn entries_over_the_cap_are_rejected() {
        let mut archive = ZipArchive::new(apk(&[(
            "res/mipmap-mdpi/ic_launcher.png",
            png(48, 48, [1, 1, 1, 255]),
        )]))
        .unwrap();

        let err = read_bitmap_within(&mut archive, 0, 16).unwrap_err();
        assert!(matches!(err, AppListError::Icon(ref message) if message.contains("exceeds 16 bytes")));
        assert_eq!(read_bitmap(&mut archive, 0).unwrap().dimensions(), (48, 48));
    }

    #[test]
    fn oversized_candidates_are_passed_over() {
        let oversized = vec![0u8; MAX_ICON_BYTES as usize + 1];
        let archive = apk(&[
            ("res/mipmap-xxxhdpi/ic_launcher.png", oversized),
            ("res/mipmap-mdpi/ic_launcher.png", png(48, 48, [5, 5, 5, 255])),
        ]);

        match icon_from_archive(archive).unwrap() {
            IconSource::DirectBitmap(bitmap) => assert_eq!(bitmap.dimensions(), (48, 48)),
            other => panic!("expected bitmap, got {other:?}"),
        }
    }

    #[test]
    fn adaptive_layers_become_a_rasterizable_source() {
        let archive = apk(&[
            ("res/mipmap-anydpi-v26/ic_launcher.xml", b"<adaptive-icon/>".to_vec()),
            ("res/mipmap-xhdpi/ic_launcher_foreground.png", png(216, 216, [0, 0, 0, 0])),
            ("res/mipmap-xhdpi/ic_launcher_background.png", png(216, 216, [0, 128, 0, 255])),
        ]);

        let source = icon_from_archive(archive).unwrap();
        assert!(matches!(source, IconSource::Rasterizable(_)));
        let pixels = source.into_pixels().unwrap();
        assert_eq!(pixels.dimensions(), (216, 216));
        assert_eq!(*pixels.get_pixel(100, 100), Rgba([0, 128, 0, 255]));
    }

    #[test]
    fn archive_without_launcher_art_is_an_error() {
        let archive = apk(&[("res/drawable/divider.png", png(1, 1, [0, 0, 0, 255]))]);
        assert!(matches!(
            icon_from_archive(archive),
            Err(AppListError::Icon(_))
        ));
    }

    #[test]
    fn non_zip_input_is_an_error() {
        let result = icon_from_archive(Cursor::new(b"not an apk".to_vec()));
        assert!(result.is_err());
    }

    #[test]
    fn density_qualifiers_rank_in_order() {
        assert!(density_rank("res/mipmap-xxxhdpi/a.png") > density_rank("res/mipmap-xxhdpi/a.png"));
        assert!(density_rank("res/mipmap-xhdpi/a.png") > density_rank("res/mipmap-hdpi/a.png"));
        assert_eq!(density_rank("res/drawable/a.png"), 0);
    }
}
