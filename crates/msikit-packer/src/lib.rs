//! # msikit-packer
//!
//! Cabinet assembly: collects the File rows reachable from a set of
//! components, streams their source payloads into a gzip-compressed tar
//! archive, and links the result through the Media table.
//!
//! The archive is staged in a scratch directory and renamed next to the
//! package only once it is complete, so a failure partway never leaves a
//! half-written archive referenced by the table store. Media and File
//! sequence rows are written after the archive lands and roll back with the
//! rest of the transaction if commit never happens.

use std::fs::{self, File as FsFile};
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder as TarBuilder;
use tracing::{debug, info};

use msikit_author::Component;
use msikit_core::error::{Error, Result};
use msikit_core::tables::Media;
use msikit_core::{Package, Row, TableRow, Value};

/// Result of a packing operation
#[derive(Debug, Clone)]
pub struct PackResult {
    /// Path of the finished archive, next to the package container
    pub archive_path: PathBuf,
    /// Number of file payloads packed
    pub file_count: usize,
    /// Compressed archive size in bytes
    pub size_bytes: u64,
    /// Media disk id assigned to this archive
    pub disk_id: i32,
    /// Highest file sequence number covered by this archive
    pub last_sequence: i32,
}

struct PackEntry {
    file_key: String,
    file_name: String,
    source: PathBuf,
}

/// Pack the files of the given components into a compressed archive and
/// insert the Media row mapping `archive_tag` to the packed sequence range.
///
/// Fails with [`Error::FileNotFound`] when a referenced source file is
/// missing and [`Error::ArchiveWrite`] on I/O failure; in both cases the
/// Media table is left untouched.
pub fn pack_files(
    package: &mut Package,
    archive_name: &str,
    archive_tag: &str,
    components: &[&Component],
) -> Result<PackResult> {
    let entries = collect_entries(package, components)?;
    if entries.is_empty() {
        return Err(Error::validation("no files to pack for the given components"));
    }

    let (first_sequence, disk_id) = next_media_slot(package)?;
    let archive_path = archive_destination(package.path(), archive_name);
    let size_bytes = write_archive(&archive_path, &entries)?;

    // Archive is complete on disk; only now touch the tables.
    let last_sequence = first_sequence + entries.len() as i32 - 1;
    for (offset, entry) in entries.iter().enumerate() {
        package.update(
            Row::new("File")
                .set("File", entry.file_key.as_str())
                .set("Sequence", first_sequence + offset as i32),
            None,
        )?;
    }
    package.insert([Media {
        disk_id,
        last_sequence,
        disk_prompt: None,
        cabinet: Some(archive_name.to_string()),
        volume_label: Some(archive_tag.to_string()),
        source: None,
    }
    .into_row()])?;

    info!(
        archive = archive_name,
        files = entries.len(),
        disk_id,
        "packed cabinet"
    );
    Ok(PackResult {
        archive_path,
        file_count: entries.len(),
        size_bytes,
        disk_id,
        last_sequence,
    })
}

/// Walk the File rows reachable from the components and resolve each source
/// path, failing fast on the first missing payload.
fn collect_entries(package: &Package, components: &[&Component]) -> Result<Vec<PackEntry>> {
    let mut entries = Vec::new();
    for component in components {
        let source_dir = component.source_dir().ok_or_else(|| {
            Error::validation(format!(
                "component {} has no source directory; add_component must run first",
                component.id()
            ))
        })?;
        let rows = package.query(Row::new("File").set("Component_", component.id()))?;
        for row in rows {
            let file_key = text_field(&row, "File")?.to_string();
            let file_name = text_field(&row, "FileName")?.to_string();
            let source = source_dir.join(&file_name);
            if !source.is_file() {
                return Err(Error::file_not_found(source.display().to_string()));
            }
            debug!(file = %file_key, source = %source.display(), "collected file payload");
            entries.push(PackEntry {
                file_key,
                file_name,
                source,
            });
        }
    }
    Ok(entries)
}

/// First free file sequence number and the next Media disk id
fn next_media_slot(package: &Package) -> Result<(i32, i32)> {
    let media = package.rows("Media")?;
    let last_sequence = media
        .iter()
        .filter_map(|row| row.get("LastSequence").and_then(Value::as_int))
        .max()
        .unwrap_or(0);
    let disk_id = media
        .iter()
        .filter_map(|row| row.get("DiskId").and_then(Value::as_int))
        .max()
        .unwrap_or(0)
        + 1;
    Ok((last_sequence + 1, disk_id))
}

fn archive_destination(package_path: &Path, archive_name: &str) -> PathBuf {
    match package_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(archive_name),
        _ => PathBuf::from(archive_name),
    }
}

/// Stage the gzip-compressed tar in a scratch dir, then rename it into place.
fn write_archive(destination: &Path, entries: &[PackEntry]) -> Result<u64> {
    let scratch_dir = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tempfile::tempdir_in(dir),
        _ => tempfile::tempdir(),
    }
    .map_err(Error::ArchiveWrite)?;
    let staged_path = scratch_dir.path().join("staging.cab");

    let staged = FsFile::create(&staged_path).map_err(Error::ArchiveWrite)?;
    let encoder = GzEncoder::new(staged, Compression::default());
    let mut archive = TarBuilder::new(encoder);
    for entry in entries {
        archive
            .append_path_with_name(&entry.source, &entry.file_name)
            .map_err(Error::ArchiveWrite)?;
    }
    let encoder = archive.into_inner().map_err(Error::ArchiveWrite)?;
    let mut staged = encoder.finish().map_err(Error::ArchiveWrite)?;
    staged.flush().map_err(Error::ArchiveWrite)?;
    staged.sync_all().map_err(Error::ArchiveWrite)?;
    drop(staged);

    fs::rename(&staged_path, destination).map_err(Error::ArchiveWrite)?;
    fs::metadata(destination)
        .map(|m| m.len())
        .map_err(Error::ArchiveWrite)
}

fn text_field<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    row.get(column)
        .and_then(Value::as_text)
        .ok_or_else(|| Error::schema(format!("missing text column {column}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use msikit_author::Author;
    use msikit_core::OpenMode;
    use std::fs;
    use tempfile::TempDir;

    const UPGRADE_CODE: &str = "{7325E7C4-20B5-4E5F-9B1B-0A11D6EAC8F5}";

    fn component_with_payload(dir: &TempDir, author: &mut Author) -> Component {
        let source_dir = dir.path().join("resource");
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(source_dir.join("service.exe"), b"example service payload").unwrap();

        let mut comp = Component::new("main", UPGRADE_CODE, "service", "INSTALLDIR");
        author
            .add_component(&mut comp, &source_dir, "service.exe")
            .unwrap();
        comp
    }

    #[test]
    fn test_pack_files_writes_archive_and_media_row() {
        let dir = TempDir::new().unwrap();
        let mut author = Author::new(Package::create(dir.path().join("out.msi")), UPGRADE_CODE);
        let comp = component_with_payload(&dir, &mut author);

        let mut package = author.into_package();
        let result = pack_files(&mut package, "cabinet.cab", "cabinet", &[&comp]).unwrap();

        assert!(result.archive_path.exists());
        assert_eq!(result.file_count, 1);
        assert_eq!(result.disk_id, 1);
        assert_eq!(result.last_sequence, 1);

        let media = package.rows("Media").unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].get("Cabinet").unwrap().as_text(), Some("cabinet.cab"));
        assert_eq!(media[0].get("VolumeLabel").unwrap().as_text(), Some("cabinet"));

        // File sequence numbers were assigned into the packed range.
        let files = package.rows("File").unwrap();
        assert_eq!(files[0].get("Sequence"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_packed_archive_roundtrips() {
        let dir = TempDir::new().unwrap();
        let mut author = Author::new(Package::create(dir.path().join("out.msi")), UPGRADE_CODE);
        let comp = component_with_payload(&dir, &mut author);

        let mut package = author.into_package();
        let result = pack_files(&mut package, "cabinet.cab", "cabinet", &[&comp]).unwrap();

        let extract_dir = TempDir::new().unwrap();
        let archive = FsFile::open(&result.archive_path).unwrap();
        let decoder = flate2::read::GzDecoder::new(archive);
        tar::Archive::new(decoder).unpack(extract_dir.path()).unwrap();

        let unpacked = fs::read(extract_dir.path().join("service.exe")).unwrap();
        assert_eq!(unpacked, b"example service payload");
    }

    #[test]
    fn test_missing_source_leaves_media_empty_after_commit() {
        let dir = TempDir::new().unwrap();
        let package_path = dir.path().join("out.msi");
        let mut author = Author::new(Package::create(&package_path), UPGRADE_CODE);
        let comp = component_with_payload(&dir, &mut author);

        // The payload disappears between add_component and pack time.
        fs::remove_file(dir.path().join("resource/service.exe")).unwrap();

        let mut package = author.into_package();
        let err = pack_files(&mut package, "cabinet.cab", "cabinet", &[&comp]).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert!(!dir.path().join("cabinet.cab").exists());

        package.commit().unwrap();
        let reopened = Package::open(&package_path, OpenMode::ReadOnly).unwrap();
        assert!(reopened.rows("Media").unwrap().is_empty());
    }

    #[test]
    fn test_pack_unbound_component_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut package = Package::create(dir.path().join("out.msi"));
        let comp = Component::new("main", UPGRADE_CODE, "service", "INSTALLDIR");
        let err = pack_files(&mut package, "cabinet.cab", "cabinet", &[&comp]).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_second_cabinet_continues_sequence_range() {
        let dir = TempDir::new().unwrap();
        let mut author = Author::new(Package::create(dir.path().join("out.msi")), UPGRADE_CODE);
        let first = component_with_payload(&dir, &mut author);

        let other_dir = dir.path().join("other");
        fs::create_dir_all(&other_dir).unwrap();
        fs::write(other_dir.join("helper.dll"), b"helper payload").unwrap();
        let mut second = Component::new("main", UPGRADE_CODE, "helper", "INSTALLDIR");
        author
            .add_component(&mut second, &other_dir, "helper.dll")
            .unwrap();

        let mut package = author.into_package();
        let a = pack_files(&mut package, "one.cab", "one", &[&first]).unwrap();
        let b = pack_files(&mut package, "two.cab", "two", &[&second]).unwrap();

        assert_eq!(a.disk_id, 1);
        assert_eq!(b.disk_id, 2);
        assert_eq!(a.last_sequence, 1);
        assert_eq!(b.last_sequence, 2);
    }
}
