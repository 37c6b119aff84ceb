use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{debug, warn};
use zip::ZipArchive;
use crate::core::error::{Error, ErrorKind, Result};

/// Index archives are named `<index>.solrindex[.<format>]`
pub const INDEX_ARCHIVE_EXTENSION: &str = "solrindex";

/// Property of a reference archive naming the archive it points to
pub const REFERENCED_ARCHIVE_KEY: &str = "Index-Archive";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarBz2,
    /// Properties naming another archive; holds no index data
    Reference,
}

impl ArchiveFormat {
    /// Format by the extension of the archive name; a bare `.solrindex`
    /// archive is a zip file
    pub fn from_name(archive_name: &str) -> Result<ArchiveFormat> {
        let extension = Path::new(archive_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(archive_name);
        match extension.to_ascii_lowercase().as_str() {
            INDEX_ARCHIVE_EXTENSION | "zip" | "jar" => Ok(ArchiveFormat::Zip),
            "gz" => Ok(ArchiveFormat::TarGz),
            "bz2" => Ok(ArchiveFormat::TarBz2),
            "ref" | "properties" => Ok(ArchiveFormat::Reference),
            other => Err(Error::invalid_argument(format!(
                "unsupported archive format '{}' of {}", other, archive_name
            ))),
        }
    }
}

pub fn is_index_archive_name(name: &str) -> bool {
    name.contains(&format!(".{}", INDEX_ARCHIVE_EXTENSION))
}

pub fn with_archive_extension(name: &str) -> String {
    if is_index_archive_name(name) {
        name.to_string()
    } else {
        format!("{}.{}", name, INDEX_ARCHIVE_EXTENSION)
    }
}

/// Name of the index inside an archive: the archive name up to the first
/// dot. Archives keep their files below a folder of that name.
pub fn index_name(archive_name: &str) -> &str {
    let file_name = archive_name.rsplit('/').next().unwrap_or(archive_name);
    file_name.split('.').next().unwrap_or(file_name)
}

/// Reads `key=value` (or `key: value`) lines; `#` and `!` start comments
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let pos = line.find(|c| c == '=' || c == ':')?;
            Some((line[..pos].trim().to_string(), line[pos + 1..].trim().to_string()))
        })
        .collect()
}

/// Content of a reference archive
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReference {
    pub archive_name: String,
    pub properties: BTreeMap<String, String>,
}

impl IndexReference {
    pub fn parse(text: &str) -> Result<IndexReference> {
        let mut properties = parse_properties(text);
        let archive_name = properties.remove(REFERENCED_ARCHIVE_KEY).ok_or_else(|| {
            Error::new(ErrorKind::Parse, format!("index reference without '{}'", REFERENCED_ARCHIVE_KEY))
        })?;
        Ok(IndexReference { archive_name, properties })
    }
}

/// Relative target path of an archive entry: the part after the last
/// `<index>/` folder. Entries outside such a folder, or escaping it, are
/// skipped.
fn entry_target(entry_name: &str, index: &str) -> Option<PathBuf> {
    let folder = format!("{}/", index);
    let Some(pos) = entry_name.rfind(&folder) else {
        warn!("archive entry {} is not below folder {} and is ignored", entry_name, folder);
        return None;
    };
    let relative = Path::new(&entry_name[pos + folder.len()..]);
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        warn!("archive entry {} leaves the index folder and is ignored", entry_name);
        return None;
    }
    Some(relative.to_path_buf())
}

fn copy_entry(reader: &mut impl Read, target_dir: &Path, relative: &Path) -> Result<()> {
    let target = target_dir.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&target)?;
    io::copy(reader, &mut file)?;
    Ok(())
}

/// Extracts the files of the index `index` into `target_dir`.
/// Returns the number of files written.
pub fn extract<R: Read>(format: ArchiveFormat, mut reader: R, target_dir: &Path, index: &str) -> Result<usize> {
    match format {
        ArchiveFormat::Zip => {
            // zip needs random access
            let mut data = Vec::new();
            reader.read_to_end(&mut data)?;
            let mut archive = ZipArchive::new(Cursor::new(data))?;
            let mut copied = 0;
            for i in 0..archive.len() {
                let mut entry = archive.by_index(i)?;
                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_string();
                if let Some(relative) = entry_target(&name, index) {
                    copy_entry(&mut entry, target_dir, &relative)?;
                    copied += 1;
                }
            }
            debug!("extracted {} files of index {} from zip archive", copied, index);
            Ok(copied)
        }
        ArchiveFormat::TarGz => extract_tar(tar::Archive::new(GzDecoder::new(reader)), target_dir, index),
        ArchiveFormat::TarBz2 => extract_tar(tar::Archive::new(BzDecoder::new(reader)), target_dir, index),
        ArchiveFormat::Reference => Err(Error::invalid_argument(format!(
            "index {}: reference archives hold no index data", index
        ))),
    }
}

fn extract_tar<R: Read>(mut archive: tar::Archive<R>, target_dir: &Path, index: &str) -> Result<usize> {
    let mut copied = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        if let Some(relative) = entry_target(&name, index) {
            copy_entry(&mut entry, target_dir, &relative)?;
            copied += 1;
        }
    }
    debug!("extracted {} files of index {} from tar archive", copied, index);
    Ok(copied)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;
    use flate2::write::GzEncoder;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;
    use super::*;

    pub(crate) fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn tar_entries<W: Write>(builder: &mut tar::Builder<W>, files: &[(&str, &str)]) {
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
    }

    fn tar_gz_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), flate2::Compression::default()));
        tar_entries(&mut builder, files);
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn tar_bz2_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        tar_entries(&mut builder, files);
        builder.into_inner().unwrap().finish().unwrap()
    }

    const FILES: [(&str, &str); 3] = [
        ("dbpedia/conf/schema.xml", "<schema/>"),
        ("dbpedia/data/index/segments_1", "segment"),
        ("README", "ignored"),
    ];

    #[test]
    fn formats_by_name() {
        assert_eq!(ArchiveFormat::from_name("dbpedia.solrindex.zip").unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_name("dbpedia.solrindex").unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_name("lib.jar").unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_name("dbpedia.solrindex.tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_name("dbpedia.solrindex.bz2").unwrap(), ArchiveFormat::TarBz2);
        assert_eq!(ArchiveFormat::from_name("dbpedia.solrindex.ref").unwrap(), ArchiveFormat::Reference);
        assert!(ArchiveFormat::from_name("dbpedia.rar").is_err());
    }

    #[test]
    fn archive_names() {
        assert_eq!(with_archive_extension("dbpedia"), "dbpedia.solrindex");
        assert_eq!(with_archive_extension("dbpedia.solrindex.zip"), "dbpedia.solrindex.zip");
        assert_eq!(index_name("dist/dbpedia.solrindex.zip"), "dbpedia");
    }

    #[test]
    fn references_name_their_archive() {
        let reference = IndexReference::parse("# built 2012\nIndex-Archive=dbpedia.solrindex.zip\nDescription: DBpedia\n").unwrap();
        assert_eq!(reference.archive_name, "dbpedia.solrindex.zip");
        assert_eq!(reference.properties.get("Description").map(String::as_str), Some("DBpedia"));
        assert!(IndexReference::parse("Description=none").is_err());
    }

    #[test]
    fn entries_outside_the_index_folder_are_skipped() {
        assert_eq!(entry_target("dbpedia/conf/schema.xml", "dbpedia"), Some(PathBuf::from("conf/schema.xml")));
        assert_eq!(entry_target("x/dbpedia/conf/schema.xml", "dbpedia"), Some(PathBuf::from("conf/schema.xml")));
        assert_eq!(entry_target("README", "dbpedia"), None);
        assert_eq!(entry_target("dbpedia/../../etc/passwd", "dbpedia"), None);
    }

    #[test]
    fn extracts_all_formats() {
        let archives = [
            (ArchiveFormat::Zip, zip_archive(&FILES)),
            (ArchiveFormat::TarGz, tar_gz_archive(&FILES)),
            (ArchiveFormat::TarBz2, tar_bz2_archive(&FILES)),
        ];
        for (format, data) in archives {
            let dir = tempfile::tempdir().unwrap();
            let copied = extract(format, Cursor::new(data), dir.path(), "dbpedia").unwrap();
            assert_eq!(copied, 2, "{:?}", format);
            assert_eq!(fs::read_to_string(dir.path().join("conf/schema.xml")).unwrap(), "<schema/>");
            assert!(dir.path().join("data/index/segments_1").is_file());
            assert!(!dir.path().join("README").exists());
        }
    }

    #[test]
    fn corrupt_zip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(ArchiveFormat::Zip, Cursor::new(b"not a zip".to_vec()), dir.path(), "dbpedia").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
