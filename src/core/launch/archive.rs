// ─── Archive Introspection ───
// Reads jar directory listings and the embedded manifest only.
// Nothing inside an archive is ever executed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// What an archive can be used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// Well-formed, non-empty, declares `Main-Class`.
    Runnable { main_class: String },
    /// Well-formed and non-empty, but no entry point.
    Readable,
    /// Missing, empty or malformed; carries the reason.
    Invalid(String),
}

impl ArchiveStatus {
    pub fn is_runnable(&self) -> bool {
        matches!(self, ArchiveStatus::Runnable { .. })
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self, ArchiveStatus::Invalid(_))
    }
}

pub fn inspect_archive(path: &Path) -> ArchiveStatus {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => return ArchiveStatus::Invalid(format!("cannot open: {err}")),
    };
    match file.metadata() {
        Ok(meta) if meta.len() == 0 => return ArchiveStatus::Invalid("file is empty".into()),
        Ok(meta) if !meta.is_file() => return ArchiveStatus::Invalid("not a file".into()),
        Err(err) => return ArchiveStatus::Invalid(format!("cannot stat: {err}")),
        _ => {}
    }

    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(err) => return ArchiveStatus::Invalid(format!("not a valid archive: {err}")),
    };
    if archive.is_empty() {
        return ArchiveStatus::Invalid("archive has no entries".into());
    }

    match read_main_class(&mut archive) {
        Some(main_class) => ArchiveStatus::Runnable { main_class },
        None => ArchiveStatus::Readable,
    }
}

fn read_main_class<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Option<String> {
    let mut entry = archive.by_name(MANIFEST_ENTRY).ok()?;
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw).ok()?;
    parse_main_class(&String::from_utf8_lossy(&raw))
}

/// Extract `Main-Class` from manifest text, joining continuation lines.
pub fn parse_main_class(manifest: &str) -> Option<String> {
    let mut logical: Vec<String> = Vec::new();
    for line in manifest.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(continued) = line.strip_prefix(' ') {
            if let Some(last) = logical.last_mut() {
                last.push_str(continued);
                continue;
            }
        }
        logical.push(line.to_string());
    }

    logical.iter().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("Main-Class") {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

/// `a.b.C` -> `a/b/C.class`
pub fn class_entry_name(class_name: &str) -> String {
    format!("{}.class", class_name.trim().replace('.', "/"))
}

/// Whether a classpath entry (archive or class directory) holds `class_name`.
pub fn entry_contains_class(entry: &Path, class_name: &str) -> bool {
    let wanted = class_entry_name(class_name);
    if entry.is_dir() {
        return entry.join(&wanted).is_file();
    }

    let Ok(file) = File::open(entry) else {
        return false;
    };
    let Ok(archive) = ZipArchive::new(file) else {
        return false;
    };
    let found = archive.file_names().any(|name| name == wanted);
    found
}

/// Whether any entry of `classpath` holds `class_name`.
pub fn classpath_contains_class<P: AsRef<Path>>(classpath: &[P], class_name: &str) -> bool {
    classpath
        .iter()
        .any(|entry| entry_contains_class(entry.as_ref(), class_name))
}
