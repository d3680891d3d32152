//! Shared helpers for Office Open XML containers (`.docx`, `.pptx`).

use crate::error::Ocr2MdError;
use quick_xml::events::BytesStart;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub(crate) type Archive = zip::ZipArchive<File>;

/// Open the zip container; anything unreadable is a corrupt document.
pub(crate) fn open_archive(path: &Path) -> Result<Archive, Ocr2MdError> {
    let file = File::open(path).map_err(|e| Ocr2MdError::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    zip::ZipArchive::new(file).map_err(|e| Ocr2MdError::CorruptDocument {
        path: path.to_path_buf(),
        detail: format!("invalid zip container: {}", e),
    })
}

/// Read a part as UTF-8. `Ok(None)` when the part does not exist.
pub(crate) fn read_part(
    archive: &mut Archive,
    path: &Path,
    name: &str,
) -> Result<Option<String>, Ocr2MdError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(Ocr2MdError::CorruptDocument {
                path: path.to_path_buf(),
                detail: format!("{}: {}", name, e),
            })
        }
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| Ocr2MdError::CorruptDocument {
            path: path.to_path_buf(),
            detail: format!("{}: {}", name, e),
        })?;
    Ok(Some(xml))
}

/// Read a part that must exist.
pub(crate) fn require_part(
    archive: &mut Archive,
    path: &Path,
    name: &str,
) -> Result<String, Ocr2MdError> {
    read_part(archive, path, name)?.ok_or_else(|| Ocr2MdError::CorruptDocument {
        path: path.to_path_buf(),
        detail: format!("missing part {}", name),
    })
}

/// A part that is not well-formed XML makes the whole container corrupt.
pub(crate) fn malformed(path: &Path, part: &str, e: quick_xml::Error) -> Ocr2MdError {
    Ocr2MdError::CorruptDocument {
        path: path.to_path_buf(),
        detail: format!("{}: malformed XML: {}", part, e),
    }
}

/// Element name without its namespace prefix.
pub(crate) fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Value of the attribute whose local name is `key`.
pub(crate) fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        (a.key.local_name().as_ref() == key.as_bytes())
            .then(|| String::from_utf8_lossy(&a.value).into_owned())
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    #[test]
    fn attr_matches_local_name() {
        let mut reader = Reader::from_str(r#"<w:pStyle w:val="Heading1"/>"#);
        match reader.read_event().unwrap() {
            Event::Empty(e) => {
                assert_eq!(local_name(&e), "pStyle");
                assert_eq!(attr(&e, "val").as_deref(), Some("Heading1"));
                assert_eq!(attr(&e, "missing"), None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn non_zip_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.docx");
        std::fs::write(&path, b"PK\x03\x04 not really a zip").unwrap();
        let err = open_archive(&path).unwrap_err();
        assert!(matches!(err, Ocr2MdError::CorruptDocument { .. }), "{err}");
    }

    #[test]
    fn missing_part_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write_container(dir.path(), "a.docx", &[("a.xml", "<a/>")]);
        let mut archive = open_archive(&path).unwrap();
        assert_eq!(read_part(&mut archive, &path, "a.xml").unwrap().as_deref(), Some("<a/>"));
        assert!(read_part(&mut archive, &path, "b.xml").unwrap().is_none());
        assert!(require_part(&mut archive, &path, "b.xml").is_err());
    }
}
