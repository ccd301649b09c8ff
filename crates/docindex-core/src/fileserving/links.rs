//! Link creation with platform fallbacks.

use std::io;
use std::path::Path;

/// How a document link ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Symlink,
    Hardlink,
    Copy,
}

/// Create `target` pointing at `source`, falling back to a hard link when
/// symlinks are unavailable. Copies are made separately by [`copy_file`].
pub(crate) fn create_link(source: &Path, target: &Path) -> io::Result<LinkKind> {
    #[cfg(unix)]
    {
        if std::os::unix::fs::symlink(source, target).is_ok() {
            return Ok(LinkKind::Symlink);
        }
    }

    #[cfg(windows)]
    {
        if std::os::windows::fs::symlink_file(source, target).is_ok() {
            return Ok(LinkKind::Symlink);
        }
    }

    std::fs::hard_link(source, target)?;
    Ok(LinkKind::Hardlink)
}

pub(crate) fn copy_file(source: &Path, target: &Path) -> io::Result<LinkKind> {
    std::fs::copy(source, target)?;
    Ok(LinkKind::Copy)
}

/// Whether the entry at `link` is a symlink or hard link to `source`.
pub(crate) fn is_link_to(link: &Path, source: &Path) -> bool {
    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => std::fs::read_link(link)
            .map(|target| target == source)
            .unwrap_or(false),
        Ok(meta) if meta.is_file() => same_file(&meta, source),
        _ => false,
    }
}

/// Whether `link` is a plain copy with the same size as `source`.
pub(crate) fn is_copy_of(link: &Path, source: &Path) -> bool {
    match (std::fs::symlink_metadata(link), std::fs::metadata(source)) {
        (Ok(copy), Ok(original)) => copy.is_file() && copy.len() == original.len(),
        _ => false,
    }
}

/// Whether anything, including a dangling symlink, exists at `path`.
pub(crate) fn entry_exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

fn same_file(link_meta: &std::fs::Metadata, source: &Path) -> bool {
    // Compare device and inode on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata(source)
            .map(|meta| meta.dev() == link_meta.dev() && meta.ino() == link_meta.ino())
            .unwrap_or(false)
    }

    // No stable file identity elsewhere
    #[cfg(not(unix))]
    {
        let _ = (link_meta, source);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_link_and_detect() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.pdf");
        std::fs::write(&source, b"pdf").unwrap();
        let other = temp.path().join("other.pdf");
        std::fs::write(&other, b"other").unwrap();

        let link = temp.path().join("link.pdf");
        create_link(&source, &link).unwrap();
        assert!(entry_exists(&link));
        assert!(is_link_to(&link, &source));
        assert!(!is_link_to(&link, &other));
    }

    #[cfg(unix)]
    #[test]
    fn test_hard_link_matches_only_its_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.pdf");
        std::fs::write(&source, b"pdf").unwrap();
        let other = temp.path().join("other.pdf");
        std::fs::write(&other, b"pdf").unwrap();

        let link = temp.path().join("link.pdf");
        std::fs::hard_link(&source, &link).unwrap();
        assert!(is_link_to(&link, &source));
        assert!(!is_link_to(&link, &other));
    }

    #[test]
    fn test_copy_is_not_a_link() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.pdf");
        std::fs::write(&source, b"pdf").unwrap();

        let copy = temp.path().join("copy.pdf");
        assert_eq!(copy_file(&source, &copy).unwrap(), LinkKind::Copy);
        assert!(!is_link_to(&copy, &source));
        assert!(is_copy_of(&copy, &source));

        std::fs::write(&copy, b"changed").unwrap();
        assert!(!is_copy_of(&copy, &source));
    }

    #[test]
    fn test_missing_entry() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(!entry_exists(&missing));
        assert!(!is_link_to(&missing, temp.path()));
        assert!(!is_copy_of(&missing, temp.path()));
    }
}
