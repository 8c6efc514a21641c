//! Discovery of the images making up a dataset.

use crate::Error;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// The file extensions searched for when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Recursively finds every file below `root` whose extension is one of
/// `extensions`, compared case sensitively.
///
/// When `subdirs` is given only those directories of `root` are searched.
/// Paths are absolute, deduplicated and sorted, so indexing into the result
/// is stable from run to run. Finding nothing is an error.
pub fn find_images<S: AsRef<str>>(
    root: &Path,
    extensions: &[S],
    subdirs: Option<&[String]>,
) -> Result<Vec<PathBuf>, Error> {
    if extensions.is_empty() {
        return Err(Error::NoExtensions);
    }

    if !root.is_dir() {
        return Err(Error::MissingDirectory(root.to_owned()));
    }
    let root = root.canonicalize()?;

    let mut found = BTreeSet::new();
    match subdirs {
        Some(subdirs) => {
            for subdir in subdirs {
                let dir = root.join(subdir);
                if !dir.is_dir() {
                    return Err(Error::InvalidImageDir(subdir.clone()));
                }
                collect(&dir, extensions, &mut found)?;
            }
        }
        None => collect(&root, extensions, &mut found)?,
    }

    non_empty(root, extensions, found)
}

/// Like [`find_images`], restricted to the named top level `entries` of
/// `root`. Entries may be directories, searched recursively, or image files
/// themselves; entries that don't exist are ignored.
pub fn find_images_in_entries<S: AsRef<str>>(
    root: &Path,
    extensions: &[S],
    entries: &[String],
) -> Result<Vec<PathBuf>, Error> {
    if extensions.is_empty() {
        return Err(Error::NoExtensions);
    }

    if !root.is_dir() {
        return Err(Error::MissingDirectory(root.to_owned()));
    }
    let root = root.canonicalize()?;

    let mut found = BTreeSet::new();
    for entry in entries {
        let path = root.join(entry);
        if path.is_dir() {
            collect(&path, extensions, &mut found)?;
        } else if path.is_file() && has_extension(&path, extensions) {
            found.insert(path);
        }
    }

    non_empty(root, extensions, found)
}

fn non_empty<S: AsRef<str>>(
    root: PathBuf,
    extensions: &[S],
    found: BTreeSet<PathBuf>,
) -> Result<Vec<PathBuf>, Error> {
    if found.is_empty() {
        return Err(Error::EmptyDataset {
            root,
            extensions: extensions.iter().map(|e| e.as_ref().to_owned()).collect(),
        });
    }

    Ok(found.into_iter().collect())
}

fn collect<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
    found: &mut BTreeSet<PathBuf>,
) -> Result<(), Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // Symlinked directories aren't followed, they could form a cycle
        if entry.file_type()?.is_dir() {
            collect(&path, extensions, found)?;
        } else if path.is_file() && has_extension(&path, extensions) {
            found.insert(path);
        }
    }

    Ok(())
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.as_ref() == ext),
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_matching_files_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        for rel in &["b.jpg", "a/c.png", "a/deep/er/d.jpeg", "z/e.jpg"] {
            touch(dir.path(), rel);
        }
        for rel in &["notes.txt", "a/f.JPG", "a/deep/g.gif", "jpg"] {
            touch(dir.path(), rel);
        }

        let found = find_images(dir.path(), DEFAULT_EXTENSIONS, None).unwrap();
        let root = dir.path().canonicalize().unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_str().unwrap().to_owned())
            .collect();

        assert_eq!(rel, vec!["a/c.png", "a/deep/er/d.jpeg", "b.jpg", "z/e.jpg"]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn repeated_extensions_do_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "x/1.png");
        touch(dir.path(), "2.png");

        let found = find_images(dir.path(), &["png", "png"], None).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn restricted_to_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "train/1.jpg");
        touch(dir.path(), "val/2.jpg");
        touch(dir.path(), "labels/3.jpg");

        let subdirs = vec!["val".to_owned(), "train".to_owned()];
        let found = find_images(dir.path(), &["jpg"], Some(&subdirs)).unwrap();

        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["1.jpg", "2.jpg"]);
    }

    #[test]
    fn restricted_to_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cover.png");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "train/a/1.jpg");
        touch(dir.path(), "previews/2.jpg");

        let entries = vec![
            "train".to_owned(),
            "cover.png".to_owned(),
            "notes.txt".to_owned(),
            "missing".to_owned(),
        ];
        let found = find_images_in_entries(dir.path(), DEFAULT_EXTENSIONS, &entries).unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(found, vec![root.join("cover.png"), root.join("train/a/1.jpg")]);

        let entries = vec!["notes.txt".to_owned(), "missing".to_owned()];
        assert!(matches!(
            find_images_in_entries(dir.path(), DEFAULT_EXTENSIONS, &entries),
            Err(Error::EmptyDataset { .. })
        ));
    }

    #[test]
    fn missing_subdir_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "train/1.jpg");

        let subdirs = vec!["test".to_owned()];
        assert!(matches!(
            find_images(dir.path(), &["jpg"], Some(&subdirs)),
            Err(Error::InvalidImageDir(d)) if d == "test"
        ));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.md");

        let err = find_images(dir.path(), DEFAULT_EXTENSIONS, None).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn missing_root_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            find_images(&missing, DEFAULT_EXTENSIONS, None),
            Err(Error::MissingDirectory(_))
        ));

        let none: &[&str] = &[];
        assert!(matches!(
            find_images(dir.path(), none, None),
            Err(Error::NoExtensions)
        ));
    }
}
