//! Copying a dataset tree before it is stylized in place.

use crate::Error;
use std::{fs, path::Path};

/// Which top level entries of a dataset root are copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySelection {
    /// Every entry
    All,
    /// Only the named entries, in the given order
    Whitelist(Vec<String>),
    /// Every entry except the named ones
    Blacklist(Vec<String>),
}

impl EntrySelection {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Whitelist(names) => names.iter().any(|n| n == name),
            Self::Blacklist(names) => !names.iter().any(|n| n == name),
        }
    }
}

/// Summary of a finished copy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Top level entries that were copied
    pub entries: usize,
    /// Files written below the target root
    pub files: usize,
}

/// Copies the selected top level entries of `source` verbatim to `target`,
/// creating `target` if needed.
///
/// Whitelisted entries missing from `source` are skipped with a warning.
/// Files already present in `target` are overwritten.
pub fn copy_dataset(
    source: &Path,
    target: &Path,
    selection: &EntrySelection,
) -> Result<CopyReport, Error> {
    if !source.is_dir() {
        return Err(Error::MissingDirectory(source.to_owned()));
    }

    fs::create_dir_all(target)?;
    let source = source.canonicalize()?;
    let target = target.canonicalize()?;
    if target.starts_with(&source) {
        return Err(Error::Config {
            path: target,
            reason: format!("the copy target can't be inside '{}'", source.display()),
        });
    }

    let mut report = CopyReport::default();
    for name in selected_entries(&source, selection)? {
        let from = source.join(&name);
        let to = target.join(&name);

        if from.is_file() {
            fs::copy(&from, &to)?;
            report.files += 1;
        } else if from.is_dir() {
            report.files += copy_tree(&from, &to)?;
        } else {
            tracing::warn!(
                "skipping whitelisted entry '{}' because no such file or directory exists in '{}'",
                name,
                source.display()
            );
            continue;
        }

        report.entries += 1;
    }

    tracing::info!(
        entries = report.entries,
        files = report.files,
        "copied dataset from '{}' to '{}'",
        source.display(),
        target.display()
    );

    Ok(report)
}

/// Names of the top level entries of `source` that `selection` copies.
///
/// Whitelisted names are returned as given, whether they exist or not,
/// otherwise the listing of `source` is filtered and sorted.
pub fn selected_entries(source: &Path, selection: &EntrySelection) -> Result<Vec<String>, Error> {
    if let EntrySelection::Whitelist(names) = selection {
        return Ok(names.clone());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(source)? {
        let name = entry?.file_name();
        match name.into_string() {
            Ok(name) if selection.includes(&name) => names.push(name),
            Ok(_) => {}
            Err(name) => {
                tracing::warn!(entry = ?name, "skipping entry with a non UTF-8 name");
            }
        }
    }
    names.sort();

    Ok(names)
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize, Error> {
    fs::create_dir_all(to)?;

    let mut files = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let path = entry.path();
        let dest = to.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            files += copy_tree(&path, &dest)?;
        } else if path.is_file() {
            fs::copy(&path, &dest)?;
            files += 1;
        } else {
            tracing::warn!("not copying '{}', it isn't a regular file", path.display());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout(root: &Path) {
        for (rel, body) in &[
            ("images/train/0.jpg", "a"),
            ("images/val/1.jpg", "b"),
            ("labels/train/0.txt", "c"),
            ("README.md", "d"),
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
    }

    #[test]
    fn copies_everything_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        layout(&src);

        let report = copy_dataset(&src, &dst, &EntrySelection::All).unwrap();
        assert_eq!(report, CopyReport { entries: 3, files: 4 });

        assert_eq!(fs::read_to_string(dst.join("images/val/1.jpg")).unwrap(), "b");
        assert_eq!(fs::read_to_string(dst.join("labels/train/0.txt")).unwrap(), "c");
        assert_eq!(fs::read_to_string(dst.join("README.md")).unwrap(), "d");
    }

    #[test]
    fn whitelist_only_copies_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        layout(&src);

        let selection =
            EntrySelection::Whitelist(vec!["images".to_owned(), "missing".to_owned()]);
        let report = copy_dataset(&src, &dst, &selection).unwrap();

        assert_eq!(report, CopyReport { entries: 1, files: 2 });
        assert!(dst.join("images/train/0.jpg").is_file());
        assert!(!dst.join("labels").exists());
        assert!(!dst.join("README.md").exists());
    }

    #[test]
    fn blacklist_leaves_out_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        layout(&src);

        let selection = EntrySelection::Blacklist(vec!["labels".to_owned()]);
        copy_dataset(&src, &dst, &selection).unwrap();

        assert!(dst.join("images/val/1.jpg").is_file());
        assert!(dst.join("README.md").is_file());
        assert!(!dst.join("labels").exists());
    }

    #[test]
    fn selected_entries_follow_the_selection() {
        let dir = tempfile::tempdir().unwrap();
        layout(dir.path());

        assert_eq!(
            selected_entries(dir.path(), &EntrySelection::All).unwrap(),
            vec!["README.md", "images", "labels"]
        );
        assert_eq!(
            selected_entries(dir.path(), &EntrySelection::Blacklist(vec!["images".to_owned()]))
                .unwrap(),
            vec!["README.md", "labels"]
        );
        assert_eq!(
            selected_entries(dir.path(), &EntrySelection::Whitelist(vec!["gone".to_owned()]))
                .unwrap(),
            vec!["gone"]
        );
    }

    #[test]
    fn target_inside_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        layout(dir.path());

        let err = copy_dataset(dir.path(), &dir.path().join("images/copy"), &EntrySelection::All)
            .unwrap_err();
        assert!(err.is_config());
    }
}
