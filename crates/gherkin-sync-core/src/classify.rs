//! Change classification.
//!
//! Converts `git diff --name-status` records into typed [`FileChange`]s,
//! keeping only spec files. Records that do not have the expected shape
//! are dropped without error.

use crate::models::{FileChange, FileStatus};

/// Extension that marks a spec file.
pub const DEFAULT_EXTENSION: &str = ".feature";

/// Classify raw diff records, preserving their order.
///
/// Records whose paths all lack `extension` are dropped, as are malformed
/// records (see [`parse_diff_record`]).
pub fn classify_diff<I, S>(records: I, extension: &str) -> Vec<FileChange>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    records
        .into_iter()
        .filter_map(|record| parse_diff_record(record.as_ref()))
        .filter(|change| is_spec_change(change, extension))
        .collect()
}

/// Synthesize changes for an initial sync: every tracked spec file is
/// an addition.
pub fn classify_initial<I, S>(tracked_files: I, extension: &str) -> Vec<FileChange>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tracked_files
        .into_iter()
        .map(|path| path.as_ref().trim().to_string())
        .filter(|path| is_spec_path(path, extension))
        .map(FileChange::added)
        .collect()
}

/// Parse one diff record: a status token followed by one or two paths.
///
/// Fields are tab-separated as git prints them; whitespace separation is
/// accepted for records without tabs. `old_path` is set only for deletions
/// and renames, `new_path` only for additions, modifications and renames,
/// falling back to the single path when only one is given.
pub fn parse_diff_record(record: &str) -> Option<FileChange> {
    let record = record.trim_end_matches(['\r', '\n']);
    let tokens: Vec<&str> = if record.contains('\t') {
        record.split('\t').filter(|t| !t.is_empty()).collect()
    } else {
        record.split_whitespace().collect()
    };

    let (status, first, second) = match tokens.as_slice() {
        [status, first] => (*status, *first, None),
        [status, first, second] => (*status, *first, Some(*second)),
        _ => return None,
    };
    let status = FileStatus::parse(status.trim())?;

    let old_path = match status {
        FileStatus::Deleted | FileStatus::Renamed { .. } => Some(first.to_string()),
        FileStatus::Added | FileStatus::Modified => None,
    };
    let new_path = match status {
        FileStatus::Added | FileStatus::Modified | FileStatus::Renamed { .. } => {
            Some(second.unwrap_or(first).to_string())
        }
        FileStatus::Deleted => None,
    };

    Some(FileChange {
        status,
        old_path,
        new_path,
    })
}

pub fn is_spec_path(path: &str, extension: &str) -> bool {
    path.ends_with(extension)
}

fn is_spec_change(change: &FileChange, extension: &str) -> bool {
    [&change.old_path, &change.new_path]
        .into_iter()
        .flatten()
        .any(|path| is_spec_path(path, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_status() {
        assert_eq!(
            parse_diff_record("A\tfeatures/new.feature"),
            Some(FileChange::added("features/new.feature"))
        );
        assert_eq!(
            parse_diff_record("M\tfeatures/edit.feature"),
            Some(FileChange::modified("features/edit.feature"))
        );
        assert_eq!(
            parse_diff_record("D\tfeatures/gone.feature"),
            Some(FileChange::deleted("features/gone.feature"))
        );
        assert_eq!(
            parse_diff_record("R097\tfeatures/old.feature\tfeatures/new.feature"),
            Some(FileChange::renamed(
                "features/old.feature",
                "features/new.feature",
                97
            ))
        );
    }

    #[test]
    fn test_parse_paths_with_spaces() {
        let change = parse_diff_record("R100\tfeatures/my old.feature\tfeatures/my new.feature")
            .unwrap();
        assert_eq!(change.old_path.as_deref(), Some("features/my old.feature"));
        assert_eq!(change.new_path.as_deref(), Some("features/my new.feature"));
    }

    #[test]
    fn test_parse_whitespace_separated() {
        assert_eq!(
            parse_diff_record("M   features/a.feature"),
            Some(FileChange::modified("features/a.feature"))
        );
    }

    #[test]
    fn test_rename_with_single_path_uses_it_for_both() {
        let change = parse_diff_record("R100\tfeatures/a.feature").unwrap();
        assert_eq!(change.old_path.as_deref(), Some("features/a.feature"));
        assert_eq!(change.new_path.as_deref(), Some("features/a.feature"));
    }

    #[test]
    fn test_malformed_records_dropped() {
        assert_eq!(parse_diff_record(""), None);
        assert_eq!(parse_diff_record("M"), None);
        assert_eq!(parse_diff_record("?\tfoo.feature"), None);
        assert_eq!(parse_diff_record("C075\ta.feature\tb.feature"), None);
        assert_eq!(parse_diff_record("M\ta\tb\tc"), None);
        assert_eq!(parse_diff_record("modified: a.feature"), None);
    }

    #[test]
    fn test_classify_filters_non_spec_files() {
        let records = [
            "M\tsrc/main.rs",
            "A\tfeatures/login.feature",
            "",
            "garbage",
            "D\tREADME.md",
            "R100\tdocs/spec.txt\tfeatures/spec.feature",
            "R090\tfeatures/moved.feature\tarchive/moved.txt",
        ];
        let changes = classify_diff(records, DEFAULT_EXTENSION);
        assert_eq!(
            changes,
            vec![
                FileChange::added("features/login.feature"),
                FileChange::renamed("docs/spec.txt", "features/spec.feature", 100),
                FileChange::renamed("features/moved.feature", "archive/moved.txt", 90),
            ]
        );
    }

    #[test]
    fn test_classify_initial() {
        let files = ["features/a.feature", "Cargo.toml", "features/b/c.feature\n"];
        let changes = classify_initial(files, DEFAULT_EXTENSION);
        assert_eq!(
            changes,
            vec![
                FileChange::added("features/a.feature"),
                FileChange::added("features/b/c.feature"),
            ]
        );
        assert!(changes.iter().all(|c| c.old_path.is_none()));
    }

    #[test]
    fn test_custom_extension() {
        let changes = classify_diff(["A\tspecs/a.story", "A\tspecs/b.feature"], ".story");
        assert_eq!(changes, vec![FileChange::added("specs/a.story")]);
    }
}
