//! Patch artifacts for operator edits.
//!
//! Every accepted edit of a resource leaves two files in the patch directory:
//! a unified diff and a full copy of the edited content. For a source file
//! `foo.json` the n-th edit produces `foo.json.NNN.patch` and
//! `foo.json.NNN.json`. Sequence numbers count edit events per file name and
//! resume after the highest number already present in the directory.
//! Numbers are padded to three digits so that name order matches edit order;
//! a file can therefore collect at most 999 edits in one patch directory.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;
use tempfile::NamedTempFile;

use crate::error::PatchError;

const PATCH_EXTENSION: &str = "patch";
const EDITED_EXTENSION: &str = "json";

/// Highest sequence number that still fits the three-digit padding.
pub const MAX_SEQUENCE: u32 = 999;

/// Lines of unchanged context around each hunk.
const CONTEXT_RADIUS: usize = 3;

/// Audit record of one edit. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRecord {
    pub original_path: PathBuf,
    pub patch_file_path: PathBuf,
    pub modified_file_path: PathBuf,
    pub sequence_number: u32,
    /// The last edit of a resource that was then uploaded successfully.
    /// Set by the driver; artifacts on disk are not touched.
    pub is_final: bool,
}

/// Writes patch artifacts into one directory.
#[derive(Debug)]
pub struct PatchWriter {
    directory: PathBuf,
    /// Highest sequence number in use per source file name
    sequences: HashMap<String, u32>,
}

impl PatchWriter {
    /// Open a patch directory, creating it if needed, and pick up the sequence
    /// numbers of artifacts left by earlier runs.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, PatchError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        let mut sequences: HashMap<String, u32> = HashMap::new();
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some((source, sequence)) = parse_artifact_name(&name.to_string_lossy()) else {
                continue;
            };
            let current = sequences.entry(source).or_default();
            *current = (*current).max(sequence);
        }

        tracing::debug!(
            directory = %directory.display(),
            tracked_files = sequences.len(),
            "Opened patch directory"
        );

        Ok(Self {
            directory,
            sequences,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Next sequence number that would be allocated for `file_name`.
    pub fn next_sequence(&self, file_name: &str) -> u32 {
        self.sequences.get(file_name).copied().unwrap_or(0) + 1
    }

    /// Record an edit of `original_path` from `original_content` to
    /// `edited_content`.
    ///
    /// Both artifacts are staged as temporary files in the patch directory and
    /// only then moved into place, so a failure leaves neither behind. A failed
    /// write does not consume a sequence number.
    pub fn write_patch(
        &mut self,
        original_path: &Path,
        original_content: &str,
        edited_content: &str,
    ) -> Result<PatchRecord, PatchError> {
        let file_name = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PatchError::InvalidPath(original_path.display().to_string()))?;
        let sequence = self.next_sequence(&file_name);
        if sequence > MAX_SEQUENCE {
            return Err(PatchError::SequenceExhausted(file_name));
        }

        let diff = unified_diff(&file_name, original_content, edited_content);
        let patch_file_path = self.artifact_path(&file_name, sequence, PATCH_EXTENSION);
        let modified_file_path = self.artifact_path(&file_name, sequence, EDITED_EXTENSION);

        let staged_patch = self.stage(&diff)?;
        let staged_edit = self.stage(edited_content)?;

        staged_patch.persist_noclobber(&patch_file_path)?;
        if let Err(e) = staged_edit.persist_noclobber(&modified_file_path) {
            let _ = fs::remove_file(&patch_file_path);
            return Err(e.into());
        }

        self.sequences.insert(file_name, sequence);
        tracing::info!(
            patch = %patch_file_path.display(),
            edited = %modified_file_path.display(),
            "Wrote patch revision {sequence}"
        );

        Ok(PatchRecord {
            original_path: original_path.to_path_buf(),
            patch_file_path,
            modified_file_path,
            sequence_number: sequence,
            is_final: false,
        })
    }

    fn artifact_path(&self, file_name: &str, sequence: u32, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{file_name}.{sequence:03}.{extension}"))
    }

    fn stage(&self, content: &str) -> Result<NamedTempFile, PatchError> {
        let mut file = NamedTempFile::new_in(&self.directory)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        Ok(file)
    }
}

/// Unified diff with `a/` and `b/` headers, as produced by `diff -u`.
pub fn unified_diff(file_name: &str, original: &str, edited: &str) -> String {
    TextDiff::from_lines(original, edited)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(&format!("a/{file_name}"), &format!("b/{file_name}"))
        .to_string()
}

/// Split `foo.json.007.patch` into (`foo.json`, 7).
fn parse_artifact_name(name: &str) -> Option<(String, u32)> {
    let mut parts = name.rsplitn(3, '.');
    let extension = parts.next()?;
    if extension != PATCH_EXTENSION && extension != EDITED_EXTENSION {
        return None;
    }
    let digits = parts.next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let source = parts.next()?;
    if source.is_empty() {
        return None;
    }
    Some((source.to_string(), digits.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "{\n  \"resourceType\": \"CodeSystem\",\n  \"status\": \"draft\"\n}\n";
    const EDITED: &str = "{\n  \"resourceType\": \"CodeSystem\",\n  \"status\": \"active\"\n}\n";

    #[test]
    fn test_parse_artifact_name() {
        assert_eq!(
            parse_artifact_name("foo.json.007.patch"),
            Some(("foo.json".to_string(), 7))
        );
        assert_eq!(
            parse_artifact_name("foo.json.012.json"),
            Some(("foo.json".to_string(), 12))
        );
        assert_eq!(parse_artifact_name("foo.json"), None);
        assert_eq!(parse_artifact_name("foo.json.txt"), None);
        assert_eq!(parse_artifact_name(".001.patch"), None);
        assert_eq!(parse_artifact_name("notes.abc.patch"), None);
    }

    #[test]
    fn test_write_patch_creates_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PatchWriter::open(dir.path()).unwrap();

        let record = writer
            .write_patch(Path::new("/input/cs.json"), ORIGINAL, EDITED)
            .unwrap();

        assert_eq!(record.sequence_number, 1);
        assert_eq!(record.patch_file_path, dir.path().join("cs.json.001.patch"));
        assert_eq!(record.modified_file_path, dir.path().join("cs.json.001.json"));

        let patch = fs::read_to_string(&record.patch_file_path).unwrap();
        assert!(patch.starts_with("--- a/cs.json\n+++ b/cs.json\n"));
        assert!(patch.contains("-  \"status\": \"draft\""));
        assert!(patch.contains("+  \"status\": \"active\""));
        assert_eq!(fs::read_to_string(&record.modified_file_path).unwrap(), EDITED);

        // No staging files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_sequence_numbers_increase_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PatchWriter::open(dir.path()).unwrap();
        let cs = Path::new("cs.json");
        let vs = Path::new("vs.json");

        let first = writer.write_patch(cs, ORIGINAL, EDITED).unwrap();
        let other = writer.write_patch(vs, ORIGINAL, EDITED).unwrap();
        // Reverting to the original content is still a new edit event
        let second = writer.write_patch(cs, EDITED, ORIGINAL).unwrap();
        let third = writer.write_patch(cs, ORIGINAL, EDITED).unwrap();

        assert_eq!(first.sequence_number, 1);
        assert_eq!(other.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);
        assert_eq!(third.sequence_number, 3);
    }

    #[test]
    fn test_sequence_resumes_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut writer = PatchWriter::open(dir.path()).unwrap();
            writer.write_patch(Path::new("cs.json"), ORIGINAL, EDITED).unwrap();
            writer.write_patch(Path::new("cs.json"), EDITED, ORIGINAL).unwrap();
        }
        fs::write(dir.path().join("README.txt"), "unrelated").unwrap();

        let mut writer = PatchWriter::open(dir.path()).unwrap();
        assert_eq!(writer.next_sequence("cs.json"), 3);
        assert_eq!(writer.next_sequence("vs.json"), 1);

        let record = writer.write_patch(Path::new("cs.json"), ORIGINAL, EDITED).unwrap();
        assert_eq!(record.sequence_number, 3);
        assert_eq!(record.patch_file_path, dir.path().join("cs.json.003.patch"));
    }

    #[test]
    fn test_failed_write_leaves_nothing_and_keeps_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PatchWriter::open(dir.path()).unwrap();
        // Occupy the edited-copy name so the second persist fails
        fs::create_dir(dir.path().join("cs.json.001.json")).unwrap();
        let before: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();

        let err = writer.write_patch(Path::new("cs.json"), ORIGINAL, EDITED);
        assert!(err.is_err());
        assert!(!dir.path().join("cs.json.001.patch").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), before.len());
        assert_eq!(writer.next_sequence("cs.json"), 1);
    }

    #[test]
    fn test_sequence_stops_at_three_digits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cs.json.999.patch"), "").unwrap();
        fs::write(dir.path().join("cs.json.999.json"), "{}").unwrap();

        let mut writer = PatchWriter::open(dir.path()).unwrap();
        let err = writer.write_patch(Path::new("cs.json"), ORIGINAL, EDITED).unwrap_err();
        assert!(matches!(err, PatchError::SequenceExhausted(ref name) if name == "cs.json"));
        assert!(!dir.path().join("cs.json.1000.patch").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);

        let other = writer.write_patch(Path::new("vs.json"), ORIGINAL, EDITED).unwrap();
        assert_eq!(other.sequence_number, 1);
        assert!(!other.is_final);
    }

    #[test]
    fn test_write_patch_rejects_path_without_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PatchWriter::open(dir.path()).unwrap();
        let err = writer.write_patch(Path::new("/"), ORIGINAL, EDITED).unwrap_err();
        assert!(matches!(err, PatchError::InvalidPath(_)));
    }
}
