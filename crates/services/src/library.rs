use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use narrator_core::model::{ContentSet, Subject, TrackName};
use narrator_core::parse::parse_content;
use serde::Serialize;
use tracing::{debug, info};

use crate::document::read_docx;
use crate::error::LibraryError;

const MATERIAL_EXTENSIONS: [&str; 3] = ["docx", "txt", "md"];
const TRACK_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub name: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Serializable view of a loaded subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentExport {
    pub subject: String,
    pub qa_pairs: Vec<QaPair>,
    pub songs: Vec<String>,
}

impl From<&ContentSet> for ContentExport {
    fn from(content: &ContentSet) -> Self {
        Self {
            subject: content.subject().as_str().to_string(),
            qa_pairs: content
                .items()
                .iter()
                .map(|item| QaPair {
                    question: item.question().to_string(),
                    answer: item.answer().to_string(),
                })
                .collect(),
            songs: content
                .break_tracks()
                .iter()
                .map(|track| track.as_str().to_string())
                .collect(),
        }
    }
}

/// Study material on disk: one Word or text file per subject plus a folder
/// of break-music tracks.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    material_dir: PathBuf,
    songs_dir: PathBuf,
}

impl MaterialLibrary {
    #[must_use]
    pub fn new(material_dir: impl Into<PathBuf>, songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            material_dir: material_dir.into(),
            songs_dir: songs_dir.into(),
        }
    }

    #[must_use]
    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    /// Subjects available in the material folder, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Io` if the folder exists but cannot be read.
    pub fn list_subjects(&self) -> Result<Vec<SubjectEntry>, LibraryError> {
        let mut subjects: Vec<SubjectEntry> =
            files_with_extension(&self.material_dir, &MATERIAL_EXTENSIONS)?
                .into_iter()
                .filter_map(|file| {
                    let name = file.file_stem()?.to_str()?.to_string();
                    Some(SubjectEntry { name, file })
                })
                .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    /// Break-music tracks, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Io` if the folder exists but cannot be read.
    pub fn list_tracks(&self) -> Result<Vec<TrackName>, LibraryError> {
        let mut names: Vec<String> = files_with_extension(&self.songs_dir, &TRACK_EXTENSIONS)?
            .into_iter()
            .filter_map(|file| file.file_name()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        Ok(names.into_iter().map(TrackName::new).collect())
    }

    /// Read and parse one subject.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::SubjectNotFound` for unknown names,
    /// `LibraryError::Content` when the file holds no usable Q&A,
    /// `LibraryError::Document` for unreadable Word files and
    /// `LibraryError::Io` on read failures.
    pub fn load(&self, name: &str) -> Result<ContentSet, LibraryError> {
        let entry = self
            .list_subjects()?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| LibraryError::SubjectNotFound(name.to_string()))?;

        let text = read_material(&entry.file)?;
        let subject = Subject::parse(entry.name)?;
        let content = parse_content(subject, &text, self.list_tracks()?)?;
        info!(
            subject = %content.subject(),
            items = content.len(),
            tracks = content.break_tracks().len(),
            "material loaded"
        );
        Ok(content)
    }

    /// Load a subject and return its exportable form.
    ///
    /// # Errors
    ///
    /// See [`MaterialLibrary::load`].
    pub fn export(&self, name: &str) -> Result<ContentExport, LibraryError> {
        self.load(name).map(|content| ContentExport::from(&content))
    }
}

fn read_material(file: &Path) -> Result<String, LibraryError> {
    let is_docx = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    if is_docx {
        read_docx(file)
    } else {
        Ok(fs::read_to_string(file)?)
    }
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, LibraryError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "folder missing; treating as empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::docx_bytes;
    use tempfile::TempDir;

    fn library() -> (TempDir, MaterialLibrary) {
        let root = tempfile::tempdir().unwrap();
        let material = root.path().join("material");
        let songs = root.path().join("songs");
        fs::create_dir_all(&material).unwrap();
        fs::create_dir_all(&songs).unwrap();

        fs::write(material.join("physics.txt"), "What is force?\nMass times acceleration.\n").unwrap();
        fs::write(material.join("algebra.md"), "What is x?\nAn unknown.\n").unwrap();
        fs::write(
            material.join("biology.docx"),
            docx_bytes(&["What is ATP?", "The energy currency", "of the cell."]),
        )
        .unwrap();
        fs::write(material.join("notes.pdf"), "ignored").unwrap();
        fs::write(material.join("empty.txt"), "\n\n").unwrap();
        fs::write(songs.join("calm.mp3"), b"").unwrap();
        fs::write(songs.join("rain.WAV"), b"").unwrap();
        fs::write(songs.join("cover.jpg"), b"").unwrap();

        let lib = MaterialLibrary::new(material, songs);
        (root, lib)
    }

    #[test]
    fn lists_subjects_sorted_by_name() {
        let (_root, lib) = library();
        let names: Vec<_> = lib
            .list_subjects()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["algebra", "biology", "empty", "physics"]);
    }

    #[test]
    fn lists_only_audio_tracks() {
        let (_root, lib) = library();
        let tracks = lib.list_tracks().unwrap();
        let names: Vec<_> = tracks.iter().map(TrackName::as_str).collect();
        assert_eq!(names, vec!["calm.mp3", "rain.WAV"]);
    }

    #[test]
    fn loads_subject_with_tracks() {
        let (_root, lib) = library();
        let content = lib.load("physics").unwrap();
        assert_eq!(content.subject().as_str(), "physics");
        assert_eq!(content.len(), 1);
        assert_eq!(content.items()[0].answer(), "Mass times acceleration.");
        assert_eq!(content.break_tracks().len(), 2);
    }

    #[test]
    fn loads_word_documents() {
        let (_root, lib) = library();
        let content = lib.load("biology").unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content.items()[0].question(), "What is ATP?");
        assert_eq!(content.items()[0].answer(), "The energy currency of the cell.");
    }

    #[test]
    fn unknown_subject_is_not_found() {
        let (_root, lib) = library();
        let err = lib.load("chemistry").unwrap_err();
        assert!(matches!(err, LibraryError::SubjectNotFound(name) if name == "chemistry"));
    }

    #[test]
    fn blank_material_is_a_content_error() {
        let (_root, lib) = library();
        let err = lib.load("empty").unwrap_err();
        assert!(matches!(err, LibraryError::Content(_)));
    }

    #[test]
    fn missing_folders_are_empty() {
        let root = tempfile::tempdir().unwrap();
        let lib = MaterialLibrary::new(root.path().join("nope"), root.path().join("none"));
        assert!(lib.list_subjects().unwrap().is_empty());
        assert!(lib.list_tracks().unwrap().is_empty());
    }

    #[test]
    fn export_serializes_pairs_and_songs() {
        let (_root, lib) = library();
        let json = serde_json::to_value(lib.export("algebra").unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "subject": "algebra",
                "qa_pairs": [{ "question": "What is x?", "answer": "An unknown." }],
                "songs": ["calm.mp3", "rain.WAV"],
            })
        );
    }
}
