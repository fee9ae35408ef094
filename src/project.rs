//! Project archives
//!
//! A project bundles the title, tempo scalars, main sequence and track
//! texts. It is stored either as a directory (`project.json` plus one
//! `tracks/<id>.s` file per track) or as a single `.mina` file holding
//! gzip-compressed JSON.

use crate::compiler::document::{TempoConfig, DEFAULT_BPM, DEFAULT_FPS, DEFAULT_TITLE};
use crate::compiler::{CompiledDocument, Compiler};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const PROJECT_VERSION: &str = "2.0";

/// Manifest file inside a project directory
pub const MANIFEST_NAME: &str = "project.json";

/// Track directory inside a project directory
pub const TRACKS_DIR: &str = "tracks";

/// Extension of track files
pub const TRACK_EXTENSION: &str = "s";

/// Extension of ZIP project archives
pub const ARCHIVE_EXTENSION: &str = "mina";

/// Extension of gzip-compressed JSON projects
pub const GZIP_EXTENSION: &str = "gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(
        default = "default_fps",
        serialize_with = "as_text",
        deserialize_with = "number_or_string"
    )]
    pub fps: f64,
    #[serde(
        default = "default_bpm",
        serialize_with = "as_text",
        deserialize_with = "number_or_string"
    )]
    pub bpm: f64,
    /// Main-sequence text
    #[serde(default)]
    pub main: String,
    /// Track texts by identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tracks: BTreeMap<String, String>,
}

fn default_version() -> String {
    PROJECT_VERSION.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

/// Accept `24` as well as `"24"`; unparseable text becomes `0`, which the
/// tempo config replaces with its default.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Number(f64),
        Text(String),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => n,
        Scalar::Text(s) => s.trim().parse().unwrap_or(0.0),
    })
}

/// Scalars are written as text, the way the editor stores them
fn as_text<S>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

impl Default for Project {
    fn default() -> Self {
        Self {
            version: default_version(),
            title: default_title(),
            fps: DEFAULT_FPS,
            bpm: DEFAULT_BPM,
            main: String::new(),
            tracks: BTreeMap::new(),
        }
    }
}

impl Project {
    pub fn tempo(&self) -> TempoConfig {
        TempoConfig::new(self.fps, self.bpm, self.title.clone())
    }

    /// Compile the project's main sequence
    pub fn compile(&self) -> CompiledDocument {
        Compiler::with_config(self.tempo()).compile(&self.main, &self.tracks)
    }

    /// Load a project directory or single-file archive
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load_file(path)
        }
    }

    /// Save as a directory, or as a single file when `path` has an extension
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.extension().is_some() && !path.is_dir() {
            self.save_file(path)
        } else {
            self.save_dir(path)
        }
    }

    /// Load `project.json` and every `tracks/*.s` file under `dir`
    ///
    /// Track files override tracks of the same id embedded in the manifest.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let manifest = dir.join(MANIFEST_NAME);
        let data = fs::read(&manifest).map_err(|e| project_error(&manifest, e))?;
        let mut project: Project =
            serde_json::from_slice(&data).map_err(|e| project_error(&manifest, e))?;

        let tracks_dir = dir.join(TRACKS_DIR);
        if tracks_dir.is_dir() {
            project.tracks.extend(read_track_dir(&tracks_dir)?);
        }

        tracing::debug!(
            path = %dir.display(),
            tracks = project.tracks.len(),
            "loaded project directory"
        );
        Ok(project)
    }

    /// Write `project.json` and one file per track under `dir`
    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        let tracks_dir = dir.join(TRACKS_DIR);
        fs::create_dir_all(&tracks_dir)?;

        fs::write(dir.join(MANIFEST_NAME), self.manifest_json()?)?;

        for (id, text) in &self.tracks {
            validate_track_id(id, dir)?;
            let path = tracks_dir.join(format!("{}.{}", id, TRACK_EXTENSION));
            fs::write(path, text)?;
        }
        Ok(())
    }

    /// Load a `.mina` ZIP archive or a JSON project file
    pub fn load_file(path: &Path) -> Result<Self> {
        let data = read_file(path).map_err(|e| project_error(path, e))?;
        if data.starts_with(&ZIP_MAGIC) {
            return Self::read_archive(Cursor::new(data), path);
        }
        serde_json::from_slice(&data).map_err(|e| project_error(path, e))
    }

    /// Write a single-file project
    ///
    /// `.mina` writes a ZIP archive, `.gz` gzip-compressed JSON, anything
    /// else plain JSON.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        let has_extension = |wanted: &str| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
        };

        let file = File::create(path)?;
        if has_extension(ARCHIVE_EXTENSION) {
            self.write_archive(file, path)
        } else if has_extension(GZIP_EXTENSION) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&serde_json::to_vec_pretty(self)?)?;
            encoder.finish()?;
            Ok(())
        } else {
            let mut file = file;
            file.write_all(&serde_json::to_vec_pretty(self)?)?;
            Ok(())
        }
    }

    /// Read `project.json` and every `tracks/<id>.s` entry of a ZIP archive
    fn read_archive<R: Read + Seek>(reader: R, path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|e| project_error(path, e))?;
        let mut manifest = None;
        let mut tracks = BTreeMap::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| project_error(path, e))?;
            if !entry.is_file() {
                continue;
            }
            let name = entry.name().to_string();

            if name == MANIFEST_NAME {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                manifest = Some(data);
            } else if let Some(id) = archive_track_id(&name) {
                let mut text = String::new();
                entry.read_to_string(&mut text)?;
                tracks.insert(id.to_string(), text);
            } else {
                tracing::trace!(entry = %name, "skipping archive entry");
            }
        }

        let data = manifest.ok_or_else(|| project_error(path, "missing project.json"))?;
        let mut project: Project =
            serde_json::from_slice(&data).map_err(|e| project_error(path, e))?;
        project.tracks.extend(tracks);

        tracing::debug!(
            path = %path.display(),
            tracks = project.tracks.len(),
            "loaded project archive"
        );
        Ok(project)
    }

    fn write_archive<W: Write + Seek>(&self, writer: W, path: &Path) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        zip.start_file(MANIFEST_NAME, entry_options())?;
        zip.write_all(self.manifest_json()?.as_bytes())?;

        for (id, text) in &self.tracks {
            validate_track_id(id, path)?;
            let name = format!("{}/{}.{}", TRACKS_DIR, id, TRACK_EXTENSION);
            zip.start_file(name, entry_options())?;
            zip.write_all(text.as_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }

    /// `project.json` contents; tracks live in their own files
    fn manifest_json(&self) -> Result<String> {
        let manifest = Project {
            tracks: BTreeMap::new(),
            ..self.clone()
        };
        Ok(serde_json::to_string_pretty(&manifest)?)
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// `tracks/<id>.s` -> `<id>`; nested paths are not tracks
fn archive_track_id(name: &str) -> Option<&str> {
    let file = name.strip_prefix(TRACKS_DIR)?.strip_prefix('/')?;
    let id = file.strip_suffix(TRACK_EXTENSION)?.strip_suffix('.')?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

/// Read every `<id>.s` file in `dir`, keyed by file stem
pub fn read_track_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut tracks = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_track = path
            .extension()
            .map(|ext| ext == TRACK_EXTENSION)
            .unwrap_or(false);
        if !is_track || !path.is_file() {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping track file with non UTF-8 name");
            continue;
        };
        tracks.insert(id.to_string(), fs::read_to_string(&path)?);
    }

    Ok(tracks)
}

/// Read a file, transparently decompressing gzip data
pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;

    if data.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(data.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    } else {
        Ok(data)
    }
}

fn validate_track_id(id: &str, dir: &Path) -> Result<()> {
    if id.is_empty() || id.contains(|c: char| c == '/' || c == '\\') || id == "." || id == ".." {
        return Err(Error::Project {
            path: dir.to_path_buf(),
            message: format!("invalid track id '{}'", id),
        });
    }
    Ok(())
}

fn project_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Project {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
