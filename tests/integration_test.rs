//! Integration tests for mimi compilation
//!
//! These tests compile main sequences to mimi text and verify the output
//! with the MimiReader model, plus project archive round trips.

use pretty_assertions::assert_eq;
use mimick::compiler::document::TempoConfig;
use mimick::compiler::sequence::CompileWarning;
use mimick::mimi::{MimiReader, MimiRecord, MimiSong};
use mimick::project::Project;
use mimick::Compiler;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const DEMO_MAIN: &str = "# Main Loop
# TrackID, Start, PitchOff, Vol, Pan
00, 0, 0, 255, 128
00, 48, 4, 255, 128
01, 0, 0, 180, 80";

const DEMO_DRUMS: &str = "# Drum Pattern
04, 0x24, 2, 0, 255, 128
04, 0x24, 2, 12, 180, 128
04, 0x24, 2, 24, 255, 128
04, 0x24, 2, 36, 180, 128";

const DEMO_BASS: &str = "# Bass Line
02, 0x18, 12, 0, 200, 128
02, 0x1B, 12, 24, 200, 128";

fn demo_tracks() -> BTreeMap<String, String> {
    let mut tracks = BTreeMap::new();
    tracks.insert("00".to_string(), DEMO_DRUMS.to_string());
    tracks.insert("01".to_string(), DEMO_BASS.to_string());
    tracks
}

/// Helper to compile and re-read the output the way the player does
fn compile_and_parse(main: &str, tracks: &BTreeMap<String, String>) -> MimiSong {
    let text = Compiler::new().compile(main, tracks).to_text();
    MimiReader::new(&text).parse()
}

fn body_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}

// =============================================================================
// End-to-end compilation
// =============================================================================

#[test]
fn test_single_note_then_next() {
    let mut tracks = BTreeMap::new();
    tracks.insert("00".to_string(), "04, 0x24, 2, 0, 255, 128".to_string());

    let doc = Compiler::new().compile("00, 0, 0, 255, 128\n00, next", &tracks);
    let text = doc.to_text();

    assert_eq!(
        body_lines(&text),
        vec![
            "04, 24, 0002, 00000000, FF, 80",
            "04, 24, 0002, 00000002, FF, 80",
        ]
    );
    assert_eq!(doc.end_frame, 4);
}

#[test]
fn test_demo_song_document() {
    let config = TempoConfig::new(24.0, 120.0, "Demo");
    let text = Compiler::with_config(config)
        .compile(DEMO_MAIN, &demo_tracks())
        .to_text();

    let expected = "\
# Mimi Music Format v2.0
# Title: Demo
# Config: 120BPM, 24FPS (1beat=12f / 1bar=48f)
# Format: Type, Pitch, Length, Start, Volume, Pan[, Attack, Release[ ; Slide]]

04, 24, 0002, 00000000, FF, 80
04, 24, 0002, 0000000C, B4, 80
04, 24, 0002, 00000018, FF, 80
04, 24, 0002, 00000024, B4, 80
04, 28, 0002, 00000030, FF, 80
04, 28, 0002, 0000003C, B4, 80
04, 28, 0002, 00000048, FF, 80
04, 28, 0002, 00000054, B4, 80
02, 18, 000C, 00000000, 8D, 80
02, 1B, 000C, 00000018, 8D, 80
";
    assert_eq!(text, expected);
}

#[test]
fn test_sequential_composition_with_next() {
    let main = "00, 0\n01, next\n00, next\n01, +12";
    let song = compile_and_parse(main, &demo_tracks());

    let starts: Vec<u64> = song.notes().map(|n| n.start).collect();
    // drums: 0..38, bass: 38..74, drums: 74..112, bass at 112 + 12
    assert_eq!(
        starts,
        vec![0, 12, 24, 36, 38, 62, 74, 86, 98, 110, 124, 148]
    );
    assert_eq!(song.end_frame(), 160);
}

#[test]
fn test_unknown_track_is_skipped_with_warning() {
    let doc = Compiler::new().compile("01, 0\n# gap\nzz, next\n01, next", &demo_tracks());

    assert_eq!(
        doc.warnings,
        vec![CompileWarning::UnknownTrack {
            track: "zz".to_string(),
            line: 3,
        }]
    );
    assert_eq!(doc.warnings[0].to_string(), "Track zz not found at line 3");

    let song = MimiReader::new(&doc.to_text()).parse();
    let starts: Vec<u64> = song.notes().map(|n| n.start).collect();
    assert_eq!(starts, vec![0, 24, 36, 60]);
}

#[test]
fn test_passthrough_and_pcm_records() {
    let mut tracks = demo_tracks();
    tracks.insert(
        "fx".to_string(),
        "0x0F, 6, crash, 0\n01, 40, 3, 0, 255, 128, 2, 4;3".to_string(),
    );

    let text = Compiler::new()
        .compile("@# Loop: 0\nfx, 0x10\n@END", &tracks)
        .to_text();

    assert_eq!(
        body_lines(&text),
        vec![
            "0F, 00000016, crash",
            "01, 28, 0003, 00000010, FF, 80, 02, 04 ; 03",
            "END",
        ]
    );
    assert!(text.contains("\n# Loop: 0\n"));

    let song = MimiReader::new(&text).parse();
    assert!(matches!(
        &song.records[0],
        MimiRecord::Pcm { start: 0x16, payload } if payload == "crash"
    ));
    assert!(matches!(&song.records[2], MimiRecord::Raw { text } if text == "END"));
}

#[test]
fn test_pcm_extent_is_its_start_offset() {
    let mut tracks = BTreeMap::new();
    tracks.insert("pcm".to_string(), "0F, 30, vox, 0".to_string());
    tracks.insert("n".to_string(), "01, 1, 1, 0".to_string());

    let doc = Compiler::new().compile("pcm, 10\nn, next", &tracks);
    let song = MimiReader::new(&doc.to_text()).parse();

    assert_eq!(song.notes().next().map(|n| n.start), Some(40));
    assert_eq!(doc.end_frame, 41);
}

#[test]
fn test_volume_and_pitch_scaling() {
    let song = compile_and_parse("01, 0, -2, 128, 10", &demo_tracks());
    let notes: Vec<_> = song.notes().collect();

    // 200 * 128 / 255 = 100.39
    assert_eq!(notes[0].volume, 100);
    assert_eq!(notes[0].pitch, 0x16);
    assert_eq!(notes[1].pitch, 0x19);
    // explicit per-note pan wins over the placement pan
    assert!(notes.iter().all(|n| n.pan == 128));

    let mut tracks = BTreeMap::new();
    tracks.insert("p".to_string(), "01, 1, 1, 0, 255".to_string());
    let song = compile_and_parse("p, 0, 0, 255, 10", &tracks);
    assert_eq!(song.notes().next().map(|n| n.pan), Some(10));
}

#[test]
fn test_active_notes_monitor() {
    let song = compile_and_parse(DEMO_MAIN, &demo_tracks());

    let at_zero: Vec<u64> = song.active_at(0).map(|n| n.pitch).collect();
    assert_eq!(at_zero, vec![0x24, 0x18]);

    let at_two: Vec<u64> = song.active_at(2).map(|n| n.pitch).collect();
    assert_eq!(at_two, vec![0x18]);

    assert_eq!(song.header.frames_per_beat, Some(12));
}

#[test]
fn test_passthrough_record_lookalike_reads_as_raw() {
    let doc = Compiler::new().compile("@A, B, C, D, E, G\n00, 0", &demo_tracks());
    let song = MimiReader::new(&doc.to_text()).parse();

    assert_eq!(
        song.records[0],
        MimiRecord::Raw {
            text: "A, B, C, D, E, G".to_string()
        }
    );
    assert_eq!(song.notes().count(), 4);
}

#[test]
fn test_solo_compile() {
    let doc = Compiler::new().compile_solo("01", &demo_tracks()).unwrap();
    let text = doc.to_text();
    assert_eq!(
        body_lines(&text),
        vec!["02, 18, 000C, 00000000, C8, 80", "02, 1B, 000C, 00000018, C8, 80"]
    );
    assert!(Compiler::new().compile_solo("02", &demo_tracks()).is_err());
}

// =============================================================================
// Project archives
// =============================================================================

fn demo_project() -> Project {
    Project {
        title: "Demo".to_string(),
        fps: 30.0,
        bpm: 90.0,
        main: DEMO_MAIN.to_string(),
        tracks: demo_tracks(),
        ..Project::default()
    }
}

#[test]
fn test_project_directory_round_trip() {
    let dir = tempdir().unwrap();
    let project = demo_project();

    project.save_dir(dir.path()).unwrap();
    assert!(dir.path().join("project.json").is_file());
    assert!(dir.path().join("tracks").join("00.s").is_file());

    let loaded = Project::load(dir.path()).unwrap();
    assert_eq!(loaded, project);
}

#[test]
fn test_project_archive_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mina");
    let project = demo_project();

    project.save(&path).unwrap();
    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[..4], b"PK\x03\x04");

    let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["project.json", "tracks/00.s", "tracks/01.s"]);

    let mut manifest = String::new();
    archive
        .by_name("project.json")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["fps"], "30");
    assert_eq!(manifest["bpm"], "90");
    assert_eq!(manifest["version"], "2.0");

    let loaded = Project::load(&path).unwrap();
    assert_eq!(loaded, project);
    assert_eq!(loaded.compile(), project.compile());
}

#[test]
fn test_load_editor_written_archive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mySong.mina");

    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    zip.start_file("project.json", SimpleFileOptions::default()).unwrap();
    zip.write_all(
        br#"{
  "title": "Editor",
  "fps": "24",
  "bpm": "120",
  "main": "00, 0\n01, next",
  "version": "2.0"
}"#,
    )
    .unwrap();
    zip.add_directory("tracks/", SimpleFileOptions::default()).unwrap();
    zip.start_file("tracks/00.s", SimpleFileOptions::default()).unwrap();
    zip.write_all(DEMO_DRUMS.as_bytes()).unwrap();
    zip.start_file("tracks/01.s", SimpleFileOptions::default()).unwrap();
    zip.write_all(DEMO_BASS.as_bytes()).unwrap();
    zip.start_file("tracks/notes.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"ignored").unwrap();
    zip.finish().unwrap();

    let project = Project::load(&path).unwrap();
    assert_eq!(project.title, "Editor");
    assert_eq!(project.fps, 24.0);
    assert_eq!(project.bpm, 120.0);
    assert_eq!(project.tracks, demo_tracks());

    let song = MimiReader::new(&project.compile().to_text()).parse();
    assert_eq!(song.notes().count(), 6);
    assert_eq!(song.header.title.as_deref(), Some("Editor"));
}

#[test]
fn test_archive_without_manifest_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.mina");

    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    zip.start_file("tracks/00.s", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(DEMO_DRUMS.as_bytes()).unwrap();
    zip.finish().unwrap();

    let err = Project::load(&path).unwrap_err();
    assert!(matches!(err, mimick::Error::Project { .. }));
}

#[test]
fn test_project_gzip_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.json.gz");
    let project = demo_project();

    project.save(&path).unwrap();
    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    assert_eq!(Project::load(&path).unwrap(), project);
}

#[test]
fn test_project_with_string_scalars() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("project.json"),
        r#"{"title":"Old","fps":"24","bpm":"120","main":"00, 0","version":"2.0"}"#,
    )
    .unwrap();
    std::fs::create_dir(dir.path().join("tracks")).unwrap();
    std::fs::write(dir.path().join("tracks").join("00.s"), "04, 0x24, 2, 0").unwrap();
    std::fs::write(dir.path().join("tracks").join("notes.txt"), "ignored").unwrap();

    let project = Project::load(dir.path()).unwrap();
    assert_eq!(project.tracks.len(), 1);

    let doc = project.compile();
    assert!(doc.header.contains("# Title: Old"));
    assert!(doc.header.contains("120BPM, 24FPS"));
    assert_eq!(doc.lines.len(), 1);
}

#[test]
fn test_missing_project_is_an_error() {
    let dir = tempdir().unwrap();
    let err = Project::load(dir.path()).unwrap_err();
    assert!(matches!(err, mimick::Error::Project { .. }));
}
