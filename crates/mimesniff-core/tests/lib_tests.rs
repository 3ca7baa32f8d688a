//! Detection tests against the built-in rule database.
//!
//! These exercise the public API surface of mimesniff-core: name-only
//! detection, content precedence, the text heuristic and every content
//! acquisition mode.

#![allow(clippy::useless_vec)]

use std::cell::Cell;
use std::io::{self, Cursor, Write};

use mimesniff_core::*;

fn detector() -> Detector {
    Detector::with_builtin()
}

fn matroska_header(marker: &[u8], at: usize) -> Vec<u8> {
    let mut data = vec![0u8; at + marker.len() + 8];
    data[..4].copy_from_slice(&[0x1a, 0x45, 0xdf, 0xa3]);
    data[at..at + marker.len()].copy_from_slice(marker);
    data
}

// ============================================================================
// Name-only detection
// ============================================================================

#[test]
fn test_name_vectors() {
    let d = detector();
    let cases = [
        ("abc.txt", "text/plain"),
        ("x.cur", "image/x-win-bitmap"),
        ("winmail.dat", "application/vnd.ms-tnef"),
        ("README", "text/x-readme"),
        ("README.log", "text/x-log"),
        ("README.Z", "application/x-compress"),
        ("e.1.3.jar", "application/x-java-archive"),
        ("abc.anim5", "video/x-anim"),
        ("abc.animj", "video/x-anim"),
        ("t.pst", "application/vnd.ms-outlook"),
        ("abc.mm", "text/x-troff-mm"),
        ("CMakeLists.txt", "text/x-cmake"),
        ("backup.tar.gz", "application/x-compressed-tar"),
        ("BACKUP.TGZ", "application/x-compressed-tar"),
        ("ls.1", "text/x-troff-man"),
        ("notes.txt~", "application/x-trash"),
        ("INSTALL.unix", "text/x-install"),
    ];
    for (name, expected) in cases {
        assert_eq!(d.detect_by_name(name), Some(expected), "name: {name}");
    }
}

#[test]
fn test_unknown_names() {
    let d = detector();
    assert_eq!(d.detect_by_name("abc.anim0"), None);
    assert_eq!(d.detect_by_name("no-extension"), None);
    assert_eq!(d.detect_by_name(""), None);
    // Literal rules are case-sensitive.
    assert_eq!(d.detect_by_name("MAKEFILE"), None);
    assert_eq!(d.detect_by_name("Makefile"), Some("text/x-makefile"));
}

#[test]
fn test_case_sensitive_extension_falls_through_to_prefix() {
    let d = detector();
    assert_eq!(d.detect_by_name("README.z"), Some("text/x-readme"));
    assert_eq!(d.detect_by_name("main.C"), None);
    assert_eq!(d.detect_by_name("main.c"), Some("text/x-csrc"));
}

#[test]
fn test_directories_are_ignored() {
    let d = detector();
    assert_eq!(
        d.detect_by_name("mail/inbox/winmail.dat"),
        Some("application/vnd.ms-tnef")
    );
    assert_eq!(d.detect_by_name("docs/README"), Some("text/x-readme"));
}

#[test]
fn test_name_only_fallback_is_binary() {
    let d = detector();
    let detection = d.classify("mystery", None);
    assert_eq!(detection.mime_type, OCTET_STREAM);
    assert_eq!(detection.source, DetectionSource::NameFallback);
}

#[test]
fn test_literal_name_wins_without_magic() {
    let d = detector();
    assert_eq!(
        d.detect("winmail.dat", Some(b"plain text body")),
        "application/vnd.ms-tnef"
    );
}

// ============================================================================
// Content precedence
// ============================================================================

#[test]
fn test_ogg_resolves_by_declared_order() {
    let d = detector();
    let ogg = b"OggS\x00\x02\x00\x00\x00\x00\x00\x00\x00\x00";
    assert_eq!(d.detect("unknown", Some(ogg)), "application/ogg");
    assert_eq!(d.detect("song.ogg", Some(ogg)), "application/ogg");
    assert_eq!(d.detect("clip.ogv", Some(ogg)), "application/ogg");
}

#[test]
fn test_ogg_candidates_keep_every_match() {
    let d = detector();
    let explanation = d.explain("x", Some(b"OggS\x00\x02"));
    let mimes: Vec<&str> = explanation
        .magic_candidates
        .iter()
        .map(|c| c.mime_type)
        .collect();
    assert_eq!(mimes, vec!["application/ogg", "audio/ogg", "video/ogg"]);
}

#[test]
fn test_magic_overrides_glob() {
    let d = detector();
    let detection = d.classify("notes.txt", Some(b"\x89PNG\r\n\x1a\n\x00\x00"));
    assert_eq!(detection.mime_type, "image/png");
    assert_eq!(detection.source, DetectionSource::Magic);
}

#[test]
fn test_matroska_marker_at_end_of_range() {
    let d = detector();
    assert_eq!(
        d.detect("x", Some(&matroska_header(b"matroska", 65))),
        "video/x-matroska"
    );
    assert_eq!(d.detect("x", Some(&matroska_header(b"webm", 31))), "video/webm");
    // One byte past the range: only the EBML magic remains, which is not enough.
    assert_eq!(
        d.detect("x", Some(&matroska_header(b"matroska", 66))),
        OCTET_STREAM
    );
}

#[test]
fn test_and_joined_matchlets() {
    let d = detector();
    assert_eq!(d.detect("x", Some(&[0x0a, 0x05, 0x01, 0x08])), "image/x-pcx");
    // 0x0a alone satisfies the parent test but no child: falls to the heuristic.
    assert_eq!(d.detect("x", Some(&[0x0a, 0x07])), TEXT_PLAIN);

    assert_eq!(d.detect("x", Some(b"RIFF\x24\x00\x00\x00WAVEfmt ")), "audio/x-wav");
    assert_eq!(d.detect("x", Some(b"RIFF\x24\x00\x00\x00WEBPVP8 ")), "image/webp");
}

#[test]
fn test_priority_beats_declaration() {
    let d = detector();
    let svg = b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
    assert_eq!(d.detect("drawing", Some(svg)), "image/svg+xml");
    assert_eq!(
        d.detect("data", Some(b"<?xml version=\"1.0\"?><root/>")),
        "application/xml"
    );
}

#[test]
fn test_masked_matches() {
    let d = detector();
    assert_eq!(d.detect("x", Some(b"<!doctype html><html>")), "text/html");
    assert_eq!(d.detect("x", Some(b"  <HtMl><body>")), "text/html");
    assert_eq!(d.detect("x", Some(&[0xff, 0xfa, 0x90, 0x00])), "audio/mpeg");
    assert_eq!(d.detect("x", Some(b"ID3\x03\x00")), "audio/mpeg");
}

#[test]
fn test_offset_ranges() {
    let d = detector();
    let mut pdf = vec![b' '; 100];
    pdf.extend_from_slice(b"%PDF-1.7\n");
    assert_eq!(d.detect("x", Some(&pdf)), "application/pdf");

    let mut tar = vec![0u8; 512];
    tar[257..262].copy_from_slice(b"ustar");
    assert_eq!(d.detect("x", Some(&tar)), "application/x-tar");
}

#[test]
fn test_compression_signatures() {
    let d = detector();
    assert_eq!(d.detect("x", Some(&[0x1f, 0x8b, 0x08, 0x00])), "application/gzip");
    assert_eq!(d.detect("x", Some(&[0x1f, 0x9d, 0x90])), "application/x-compress");
    assert_eq!(d.detect("x", Some(b"BZh91AY&SY")), "application/x-bzip");
    assert_eq!(d.detect("x", Some(b"PK\x03\x04\x14\x00")), "application/zip");
}

// ============================================================================
// Heuristic fallback
// ============================================================================

#[test]
fn test_empty_content() {
    let d = detector();
    let detection = d.classify("unknown", Some(b""));
    assert_eq!(detection.mime_type, OCTET_STREAM);
    assert_eq!(detection.source, DetectionSource::BinaryFallback);

    assert_eq!(d.detect("abc.txt", Some(b"")), "text/plain");
}

#[test]
fn test_text_and_binary() {
    let d = detector();
    assert_eq!(d.detect("unknown", Some(b"just some words\n")), TEXT_PLAIN);
    assert_eq!(d.detect("unknown", Some("héllo wörld".as_bytes())), TEXT_PLAIN);
    assert_eq!(d.detect("unknown", Some(b"\x00\x01\x02\x03")), OCTET_STREAM);
}

// ============================================================================
// Content acquisition
// ============================================================================

#[test]
fn test_detect_path() {
    let dir = tempfile::tempdir().unwrap();
    let d = detector();

    let image = dir.path().join("image.dat");
    std::fs::write(&image, b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR").unwrap();
    assert_eq!(d.detect_path(&image).unwrap(), "image/png");

    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, b"meeting at noon").unwrap();
    assert_eq!(d.detect_path(&notes).unwrap(), "text/plain");

    let empty = dir.path().join("empty");
    std::fs::write(&empty, b"").unwrap();
    assert_eq!(d.detect_path(&empty).unwrap(), OCTET_STREAM);
}

#[test]
fn test_detect_path_matches_file_name_only() {
    let dir = tempfile::tempdir().unwrap();
    let d = detector();

    let mail = dir.path().join("mail.pdf");
    std::fs::create_dir(&mail).unwrap();
    let tnef = mail.join("winmail.dat");
    std::fs::write(&tnef, b"\x01\x02 opaque attachment").unwrap();
    assert_eq!(d.detect_path(&tnef).unwrap(), "application/vnd.ms-tnef");

    let readme = mail.join("README");
    std::fs::write(&readme, b"read me first").unwrap();
    assert_eq!(d.detect_path(&readme).unwrap(), "text/x-readme");
}

#[test]
fn test_detect_path_reads_far_enough_for_every_rule() {
    let dir = tempfile::tempdir().unwrap();
    let d = detector();
    assert!(d.read_limit() >= d.database().max_extent());

    let mut data = vec![b' '; 1024];
    data.extend_from_slice(b"%PDF-1.4\n");
    data.extend(std::iter::repeat_n(b'x', 4096));
    let path = dir.path().join("late-header");
    std::fs::write(&path, &data).unwrap();
    assert_eq!(d.detect_path(&path).unwrap(), "application/pdf");
}

#[test]
fn test_detect_path_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.bin");

    let err = detector().detect_path(&missing).unwrap_err();
    assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::NotFound);
    assert!(err.name().ends_with("absent.bin"));
}

#[test]
fn test_detect_reader() {
    let d = detector();
    let reader = Cursor::new(b"GIF89a\x01\x00\x01\x00".to_vec());
    assert_eq!(d.detect_reader("anim", reader).unwrap(), "image/gif");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"BM\x00\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00\x28\x00")
        .unwrap();
    let reopened = file.reopen().unwrap();
    assert_eq!(d.detect_reader("bitmap", reopened).unwrap(), "image/bmp");
}

#[test]
fn test_detect_with_callback() {
    let d = detector();
    let calls = Cell::new(0);
    let mime = d
        .detect_with("capture", || {
            calls.set(calls.get() + 1);
            Ok::<_, io::Error>(b"OggS\x00\x02".to_vec())
        })
        .unwrap();
    assert_eq!(mime, "application/ogg");
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_detect_with_failing_callback() {
    let err = detector()
        .detect_with("capture", || {
            Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::BrokenPipe, "stream reset"))
        })
        .unwrap_err();
    assert_eq!(err.name(), "capture");
    assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(err.to_string(), "Failed to acquire content for 'capture'");
}

#[test]
fn test_detect_source_variants_agree() {
    let d = detector();
    let data = b"%PDF-1.5\n%\xe2\xe3\xcf\xd3".to_vec();

    let from_bytes = d.detect_source("a", ContentSource::from_bytes(&data)).unwrap();
    let from_reader = d
        .detect_source("a", ContentSource::from_reader(Cursor::new(data.clone())))
        .unwrap();
    let from_callback = d
        .detect_source(
            "a",
            ContentSource::from_callback(|| Ok::<_, io::Error>(data.clone())),
        )
        .unwrap();

    assert_eq!(from_bytes, "application/pdf");
    assert_eq!(from_reader, from_bytes);
    assert_eq!(from_callback, from_bytes);
}

// ============================================================================
// Custom databases
// ============================================================================

struct AcmeRules;

impl RuleProvider for AcmeRules {
    fn globs(&self) -> Vec<GlobRule> {
        vec![GlobRule::new("*.acme", "application/x-acme")]
    }

    fn magic(&self) -> Vec<MagicRule> {
        vec![MagicRule::new("application/x-acme", 90).with_matchlet(Matchlet::new(0, *b"OggS"))]
    }
}

#[test]
fn test_provider_extends_builtin() {
    let db = RuleDatabase::builder()
        .with_builtin()
        .with_provider(&AcmeRules)
        .build()
        .unwrap();
    let d = Detector::new(std::sync::Arc::new(db));

    assert_eq!(d.detect_by_name("widget.acme"), Some("application/x-acme"));
    assert_eq!(d.detect("x", Some(b"OggS\x00")), "application/x-acme");
    assert_eq!(AcmeRules.name(), "AcmeRules");
}

#[test]
fn test_custom_config_limits_reads() {
    let config = DetectorConfig::builder()
        .max_read_bytes(16)
        .text_probe_bytes(16)
        .build()
        .unwrap();
    let d = Detector::with_config(RuleDatabase::builtin(), config);
    assert_eq!(d.read_limit(), 16);

    let mut tar = vec![0u8; 512];
    tar[257..262].copy_from_slice(b"ustar");
    // The tar marker lies beyond the read limit; only zeros are seen.
    assert_eq!(d.detect_reader("x", Cursor::new(tar)).unwrap(), OCTET_STREAM);
}
