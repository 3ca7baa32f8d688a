//! Fuzz target for detection
//!
//! The first byte splits the input into a file name and content. Detection
//! must never panic and must always return a `type/subtype` string.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

use mimesniff_core::Detector;

static DETECTOR: OnceLock<Detector> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let detector = DETECTOR.get_or_init(Detector::with_builtin);
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (name, content) = rest.split_at(split);
    let name = String::from_utf8_lossy(name);

    let mime = detector.detect(&name, Some(content));
    assert!(mime.contains('/'));
    let _ = detector.detect_by_name(&name);
    let _ = detector.explain(&name, Some(content));
});
