//! Build script for mimesniff-rules.
//!
//! Generates static Rust tables from rules.json at compile time.
//! Supports both local crate builds (crates.io) and workspace builds (development).

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Maximum allowed file size for rules.json (5 MB)
const MAX_RULES_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum nesting depth of matchlet children
const MAX_MATCHLET_DEPTH: usize = 8;

/// Value encodings a matchlet may use. Exactly one must be present.
const VALUE_FIELDS: &[&str] = &[
    "string", "hex", "byte", "big16", "little16", "big32", "little32",
];

const GLOB_CLASSES: &[&str] = &["literal", "extension", "wildcard", "prefix"];

/// Find the workspace root by searching for Cargo.toml with [workspace]
fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|path| {
            path.join("Cargo.toml")
                .exists()
                .then(|| fs::read_to_string(path.join("Cargo.toml")).ok())
                .flatten()
                .is_some_and(|content| {
                    content.contains("[workspace]") || content.contains("[workspace.")
                })
        })
        .map(|p| p.to_path_buf())
}

// Escape special characters for Rust string literal
fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// `type/subtype`, both halves non-empty and drawn from the RFC 6838 charset.
fn is_valid_mime(mime: &str) -> bool {
    let Some((top, sub)) = mime.split_once('/') else {
        return false;
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.len() <= 127
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
    };
    valid_part(top) && valid_part(sub)
}

fn parse_offset(raw: &str, ctx: &str) -> (u32, u32) {
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .unwrap_or_else(|_| panic!("{}: invalid offset '{}'", ctx, raw))
    };
    let (low, high) = match raw.split_once(':') {
        Some((low, high)) => (parse(low), parse(high)),
        None => {
            let at = parse(raw);
            (at, at)
        }
    };
    if low > high {
        panic!("{}: offset range '{}' is inverted", ctx, raw);
    }
    (low, high)
}

fn parse_hex(raw: &str, ctx: &str) -> Vec<u8> {
    if raw.len() % 2 != 0 {
        panic!("{}: hex value '{}' has odd length", ctx, raw);
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&raw[i..i + 2], 16)
                .unwrap_or_else(|_| panic!("{}: invalid hex value '{}'", ctx, raw))
        })
        .collect()
}

fn parse_value(matchlet: &Value, ctx: &str) -> Vec<u8> {
    let present: Vec<&str> = VALUE_FIELDS
        .iter()
        .copied()
        .filter(|field| matchlet.get(*field).is_some())
        .collect();
    if present.len() != 1 {
        panic!(
            "{}: exactly one of {:?} is required, found {:?}",
            ctx, VALUE_FIELDS, present
        );
    }

    let field = present[0];
    let raw = &matchlet[field];
    let int = |max: u64| -> u64 {
        let n = raw
            .as_u64()
            .unwrap_or_else(|| panic!("{}: '{}' must be a non-negative integer", ctx, field));
        if n > max {
            panic!("{}: '{}' value {} does not fit", ctx, field, n);
        }
        n
    };

    let bytes = match field {
        "string" => raw
            .as_str()
            .unwrap_or_else(|| panic!("{}: 'string' must be a string", ctx))
            .as_bytes()
            .to_vec(),
        "hex" => parse_hex(
            raw.as_str()
                .unwrap_or_else(|| panic!("{}: 'hex' must be a string", ctx)),
            ctx,
        ),
        "byte" => vec![int(u8::MAX as u64) as u8],
        "big16" => (int(u16::MAX as u64) as u16).to_be_bytes().to_vec(),
        "little16" => (int(u16::MAX as u64) as u16).to_le_bytes().to_vec(),
        "big32" => (int(u32::MAX as u64) as u32).to_be_bytes().to_vec(),
        "little32" => (int(u32::MAX as u64) as u32).to_le_bytes().to_vec(),
        _ => unreachable!(),
    };

    if bytes.is_empty() {
        panic!("{}: matchlet value must not be empty", ctx);
    }
    bytes
}

fn render_bytes(bytes: &[u8]) -> String {
    let parts: Vec<String> = bytes.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("&[{}]", parts.join(", "))
}

fn render_matchlet(matchlet: &Value, ctx: &str, depth: usize, out: &mut String) {
    if depth > MAX_MATCHLET_DEPTH {
        panic!("{}: matchlets nested deeper than {}", ctx, MAX_MATCHLET_DEPTH);
    }

    let offset = matchlet["offset"]
        .as_str()
        .unwrap_or_else(|| panic!("{}: must have string 'offset' field", ctx));
    let (low, high) = parse_offset(offset, ctx);
    let value = parse_value(matchlet, ctx);

    let mask = match matchlet.get("mask") {
        None => "None".to_string(),
        Some(raw) => {
            let mask = parse_hex(
                raw.as_str()
                    .unwrap_or_else(|| panic!("{}: 'mask' must be a hex string", ctx)),
                ctx,
            );
            if mask.len() != value.len() {
                panic!(
                    "{}: mask is {} bytes but value is {} bytes",
                    ctx,
                    mask.len(),
                    value.len()
                );
            }
            format!("Some({})", render_bytes(&mask))
        }
    };

    let mut children = String::new();
    if let Some(list) = matchlet.get("children") {
        let list = list
            .as_array()
            .unwrap_or_else(|| panic!("{}: 'children' must be an array", ctx));
        for (idx, child) in list.iter().enumerate() {
            render_matchlet(child, &format!("{}.children[{}]", ctx, idx), depth + 1, &mut children);
        }
    }

    let _ = write!(
        out,
        "MatchletEntry {{ low: {}, high: {}, value: {}, mask: {}, children: &[{}] }}, ",
        low,
        high,
        render_bytes(&value),
        mask,
        children
    );
}

fn render_globs(globs: &[Value], out: &mut String) {
    out.push_str("/// Glob rules in declaration order.\n");
    out.push_str("pub const GLOB_DATA: &[GlobEntry] = &[\n");

    for (idx, glob) in globs.iter().enumerate() {
        let ctx = format!("globs[{}]", idx);
        let pattern = glob["pattern"]
            .as_str()
            .unwrap_or_else(|| panic!("{} must have string 'pattern' field", ctx));
        let mime = glob["mime"]
            .as_str()
            .unwrap_or_else(|| panic!("{} must have string 'mime' field", ctx));

        if pattern.is_empty() || pattern.len() > 255 || pattern.contains('/') {
            panic!(
                "{} has invalid pattern '{}': must be 1-255 chars without '/'",
                ctx, pattern
            );
        }
        if !is_valid_mime(mime) {
            panic!("{} '{}' has invalid mime type '{}'", ctx, pattern, mime);
        }

        let weight = match glob.get("weight") {
            None => 50,
            Some(w) => w
                .as_u64()
                .filter(|w| *w <= 100)
                .unwrap_or_else(|| panic!("{} '{}': weight must be 0-100", ctx, pattern)),
        };
        let case_sensitive = match glob.get("case_sensitive") {
            None => "None".to_string(),
            Some(flag) => format!(
                "Some({})",
                flag.as_bool()
                    .unwrap_or_else(|| panic!("{} '{}': case_sensitive must be a bool", ctx, pattern))
            ),
        };
        let class = match glob.get("class") {
            None => "None".to_string(),
            Some(class) => {
                let class = class
                    .as_str()
                    .unwrap_or_else(|| panic!("{} '{}': class must be a string", ctx, pattern));
                if !GLOB_CLASSES.contains(&class) {
                    panic!(
                        "{} '{}': unknown class '{}', expected one of {:?}",
                        ctx, pattern, class, GLOB_CLASSES
                    );
                }
                format!("Some(\"{}\")", class)
            }
        };

        let _ = writeln!(
            out,
            "    GlobEntry {{ pattern: \"{}\", mime_type: \"{}\", weight: {}, case_sensitive: {}, class: {} }},",
            escape_str(pattern),
            escape_str(mime),
            weight,
            case_sensitive,
            class
        );
    }

    out.push_str("];\n\n");
}

fn render_magic(rules: &[Value], out: &mut String) {
    out.push_str("/// Magic rules in declaration order.\n");
    out.push_str("pub const MAGIC_DATA: &[MagicEntry] = &[\n");

    for (idx, rule) in rules.iter().enumerate() {
        let ctx = format!("magic[{}]", idx);
        let mime = rule["mime"]
            .as_str()
            .unwrap_or_else(|| panic!("{} must have string 'mime' field", ctx));
        if !is_valid_mime(mime) {
            panic!("{} has invalid mime type '{}'", ctx, mime);
        }

        let priority = match rule.get("priority") {
            None => 50,
            Some(p) => p
                .as_u64()
                .filter(|p| *p <= 100)
                .unwrap_or_else(|| panic!("{} '{}': priority must be 0-100", ctx, mime)),
        };

        let matchlets = rule["matchlets"]
            .as_array()
            .unwrap_or_else(|| panic!("{} '{}' must have a 'matchlets' array", ctx, mime));
        if matchlets.is_empty() {
            panic!("{} '{}' has no matchlets", ctx, mime);
        }

        let mut rendered = String::new();
        for (m_idx, matchlet) in matchlets.iter().enumerate() {
            render_matchlet(
                matchlet,
                &format!("{}.matchlets[{}]", ctx, m_idx),
                0,
                &mut rendered,
            );
        }

        let _ = writeln!(
            out,
            "    MagicEntry {{ mime_type: \"{}\", priority: {}, matchlets: &[{}] }},",
            escape_str(mime),
            priority,
            rendered
        );
    }

    out.push_str("];\n");
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let manifest_path = Path::new(&manifest_dir);

    // Try crate-local rules.json first (for crates.io builds)
    // Then fall back to workspace knowledge-base/mime-rules.json (for development)
    let crate_rules = manifest_path.join("rules.json");
    let workspace_rules = find_workspace_root(manifest_path)
        .map(|root| root.join("knowledge-base/mime-rules.json"));

    println!("cargo:rerun-if-changed={}", crate_rules.display());

    let rules_path = if crate_rules.exists() {
        crate_rules
    } else if let Some(ws_rules) = workspace_rules {
        if ws_rules.exists() {
            println!("cargo:rerun-if-changed={}", ws_rules.display());
            ws_rules
        } else {
            panic!(
                "Could not find rules.json at {} or {}",
                manifest_path.join("rules.json").display(),
                ws_rules.display()
            );
        }
    } else {
        panic!(
            "Could not find rules.json at {} (no workspace root found)",
            manifest_path.join("rules.json").display()
        );
    };

    let file_size = fs::metadata(&rules_path)
        .unwrap_or_else(|e| panic!("Failed to get metadata for {}: {}", rules_path.display(), e))
        .len();
    if file_size > MAX_RULES_FILE_SIZE {
        panic!(
            "rules.json at {} is too large ({} bytes, max {} bytes)",
            rules_path.display(),
            file_size,
            MAX_RULES_FILE_SIZE
        );
    }

    let rules_json = fs::read_to_string(&rules_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read rules.json at {}: {}",
            rules_path.display(),
            e
        )
    });

    let rules: Value = serde_json::from_str(&rules_json).unwrap_or_else(|e| {
        panic!(
            "Failed to parse rules.json at {}: {}",
            rules_path.display(),
            e
        )
    });

    let globs = rules["globs"]
        .as_array()
        .expect("rules.json must have a 'globs' array");
    let magic = rules["magic"]
        .as_array()
        .expect("rules.json must have a 'magic' array");

    let mut generated_code = String::new();
    generated_code.push_str("// Auto-generated from rules.json by build.rs\n");
    generated_code.push_str("// Do not edit manually!\n\n");
    render_globs(globs, &mut generated_code);
    render_magic(magic, &mut generated_code);

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("rules_data.rs");
    fs::write(&dest_path, generated_code).expect("Failed to write generated rules");
}
