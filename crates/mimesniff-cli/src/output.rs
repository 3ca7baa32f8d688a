//! Text and JSON rendering of detection results.

use std::io::{self, Write};

use colored::Colorize;
use mimesniff_core::{DetectionSource, Explanation};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GlobReport {
    pub pattern: String,
    pub mime_type: String,
    pub class: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MagicReport {
    pub mime_type: String,
    pub priority: u32,
    pub order_index: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExplainReport {
    pub glob_matches: Vec<GlobReport>,
    pub magic_candidates: Vec<MagicReport>,
}

/// Outcome for one input.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<ExplainReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    from_rule: bool,
}

impl Report {
    pub fn detected(path: String, explanation: &Explanation<'_>, explain: bool) -> Self {
        let detection = explanation.detection;
        let details = explain.then(|| ExplainReport {
            glob_matches: explanation
                .glob_matches
                .iter()
                .map(|m| GlobReport {
                    pattern: m.pattern.to_string(),
                    mime_type: m.mime_type.to_string(),
                    class: m.class.to_string(),
                    weight: m.weight,
                })
                .collect(),
            magic_candidates: explanation
                .magic_candidates
                .iter()
                .map(|m| MagicReport {
                    mime_type: m.mime_type.to_string(),
                    priority: m.priority,
                    order_index: m.order_index,
                })
                .collect(),
        });
        Self {
            path,
            mime_type: Some(detection.mime_type.to_string()),
            source: Some(detection.source.to_string()),
            explanation: details,
            error: None,
            from_rule: matches!(
                detection.source,
                DetectionSource::Magic | DetectionSource::Glob(_)
            ),
        }
    }

    pub fn failed(path: String, error: String) -> Self {
        Self {
            path,
            mime_type: None,
            source: None,
            explanation: None,
            error: Some(error),
            from_rule: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// `path: type` per line on `out`; failures go to `err`.
pub fn print_text(reports: &[Report], out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    for report in reports {
        if let Some(error) = &report.error {
            writeln!(err, "{}: {} {}", report.path, "error:".red().bold(), error)?;
            continue;
        }
        let mime = report.mime_type.as_deref().unwrap_or_default();
        let mime = if report.from_rule {
            mime.green()
        } else {
            mime.yellow()
        };
        writeln!(out, "{}: {}", report.path.bold(), mime)?;

        let Some(explanation) = &report.explanation else {
            continue;
        };
        writeln!(
            out,
            "  {} {}",
            "decided by".dimmed(),
            report.source.as_deref().unwrap_or_default()
        )?;
        for m in &explanation.glob_matches {
            writeln!(
                out,
                "  glob   {:<9} {} -> {} (weight {})",
                m.class, m.pattern, m.mime_type, m.weight
            )?;
        }
        for m in &explanation.magic_candidates {
            writeln!(
                out,
                "  magic  priority {:<3} #{:<3} -> {}",
                m.priority, m.order_index, m.mime_type
            )?;
        }
    }
    Ok(())
}

/// All reports as one pretty-printed JSON array.
pub fn print_json(reports: &[Report], out: &mut impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out)?;
    Ok(())
}
