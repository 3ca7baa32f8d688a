//! Expand command-line paths into the inputs to classify.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

/// One thing to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
    /// A path that could not be expanded; reported as a failure.
    Invalid { path: PathBuf, reason: String },
}

impl Input {
    pub fn display_path(&self) -> String {
        match self {
            Input::Stdin => "-".to_string(),
            Input::File(path) | Input::Invalid { path, .. } => path.display().to_string(),
        }
    }

    /// Name matched against glob rules: the file name for paths, the
    /// `--as-name` value (or nothing) for stdin.
    pub fn glob_name(&self, as_name: Option<&str>) -> String {
        match self {
            Input::Stdin => as_name.unwrap_or_default().to_string(),
            Input::File(path) | Input::Invalid { path, .. } => path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
        }
    }
}

/// Expand `paths` in order. Directories are walked (sorted by file name)
/// when `recursive` is set and rejected otherwise.
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Vec<Input> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.as_os_str() == "-" {
            inputs.push(Input::Stdin);
        } else if path.is_dir() {
            if recursive {
                walk_dir(path, &mut inputs);
            } else {
                inputs.push(Input::Invalid {
                    path: path.clone(),
                    reason: "is a directory (use --recursive)".to_string(),
                });
            }
        } else {
            inputs.push(Input::File(path.clone()));
        }
    }
    inputs
}

fn walk_dir(root: &Path, inputs: &mut Vec<Input>) {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                inputs.push(Input::File(entry.into_path()));
            }
            Ok(_) => {}
            Err(e) => {
                debug!(root = %root.display(), error = %e, "walk error");
                inputs.push(Input::Invalid {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
