//! Example corpus file naming.
//!
//! Stored exchanges follow `{number}-{Stage}-{Direction}[-{variant}]-{status}.{ext}`, for example:
//! - `1-Prepare-Request-200_OK.json`
//! - `1-Prepare-Response-200_OK.json`
//! - `1-Process-Request-Send-200_OK.json`
//! - `1-Convert-Response-Send-200_OK.xml`
//!
//! Files belonging to one exchange share a directory, a number and a status. [`FixtureName`]
//! parses these names and derives the sibling names the refresh workflow writes.

use crate::constants::{JSON_EXTENSION, PREPARE_REQUEST_MARKER, SUCCESS_STATUS, XML_EXTENSION};
use crate::{ToolError, ToolResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Process,
    Convert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prepare => "Prepare",
            Stage::Process => "Process",
            Stage::Convert => "Convert",
        }
    }
}

impl FromStr for Stage {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Prepare" => Ok(Stage::Prepare),
            "Process" => Ok(Stage::Process),
            "Convert" => Ok(Stage::Convert),
            other => Err(ToolError::InvalidFixtureName(format!(
                "unknown stage '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "Request",
            Direction::Response => "Response",
        }
    }
}

impl FromStr for Direction {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Request" => Ok(Direction::Request),
            "Response" => Ok(Direction::Response),
            other => Err(ToolError::InvalidFixtureName(format!(
                "unknown direction '{other}'"
            ))),
        }
    }
}

/// A parsed example file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureName {
    pub number: String,
    pub stage: Stage,
    pub direction: Direction,
    /// Operation variant of process/convert files (`Send`, `Cancel`, ...).
    pub variant: Option<String>,
    pub status: String,
    pub extension: String,
}

impl FixtureName {
    /// Parses a bare file name (no directory components).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidFixtureName`] if the name does not follow the corpus pattern.
    pub fn parse(file_name: &str) -> ToolResult<Self> {
        let invalid = |reason: &str| ToolError::InvalidFixtureName(format!("{file_name}: {reason}"));

        let (stem, extension) = file_name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .ok_or_else(|| invalid("missing extension"))?;

        let parts: Vec<&str> = stem.split('-').collect();
        if parts.len() < 4 {
            return Err(invalid("expected number, stage, direction and status"));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty name segment"));
        }

        let number = parts[0];
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("number must be digits"));
        }

        let stage = parts[1]
            .parse::<Stage>()
            .map_err(|_| invalid(&format!("unknown stage '{}'", parts[1])))?;
        let direction = parts[2]
            .parse::<Direction>()
            .map_err(|_| invalid(&format!("unknown direction '{}'", parts[2])))?;

        let last = parts.len() - 1;
        let variant = (last > 3).then(|| parts[3..last].join("-"));

        Ok(Self {
            number: number.to_string(),
            stage,
            direction,
            variant,
            status: parts[last].to_string(),
            extension: extension.to_string(),
        })
    }

    /// Parses the file name component of `path`.
    pub fn from_path(path: &Path) -> ToolResult<Self> {
        let file_name = path
            .file_name()
            .and_then(|os| os.to_str())
            .ok_or_else(|| {
                ToolError::InvalidFixtureName(format!("{} has no file name", path.display()))
            })?;
        Self::parse(file_name)
    }

    fn expect(&self, stage: Stage, direction: Direction) -> ToolResult<()> {
        if self.stage == stage && self.direction == direction {
            Ok(())
        } else {
            Err(ToolError::InvalidFixtureName(format!(
                "{self} is not a {}-{} file",
                stage.as_str(),
                direction.as_str()
            )))
        }
    }

    /// The `$prepare` response stored next to this prepare request.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidFixtureName`] unless this is a prepare request.
    pub fn prepare_response(&self) -> ToolResult<Self> {
        self.expect(Stage::Prepare, Direction::Request)?;
        Ok(Self {
            stage: Stage::Prepare,
            direction: Direction::Response,
            variant: None,
            ..self.clone()
        })
    }

    /// Whether this is a process request of the same exchange as `prepare_request`.
    pub fn is_process_request_for(&self, prepare_request: &FixtureName) -> bool {
        self.stage == Stage::Process
            && self.direction == Direction::Request
            && self.variant.is_some()
            && self.number == prepare_request.number
            && self.status == prepare_request.status
            && self.extension == prepare_request.extension
    }

    /// The `$convert` response stored next to this process request, with an `.xml` extension.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidFixtureName`] unless this is a process request.
    pub fn convert_response(&self) -> ToolResult<Self> {
        self.expect(Stage::Process, Direction::Request)?;
        Ok(Self {
            stage: Stage::Convert,
            direction: Direction::Response,
            extension: XML_EXTENSION.to_string(),
            ..self.clone()
        })
    }
}

impl fmt::Display for FixtureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.number,
            self.stage.as_str(),
            self.direction.as_str()
        )?;
        if let Some(variant) = &self.variant {
            write!(f, "-{variant}")?;
        }
        write!(f, "-{}.{}", self.status, self.extension)
    }
}

impl FromStr for FixtureName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FixtureName::parse(s)
    }
}

/// Whether `file_name` matches `*Prepare-Request*200_OK*.json`.
fn is_successful_prepare_request(file_name: &str) -> bool {
    let Some(stem) = file_name
        .strip_suffix(JSON_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
    else {
        return false;
    };

    stem.find(PREPARE_REQUEST_MARKER)
        .map(|at| &stem[at + PREPARE_REQUEST_MARKER.len()..])
        .is_some_and(|rest| rest.contains(SUCCESS_STATUS))
}

/// Finds every successful prepare request under `root`, recursively, in sorted order.
///
/// Hidden files and directories are skipped. A name that matches the prepare request pattern
/// but is not a valid [`FixtureName`] is logged and skipped.
///
/// # Errors
///
/// Returns [`ToolError::FileRead`] if a directory cannot be listed.
pub fn find_prepare_requests(root: &Path) -> ToolResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| ToolError::FileRead {
            path: dir.clone(),
            source,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|os| os.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            if path.is_dir() {
                pending.push(path);
            } else if is_successful_prepare_request(name) {
                match FixtureName::parse(name) {
                    Ok(fixture)
                        if fixture.stage == Stage::Prepare
                            && fixture.direction == Direction::Request =>
                    {
                        found.push(path);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping malformed prepare request name");
                    }
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Lists the process requests that belong to the exchange of `prepare_request`, sorted.
///
/// Files in the same directory whose names do not parse are ignored.
pub fn process_requests_for(prepare_request: &Path) -> ToolResult<Vec<PathBuf>> {
    let prepare_name = FixtureName::from_path(prepare_request)?;
    let dir = prepare_request.parent().unwrap_or_else(|| Path::new("."));

    let entries = fs::read_dir(dir).map_err(|source| ToolError::FileRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            FixtureName::from_path(path)
                .map(|name| name.is_process_request_for(&prepare_name))
                .unwrap_or(false)
        })
        .collect();

    found.sort();
    Ok(found)
}
