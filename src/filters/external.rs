use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use tempfile::Builder;

use crate::error::{AssetError, Result};

use super::{TransformContext, TransformStage, Transformer};

/// Runs an external binary on a temporary copy of the source and returns its stdout.
///
/// The temporary file keeps the source's extension because several compilers
/// pick their dialect from it.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
  name: String,
  binary: PathBuf,
  args: Vec<String>,
  stage: TransformStage,
}

impl ExternalCommand {
  /// Create a command transformer registered as `name`.
  pub fn new(name: impl Into<String>, binary: impl Into<PathBuf>, stage: TransformStage) -> Self {
    Self {
      name: name.into(),
      binary: binary.into(),
      args: Vec::new(),
      stage,
    }
  }

  /// Arguments placed before the input file path.
  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  fn failure(&self, message: impl Into<String>) -> AssetError {
    AssetError::Transform {
      filter: self.name.clone(),
      message: message.into(),
    }
  }
}

impl Transformer for ExternalCommand {
  fn stage(&self) -> TransformStage {
    self.stage
  }

  fn apply(&self, source: &[u8], context: &TransformContext<'_>) -> Result<Vec<u8>> {
    let suffix = context
      .source_path
      .extension()
      .map(|ext| format!(".{}", ext.to_string_lossy()))
      .unwrap_or_default();

    let mut input = Builder::new()
      .prefix("asset-pipeline-")
      .suffix(&suffix)
      .tempfile()
      .map_err(|err| AssetError::io(std::env::temp_dir(), err))?;
    let written = input.write_all(source).and_then(|_| input.flush());
    written.map_err(|err| AssetError::io(input.path(), err))?;

    let output = Command::new(&self.binary)
      .args(&self.args)
      .arg(input.path())
      .output()
      .map_err(|err| self.failure(format!("failed to run {}: {err}", self.binary.display())))?;

    if !output.status.success() {
      return Err(self.failure(format!(
        "{} exited with {} while processing {}: {}",
        self.binary.display(),
        output.status,
        context.source_path.display(),
        String::from_utf8_lossy(&output.stderr).trim()
      )));
    }

    Ok(output.stdout)
  }
}
