use libpcap_tools::Error;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Step of the transcoding run where an error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    OpenInput,
    ReadInput,
    CreateOutput,
    WriteOutput,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Stage::OpenInput => "opening input",
            Stage::ReadInput => "reading input",
            Stage::CreateOutput => "creating output",
            Stage::WriteOutput => "writing output",
            Stage::Finalize => "finalizing output",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Rejected before any file was touched
    #[error("{0}")]
    Config(Error),

    #[error("{stage} '{}': {source}", .file.display())]
    Stage {
        stage: Stage,
        file: PathBuf,
        #[source]
        source: Error,
    },
}

impl TranscodeError {
    pub(crate) fn stage<P: Into<PathBuf>>(stage: Stage, file: P, source: Error) -> Self {
        TranscodeError::Stage {
            stage,
            file: file.into(),
            source,
        }
    }

    /// The underlying codec or I/O error
    pub fn error(&self) -> &Error {
        match self {
            TranscodeError::Config(e) => e,
            TranscodeError::Stage { source, .. } => source,
        }
    }

    /// Stage of the failure, if any file was touched
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            TranscodeError::Config(_) => None,
            TranscodeError::Stage { stage, .. } => Some(*stage),
        }
    }
}

impl From<Error> for TranscodeError {
    fn from(e: Error) -> Self {
        TranscodeError::Config(e)
    }
}
