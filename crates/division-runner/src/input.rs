//! Transcript documents read from disk.

use std::path::{Path, PathBuf};

use adjudication::{
    definitions_context, DefinitionsContestation, DefinitionsFrame, Interjection, Speech,
    Transcript,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read transcript {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse transcript {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("definitions contestation given without a definitions frame")]
    ContestationWithoutFrame,
}

/// On-disk transcript: the engine's [`Transcript`] plus an optional
/// structured definitional framework.
///
/// A literal `definitions_context` takes precedence over a structured frame.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptDocument {
    pub motion: String,
    pub speeches: Vec<Speech>,
    #[serde(default)]
    pub interjections: Vec<Interjection>,
    #[serde(default)]
    pub definitions: Option<DefinitionsFrame>,
    #[serde(default)]
    pub contestation: Option<DefinitionsContestation>,
    #[serde(default)]
    pub definitions_context: Option<String>,
}

impl TranscriptDocument {
    pub fn into_transcript(self) -> Result<Transcript, InputError> {
        let context = match (self.definitions_context, &self.definitions, &self.contestation) {
            (Some(literal), _, _) => Some(literal),
            (None, Some(frame), contestation) => {
                Some(definitions_context(frame, contestation.as_ref()))
            }
            (None, None, Some(_)) => return Err(InputError::ContestationWithoutFrame),
            (None, None, None) => None,
        };

        let transcript =
            Transcript::new(self.motion, self.speeches).with_interjections(self.interjections);
        Ok(match context {
            Some(context) => transcript.with_definitions_context(context),
            None => transcript,
        })
    }
}

/// Read and convert a transcript document. Structural validation is left
/// to the engine.
pub fn load_transcript(path: &Path) -> Result<Transcript, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: TranscriptDocument =
        serde_json::from_str(&text).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    document.into_transcript()
}
