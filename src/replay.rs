//! replay — versioned dump files of a full run's inputs.
//!
//! Purpose
//! -------
//! Persist everything a run consumes (raw series and embedding parameters
//! via the generator, the options — thread request included — and both row
//! filters) into a self-describing, hierarchical JSON file, and replay such
//! a file without the host attached. Benchmarks and bug reports travel as
//! these files.
//!
//! Key behaviors
//! -------------
//! - Writers stamp the current format version; readers accept any file
//!   whose version is not newer than their own and fail closed otherwise.
//! - Unknown auxiliary fields are tolerated on read (newer writers may add
//!   them); missing mandatory fields are a hard decode error.
//! - [`replay`] is the standalone driver: load a file, run it to
//!   completion, return the aggregate.
//!
//! Conventions
//! -----------
//! - Errors split by cause: [`EdmError::ReplayIo`] for the file system,
//!   [`EdmError::MalformedReplayFile`] for decode failures, and
//!   [`EdmError::UnsupportedReplayVersion`] for future-format files.
use crate::driver::{Prediction, run_blocking};
use crate::errors::{EdmError, EdmResult};
use crate::io::{ConsoleIo, NeverCancel};
use crate::manifold::ManifoldGenerator;
use crate::options::EdmOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format version stamped into every file this writer produces.
pub const REPLAY_VERSION: u32 = 1;

/// Everything one prediction run consumes.
///
/// The requested thread count travels inside `options`; readers of older
/// files with fewer optional knobs still decode because the mandatory
/// fields have not moved since version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayInputs {
    /// Format version the writer stamped.
    pub version: u32,
    /// Run options, thread request included.
    pub options: EdmOptions,
    /// Raw columns plus embedding parameters.
    pub generator: ManifoldGenerator,
    /// Library row filter.
    pub training_filter: Vec<bool>,
    /// Query row filter.
    pub prediction_filter: Vec<bool>,
}

/// Minimal probe decoded before the payload so a future-format file fails
/// closed instead of half-decoding.
#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl ReplayInputs {
    /// Bundle run inputs under the current format version.
    pub fn new(
        options: EdmOptions, generator: ManifoldGenerator, training_filter: Vec<bool>,
        prediction_filter: Vec<bool>,
    ) -> ReplayInputs {
        ReplayInputs {
            version: REPLAY_VERSION,
            options,
            generator,
            training_filter,
            prediction_filter,
        }
    }
}

/// Serialize run inputs to a JSON string.
///
/// # Errors
/// - [`EdmError::ReplayIo`] when encoding fails.
pub fn to_json_string(inputs: &ReplayInputs) -> EdmResult<String> {
    serde_json::to_string_pretty(inputs)
        .map_err(|err| EdmError::ReplayIo { detail: err.to_string() })
}

/// Decode run inputs from a JSON string, tolerating unknown fields and
/// failing closed on missing mandatory fields or a newer format version.
///
/// # Errors
/// - [`EdmError::UnsupportedReplayVersion`] when the file is from a newer
///   writer.
/// - [`EdmError::MalformedReplayFile`] on any decode failure.
pub fn from_json_str(payload: &str) -> EdmResult<ReplayInputs> {
    let probe: VersionProbe = serde_json::from_str(payload)
        .map_err(|err| EdmError::MalformedReplayFile { detail: err.to_string() })?;
    if probe.version > REPLAY_VERSION {
        return Err(EdmError::UnsupportedReplayVersion {
            found: probe.version,
            supported: REPLAY_VERSION,
        });
    }
    serde_json::from_str(payload)
        .map_err(|err| EdmError::MalformedReplayFile { detail: err.to_string() })
}

/// Write run inputs to a dump file.
///
/// # Errors
/// - [`EdmError::ReplayIo`] on encoding or file-system failure.
pub fn save_inputs<P: AsRef<Path>>(path: P, inputs: &ReplayInputs) -> EdmResult<()> {
    let payload = to_json_string(inputs)?;
    std::fs::write(path, payload).map_err(|err| EdmError::ReplayIo { detail: err.to_string() })
}

/// Read run inputs back from a dump file.
///
/// # Errors
/// - [`EdmError::ReplayIo`] on file-system failure, plus everything
///   [`from_json_str`] reports.
pub fn load_inputs<P: AsRef<Path>>(path: P) -> EdmResult<ReplayInputs> {
    let payload = std::fs::read_to_string(path)
        .map_err(|err| EdmError::ReplayIo { detail: err.to_string() })?;
    from_json_str(&payload)
}

/// Load a dump file and run it to completion on the calling thread, with
/// console output and no cancellation — the standalone replay driver.
pub fn replay<P: AsRef<Path>>(path: P) -> EdmResult<Prediction> {
    let inputs = load_inputs(path)?;
    run_blocking(
        &inputs.options,
        &inputs.generator,
        &inputs.training_filter,
        &inputs.prediction_filter,
        &ConsoleIo,
        &NeverCancel,
    )
}
