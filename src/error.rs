use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Invariant violations on the pixel grid. Reaching one of these after a
/// successful decode means there is a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("malformed grid: {reason}")]
    Malformed { reason: String },

    #[error("pixel ({row}, {col}) is outside a {width}x{height} grid")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
}

impl GridError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("concurrency budget must be at least 1")]
    InvalidBudget,

    #[error("failed to start worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{failed} of {total} pixels failed to transform; first failure at ({row}, {col}): {message}")]
    PixelFailures {
        failed: usize,
        total: usize,
        row: usize,
        col: usize,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("could not run `{command}`")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Status { command: String, status: String },

    #[error("host reports no descriptor limit")]
    Unbounded,

    #[error("could not parse limit {output:?}")]
    Parse { output: String },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt image data: {0}")]
    CorruptData(String),

    #[error("could not encode image: {0}")]
    Encode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("not a valid adjustment type: {0:?}. Try \"brightness\" or \"contrast\"")]
    UnknownAdjustment(String),

    #[error("adjustment factor must be a finite number >= 0, got {0}")]
    InvalidFactor(f32),

    #[error("unknown output format {0:?}, expected \"png\" or \"jpeg\"")]
    UnknownFormat(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read {path}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image could not be decoded")]
    Decode(#[source] CodecError),

    #[error("image could not be encoded")]
    Encode(#[source] CodecError),

    #[error("no safe concurrency budget: {0}")]
    InvalidBudget(String),

    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    #[error("{0} adjustment is not implemented yet")]
    Unimplemented(String),

    #[error("output directory {0} does not exist")]
    OutputDirMissing(PathBuf),

    #[error("could not write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Engine(EngineError),

    #[error("resource limit probe failed")]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidBudget => {
                Error::InvalidBudget(EngineError::InvalidBudget.to_string())
            }
            other => Error::Engine(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn one_line(err: Error) -> String {
        format!("{:#}", anyhow::Error::from(err))
    }

    #[test]
    fn causes_are_printed_once() {
        let message = one_line(Error::FileAccess {
            path: PathBuf::from("missing.png"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
        assert_eq!(message, "could not read missing.png: no such file");

        let message = one_line(Error::Decode(CodecError::UnsupportedFormat(
            "unknown container".to_string(),
        )));
        assert_eq!(
            message,
            "image could not be decoded: unsupported image format: unknown container"
        );

        let message = one_line(Error::Probe(ProbeError::Command {
            command: "sh -c 'ulimit -n'".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no shell"),
        }));
        assert_eq!(
            message,
            "resource limit probe failed: could not run `sh -c 'ulimit -n'`: no shell"
        );
    }

    #[test]
    fn zero_budget_message_does_not_blame_a_probe() {
        let message = Error::from(EngineError::InvalidBudget).to_string();
        assert_eq!(
            message,
            "no safe concurrency budget: concurrency budget must be at least 1"
        );
    }
}
