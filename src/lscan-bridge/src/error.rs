//! Error types for the boundary layer

use thiserror::Error;

/// Failure reported by the host object model for a single call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("type not found: {0}")]
    TypeNotFound(String),

    #[error("member not found: {owner}.{member} {signature}")]
    MemberNotFound {
        owner: String,
        member: String,
        signature: String,
    },

    #[error("host exception: {0}")]
    Exception(String),

    #[error("stale or released object reference")]
    InvalidObject,
}

/// Whether a descriptor names a field or a callable member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
        }
    }
}

/// One entry of the descriptor table that could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("can't find type {owner}")]
    TypeNotFound { owner: String },

    #[error("can't find {} {owner}.{member} {signature}", .kind.as_str())]
    MemberNotFound {
        kind: MemberKind,
        owner: String,
        member: String,
        signature: String,
    },
}

/// Load-time failure: the host does not provide the contract the bridge needs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved host contract: {}", join_failures(.failures))]
pub struct ResolutionError {
    pub failures: Vec<ResolutionFailure>,
}

fn join_failures(failures: &[ResolutionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure while moving a region or a result list across the boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("failed to read {field} from host rectangle: {source}")]
    Read {
        field: &'static str,
        source: HostError,
    },

    #[error("failed to write {field} on host rectangle: {source}")]
    Write {
        field: &'static str,
        source: HostError,
    },

    #[error("failed to allocate host {what}: {source}")]
    Allocate {
        what: &'static str,
        source: HostError,
    },

    #[error("failed to append to host list: {0}")]
    Append(HostError),

    #[error("host rejected list append")]
    AppendRejected,

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Underlying recognition failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("failed to initialize recognition: {0}")]
    InitFailed(String),

    #[error("recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("recognition engine panicked: {0}")]
    Panicked(String),
}

/// Engine output that violates the pairing contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("pair {pair} references region {index}, but only {len} regions were detected")]
    PairIndexOutOfRange { pair: usize, index: usize, len: usize },
}

pub type Result<T, E = ConversionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_lists_every_failure() {
        let err = ResolutionError {
            failures: vec![
                ResolutionFailure::TypeNotFound {
                    owner: "java/util/ArrayList".into(),
                },
                ResolutionFailure::MemberNotFound {
                    kind: MemberKind::Field,
                    owner: "android/graphics/Rect".into(),
                    member: "bottom".into(),
                    signature: "I".into(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("can't find type java/util/ArrayList"));
        assert!(message.contains("can't find field android/graphics/Rect.bottom I"));
    }
}
