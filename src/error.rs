//! Error types for revocation checking.
//!
//! Every variant here ends a chain verification with a rejection. The only
//! non-fatal conditions (missing SCT extension, SCT records shorter than the
//! fixed header) never become errors at all.

use std::fmt;
use std::io;
use std::time::Duration;

/// Reason a certificate chain was rejected, or a client operation failed.
#[derive(Debug)]
pub enum RevocationError {
    /// A chain member is not valid DER
    MalformedCertificate {
        /// Position in the chain, 0 = end-entity
        index: usize,
        /// Parser message
        reason: String,
    },

    /// The embedded SCT extension value is not an octet string
    ExtensionEncoding {
        /// Parser message
        reason: String,
    },

    /// The SCT list length prefix claims more bytes than are present
    TruncatedList {
        /// Declared list length
        declared: usize,
        /// Bytes available after the prefix
        available: usize,
    },

    /// An SCT record length prefix claims more bytes than remain in the list
    TruncatedRecord {
        /// Offset of the record inside the list
        offset: usize,
        /// Declared record length
        declared: usize,
        /// Bytes remaining after the prefix
        available: usize,
    },

    /// The chain is too short for the evidence a binding needs
    InsufficientChain {
        /// Number of certificates required
        required: usize,
        /// Number of certificates supplied
        actual: usize,
    },

    /// The oracle could not be consulted or gave no usable answer
    Transport(TransportFailure),

    /// The oracle reported the end-entity certificate as revoked
    Revoked,

    /// DNS resolution failed for the given hostname
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to the target address
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TLS handshake failed for a reason other than a revocation rejection
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// Invalid input provided to the API
    InvalidInput {
        /// Which field/parameter was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },

    /// OpenSSL error occurred
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Generic I/O error
    IoError {
        /// The underlying I/O error
        source: io::Error,
    },
}

/// Why the oracle could not produce a verdict.
#[derive(Debug)]
pub enum TransportFailure {
    /// The oracle process could not be started
    Launch {
        /// Program that failed to start
        program: String,
        /// The underlying I/O error
        source: io::Error,
    },
    /// Writing to or waiting on the oracle process failed
    Io {
        /// The underlying I/O error
        source: io::Error,
    },
    /// The oracle process exited with a nonzero status
    ExitCode(i32),
    /// The oracle process was terminated by a signal
    Terminated,
    /// The oracle did not finish within the configured bound
    Timeout(Duration),
    /// The in-process oracle returned a code outside the known set
    ResultCode(i32),
    /// No in-process oracle library is available in this build
    Unavailable,
}

impl TransportFailure {
    /// Exit status or result code carried by this failure, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::ExitCode(code) | Self::ResultCode(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch { program, source } => {
                write!(f, "failed to start oracle '{}': {}", program, source)
            }
            Self::Io { source } => write!(f, "oracle I/O failed: {}", source),
            Self::ExitCode(code) => write!(f, "oracle exited with status {}", code),
            Self::Terminated => write!(f, "oracle was terminated by a signal"),
            Self::Timeout(limit) => {
                write!(f, "oracle did not answer within {}s", limit.as_secs_f64())
            }
            Self::ResultCode(code) => write!(f, "oracle failed with error: {}", code),
            Self::Unavailable => write!(f, "in-process oracle is not linked into this build"),
        }
    }
}

impl std::error::Error for TransportFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch { source, .. } | Self::Io { source } => Some(source),
            _ => None,
        }
    }
}

impl RevocationError {
    /// Short stable name of the rejection reason.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedCertificate { .. } => "malformed certificate",
            Self::ExtensionEncoding { .. } => "extension encoding error",
            Self::TruncatedList { .. } => "truncated list",
            Self::TruncatedRecord { .. } => "truncated record",
            Self::InsufficientChain { .. } => "insufficient chain",
            Self::Transport(_) => "transport error",
            Self::Revoked => "revoked",
            Self::DnsResolution { .. } => "dns resolution",
            Self::ConnectionFailed { .. } => "connection failed",
            Self::HandshakeFailed { .. } => "handshake failed",
            Self::InvalidInput { .. } => "invalid input",
            Self::OpenSSLError { .. } => "openssl error",
            Self::IoError { .. } => "io error",
        }
    }
}

impl fmt::Display for RevocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCertificate { index, reason } => {
                write!(f, "Malformed certificate at chain index {}: {}", index, reason)
            }
            Self::ExtensionEncoding { reason } => {
                write!(f, "Embedded SCT extension is not a valid octet string: {}", reason)
            }
            Self::TruncatedList {
                declared,
                available,
            } => {
                write!(
                    f,
                    "SCT list declares {} bytes but only {} are present",
                    declared, available
                )
            }
            Self::TruncatedRecord {
                offset,
                declared,
                available,
            } => {
                write!(
                    f,
                    "SCT record at offset {} declares {} bytes but only {} remain",
                    offset, declared, available
                )
            }
            Self::InsufficientChain { required, actual } => {
                write!(
                    f,
                    "Chain has {} certificate(s), revocation evidence needs {}",
                    actual, required
                )
            }
            Self::Transport(failure) => {
                write!(f, "Revocation check could not be completed: {}", failure)
            }
            Self::Revoked => write!(f, "Revocation check: revoked"),
            Self::DnsResolution { hostname, .. } => {
                write!(
                    f,
                    "Failed to resolve hostname: {}. Check that the hostname is spelled correctly and your DNS configuration is working.",
                    hostname
                )
            }
            Self::ConnectionFailed { address, .. } => {
                write!(
                    f,
                    "Connection failed to: {}. Verify the host is running a TLS service and is reachable.",
                    address
                )
            }
            Self::HandshakeFailed { details } => {
                write!(f, "TLS handshake failed: {}", details)
            }
            Self::InvalidInput { field, reason } => {
                write!(f, "Invalid input for '{}': {}", field, reason)
            }
            Self::OpenSSLError { details } => {
                write!(f, "OpenSSL error: {}", details)
            }
            Self::IoError { source } => {
                write!(f, "I/O error: {}", source)
            }
        }
    }
}

impl std::error::Error for RevocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::IoError { source } => Some(source),
            Self::Transport(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<TransportFailure> for RevocationError {
    fn from(failure: TransportFailure) -> Self {
        Self::Transport(failure)
    }
}

impl From<io::Error> for RevocationError {
    fn from(e: io::Error) -> Self {
        Self::IoError { source: e }
    }
}

impl From<openssl::error::ErrorStack> for RevocationError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}
