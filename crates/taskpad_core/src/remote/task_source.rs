//! Seed task source contract and HTTP implementation.
//!
//! # Responsibility
//! - Issue a single bounded-timeout GET against the seed endpoint.
//! - Decode the JSON envelope into neutral `SeedTask` values.
//!
//! # Invariants
//! - No retry happens here; the caller decides whether to retry.
//! - Extra envelope fields (total/skip/limit) are ignored.

use log::{error, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Default seed endpoint consumed on first launch.
pub const DEFAULT_SEED_ENDPOINT: &str = "https://dummyjson.com/todos";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote fetch failure taxonomy.
#[derive(Debug)]
pub enum RemoteError {
    /// The configured endpoint URL is malformed.
    InvalidEndpoint,
    /// Non-2xx status or an undecodable body.
    BadResponse {
        status: Option<u16>,
        detail: String,
    },
    /// No network path to the host (DNS or connect failure).
    NoConnectivity,
    /// No response within the configured bound.
    Timeout,
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEndpoint => write!(f, "seed endpoint URL is malformed"),
            Self::BadResponse { status, detail } => match status {
                Some(code) => write!(f, "bad seed response (status {code}): {detail}"),
                None => write!(f, "bad seed response: {detail}"),
            },
            Self::NoConnectivity => write!(f, "no network path to seed host"),
            Self::Timeout => write!(f, "seed fetch timed out"),
        }
    }
}

impl Error for RemoteError {}

/// Neutral transfer shape for one remote seed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTask {
    /// Remote integer id; not reused as local identity.
    pub remote_id: i64,
    pub text: String,
    pub completed: bool,
}

/// Source of seed tasks for the first-launch import.
///
/// A trait seam so the sync coordinator can be exercised without a network.
pub trait SeedTaskSource: Send + Sync {
    fn fetch_seed_tasks(&self) -> RemoteResult<Vec<SeedTask>>;
}

/// Remote endpoint configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEED_ENDPOINT.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// HTTP-backed seed task source.
pub struct HttpTaskSource {
    agent: ureq::Agent,
    config: RemoteConfig,
}

impl HttpTaskSource {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { agent, config }
    }
}

impl Default for HttpTaskSource {
    fn default() -> Self {
        Self::new(RemoteConfig::default())
    }
}

impl SeedTaskSource for HttpTaskSource {
    fn fetch_seed_tasks(&self) -> RemoteResult<Vec<SeedTask>> {
        let started_at = Instant::now();
        info!(
            "event=seed_fetch module=remote status=start endpoint={}",
            self.config.endpoint
        );

        let response = self
            .agent
            .get(&self.config.endpoint)
            .call()
            .map_err(map_call_error)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(RemoteError::BadResponse {
                status: Some(status),
                detail: "non-success status".to_string(),
            });
        }

        let body = response.into_string().map_err(|err| RemoteError::BadResponse {
            status: Some(status),
            detail: format!("failed to read body: {err}"),
        })?;

        let seeds = decode_envelope(&body).map_err(|err| {
            error!("event=seed_fetch module=remote status=error error_code=decode_failed error={err}");
            RemoteError::BadResponse {
                status: Some(status),
                detail: format!("undecodable body: {err}"),
            }
        })?;

        info!(
            "event=seed_fetch module=remote status=ok count={} duration_ms={}",
            seeds.len(),
            started_at.elapsed().as_millis()
        );
        Ok(seeds)
    }
}

fn map_call_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(code, _) => RemoteError::BadResponse {
            status: Some(code),
            detail: "non-success status".to_string(),
        },
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                RemoteError::InvalidEndpoint
            }
            ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                RemoteError::NoConnectivity
            }
            ureq::ErrorKind::Io => {
                if error_chain_timed_out(&transport) {
                    RemoteError::Timeout
                } else {
                    RemoteError::NoConnectivity
                }
            }
            _ => RemoteError::BadResponse {
                status: None,
                detail: transport.to_string(),
            },
        },
    }
}

/// Walks an error's source chain looking for an I/O timeout.
///
/// Transport errors wrap the underlying `std::io::Error`, so inspecting
/// `ErrorKind` is reliable where display strings are not.
fn error_chain_timed_out(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(inner) = current {
        if let Some(io_err) = inner.downcast_ref::<std::io::Error>() {
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = inner.source();
    }
    false
}

#[derive(Debug, Deserialize)]
struct SeedEnvelope {
    todos: Vec<SeedTaskDto>,
}

#[derive(Debug, Deserialize)]
struct SeedTaskDto {
    id: i64,
    todo: String,
    completed: bool,
}

fn decode_envelope(body: &str) -> Result<Vec<SeedTask>, serde_json::Error> {
    let envelope: SeedEnvelope = serde_json::from_str(body)?;
    Ok(envelope
        .todos
        .into_iter()
        .map(|dto| SeedTask {
            remote_id: dto.id,
            text: dto.todo,
            completed: dto.completed,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{
        decode_envelope, error_chain_timed_out, HttpTaskSource, RemoteConfig, RemoteError,
        SeedTaskSource,
    };
    use std::error::Error;
    use std::fmt::{Display, Formatter};
    use std::io;
    use std::time::Duration;

    #[test]
    fn decodes_envelope_and_ignores_extra_fields() {
        let body = r#"{
            "todos": [
                {"id": 1, "todo": "Buy milk", "completed": false, "userId": 26},
                {"id": 2, "todo": "Walk the dog", "completed": true, "userId": 9}
            ],
            "total": 150,
            "skip": 0,
            "limit": 30
        }"#;

        let seeds = decode_envelope(body).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].remote_id, 1);
        assert_eq!(seeds[0].text, "Buy milk");
        assert!(!seeds[0].completed);
        assert!(seeds[1].completed);
    }

    #[test]
    fn rejects_envelope_without_todos_field() {
        assert!(decode_envelope(r#"{"items": []}"#).is_err());
        assert!(decode_envelope("not json").is_err());
    }

    #[derive(Debug)]
    struct Wrapper(io::Error);

    impl Display for Wrapper {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "transport error")
        }
    }

    impl Error for Wrapper {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn nested_io_timeout_is_detected_through_the_source_chain() {
        let err = Wrapper(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        assert!(error_chain_timed_out(&err));
    }

    #[test]
    fn non_timeout_io_error_is_not_mistaken_for_a_timeout() {
        // Display text mentioning "timeout" must not matter; only the kind does.
        let err = Wrapper(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "peer reset before timeout window",
        ));
        assert!(!error_chain_timed_out(&err));
    }

    #[test]
    fn malformed_endpoint_reports_invalid_endpoint() {
        let source = HttpTaskSource::new(RemoteConfig {
            endpoint: "not a url".to_string(),
            timeout: Duration::from_secs(1),
        });

        let err = source.fetch_seed_tasks().unwrap_err();
        assert!(matches!(err, RemoteError::InvalidEndpoint));
    }
}
