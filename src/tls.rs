//! OpenSSL integration.
//!
//! [`install`] hooks the revocation check into one connection's verify
//! callback. OpenSSL calls it once per chain depth, root first; the check runs
//! at depth 0, only when OpenSSL's own validation passed, over the chain it
//! just verified. A rejection fails the handshake and is kept in the returned
//! [`CheckLog`] so the caller sees the real reason instead of a generic
//! certificate-verify failure. Each connection gets its own log, so a shared
//! [`SslConnector`] can run handshakes concurrently.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use openssl::error::ErrorStack;
use openssl::ssl::{SslConnector, SslMethod, SslRef, SslVerifyMode};
use openssl::x509::X509StoreContextRef;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::certificate::Chain;
use crate::error::RevocationError;
use crate::evidence::Evidence;
use crate::oracle::RevocationOracle;
use crate::verdict::Verdict;

static TIMEOUT: u64 = 30;

/// One certificate of the verified chain, for display.
#[derive(Debug, Clone, Serialize)]
pub struct ChainEntry {
    pub index: usize,
    pub common_name: Option<String>,
    pub serial: String,
}

/// What happened inside the verify callback.
#[derive(Debug)]
pub struct ChainCheck {
    pub chain: Vec<ChainEntry>,
    pub evidence: Option<Evidence>,
    pub outcome: Result<Verdict, RevocationError>,
}

/// Slot the verify callback of one connection reports into.
#[derive(Debug, Clone, Default)]
pub struct CheckLog {
    inner: Arc<Mutex<Option<ChainCheck>>>,
}

impl CheckLog {
    fn lock(&self) -> MutexGuard<'_, Option<ChainCheck>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, check: ChainCheck) {
        *self.lock() = Some(check);
    }

    /// The most recent check, if the callback ran.
    pub fn take(&self) -> Option<ChainCheck> {
        self.lock().take()
    }
}

/// Runs `oracle` on the chain OpenSSL verifies for `ssl`, typically a
/// [`ConnectConfiguration`](openssl::ssl::ConnectConfiguration).
pub fn install(ssl: &mut SslRef, oracle: Arc<dyn RevocationOracle>) -> CheckLog {
    let log = CheckLog::default();
    let slot = log.clone();
    ssl.set_verify_callback(SslVerifyMode::PEER, move |preverify_ok, ctx| {
        if !preverify_ok || ctx.error_depth() != 0 {
            return preverify_ok;
        }
        let check = check_verified_chain(oracle.as_ref(), ctx);
        let accepted = check.outcome.is_ok();
        slot.record(check);
        accepted
    });
    log
}

fn check_verified_chain(oracle: &dyn RevocationOracle, ctx: &X509StoreContextRef) -> ChainCheck {
    let ders: Result<Vec<Vec<u8>>, ErrorStack> = match ctx.chain() {
        Some(stack) => stack.iter().map(|cert| cert.to_der()).collect(),
        None => Ok(Vec::new()),
    };
    let chain = ders
        .map_err(RevocationError::from)
        .and_then(|ders| Chain::from_ders(&ders));

    match chain {
        Ok(chain) => ChainCheck {
            chain: describe(&chain),
            evidence: Evidence::from_chain(&chain)
                .or_else(|_| Evidence::serial_only(&chain))
                .ok(),
            outcome: crate::check_chain(oracle, &chain),
        },
        Err(err) => {
            warn!("Revocation check rejected chain: {}", err);
            ChainCheck {
                chain: Vec::new(),
                evidence: None,
                outcome: Err(err),
            }
        }
    }
}

fn describe(chain: &Chain) -> Vec<ChainEntry> {
    chain
        .iter()
        .enumerate()
        .map(|(index, cert)| ChainEntry {
            index,
            common_name: cert.common_name().map(String::from),
            serial: cert.serial().iter().map(|b| format!("{:02X}", b)).collect(),
        })
        .collect()
}

/// Result of [`fetch`].
#[derive(Debug)]
pub struct Fetched {
    pub check: ChainCheck,
    /// HTTP status line of the response
    pub status_line: String,
}

/// Fetches `url` over HTTPS with the revocation check enforced, writing the
/// response body to `out`.
pub fn fetch(
    url: &str,
    oracle: Arc<dyn RevocationOracle>,
    out: &mut dyn Write,
) -> Result<Fetched, RevocationError> {
    let url = Url::parse(url).map_err(|e| RevocationError::InvalidInput {
        field: "url".to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "https" {
        return Err(RevocationError::InvalidInput {
            field: "url".to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    let host = url
        .host_str()
        .ok_or_else(|| RevocationError::InvalidInput {
            field: "url".to_string(),
            reason: "missing host".to_string(),
        })?
        .to_string();
    let port = url.port_or_known_default().unwrap_or(443);

    let connector = SslConnector::builder(SslMethod::tls())?.build();
    let mut config = connector.configure()?;
    let log = install(&mut config, oracle);

    let tcp_stream = connect(&host, port)?;
    let mut stream = match config.connect(&host, tcp_stream) {
        Ok(stream) => stream,
        Err(e) => {
            return Err(match log.take() {
                Some(ChainCheck {
                    outcome: Err(reason),
                    ..
                }) => reason,
                _ => RevocationError::HandshakeFailed {
                    details: e.to_string(),
                },
            })
        }
    };
    let check = log.take().ok_or_else(|| RevocationError::HandshakeFailed {
        details: "verify callback did not run".to_string(),
    })?;

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let request = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: revocheck/{}\r\nConnection: close\r\n\r\n",
        target,
        host,
        env!("CARGO_PKG_VERSION")
    );
    stream.write_all(request.as_bytes())?;

    let mut response = Vec::new();
    if let Err(e) = stream.read_to_end(&mut response) {
        if response.is_empty() {
            return Err(e.into());
        }
        debug!("connection ended uncleanly: {}", e);
    }

    let (head, body) = split_response(&response);
    out.write_all(body)?;
    out.flush()?;

    Ok(Fetched {
        check,
        status_line: head.lines().next().unwrap_or_default().to_string(),
    })
}

fn connect(host: &str, port: u16) -> Result<TcpStream, RevocationError> {
    let address = format!("{}:{}", host, port);
    let socket_addr = address
        .to_socket_addrs()
        .and_then(|mut addrs| {
            addrs
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses"))
        })
        .map_err(|source| RevocationError::DnsResolution {
            hostname: host.to_string(),
            source,
        })?;

    let tcp_stream = TcpStream::connect_timeout(&socket_addr, Duration::from_secs(TIMEOUT))
        .map_err(|source| RevocationError::ConnectionFailed {
            address: address.clone(),
            source,
        })?;
    tcp_stream.set_read_timeout(Some(Duration::from_secs(TIMEOUT)))?;
    Ok(tcp_stream)
}

fn split_response(response: &[u8]) -> (String, &[u8]) {
    match response.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(end) => (
            String::from_utf8_lossy(&response[..end]).into_owned(),
            &response[end + 4..],
        ),
        None => (String::from_utf8_lossy(response).into_owned(), &[]),
    }
}
