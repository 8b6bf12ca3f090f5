//! Revocation check over a live TLS connection.
//!
//! Fetches each URL with the `detail` subprocess oracle hooked into the
//! handshake and reports what the oracle decided.
//!
//! Run with: cargo run --example revocation_check -- /path/to/revocation-check

use std::io;
use std::sync::Arc;

use revocheck::tls::fetch;
use revocheck::{ArgumentOracle, OracleCommand, RevocationError, RevocationOracle, StreamTarget};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    revocheck::logging::setup_logging(Some("warn"));

    let program = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "revocation-check".to_string());
    let mut command = OracleCommand::new(program);
    command.stdout = StreamTarget::Null;
    let oracle: Arc<dyn RevocationOracle> = Arc::new(ArgumentOracle::new(command));

    println!("=== TLS Certificate Revocation Check ===\n");

    let urls = vec![
        "https://google.com/",
        "https://github.com/",
        // revoked.badssl.com serves a revoked certificate
        "https://revoked.badssl.com/",
    ];

    for url in urls {
        println!("Checking {}...", url);

        match fetch(url, oracle.clone(), &mut io::sink()) {
            Ok(fetched) => {
                for entry in &fetched.check.chain {
                    println!(
                        "  [{}] {}",
                        entry.index,
                        entry.common_name.as_deref().unwrap_or("-")
                    );
                }
                if let Ok(verdict) = &fetched.check.outcome {
                    println!("  Status: {}", verdict);
                }
                println!("  Response: {}", fetched.status_line);
            }
            Err(RevocationError::Revoked) => println!("  Status: REVOKED, handshake aborted"),
            Err(e) => println!("  Error: {}", e),
        }
        println!();
    }

    Ok(())
}
