//! End-to-end checks of each oracle binding through `verify_chain`.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::ffi::c_void;
use std::os::raw::c_int;

use revocheck::oracle::{CertificateDer, InProcessOracle};
use revocheck::verdict::code;
use revocheck::{verify_chain, RevocationError, Verdict};

unsafe extern "C" fn answer(
    config: *const c_void,
    certs: *const CertificateDer,
    count: usize,
) -> c_int {
    if certs.is_null() || count == 0 {
        return -1;
    }
    *(config as *const c_int)
}

fn in_process(result: &mut c_int) -> InProcessOracle {
    unsafe { InProcessOracle::new(answer, result as *mut c_int as *mut c_void, None) }
}

#[test]
fn test_ffi_revoked_fails_verification() {
    let chain = common::chain(0x01, None);
    let mut result = code::REVOKED;
    assert!(matches!(
        verify_chain(&in_process(&mut result), &chain.ders[..2]),
        Err(RevocationError::Revoked)
    ));
}

#[test]
fn test_ffi_not_covered_passes_verification() {
    let chain = common::chain(0x01, None);
    let mut result = code::NOT_COVERED;
    assert!(matches!(
        verify_chain(&in_process(&mut result), &chain.ders[..2]),
        Ok(Verdict::NotCovered)
    ));
}

#[test]
fn test_ffi_unknown_code_fails_closed() {
    let chain = common::chain(0x01, None);
    let mut result: c_int = 7;
    match verify_chain(&in_process(&mut result), &chain.ders) {
        Err(RevocationError::Transport(failure)) => assert_eq!(failure.code(), Some(7)),
        other => panic!("expected transport rejection, got {:?}", other),
    }
}

#[cfg(unix)]
mod subprocess {
    use super::*;
    use revocheck::{ArgumentOracle, OracleCommand, StdinOracle, StreamTarget};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    // `/bin/sh -c <script> revocation-check <mode> ...`
    fn shell_oracle(script: String) -> OracleCommand {
        let mut command = OracleCommand::new("/bin/sh");
        command.leading_args = vec!["-c".to_string(), script, "revocation-check".to_string()];
        command.stdout = StreamTarget::Null;
        command.timeout = Some(Duration::from_secs(20));
        command
    }

    fn capture_args(path: &Path) -> String {
        format!("printf '%s\\n' \"$@\" > '{}'", path.display())
    }

    #[test]
    fn test_detail_arguments_in_chain_order() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("args");
        let (l1, l2) = ([0x01u8; 32], [0x02u8; 32]);
        let list = common::sct_list(&[(l1, 1000), (l2, 2000)]);
        let chain = common::chain(0x01, Some(&list));

        let oracle = ArgumentOracle::new(shell_oracle(capture_args(&out)));
        assert!(matches!(verify_chain(&oracle, &chain.ders), Ok(Verdict::Ok)));

        let recorded = fs::read_to_string(&out).unwrap();
        let args: Vec<&str> = recorded.lines().collect();
        assert_eq!(args[0], "detail");
        assert_eq!(args[1], "AQ==");
        assert_eq!(args.len(), 5);
        assert_eq!(
            &args[3..],
            &[
                format!("{}:1000", STANDARD.encode(l1)).as_str(),
                format!("{}:2000", STANDARD.encode(l2)).as_str(),
            ]
        );
    }

    #[test]
    fn test_stdin_receives_leaf_and_issuer_only() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stdin.pem");
        let chain = common::chain(0x01, None);
        assert_eq!(chain.ders.len(), 3);

        // `cat` only finishes once stdin is closed
        let script = format!("cat > '{}'", out.display());
        let oracle = StdinOracle::new(shell_oracle(script));
        assert!(matches!(verify_chain(&oracle, &chain.ders), Ok(Verdict::Ok)));

        let received = fs::read(&out).unwrap();
        let expected = [
            chain.certs[0].to_pem().unwrap(),
            chain.certs[1].to_pem().unwrap(),
        ]
        .concat();
        assert_eq!(received, expected);
        let text = String::from_utf8(received).unwrap();
        assert_eq!(text.matches("-----BEGIN CERTIFICATE-----").count(), 2);
    }

    #[test]
    fn test_stdin_mode_argument() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("args");
        let chain = common::chain(0x01, None);

        let script = format!("cat > /dev/null; {}", capture_args(&out));
        let oracle = StdinOracle::new(shell_oracle(script));
        verify_chain(&oracle, &chain.ders).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "high\n");
    }

    #[test]
    fn test_nonzero_exit_rejects_with_code() {
        let chain = common::chain(0x01, None);
        for oracle in [
            Box::new(ArgumentOracle::new(shell_oracle("exit 17".to_string())))
                as Box<dyn revocheck::RevocationOracle>,
            Box::new(StdinOracle::new(shell_oracle(
                "cat > /dev/null; exit 17".to_string(),
            ))),
        ] {
            match verify_chain(oracle.as_ref(), &chain.ders) {
                Err(RevocationError::Transport(failure)) => assert_eq!(failure.code(), Some(17)),
                other => panic!("{}: expected exit 17, got {:?}", oracle.name(), other),
            }
        }
    }

    #[test]
    fn test_oracle_stdout_goes_to_configured_file() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("oracle.out");
        let chain = common::chain(0x01, None);

        let mut command = shell_oracle("echo not revoked".to_string());
        command.stdout = StreamTarget::File(log.clone());
        verify_chain(&ArgumentOracle::new(command), &chain.ders).unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "not revoked\n");
    }

    #[test]
    fn test_lone_end_entity_is_insufficient_for_subprocess_bindings() {
        let chain = common::chain(0x01, None);
        let lone = &chain.ders[..1];
        let command = shell_oracle("exit 0".to_string());

        assert!(matches!(
            verify_chain(&ArgumentOracle::new(command.clone()), lone),
            Err(RevocationError::InsufficientChain { required: 2, actual: 1 })
        ));
        assert!(matches!(
            verify_chain(&StdinOracle::new(command), lone),
            Err(RevocationError::InsufficientChain { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_truncated_sct_list_rejects_before_launch() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("args");
        // one record claiming 0x50 bytes, only two present
        let bad = vec![0x00, 0x04, 0x00, 0x50, 0x00, 0x00];
        let chain = common::chain(0x01, Some(&bad));

        let oracle = ArgumentOracle::new(shell_oracle(capture_args(&out)));
        assert!(matches!(
            verify_chain(&oracle, &chain.ders),
            Err(RevocationError::TruncatedRecord { .. })
        ));
        assert!(!out.exists());
    }
}
