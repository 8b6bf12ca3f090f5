//! In-process oracle reached through a C entry point.
//!
//! The library receives an array of `{data, len}` views, end-entity first.
//! Those views point straight into the chain's DER buffers, so the buffers
//! are loaned for exactly the duration of the call: [`DerLoan`] borrows the
//! chain, which keeps every buffer alive and unmoved until it is dropped.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::os::raw::c_int;

use tracing::{debug, trace};

use crate::certificate::Chain;
use crate::error::RevocationError;
#[cfg(not(feature = "upki-link"))]
use crate::error::TransportFailure;
use crate::oracle::RevocationOracle;
use crate::verdict::Verdict;

/// One borrowed DER certificate, laid out as the library expects.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CertificateDer {
    pub data: *const u8,
    pub len: usize,
}

/// `check_revocation(config, certs, count) -> result code`
pub type CheckRevocationFn = unsafe extern "C" fn(
    config: *const c_void,
    certs: *const CertificateDer,
    count: usize,
) -> c_int;

/// Frees the library configuration handle.
pub type ReleaseFn = unsafe extern "C" fn(config: *mut c_void);

/// DER views valid for as long as the chain they were taken from is borrowed.
pub struct DerLoan<'a> {
    views: Vec<CertificateDer>,
    _chain: PhantomData<&'a Chain>,
}

impl<'a> DerLoan<'a> {
    pub fn new(chain: &'a Chain) -> DerLoan<'a> {
        let views = chain
            .iter()
            .map(|cert| CertificateDer {
                data: cert.der().as_ptr(),
                len: cert.der().len(),
            })
            .collect();
        DerLoan {
            views,
            _chain: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *const CertificateDer {
        self.views.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl Drop for DerLoan<'_> {
    fn drop(&mut self) {
        trace!(count = self.views.len(), "DER loan returned");
    }
}

/// Oracle implemented by a native library.
pub struct InProcessOracle {
    entry: CheckRevocationFn,
    config: *mut c_void,
    release: Option<ReleaseFn>,
}

// The entry point is required to be callable from any thread with a shared
// config; per-call state lives only in the arguments.
unsafe impl Send for InProcessOracle {}
unsafe impl Sync for InProcessOracle {}

impl InProcessOracle {
    /// Wraps a native entry point.
    ///
    /// # Safety
    ///
    /// `entry` must accept `config` and read at most `count` views without
    /// retaining them after returning. If `release` is given it is called
    /// once with `config` when the oracle is dropped.
    pub unsafe fn new(
        entry: CheckRevocationFn,
        config: *mut c_void,
        release: Option<ReleaseFn>,
    ) -> InProcessOracle {
        InProcessOracle {
            entry,
            config,
            release,
        }
    }

    /// Oracle backed by the linked `libupki`.
    #[cfg(feature = "upki-link")]
    pub fn linked() -> Result<InProcessOracle, RevocationError> {
        use crate::error::TransportFailure;

        let mut config: *mut c_void = std::ptr::null_mut();
        let result = unsafe { upki::upki_config_new(&mut config) };
        if result != crate::verdict::code::OK || config.is_null() {
            return Err(TransportFailure::ResultCode(result).into());
        }
        debug!("created upki config");
        Ok(unsafe {
            InProcessOracle::new(
                upki::upki_check_revocation,
                config,
                Some(upki::upki_config_free),
            )
        })
    }

    /// Without the `upki-link` feature there is no library to call.
    #[cfg(not(feature = "upki-link"))]
    pub fn linked() -> Result<InProcessOracle, RevocationError> {
        Err(TransportFailure::Unavailable.into())
    }
}

impl Drop for InProcessOracle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            unsafe { release(self.config) };
        }
    }
}

impl RevocationOracle for InProcessOracle {
    fn name(&self) -> &'static str {
        "ffi"
    }

    fn check(&self, chain: &Chain) -> Result<Verdict, RevocationError> {
        let loan = DerLoan::new(chain);
        debug!(count = loan.len(), "calling in-process oracle");
        let result = unsafe { (self.entry)(self.config, loan.as_ptr(), loan.len()) };
        drop(loan);

        debug!(result, "in-process oracle returned");
        Ok(Verdict::from_code(result))
    }
}

#[cfg(feature = "upki-link")]
mod upki {
    use super::CertificateDer;
    use std::ffi::c_void;
    use std::os::raw::c_int;

    #[link(name = "upki")]
    extern "C" {
        pub fn upki_config_new(config: *mut *mut c_void) -> c_int;
        pub fn upki_config_free(config: *mut c_void);
        pub fn upki_check_revocation(
            config: *const c_void,
            certs: *const CertificateDer,
            count: usize,
        ) -> c_int;
    }
}
