//! Secure string implementation with automatic memory zeroing
//!
//! Shared keys and identity tokens live in a [`SecureString`] from the moment
//! they are read until the client holding them is dropped.

use std::fmt;
use zeroize::Zeroize;

/// A UTF-8 string that zeros its memory when dropped
///
/// - Automatic memory zeroing on drop
/// - `Debug` and `Display` print `***`
/// - Constant-time comparison
/// - Best-effort memory locking on unix
#[derive(Clone, Zeroize)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Create a new SecureString, taking ownership of the buffer
    pub fn new(s: impl Into<String>) -> Self {
        let inner = s.into();

        #[cfg(unix)]
        Self::try_lock_memory(inner.as_bytes());

        Self { inner }
    }

    /// Get the secret as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Borrow the secret text
    ///
    /// The name is deliberately loud: every call site is a place the secret
    /// leaves its wrapper.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// True if the secret is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.inner.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Constant-time comparison
    pub fn constant_time_eq(&self, other: &Self) -> bool {
        let a = self.inner.as_bytes();
        let b = other.inner.as_bytes();
        if a.len() != b.len() {
            return false;
        }

        let mut result = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            result |= x ^ y;
        }
        result == 0
    }

    /// Try to lock memory pages containing the secure data
    #[cfg(unix)]
    fn try_lock_memory(data: &[u8]) {
        if data.is_empty() {
            return;
        }
        use libc::{_SC_PAGESIZE, mlock, sysconf};

        unsafe {
            let page_size = sysconf(_SC_PAGESIZE) as usize;
            let ptr = data.as_ptr() as usize;
            let aligned = ptr & !(page_size - 1);
            let aligned_len = ptr - aligned + data.len();

            // Best-effort: RLIMIT_MEMLOCK may be tiny
            let _ = mlock(aligned as *const libc::c_void, aligned_len);
        }
    }

    #[cfg(unix)]
    fn try_unlock_memory(&self) {
        if self.inner.is_empty() {
            return;
        }
        use libc::{_SC_PAGESIZE, munlock, sysconf};

        unsafe {
            let page_size = sysconf(_SC_PAGESIZE) as usize;
            let ptr = self.inner.as_ptr() as usize;
            let aligned = ptr & !(page_size - 1);
            let aligned_len = ptr - aligned + self.inner.len();

            let _ = munlock(aligned as *const libc::c_void, aligned_len);
        }
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.try_unlock_memory();

        self.inner.zeroize();
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        self.constant_time_eq(other)
    }
}

impl Eq for SecureString {}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
