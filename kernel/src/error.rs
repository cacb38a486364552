//! Kernel error taxonomy.
//!
//! Every fallible operation reachable from a system call returns
//! [`KernelResult`]. User programs only ever observe `-1`; the variant
//! is kept for logging and for the host test suite.

use core::fmt;

/// Errors produced by the process/execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Named file does not exist.
    NotFound,
    /// Descriptor index out of range, buffer missing, or slot not in use.
    InvalidDescriptor,
    /// No free descriptor slot.
    TooManyOpenFiles,
    /// Directory entry carries a type with no capability.
    UnsupportedType,
    /// Operation not valid for this capability.
    Unsupported,
    /// All process slots are live.
    NoFreeProcessSlot,
    /// Command line empty, only spaces, or too long.
    MalformedCommand,
    /// Command name does not exist in the file system.
    CommandNotFound,
    /// File lacks the executable magic.
    NotExecutable,
    /// Image could not be copied into the user window.
    LoadError,
    /// Argument value rejected.
    InvalidArgument,
    /// User pointer outside the accessible windows.
    BadAddress,
    /// A device callback reported failure.
    DeviceError,
    /// File system read failed.
    IoError,
}

impl KernelError {
    /// Short description used by `Display` and the logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KernelError::NotFound => "file not found",
            KernelError::InvalidDescriptor => "invalid file descriptor",
            KernelError::TooManyOpenFiles => "too many open files",
            KernelError::UnsupportedType => "unsupported file type",
            KernelError::Unsupported => "operation not supported",
            KernelError::NoFreeProcessSlot => "no free process slot",
            KernelError::MalformedCommand => "malformed command",
            KernelError::CommandNotFound => "command not found",
            KernelError::NotExecutable => "not an executable",
            KernelError::LoadError => "program load failed",
            KernelError::InvalidArgument => "invalid argument",
            KernelError::BadAddress => "bad user address",
            KernelError::DeviceError => "device error",
            KernelError::IoError => "i/o error",
        }
    }

    /// Value returned to user space.
    pub const fn errno(&self) -> i32 {
        -1
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type used throughout the kernel.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_distinct() {
        let errors = [
            KernelError::NotFound,
            KernelError::InvalidDescriptor,
            KernelError::TooManyOpenFiles,
            KernelError::UnsupportedType,
            KernelError::Unsupported,
            KernelError::NoFreeProcessSlot,
            KernelError::MalformedCommand,
            KernelError::CommandNotFound,
            KernelError::NotExecutable,
            KernelError::LoadError,
        ];

        for i in 0..errors.len() {
            for j in (i + 1)..errors.len() {
                assert_ne!(errors[i], errors[j]);
                assert_ne!(errors[i].as_str(), errors[j].as_str());
            }
        }
    }

    #[test]
    fn test_errno_is_minus_one() {
        assert_eq!(KernelError::NotFound.errno(), -1);
        assert_eq!(KernelError::LoadError.errno(), -1);
    }
}
