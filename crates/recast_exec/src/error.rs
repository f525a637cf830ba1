//! Error types for the work executor.

/// Errors raised while setting up the executor itself.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The worker pool could not be created.
    #[error("failed to build worker pool with {threads} threads: {reason}")]
    PoolBuild {
        /// Requested thread count (0 means the rayon default).
        threads: usize,
        /// Description of the failure.
        reason: String,
    },
}

/// The aggregate failure of a quick-fail batch.
///
/// Carries the cause reported by the first failing unit together with how
/// much of the batch ran before the failure stopped scheduling.
#[derive(Debug, thiserror::Error)]
#[error("{failed} of {total} units failed ({cancelled} cancelled before start): {cause}")]
pub struct QuickFail<E: std::error::Error + 'static> {
    /// The error of the first unit observed to fail.
    #[source]
    pub cause: E,
    /// Units in the batch.
    pub total: usize,
    /// Units that ran to completion, successfully or not.
    pub completed: usize,
    /// Units that failed (the first one plus any in-flight ones that also failed).
    pub failed: usize,
    /// Units never started because of the failure.
    pub cancelled: usize,
}

impl<E: std::error::Error + 'static> QuickFail<E> {
    /// Consumes the aggregate and returns the original cause.
    pub fn into_cause(self) -> E {
        self.cause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("compile of {0} failed")]
    struct UnitError(&'static str);

    #[test]
    fn quick_fail_display_names_cause() {
        let err = QuickFail {
            cause: UnitError("IFoo.aidl"),
            total: 8,
            completed: 3,
            failed: 1,
            cancelled: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("1 of 8 units failed"));
        assert!(msg.contains("5 cancelled"));
        assert!(msg.contains("compile of IFoo.aidl failed"));
    }

    #[test]
    fn quick_fail_source_is_cause() {
        use std::error::Error;
        let err = QuickFail {
            cause: UnitError("IBar.aidl"),
            total: 1,
            completed: 1,
            failed: 1,
            cancelled: 0,
        };
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("compile of IBar.aidl failed")
        );
        assert_eq!(err.into_cause().0, "IBar.aidl");
    }

    #[test]
    fn pool_build_display() {
        let err = ExecError::PoolBuild {
            threads: 4,
            reason: "resource unavailable".to_string(),
        };
        assert!(err.to_string().contains("4 threads"));
    }
}
