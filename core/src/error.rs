use thiserror::Error;

/// Failure taxonomy for one sync run.
///
/// Only `Auth` aborts a run; everything else is logged at the failing
/// unit (one page, one group, one create) and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Login rejected or token missing. Not retryable without new
    /// credentials; callers must abort the run.
    #[error("scanner authentication failed: {0}")]
    Auth(String),

    /// Timeout, connection reset, or non-2xx status on an otherwise
    /// well-formed exchange.
    #[error("transient network failure: {0}")]
    Transient(String),

    /// Response decoded but did not match the expected shape.
    #[error("unexpected response shape: {0}")]
    Schema(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_render_their_context() {
        let e = SyncError::Auth("code 401".into());
        assert!(e.to_string().contains("authentication"));
        let e = SyncError::Schema("total missing".into());
        assert!(e.to_string().contains("total missing"));
    }
}
