use scopesync_core::SyncError;
use std::future::Future;
use tracing::warn;

/// One round of a member submission as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    Accepted,
    /// The server named exactly one invalid member.
    InvalidMember(String),
    /// Rejection with no usable member hint.
    Failed(String),
}

/// Bounded remove-and-resubmit loop: on each rejection the named member
/// is dropped and the remainder resubmitted, so the loop terminates in
/// at most `members.len()` attempts. An emptied list counts as accepted
/// with zero members and is never posted.
pub async fn submit_with_retry<F, Fut>(
    mut members: Vec<String>,
    mut post: F,
) -> Result<Vec<String>, SyncError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<SubmitReply, SyncError>>,
{
    while !members.is_empty() {
        match post(members.clone()).await? {
            SubmitReply::Accepted => return Ok(members),
            SubmitReply::InvalidMember(bad) => {
                let before = members.len();
                members.retain(|m| m != &bad);
                if members.len() == before {
                    // server named something we never sent; bail instead
                    // of resubmitting the same list forever
                    return Err(SyncError::Schema(format!(
                        "server rejected unknown member {bad}"
                    )));
                }
                warn!(member = %bad, remaining = members.len(), "invalid member removed, resubmitting");
            }
            SubmitReply::Failed(msg) => return Err(SyncError::Transient(msg)),
        }
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn members(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("m{i}.example.com")).collect()
    }

    #[tokio::test]
    async fn accepts_first_try() {
        let out = submit_with_retry(members(3), |_| async { Ok(SubmitReply::Accepted) })
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn one_rejection_per_attempt_terminates_in_n_attempts() {
        let attempts = AtomicUsize::new(0);
        let out = submit_with_retry(members(5), |batch| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Ok(SubmitReply::InvalidMember(batch[0].clone())) }
        })
        .await
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn survivors_are_returned_after_single_rejection() {
        let out = submit_with_retry(members(3), |batch| async move {
            if batch.contains(&"m1.example.com".to_string()) {
                Ok(SubmitReply::InvalidMember("m1.example.com".into()))
            } else {
                Ok(SubmitReply::Accepted)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, vec!["m0.example.com", "m2.example.com"]);
    }

    #[tokio::test]
    async fn unknown_member_rejection_is_a_schema_error() {
        let res = submit_with_retry(members(2), |_| async {
            Ok(SubmitReply::InvalidMember("never-sent.example.com".into()))
        })
        .await;
        assert!(matches!(res, Err(SyncError::Schema(_))));
    }
}
