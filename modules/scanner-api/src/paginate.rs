use scopesync_core::SyncError;
use std::future::Future;
use tracing::warn;

pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
}

/// Drain a paged listing. Total pages are computed from the first
/// response only (the total is assumed stable for the run); a failed
/// page is logged and the loop stops early with what was collected,
/// since the whole sync is safe to re-run.
pub async fn collect_pages<T, F, Fut>(size: u64, mut fetch: F) -> Vec<T>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Page<T>, SyncError>>,
{
    let mut all = Vec::new();
    let first = match fetch(1).await {
        Ok(p) => p,
        Err(e) => {
            warn!("first page failed, returning nothing: {e}");
            return all;
        }
    };
    let pages = first.total.div_ceil(size.max(1));
    all.extend(first.items);
    for page in 2..=pages {
        match fetch(page).await {
            Ok(p) => all.extend(p.items),
            Err(e) => {
                warn!("page {page}/{pages} failed, stopping early: {e}");
                break;
            }
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn drains_exactly_ceil_total_over_size_pages() {
        let calls = AtomicU64::new(0);
        let items = collect_pages(10, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let start = (page - 1) * 10;
                let count = 10.min(37 - start);
                Ok(Page {
                    total: 37,
                    items: (start..start + count).collect::<Vec<u64>>(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(items.len(), 37);
    }

    #[tokio::test]
    async fn failed_page_returns_partial_results() {
        let items = collect_pages(10, |page| async move {
            if page == 3 {
                Err(SyncError::Transient("reset".into()))
            } else {
                Ok(Page { total: 40, items: vec![page; 10] })
            }
        })
        .await;
        assert_eq!(items.len(), 20);
    }

    #[tokio::test]
    async fn failed_first_page_is_empty() {
        let items: Vec<u64> = collect_pages(10, |_| async {
            Err(SyncError::Transient("down".into()))
        })
        .await;
        assert!(items.is_empty());
    }
}
