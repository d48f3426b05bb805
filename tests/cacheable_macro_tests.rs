/// Integration tests for `#[cacheable]`.
use cachegate::{cacheable, CacheError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

struct Users {
    calls: Arc<AtomicU32>,
}

impl Users {
    #[cacheable(cache_names = ["cacheable_users"], ttl_secs = 300)]
    async fn get(&self, id: u64) -> Result<String, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("user-{id}"))
    }
}

#[tokio::test]
async fn repeated_calls_with_the_same_key_invoke_the_method_once() {
    let users = Users { calls: Arc::new(AtomicU32::new(0)) };

    let first = users.get(101).await.unwrap();
    let second = users.get(101).await.unwrap();

    assert_eq!(first, "user-101");
    assert_eq!(second, "user-101");
    assert_eq!(users.calls.load(Ordering::SeqCst), 1, "second call should be served from cache");
}

#[tokio::test]
async fn distinct_keys_each_invoke_the_method() {
    let users = Users { calls: Arc::new(AtomicU32::new(0)) };

    users.get(201).await.unwrap();
    users.get(202).await.unwrap();

    assert_eq!(users.calls.load(Ordering::SeqCst), 2);
}
