use crate::error::CacheError;

/// Decides what an operation does with a failure raised by a storage call
/// (spec §2 item 11 "CacheErrorHandler").
pub trait CacheErrorHandler: Send + Sync {
    /// `Ok(())` swallows the error (the operation proceeds as if the call
    /// that failed had simply found nothing); `Err` re-raises it, aborting
    /// the operation.
    fn handle(&self, error: CacheError) -> Result<(), CacheError>;
}

/// Swallows every storage failure. The default, matching the teacher's
/// "a cache backend hiccup should never break the guarded method" stance.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentCacheErrorHandler;

impl CacheErrorHandler for SilentCacheErrorHandler {
    fn handle(&self, _error: CacheError) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Re-raises every storage failure, aborting the guarded call.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThrowingCacheErrorHandler;

impl CacheErrorHandler for ThrowingCacheErrorHandler {
    fn handle(&self, error: CacheError) -> Result<(), CacheError> {
        Err(error)
    }
}
