use crate::error::RateLimitError;

/// Decides what an operation does with a failure raised by a storage call
/// (spec §2 item 11 analogue "RateLimitErrorHandler").
pub trait RateLimitErrorHandler: Send + Sync {
    fn handle(&self, error: RateLimitError) -> Result<(), RateLimitError>;
}

/// Swallows every storage failure: a backend hiccup fails open, letting the
/// guarded call proceed unthrottled rather than blocking traffic.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentRateLimitErrorHandler;

impl RateLimitErrorHandler for SilentRateLimitErrorHandler {
    fn handle(&self, _error: RateLimitError) -> Result<(), RateLimitError> {
        Ok(())
    }
}

/// Re-raises every storage failure, aborting the guarded call.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThrowingRateLimitErrorHandler;

impl RateLimitErrorHandler for ThrowingRateLimitErrorHandler {
    fn handle(&self, error: RateLimitError) -> Result<(), RateLimitError> {
        Err(error)
    }
}
