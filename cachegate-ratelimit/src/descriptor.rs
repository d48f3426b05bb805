use cachegate_core::{Condition, MethodInvocation, SharedKeyGenerator};
use std::sync::Arc;

/// A condition evaluated against the current invocation (spec §4.9).
pub type InvocationCondition = Arc<dyn Condition<dyn MethodInvocation>>;

/// Declares that a method call consumes one request against one or more
/// fixed windows (spec §2 item 9 analogue "RateLimit").
#[derive(Clone)]
pub struct RateLimit {
    pub storage_names: Vec<String>,
    pub key_generator: Option<SharedKeyGenerator>,
    pub condition: Option<InvocationCondition>,
    pub unless: Option<InvocationCondition>,
    pub limit: u64,
    pub window_secs: u64,
    /// `true`: a denial surfaces as [`crate::operation::RateLimitOutcome::Exceeded`].
    /// `false`: a denial surfaces as the softer
    /// [`crate::operation::RateLimitOutcome::Skipped`] instead. Either way the
    /// guarded call is never invoked on denial (spec §4.14 step 3).
    pub throw_on_exceeded: bool,
}

impl RateLimit {
    pub fn new(storage_names: impl IntoIterator<Item = impl Into<String>>, limit: u64, window_secs: u64) -> Self {
        Self {
            storage_names: storage_names.into_iter().map(Into::into).collect(),
            key_generator: None,
            condition: None,
            unless: None,
            limit,
            window_secs,
            throw_on_exceeded: true,
        }
    }

    pub fn with_key_generator(mut self, key_generator: SharedKeyGenerator) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    pub fn with_condition(mut self, condition: InvocationCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_unless(mut self, unless: InvocationCondition) -> Self {
        self.unless = Some(unless);
        self
    }

    pub fn throw_on_exceeded(mut self, throw_on_exceeded: bool) -> Self {
        self.throw_on_exceeded = throw_on_exceeded;
        self
    }
}
