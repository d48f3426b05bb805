use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::invocation::MethodInvocation;

/// A generated cache/rate-limit key. Opaque beyond equality, hashing, and
/// display — storages key their maps on this, descriptors never interpret it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(pub String);

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

/// `generate(target, method, args) -> Key` (spec §1, §4.6).
///
/// Key generation itself is out of scope for this core — the spec treats it
/// as an externally supplied capability the operation context resolves by
/// name. This trait is the seam; [`DefaultKeyGenerator`] is the in-process
/// default every `CacheOperationContext`/rate-limit context falls back to
/// when a descriptor doesn't name one explicitly.
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self, invocation: &dyn MethodInvocation) -> Key;
}

/// Joins the method's declaring type name, method name, and the debug
/// rendering of its arguments — the same "debug-render the call" strategy
/// the teacher's `CacheableKey` blanket impl uses for arbitrary argument
/// types, generalized from a single argument to the whole call.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultKeyGenerator;

#[async_trait]
impl KeyGenerator for DefaultKeyGenerator {
    async fn generate(&self, invocation: &dyn MethodInvocation) -> Key {
        let mut rendered = String::new();
        rendered.push_str(invocation.target_type());
        rendered.push('.');
        rendered.push_str(invocation.method_name());
        rendered.push('(');
        for (i, arg) in invocation.arguments().iter().enumerate() {
            if i > 0 {
                rendered.push(',');
            }
            rendered.push_str(arg);
        }
        rendered.push(')');
        Key(rendered)
    }
}

pub type SharedKeyGenerator = Arc<dyn KeyGenerator>;
