use std::any::Any;
use std::collections::HashMap;

/// Static metadata about the method an invocation targets.
#[derive(Clone, Debug)]
pub struct MethodMetadata {
    pub target_type: String,
    pub method_name: String,
}

/// The handle the host's method-interception framework would hand the core
/// around a single invocation (spec §1, out-of-scope collaborator — this is
/// just the seam). Exposes the target, method metadata, arguments, return
/// value, and direct-annotation lookup (spec §9 "Annotation discovery":
/// `hasDirectAnnotation` / `getDirectAnnotation`, direct annotations only, no
/// inheritance traversal).
///
/// Arguments and the return value are carried pre-rendered as strings (the
/// core only ever uses them for key generation and debug context, never for
/// typed computation), matching how `cachelito`'s macros render arguments via
/// `CacheableKey`/`Debug` rather than keeping typed handles around.
pub trait MethodInvocation: Send + Sync {
    fn target_type(&self) -> &str;
    fn method_name(&self) -> &str;
    fn arguments(&self) -> &[String];
    fn return_value(&self) -> Option<&str>;

    fn has_direct_annotation(&self, kind: &str) -> bool {
        self.direct_annotation(kind).is_some()
    }

    fn direct_annotation(&self, kind: &str) -> Option<&(dyn Any + Send + Sync)>;
}

/// An in-process [`MethodInvocation`] built directly by macro-generated code
/// or by tests, rather than sourced from a real interception framework.
pub struct SimpleMethodInvocation {
    metadata: MethodMetadata,
    arguments: Vec<String>,
    return_value: Option<String>,
    annotations: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl SimpleMethodInvocation {
    pub fn new(
        target_type: impl Into<String>,
        method_name: impl Into<String>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            metadata: MethodMetadata {
                target_type: target_type.into(),
                method_name: method_name.into(),
            },
            arguments,
            return_value: None,
            annotations: HashMap::new(),
        }
    }

    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    pub fn with_return_value(mut self, rendered: String) -> Self {
        self.return_value = Some(rendered);
        self
    }

    pub fn with_annotation(
        mut self,
        kind: impl Into<String>,
        value: impl Any + Send + Sync + 'static,
    ) -> Self {
        self.annotations.insert(kind.into(), Box::new(value));
        self
    }
}

impl MethodInvocation for SimpleMethodInvocation {
    fn target_type(&self) -> &str {
        &self.metadata.target_type
    }

    fn method_name(&self) -> &str {
        &self.metadata.method_name
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn return_value(&self) -> Option<&str> {
        self.return_value.as_deref()
    }

    fn direct_annotation(&self, kind: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.annotations.get(kind).map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_annotation_lookup_is_kind_scoped() {
        let inv = SimpleMethodInvocation::new("Svc", "m", vec![])
            .with_annotation("Cacheable", 42i32);

        assert!(inv.has_direct_annotation("Cacheable"));
        assert!(!inv.has_direct_annotation("RateLimit"));
        assert_eq!(
            inv.direct_annotation("Cacheable").and_then(|a| a.downcast_ref::<i32>()),
            Some(&42)
        );
    }

    #[test]
    fn arguments_and_return_value() {
        let inv = SimpleMethodInvocation::new("Svc", "m", vec!["1".into()])
            .with_return_value("ok".into());
        assert_eq!(inv.arguments(), &["1".to_string()]);
        assert_eq!(inv.return_value(), Some("ok"));
    }
}
