use std::sync::Arc;

#[repr(transparent)]
pub struct ReqId(pub Arc<str>);
impl Clone for ReqId {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl ReqId {
    pub fn generate() -> Self {
        Self(Arc::from(nanoid::nanoid!(22)))
    }
}

/// Monotonic token tagging a comparison request.
///
/// A response is only applied while its token is still the session's
/// current one.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);
impl RequestToken {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
