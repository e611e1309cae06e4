//! Scoped ownership of call-local host references
//!
//! Every object created through a [`HandleScope`] is released exactly once:
//! either explicitly with [`HandleScope::release`], or when the scope is
//! dropped, whichever comes first. [`HandleScope::escape`] hands an object to
//! the caller instead, for the value a native call returns.

use crate::error::HostError;
use crate::host::{Handles, HostRuntime};
use tracing::{trace, warn};

/// Token for an object owned by a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoped(usize);

pub struct HandleScope<'h, H: HostRuntime> {
    host: &'h mut H,
    slots: Vec<Option<H::Object>>,
}

impl<'h, H: HostRuntime> HandleScope<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        Self {
            host,
            slots: Vec::new(),
        }
    }

    /// Construct a host object owned by this scope
    pub fn new_object(
        &mut self,
        ty: &<H::Handles as Handles>::Type,
        ctor: <H::Handles as Handles>::Method,
    ) -> Result<Scoped, HostError> {
        let obj = self.host.new_object(ty, ctor)?;
        Ok(self.adopt(obj))
    }

    /// Take ownership of a reference created elsewhere
    pub fn adopt(&mut self, obj: H::Object) -> Scoped {
        self.slots.push(Some(obj));
        Scoped(self.slots.len() - 1)
    }

    /// Run `f` with the host and the object behind `token`
    pub fn with<R>(
        &mut self,
        token: Scoped,
        f: impl FnOnce(&mut H, &H::Object) -> R,
    ) -> Result<R, HostError> {
        let obj = slot(&self.slots, token)?;
        Ok(f(&mut *self.host, obj))
    }

    /// Append `item` to `list` with the host's list add method
    pub fn append(
        &mut self,
        list: Scoped,
        add: <H::Handles as Handles>::Method,
        item: Scoped,
    ) -> Result<bool, HostError> {
        let list = slot(&self.slots, list)?;
        let item = slot(&self.slots, item)?;
        self.host.call_add(list, add, item)
    }

    /// Release the object now; later releases of the same token do nothing
    pub fn release(&mut self, token: Scoped) {
        match self.slots.get_mut(token.0).and_then(Option::take) {
            Some(obj) => release_logged(&mut *self.host, obj),
            None => trace!("scoped object {} already released", token.0),
        }
    }

    /// Stop tracking the object and hand it to the caller
    pub fn escape(&mut self, token: Scoped) -> Option<H::Object> {
        self.slots.get_mut(token.0).and_then(Option::take)
    }

    /// Objects still owned by the scope
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl<H: HostRuntime> Drop for HandleScope<'_, H> {
    fn drop(&mut self) {
        for obj in self.slots.drain(..).flatten() {
            release_logged(&mut *self.host, obj);
        }
    }
}

fn slot<O>(slots: &[Option<O>], token: Scoped) -> Result<&O, HostError> {
    slots
        .get(token.0)
        .and_then(Option::as_ref)
        .ok_or(HostError::InvalidObject)
}

fn release_logged<H: HostRuntime>(host: &mut H, obj: H::Object) {
    if let Err(e) = host.release(obj) {
        warn!("failed to release host reference: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{HostOp, LocalHost};
    use crate::registry::{DescriptorTable, HandleRegistry, MethodRole};

    #[test]
    fn test_drop_releases_everything_once() {
        let mut host = LocalHost::android();
        let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
        let ctor = registry.method(MethodRole::RectConstructor);

        {
            let mut scope = HandleScope::new(&mut host);
            let first = scope.new_object(registry.rect_type(), ctor).unwrap();
            let _second = scope.new_object(registry.rect_type(), ctor).unwrap();
            scope.release(first);
            scope.release(first);
            assert_eq!(scope.live(), 1);
        }

        let stats = host.stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.live, 0);
        assert_eq!(stats.invalid_releases, 0);
    }

    #[test]
    fn test_interleaved_failures_release_every_created_object() {
        for fail_at in 0..5 {
            let mut host = LocalHost::android();
            let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
            let ctor = registry.method(MethodRole::RectConstructor);
            host.fail_on(HostOp::NewObject, fail_at);
            host.fail_on(HostOp::NewObject, fail_at + 3);

            {
                let mut scope = HandleScope::new(&mut host);
                for _ in 0..8 {
                    let _ = scope.new_object(registry.rect_type(), ctor);
                }
            }

            let stats = host.stats();
            assert_eq!(stats.created, 6, "fail_at={}", fail_at);
            assert_eq!(stats.released, stats.created, "fail_at={}", fail_at);
            assert_eq!(stats.invalid_releases, 0);
        }
    }

    #[test]
    fn test_release_failure_does_not_stop_cleanup() {
        let mut host = LocalHost::android();
        let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
        let ctor = registry.method(MethodRole::RectConstructor);
        host.fail_on(HostOp::Release, 0);

        {
            let mut scope = HandleScope::new(&mut host);
            for _ in 0..3 {
                scope.new_object(registry.rect_type(), ctor).unwrap();
            }
        }

        assert_eq!(host.calls(HostOp::Release), 3);
        assert_eq!(host.stats().released, 3);
    }

    #[test]
    fn test_escaped_object_is_not_released() {
        let mut host = LocalHost::android();
        let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
        let ctor = registry.method(MethodRole::ListConstructor);

        let root = {
            let mut scope = HandleScope::new(&mut host);
            let token = scope.new_object(registry.list_type(), ctor).unwrap();
            scope.new_object(registry.list_type(), ctor).unwrap();
            let root = scope.escape(token);
            root
        };

        assert!(root.is_some());
        assert_eq!(host.stats().released, 1);
        assert_eq!(host.stats().live, 1);
    }
}
