// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Context
//!
//! A [`Context`] exists for exactly one invocation: it carries the
//! sender, the bindings produced while walking the command tree, the
//! flags collected by a [`crate::flag::CommandFlagParser`], and an
//! injector for values a handler wants without threading them through
//! every call site by hand.

use std::sync::Arc;

use crate::flag::FlagStore;
use crate::typed_map::{TypedKey, TypedMap};

/// A typed key into a [`Context`]'s store, identified by both its name
/// and its value type — two keys with the same name but different `V`
/// are distinct entries.
pub type ContextKey<V> = TypedKey<V>;

/// Per-invocation state threaded through the command tree walk and
/// handed to a command's handler.
pub struct Context<C> {
    sender: C,
    store: TypedMap,
    flags: FlagStore,
    injector: TypedMap,
}

impl<C> Context<C> {
    pub fn new(sender: C) -> Self {
        Context {
            sender,
            store: TypedMap::default(),
            flags: FlagStore::default(),
            injector: TypedMap::default(),
        }
    }

    pub fn sender(&self) -> &C {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut C {
        &mut self.sender
    }

    /// Read a value bound under `key`, if any.
    pub fn get<V: Send + Sync + 'static>(&self, key: ContextKey<V>) -> Option<&V> {
        self.store.get(key)
    }

    /// Bind a value under `key`, overwriting whatever was there.
    pub fn set<V: Send + Sync + 'static>(&mut self, key: ContextKey<V>, value: V) {
        self.store.insert(key, value);
    }

    /// True if `key` has a bound value of exactly type `V`.
    pub fn contains<V: 'static>(&self, key: ContextKey<V>) -> bool {
        self.store.contains(key)
    }

    /// Read the value bound under `key`, computing and storing a
    /// default via `default` if nothing is bound yet.
    pub fn get_or_compute<V: Clone + Send + Sync + 'static>(
        &mut self,
        key: ContextKey<V>,
        default: impl FnOnce() -> V,
    ) -> V {
        if let Some(existing) = self.store.get(key) {
            return existing.clone();
        }
        let value = default();
        self.store.insert(key, value.clone());
        value
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagStore {
        &mut self.flags
    }

    /// Register a value for later [`Context::inject`] calls. Called by
    /// [`crate::manager::CommandManager::execute_command`] for every
    /// provider registered via
    /// [`crate::manager::CommandManager::register_provider`], once per
    /// invocation so a single manager can serve senders with different
    /// injected state (e.g. per-connection services).
    pub fn provide<T: Send + Sync + 'static>(&mut self, value: T) {
        self.injector.insert_by_type(value);
    }

    /// Look up a previously provided value of type `T`.
    pub fn inject<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.injector.get_by_type::<T>()
    }
}

/// Translates a platform-specific raw sender identity into the domain
/// sender type `C` used by a [`crate::manager::CommandManager`], and
/// back. This is the seam front-ends (chat bridges, IDE plugins, proxy
/// integrations) are expected to implement; the core only calls
/// through it.
pub trait SenderMapper<Raw, C>: Send + Sync {
    fn map_to_domain(&self, raw: Raw) -> C;
    fn map_to_raw(&self, sender: &C) -> Raw;
}

/// A no-op [`SenderMapper`] for front-ends whose raw identity already
/// is the domain sender type.
pub struct IdentitySenderMapper;

impl<C: Clone + Send + Sync> SenderMapper<C, C> for IdentitySenderMapper {
    fn map_to_domain(&self, raw: C) -> C {
        raw
    }

    fn map_to_raw(&self, sender: &C) -> C {
        sender.clone()
    }
}

/// A shared permission predicate over a sender. `None` means "always
/// satisfied".
#[derive(Clone)]
pub struct Permission<C> {
    label: Option<Arc<str>>,
    predicate: Option<Arc<dyn Fn(&C) -> bool + Send + Sync>>,
}

impl<C> Default for Permission<C> {
    fn default() -> Self {
        Permission {
            label: None,
            predicate: None,
        }
    }
}

impl<C> Permission<C> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(label: impl Into<Arc<str>>, predicate: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Permission {
            label: Some(label.into()),
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("<none>")
    }

    pub fn is_satisfied_by(&self, sender: &C) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(sender),
            None => true,
        }
    }

    /// Combine two permissions into one satisfied by any sender that
    /// satisfies either. Used by [`crate::tree::CommandTree::register`]
    /// to fold a command's permission into every node along its path:
    /// a node shared by several commands must stay as open as the
    /// least restrictive one, since gating it would block every
    /// sibling path that passes through it too.
    pub fn or(&self, other: &Permission<C>) -> Permission<C>
    where
        C: 'static,
    {
        match (&self.predicate, &other.predicate) {
            (None, _) | (_, None) => Permission::none(),
            (Some(a), Some(b)) => {
                let a = a.clone();
                let b = b.clone();
                Permission {
                    label: Some(format!("{} or {}", self.label(), other.label()).into()),
                    predicate: Some(Arc::new(move |sender: &C| a(sender) || b(sender))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT: ContextKey<i32> = ContextKey::new("count");
    const NAME: ContextKey<String> = ContextKey::new("name");

    #[test]
    fn keys_are_distinguished_by_name_and_type() {
        let mut ctx = Context::new(());
        ctx.set(COUNT, 3);
        ctx.set(NAME, "abc".to_string());
        assert_eq!(ctx.get(COUNT), Some(&3));
        assert_eq!(ctx.get(NAME), Some(&"abc".to_string()));
    }

    #[test]
    fn compute_if_absent_only_computes_once() {
        let mut ctx = Context::new(());
        let first = ctx.get_or_compute(COUNT, || 10);
        let second = ctx.get_or_compute(COUNT, || 99);
        assert_eq!(first, 10);
        assert_eq!(second, 10);
    }

    #[test]
    fn permission_none_is_always_satisfied() {
        let perm: Permission<()> = Permission::none();
        assert!(perm.is_satisfied_by(&()));
    }

    #[test]
    fn or_combined_permission_is_satisfied_by_either_side() {
        let admin: Permission<u64> = Permission::new("admin", |sender| *sender == 1);
        let moderator: Permission<u64> = Permission::new("moderator", |sender| *sender == 2);
        let combined = admin.or(&moderator);
        assert!(combined.is_satisfied_by(&1));
        assert!(combined.is_satisfied_by(&2));
        assert!(!combined.is_satisfied_by(&3));
    }

    #[test]
    fn or_with_none_is_always_satisfied() {
        let admin: Permission<u64> = Permission::new("admin", |sender| *sender == 1);
        let open: Permission<u64> = Permission::none();
        let combined = admin.or(&open);
        assert!(combined.is_satisfied_by(&99));
    }

    #[test]
    fn injected_values_are_retrievable_by_type() {
        let mut ctx: Context<()> = Context::new(());
        ctx.provide(42u64);
        assert_eq!(ctx.inject::<u64>(), Some(&42));
        assert_eq!(ctx.inject::<String>(), None);
    }
}
