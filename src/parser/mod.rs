// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Argument Parsers
//!
//! An [`ArgumentParser`] turns the next piece (or pieces) of a
//! [`CommandInput`] into a typed value `T`, or fails with a structured
//! [`ArgumentParseError`]. [`ParserRegistry`] maps a value type to the
//! factory that builds its default parser, so a [`crate::component::TypedComponent`]
//! declared only as `TypedComponent::<C, i32>::new("amount")` can find
//! a usable parser without the caller writing one by hand.

pub mod aggregate;
pub mod mapped;
pub mod standard;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::ArgumentParseError;
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::suggestion::Suggestion;
use crate::typed_map::{TypedKey, TypedMap};

pub use aggregate::AggregateParser;
pub use mapped::MappedParser;

/// Converts the next token(s) of a [`CommandInput`] into a `T`.
///
/// Implementors must leave the cursor exactly where it was on failure:
/// a parser that reads ahead to validate, then fails, must restore the
/// cursor before returning.
pub trait ArgumentParser<C, T>: Send + Sync {
    fn parse(&self, ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<T, ArgumentParseError>;

    /// Completion candidates for whatever partial token currently sits
    /// at the cursor. The default implementation offers nothing; most
    /// parsers with a closed or enumerable domain (enum, bool, literal)
    /// override this.
    fn suggestions(&self, _ctx: &Context<C>, _input: &CommandInput) -> Vec<Suggestion> {
        Vec::new()
    }
}

/// A named slot in a [`ParserParameters`] bag, identified by both a
/// name and a value type, same discipline as [`crate::context::ContextKey`].
pub type ParserParameterKey<V> = TypedKey<V>;

/// Construction-time parameters passed to a [`ParserRegistry`] factory
/// when it builds a parser for a component — e.g. a declared numeric
/// range, a case-sensitivity flag, a custom duration unit set. Kept as
/// a type-erased bag rather than a per-parser struct so the registry's
/// factory signature stays uniform across every value type.
#[derive(Default)]
pub struct ParserParameters {
    values: TypedMap,
}

impl ParserParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Send + Sync + 'static>(mut self, key: ParserParameterKey<V>, value: V) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn get<V: 'static>(&self, key: ParserParameterKey<V>) -> Option<&V> {
        self.values.get(key)
    }
}

type ParserFactory = Arc<dyn Fn(&ParserParameters) -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// Maps a value type `T` to the factory that produces its default
/// [`ArgumentParser`]. A [`crate::component::TypedComponent`] that
/// isn't given an explicit parser looks here instead.
pub struct ParserRegistry<C> {
    factories: HashMap<TypeId, ParserFactory>,
    _marker: std::marker::PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> Default for ParserRegistry<C> {
    fn default() -> Self {
        let mut registry = ParserRegistry {
            factories: HashMap::new(),
            _marker: std::marker::PhantomData,
        };
        registry.register_defaults();
        registry
    }
}

impl<C: Send + Sync + 'static> ParserRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn register_defaults(&mut self) {
        use standard::*;

        self.register::<String, _>(|_params| Arc::new(StringParser::new(StringMode::Single)));
        self.register::<bool, _>(|_params| Arc::new(BoolParser::default()));
        self.register::<i32, _>(|_params| Arc::new(IntParser::new(i32::MIN, i32::MAX)));
        self.register::<i64, _>(|_params| Arc::new(LongParser::new(i64::MIN, i64::MAX)));
        self.register::<f64, _>(|_params| Arc::new(DoubleParser::new(f64::MIN, f64::MAX)));
        self.register::<char, _>(|_params| Arc::new(CharParser));
        self.register::<std::time::Duration, _>(|_params| Arc::new(DurationParser));
    }

    /// Register the factory used to build a `T` parser when a
    /// component doesn't supply one explicitly.
    pub fn register<T, F>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        C: 'static,
        F: Fn(&ParserParameters) -> Arc<dyn ArgumentParser<C, T>> + Send + Sync + 'static,
    {
        let erased: ParserFactory = Arc::new(move |params| {
            let parser: Arc<dyn ArgumentParser<C, T>> = factory(params);
            Box::new(parser) as Box<dyn Any + Send + Sync>
        });
        self.factories.insert(TypeId::of::<T>(), erased);
    }

    /// Build (or fetch, if the factory caches) the default parser for
    /// `T`, if one was registered.
    pub fn parser_for<T: Send + Sync + 'static>(
        &self,
        params: &ParserParameters,
    ) -> Option<Arc<dyn ArgumentParser<C, T>>>
    where
        C: 'static,
    {
        let factory = self.factories.get(&TypeId::of::<T>())?;
        let any = factory(params);
        any.downcast::<Arc<dyn ArgumentParser<C, T>>>()
            .ok()
            .map(|boxed| (*boxed).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_default_parser_for_known_type() {
        let registry: ParserRegistry<()> = ParserRegistry::new();
        let params = ParserParameters::new();
        let parser = registry.parser_for::<i32>(&params);
        assert!(parser.is_some());
    }

    #[test]
    fn registry_has_no_parser_for_unregistered_type() {
        struct Unregistered;
        let registry: ParserRegistry<()> = ParserRegistry::new();
        let params = ParserParameters::new();
        assert!(registry.parser_for::<Unregistered>(&params).is_none());
    }
}
