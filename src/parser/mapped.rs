// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`MappedParser`] composes a base parser with a fallible mapper, so
//! `map(f).map(g)` behaves the same as a single `map(g . f)` call —
//! mapped-over-mapped parsers compose without nesting layers.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ArgumentParseError;
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::suggestion::Suggestion;

use super::ArgumentParser;

/// Wraps a `base: ArgumentParser<C, A>` with a mapper `A -> ParseResult<B, ArgumentParseError>`,
/// producing an `ArgumentParser<C, B>`. Suggestions are always delegated
/// to `base`, since the mapper only runs on a value the base has
/// already committed to.
pub struct MappedParser<C, A, B> {
    base: Arc<dyn ArgumentParser<C, A>>,
    mapper: Arc<dyn Fn(A) -> ParseResult<B, ArgumentParseError> + Send + Sync>,
}

impl<C, A, B> MappedParser<C, A, B>
where
    C: Send + Sync,
    A: Send + Sync + 'static,
    B: Send + Sync,
{
    pub fn new(base: impl ArgumentParser<C, A> + 'static, mapper: impl Fn(A) -> ParseResult<B, ArgumentParseError> + Send + Sync + 'static) -> Self {
        MappedParser {
            base: Arc::new(base),
            mapper: Arc::new(mapper),
        }
    }

    /// Compose with a further mapper, flattening rather than nesting a
    /// new wrapper layer: `map(f).map(g)` and `map(|v| g(f(v)))`
    /// produce observably identical parsers.
    pub fn map<D: Send + Sync>(self, mapper: impl Fn(B) -> ParseResult<D, ArgumentParseError> + Send + Sync + 'static) -> MappedParser<C, A, D>
    where
        B: 'static,
    {
        let inner = self.mapper;
        MappedParser {
            base: self.base,
            mapper: Arc::new(move |value| inner(value).and_then(&mapper)),
        }
    }
}

impl<C: Send + Sync, A: Send + Sync, B: Send + Sync> ArgumentParser<C, B> for MappedParser<C, A, B> {
    fn parse(&self, ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<B, ArgumentParseError> {
        self.base.parse(ctx, input).and_then(|v| (self.mapper)(v))
    }

    fn suggestions(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        self.base.suggestions(ctx, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntParser;

    #[test]
    fn mapper_transforms_success() {
        let parser = MappedParser::new(IntParser::new(0, 100), |v: i32| ParseResult::success(v * 2));
        let ctx = Context::new(());
        let mut input = CommandInput::new("21");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some(42));
    }

    #[test]
    fn chained_maps_flatten() {
        let parser = MappedParser::new(IntParser::new(0, 100), |v: i32| ParseResult::success(v + 1))
            .map(|v| ParseResult::success(v * 10));
        let ctx = Context::new(());
        let mut input = CommandInput::new("4");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some(50));
    }

    #[test]
    fn mapper_can_fail() {
        let parser = MappedParser::new(IntParser::new(0, 100), |v: i32| {
            if v % 2 == 0 {
                ParseResult::success(v)
            } else {
                ParseResult::failure(ArgumentParseError::Custom {
                    message: "must be even".to_string(),
                })
            }
        });
        let ctx = Context::new(());
        let mut input = CommandInput::new("7");
        assert!(parser.parse(&ctx, &mut input).is_failure());
    }
}
