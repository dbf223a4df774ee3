// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`AggregateParser`] runs a fixed sequence of inner parsers against
//! one component's worth of input and combines their results with a
//! mapper function — e.g. parsing `x y z` into one `Vec3` value.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{AggregateParseCause, ArgumentParseError, CommandParseError};
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::suggestion::Suggestion;

use super::ArgumentParser;

type ErasedParse<C> = Arc<dyn Fn(&Context<C>, &mut CommandInput) -> ParseResult<Box<dyn std::any::Any>, ArgumentParseError> + Send + Sync>;
type ErasedSuggest<C> = Arc<dyn Fn(&Context<C>, &CommandInput) -> Vec<Suggestion> + Send + Sync>;

/// One inner parser wrapped for erased storage, plus the name it
/// reports on failure and in suggestions — distinct from the
/// aggregate's own name so a caller can tell which component of e.g.
/// `x y z` actually rejected its token.
struct Step<C> {
    name: String,
    parse: ErasedParse<C>,
    suggest: ErasedSuggest<C>,
}

/// Runs `steps` in order against one input, collecting their erased
/// results, then reduces them with `mapper` into a `T`. A step that
/// fails to find input at all (rather than finding bad input) reports
/// [`AggregateParseCause::MissingInput`]; a step that runs and fails
/// reports [`AggregateParseCause::Inner`]. Both name the step that
/// actually failed, not the aggregate.
///
/// Failure mid-sequence leaves the cursor wherever the failing step
/// left it: earlier steps already consumed their tokens for good, so
/// an aggregate parse is not itself non-consuming on failure — only
/// each inner step is.
pub struct AggregateParser<C, T> {
    name: String,
    steps: Vec<Step<C>>,
    mapper: Arc<dyn Fn(Vec<Box<dyn std::any::Any>>) -> T + Send + Sync>,
}

impl<C: Send + Sync + 'static, T: Send + Sync + 'static> AggregateParser<C, T> {
    /// The name this aggregate was constructed with — distinct from
    /// any individual step's name, used by callers that log or display
    /// which component parser ran without caring which step inside it.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn new(name: impl Into<String>) -> AggregateBuilder<C, T> {
        AggregateBuilder {
            name: name.into(),
            steps: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Convenience constructor for the common two-component case.
    pub fn pair<A, B>(
        name: impl Into<String>,
        a: impl ArgumentParser<C, A> + 'static,
        b: impl ArgumentParser<C, B> + 'static,
        mapper: impl Fn(A, B) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        AggregateParser::new(name)
            .step("a", a)
            .step("b", b)
            .build(move |mut values| {
                let b = *values.pop().unwrap().downcast::<B>().unwrap();
                let a = *values.pop().unwrap().downcast::<A>().unwrap();
                mapper(a, b)
            })
    }

    /// Convenience constructor for the common three-component case.
    pub fn triplet<A, B, D>(
        name: impl Into<String>,
        a: impl ArgumentParser<C, A> + 'static,
        b: impl ArgumentParser<C, B> + 'static,
        c: impl ArgumentParser<C, D> + 'static,
        mapper: impl Fn(A, B, D) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
        D: Send + Sync + 'static,
    {
        AggregateParser::new(name)
            .step("a", a)
            .step("b", b)
            .step("c", c)
            .build(move |mut values| {
                let c = *values.pop().unwrap().downcast::<D>().unwrap();
                let b = *values.pop().unwrap().downcast::<B>().unwrap();
                let a = *values.pop().unwrap().downcast::<A>().unwrap();
                mapper(a, b, c)
            })
    }
}

impl<C: Send + Sync, T: Send + Sync> ArgumentParser<C, T> for AggregateParser<C, T> {
    fn parse(&self, ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<T, ArgumentParseError> {
        let mut values = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if input.is_empty(true) {
                return ParseResult::failure(ArgumentParseError::Aggregate {
                    component: step.name.clone(),
                    cause: AggregateParseCause::MissingInput,
                });
            }
            input.skip_whitespace_unbounded();
            match (step.parse)(ctx, input) {
                ParseResult::Success(value) => values.push(value),
                ParseResult::Failure(cause) => {
                    return ParseResult::failure(ArgumentParseError::Aggregate {
                        component: step.name.clone(),
                        cause: AggregateParseCause::Inner(Box::new(CommandParseError::ArgumentParse { cause })),
                    });
                }
            }
        }
        ParseResult::success((self.mapper)(values))
    }

    /// Replays every step but the one sitting at the cursor against a
    /// scratch copy of `input`, then delegates to that step's own
    /// suggestions — so completing `x y <cursor>` of a three-step
    /// aggregate offers the third step's candidates, not the first's.
    fn suggestions(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        let mut scratch = input.clone();
        for step in &self.steps {
            if scratch.is_empty(true) {
                return (step.suggest)(ctx, &scratch);
            }
            let checkpoint = scratch.cursor();
            scratch.skip_whitespace_unbounded();
            match (step.parse)(ctx, &mut scratch) {
                ParseResult::Success(_) => continue,
                ParseResult::Failure(_) => {
                    scratch.set_cursor(checkpoint);
                    return (step.suggest)(ctx, &scratch);
                }
            }
        }
        Vec::new()
    }
}

/// Accumulates typed steps before [`AggregateBuilder::build`] produces
/// the finished, erased [`AggregateParser`].
pub struct AggregateBuilder<C, T> {
    name: String,
    steps: Vec<Step<C>>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<C: Send + Sync + 'static, T> AggregateBuilder<C, T> {
    pub fn step<V: Send + Sync + 'static>(mut self, name: impl Into<String>, parser: impl ArgumentParser<C, V> + 'static) -> Self {
        let parser = Arc::new(parser);
        let parse_handle = parser.clone();
        let suggest_handle = parser;
        self.steps.push(Step {
            name: name.into(),
            parse: Arc::new(move |ctx, input| {
                parse_handle
                    .parse(ctx, input)
                    .map(|v| Box::new(v) as Box<dyn std::any::Any>)
            }),
            suggest: Arc::new(move |ctx, input| suggest_handle.suggestions(ctx, input)),
        });
        self
    }

    pub fn build(self, mapper: impl Fn(Vec<Box<dyn std::any::Any>>) -> T + Send + Sync + 'static) -> AggregateParser<C, T> {
        AggregateParser {
            name: self.name,
            steps: self.steps,
            mapper: Arc::new(mapper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntParser;

    #[test]
    fn pair_combines_two_components() {
        let parser: AggregateParser<(), (i32, i32)> =
            AggregateParser::pair("point", IntParser::new(i32::MIN, i32::MAX), IntParser::new(i32::MIN, i32::MAX), |a, b| (a, b));
        let ctx = Context::new(());
        let mut input = CommandInput::new("3 4");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some((3, 4)));
    }

    #[test]
    fn missing_second_component_fails_with_missing_input() {
        let parser: AggregateParser<(), (i32, i32)> =
            AggregateParser::pair("point", IntParser::new(i32::MIN, i32::MAX), IntParser::new(i32::MIN, i32::MAX), |a, b| (a, b));
        let ctx = Context::new(());
        let mut input = CommandInput::new("3");
        assert!(parser.parse(&ctx, &mut input).is_failure());
    }

    #[test]
    fn failure_names_the_failing_step_not_the_aggregate() {
        let parser: AggregateParser<(), (i32, i32)> =
            AggregateParser::new("point").step("x", IntParser::new(i32::MIN, i32::MAX)).step("y", IntParser::new(i32::MIN, i32::MAX)).build(|mut values| {
                let b = *values.pop().unwrap().downcast::<i32>().unwrap();
                let a = *values.pop().unwrap().downcast::<i32>().unwrap();
                (a, b)
            });
        let ctx = Context::new(());
        let mut input = CommandInput::new("3 nope");
        let err = parser.parse(&ctx, &mut input).err().unwrap();
        match err {
            ArgumentParseError::Aggregate { component, .. } => assert_eq!(component, "y"),
            other => panic!("expected Aggregate error, got {other:?}"),
        }
    }

    #[test]
    fn missing_input_names_the_step_waiting_on_it() {
        let parser: AggregateParser<(), (i32, i32)> =
            AggregateParser::new("point").step("x", IntParser::new(i32::MIN, i32::MAX)).step("y", IntParser::new(i32::MIN, i32::MAX)).build(|mut values| {
                let b = *values.pop().unwrap().downcast::<i32>().unwrap();
                let a = *values.pop().unwrap().downcast::<i32>().unwrap();
                (a, b)
            });
        let ctx = Context::new(());
        let mut input = CommandInput::new("3");
        let err = parser.parse(&ctx, &mut input).err().unwrap();
        match err {
            ArgumentParseError::Aggregate { component, cause: AggregateParseCause::MissingInput } => assert_eq!(component, "y"),
            other => panic!("expected Aggregate(MissingInput), got {other:?}"),
        }
    }

    #[test]
    fn suggestions_delegate_to_the_step_at_the_cursor() {
        use crate::parser::standard::BoolParser;
        let parser: AggregateParser<(), (i32, bool)> =
            AggregateParser::new("flagged").step("count", IntParser::new(i32::MIN, i32::MAX)).step("flag", BoolParser::default()).build(|mut values| {
                let b = *values.pop().unwrap().downcast::<bool>().unwrap();
                let a = *values.pop().unwrap().downcast::<i32>().unwrap();
                (a, b)
            });
        let ctx = Context::new(());
        let input = CommandInput::new("3 tr");
        let suggestions = parser.suggestions(&ctx, &input);
        assert!(suggestions.iter().any(|s| s.value == "true"));
    }
}
