// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Standard [`ArgumentParser`] implementations: numerics, booleans,
//! characters, strings (single/quoted/greedy), enums, durations, and
//! literals.

use std::time::Duration;

use crate::context::Context;
use crate::error::ArgumentParseError;
use crate::input::{CommandInput, NumericRange};
use crate::parse_result::ParseResult;
use crate::suggestion::Suggestion;

use super::ArgumentParser;

macro_rules! ranged_numeric_parser {
    ($name:ident, $ty:ty, $reader:ident) => {
        /// A parser accepting a `
        #[doc = stringify!($ty)]
        /// ` within a declared inclusive range.
        pub struct $name {
            range: NumericRange<$ty>,
        }

        impl $name {
            pub fn new(min: $ty, max: $ty) -> Self {
                $name {
                    range: NumericRange::new(min, max),
                }
            }
        }

        impl<C: Send + Sync> ArgumentParser<C, $ty> for $name {
            fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<$ty, ArgumentParseError> {
                match input.$reader(self.range) {
                    Ok(value) => ParseResult::success(value),
                    Err(e) => ParseResult::failure(ArgumentParseError::NumberParse {
                        input: e.input,
                        min: self.range.min.to_string(),
                        max: self.range.max.to_string(),
                    }),
                }
            }
        }
    };
}

ranged_numeric_parser!(ByteParser, i8, read_byte);
ranged_numeric_parser!(ShortParser, i16, read_short);
ranged_numeric_parser!(IntParser, i32, read_int);
ranged_numeric_parser!(LongParser, i64, read_long);
ranged_numeric_parser!(FloatParser, f32, read_float);
ranged_numeric_parser!(DoubleParser, f64, read_double);

/// A parser for `true`/`false`-shaped tokens, with a configurable
/// accepted vocabulary.
pub struct BoolParser {
    truthy: Vec<String>,
    falsy: Vec<String>,
}

impl Default for BoolParser {
    fn default() -> Self {
        BoolParser {
            truthy: vec!["true".into(), "yes".into(), "on".into()],
            falsy: vec!["false".into(), "no".into(), "off".into()],
        }
    }
}

impl BoolParser {
    pub fn with_vocabulary(truthy: Vec<String>, falsy: Vec<String>) -> Self {
        BoolParser { truthy, falsy }
    }
}

impl<C: Send + Sync> ArgumentParser<C, bool> for BoolParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<bool, ArgumentParseError> {
        let token = input.peek_token();
        let lower = token.to_ascii_lowercase();
        if self.truthy.iter().any(|t| t.eq_ignore_ascii_case(&lower)) {
            input.read_token();
            return ParseResult::success(true);
        }
        if self.falsy.iter().any(|f| f.eq_ignore_ascii_case(&lower)) {
            input.read_token();
            return ParseResult::success(false);
        }
        ParseResult::failure(ArgumentParseError::EnumParse {
            input: token.to_string(),
            acceptable: self.truthy.iter().chain(self.falsy.iter()).cloned().collect(),
        })
    }

    fn suggestions(&self, _ctx: &Context<C>, _input: &CommandInput) -> Vec<Suggestion> {
        self.truthy
            .iter()
            .chain(self.falsy.iter())
            .map(Suggestion::new)
            .collect()
    }
}

/// A parser consuming exactly one character from the next token.
pub struct CharParser;

impl<C: Send + Sync> ArgumentParser<C, char> for CharParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<char, ArgumentParseError> {
        let token = input.peek_token();
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                input.read_token();
                ParseResult::success(c)
            }
            _ => ParseResult::failure(ArgumentParseError::Custom {
                message: format!("'{}' is not a single character", token),
            }),
        }
    }
}

/// How a [`StringParser`] reads its token(s): a single
/// whitespace-delimited word, a quoted span honoring backslash
/// escapes, or the remainder of the input verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringMode {
    Single,
    Quoted,
    Greedy,
}

/// A parser for string-shaped arguments, in one of three modes.
/// [`StringMode::Greedy`] must be the last component of a command —
/// enforced at tree construction, not here, since this parser has no
/// notion of its position.
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    pub fn new(mode: StringMode) -> Self {
        StringParser { mode }
    }
}

impl<C: Send + Sync> ArgumentParser<C, String> for StringParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<String, ArgumentParseError> {
        match self.mode {
            StringMode::Single => {
                let token = input.read_token();
                if token.is_empty() {
                    ParseResult::failure(ArgumentParseError::Custom {
                        message: "expected a word".to_string(),
                    })
                } else {
                    ParseResult::success(token)
                }
            }
            StringMode::Greedy => {
                let rest = input.read_remaining();
                let trimmed = rest.trim();
                if trimmed.is_empty() {
                    ParseResult::failure(ArgumentParseError::Custom {
                        message: "expected text".to_string(),
                    })
                } else {
                    ParseResult::success(trimmed.to_string())
                }
            }
            StringMode::Quoted => read_quoted(input),
        }
    }
}

/// A greedy string parser that stops consuming at the first token
/// that looks like a flag (`-x`/`--name`), so commands can mix a
/// trailing free-text component with flags admitted earlier in the
/// same sequence without the free text swallowing them.
pub struct GreedyFlagAwareStringParser;

impl<C: Send + Sync> ArgumentParser<C, String> for GreedyFlagAwareStringParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<String, ArgumentParseError> {
        let mut words = Vec::new();
        loop {
            input.skip_whitespace_unbounded();
            let token = input.peek_token();
            if token.is_empty() || (token.starts_with('-') && token != "-") {
                break;
            }
            words.push(input.read_token());
        }
        if words.is_empty() {
            ParseResult::failure(ArgumentParseError::Custom {
                message: "expected text".to_string(),
            })
        } else {
            ParseResult::success(words.join(" "))
        }
    }
}

/// Reads one quoted string, honoring `\"` and `\\` escapes. Leaves the
/// cursor untouched if the next token doesn't begin with `"`, or if
/// the closing quote is never found.
fn read_quoted(input: &mut CommandInput) -> ParseResult<String, ArgumentParseError> {
    let start = input.cursor();
    if input.peek_char() != Some('"') {
        return ParseResult::failure(ArgumentParseError::Custom {
            message: "expected a quoted string".to_string(),
        });
    }
    input.move_cursor(1);
    let mut out = String::new();
    loop {
        match input.peek_char() {
            None => {
                input.set_cursor(start);
                return ParseResult::failure(ArgumentParseError::Custom {
                    message: "unterminated quoted string".to_string(),
                });
            }
            Some('"') => {
                input.move_cursor(1);
                return ParseResult::success(out);
            }
            Some('\\') => {
                input.move_cursor(1);
                match input.peek_char() {
                    Some(escaped @ ('"' | '\\')) => {
                        out.push(escaped);
                        input.move_cursor(1);
                    }
                    _ => {
                        input.set_cursor(start);
                        return ParseResult::failure(ArgumentParseError::Custom {
                            message: "dangling escape in quoted string".to_string(),
                        });
                    }
                }
            }
            Some(c) => {
                out.push(c);
                input.move_cursor(c.len_utf8() as isize);
            }
        }
    }
}

/// A parser accepting one of a fixed, case-insensitive vocabulary.
/// Construct it from an enum's variant names; the parsed value is the
/// canonical (declared) spelling.
pub struct EnumParser {
    acceptable: Vec<String>,
}

impl EnumParser {
    pub fn new(acceptable: Vec<String>) -> Self {
        EnumParser { acceptable }
    }
}

impl<C: Send + Sync> ArgumentParser<C, String> for EnumParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<String, ArgumentParseError> {
        let token = input.peek_token();
        match self.acceptable.iter().find(|a| a.eq_ignore_ascii_case(token)) {
            Some(canonical) => {
                let canonical = canonical.clone();
                input.read_token();
                ParseResult::success(canonical)
            }
            None => ParseResult::failure(ArgumentParseError::EnumParse {
                input: token.to_string(),
                acceptable: self.acceptable.clone(),
            }),
        }
    }

    fn suggestions(&self, _ctx: &Context<C>, _input: &CommandInput) -> Vec<Suggestion> {
        self.acceptable.iter().map(Suggestion::new).collect()
    }
}

/// A parser for `<digits><unit>` durations, where unit is one of
/// `d`/`h`/`m`/`s`. Multiple
/// `<digits><unit>` pairs may be concatenated (`1h30m`); a token with
/// a zero total, an unrecognized unit, or that overflows fails.
pub struct DurationParser;

impl<C: Send + Sync> ArgumentParser<C, Duration> for DurationParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<Duration, ArgumentParseError> {
        let token = input.peek_token();
        match parse_duration_token(token) {
            Some(duration) if !duration.is_zero() => {
                input.read_token();
                ParseResult::success(duration)
            }
            _ => ParseResult::failure(ArgumentParseError::DurationParse {
                input: token.to_string(),
            }),
        }
    }
}

fn parse_duration_token(token: &str) -> Option<Duration> {
    if token.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut chars = token.chars().peekable();
    let mut saw_any = false;
    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return None;
        }
        let amount: u64 = digits.parse().ok()?;
        let unit = chars.next()?;
        let seconds = match unit {
            'd' => amount.checked_mul(86_400)?,
            'h' => amount.checked_mul(3_600)?,
            'm' => amount.checked_mul(60)?,
            's' => amount,
            _ => return None,
        };
        total = total.checked_add(Duration::from_secs(seconds))?;
        saw_any = true;
    }
    saw_any.then_some(total)
}

/// Matches one literal command word (and its aliases), case
/// insensitively, returning the canonical name on success. Used by
/// [`crate::component::LiteralComponent`] rather than exposed as a
/// component's declared parser type.
pub struct LiteralParser {
    canonical: String,
    aliases: Vec<String>,
}

impl LiteralParser {
    pub fn new(canonical: impl Into<String>, aliases: Vec<String>) -> Self {
        LiteralParser {
            canonical: canonical.into(),
            aliases,
        }
    }

    pub fn matches(&self, token: &str) -> bool {
        self.canonical.eq_ignore_ascii_case(token) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl<C: Send + Sync> ArgumentParser<C, String> for LiteralParser {
    fn parse(&self, _ctx: &Context<C>, input: &mut CommandInput) -> ParseResult<String, ArgumentParseError> {
        let token = input.peek_token();
        if self.matches(token) {
            input.read_token();
            ParseResult::success(self.canonical.clone())
        } else {
            ParseResult::failure(ArgumentParseError::Custom {
                message: format!("expected '{}'", self.canonical),
            })
        }
    }

    fn suggestions(&self, _ctx: &Context<C>, _input: &CommandInput) -> Vec<Suggestion> {
        vec![Suggestion::new(self.canonical.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<()> {
        Context::new(())
    }

    #[test]
    fn int_parser_rejects_out_of_range_without_consuming() {
        let parser = IntParser::new(1, 10);
        let ctx = ctx();
        let mut input = CommandInput::new("99 rest");
        let before = input.cursor();
        assert!(parser.parse(&ctx, &mut input).is_failure());
        assert_eq!(input.cursor(), before);
    }

    #[test]
    fn bool_parser_accepts_configured_vocabulary() {
        let parser = BoolParser::default();
        let ctx = ctx();
        let mut input = CommandInput::new("yes");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some(true));
    }

    #[test]
    fn quoted_string_handles_escapes() {
        let parser = StringParser::new(StringMode::Quoted);
        let ctx = ctx();
        let mut input = CommandInput::new(r#""a \"quoted\" word" rest"#);
        let value = parser.parse(&ctx, &mut input).ok().unwrap();
        assert_eq!(value, "a \"quoted\" word");
        assert_eq!(input.peek_token(), "rest");
    }

    #[test]
    fn quoted_string_does_not_consume_unterminated_input() {
        let parser = StringParser::new(StringMode::Quoted);
        let ctx = ctx();
        let mut input = CommandInput::new(r#""never closes"#);
        let before = input.cursor();
        assert!(parser.parse(&ctx, &mut input).is_failure());
        assert_eq!(input.cursor(), before);
    }

    #[test]
    fn greedy_flag_aware_string_stops_at_flag() {
        let parser = GreedyFlagAwareStringParser;
        let ctx = ctx();
        let mut input = CommandInput::new("hello there --loud");
        let value = parser.parse(&ctx, &mut input).ok().unwrap();
        assert_eq!(value, "hello there");
        assert_eq!(input.peek_token(), "--loud");
    }

    #[test]
    fn enum_parser_is_case_insensitive_and_canonicalizes() {
        let parser = EnumParser::new(vec!["North".into(), "South".into()]);
        let ctx = ctx();
        let mut input = CommandInput::new("north");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some("North".to_string()));
    }

    #[test]
    fn duration_parser_combines_units() {
        let parser = DurationParser;
        let ctx = ctx();
        let mut input = CommandInput::new("1h30m");
        let value = parser.parse(&ctx, &mut input).ok().unwrap();
        assert_eq!(value, Duration::from_secs(3600 + 30 * 60));
    }

    #[test]
    fn duration_parser_rejects_zero_total() {
        let parser = DurationParser;
        let ctx = ctx();
        let mut input = CommandInput::new("0s");
        assert!(parser.parse(&ctx, &mut input).is_failure());
    }

    #[test]
    fn duration_parser_rejects_unknown_unit() {
        let parser = DurationParser;
        let ctx = ctx();
        let mut input = CommandInput::new("5y");
        assert!(parser.parse(&ctx, &mut input).is_failure());
    }

    #[test]
    fn literal_parser_matches_alias_case_insensitively() {
        let parser = LiteralParser::new("teleport", vec!["tp".to_string()]);
        let ctx = ctx();
        let mut input = CommandInput::new("TP here");
        assert_eq!(parser.parse(&ctx, &mut input).ok(), Some("teleport".to_string()));
        assert_eq!(input.peek_token(), "here");
    }
}
