// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Suggestion Post-Processing
//!
//! [`CommandTree::suggest`](crate::tree::CommandTree::suggest) walks
//! the trie and returns whatever each matching component or flag
//! offers. [`SuggestionFactory`] sits in front of that: it drops
//! duplicates, filters by the caller's partial token, and can compute
//! a single completable prefix shared by everything left — the
//! behavior a terminal's tab-completion expects when pressing Tab
//! with more than one candidate remaining.

use std::collections::HashSet;

use crate::context::Context;
use crate::input::CommandInput;
use crate::suggestion::Suggestion;
use crate::tree::CommandTree;
use crate::util::longest_common_prefix;

/// Wraps a [`CommandTree`] to post-process its raw suggestions.
pub struct SuggestionFactory<'t, C> {
    tree: &'t CommandTree<C>,
}

impl<'t, C: Send + Sync + Clone + 'static> SuggestionFactory<'t, C> {
    pub fn new(tree: &'t CommandTree<C>) -> Self {
        SuggestionFactory { tree }
    }

    /// Deduplicated suggestions for `input` at its current cursor,
    /// ordered by first appearance.
    pub fn suggest(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        let raw = self.tree.suggest(ctx, input);
        let mut seen = HashSet::new();
        raw.into_iter().filter(|s| seen.insert(s.value.clone())).collect()
    }

    /// The longest prefix every current suggestion's value shares, or
    /// `None` if there are no suggestions. A front-end can insert this
    /// directly on Tab without needing to show a menu when it's longer
    /// than the user's partial token.
    pub fn common_prefix(&self, ctx: &Context<C>, input: &CommandInput) -> Option<String> {
        let suggestions = self.suggest(ctx, input);
        if suggestions.is_empty() {
            return None;
        }
        let values: Vec<&str> = suggestions.iter().map(|s| s.value.as_str()).collect();
        Some(longest_common_prefix(&values).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::component::LiteralComponent;

    fn tree_with_tell_commands() -> CommandTree<()> {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(Command::new("tell", |_| Ok(()))).unwrap();
        tree.register(
            Command::new("tellraw", |_| Ok(()))
                .component(LiteralComponent::<()>::new("here")),
        )
        .unwrap();
        tree
    }

    #[test]
    fn duplicate_suggestions_are_collapsed() {
        let tree = tree_with_tell_commands();
        tree.register(Command::new("teleport", |_| Ok(()))).unwrap();
        let factory = SuggestionFactory::new(&tree);
        let ctx = Context::new(());
        let input = CommandInput::new("tel");
        let suggestions = factory.suggest(&ctx, &input);
        let distinct: HashSet<_> = suggestions.iter().map(|s| s.value.clone()).collect();
        assert_eq!(suggestions.len(), distinct.len());
    }

    #[test]
    fn common_prefix_covers_every_candidate() {
        let tree = tree_with_tell_commands();
        let factory = SuggestionFactory::new(&tree);
        let ctx = Context::new(());
        let input = CommandInput::new("tel");
        let prefix = factory.common_prefix(&ctx, &input).unwrap();
        assert_eq!(prefix, "tell");
    }

    #[test]
    fn no_suggestions_yields_no_prefix() {
        let tree: CommandTree<()> = CommandTree::new();
        let factory = SuggestionFactory::new(&tree);
        let ctx = Context::new(());
        let input = CommandInput::new("zzz");
        assert_eq!(factory.common_prefix(&ctx, &input), None);
    }
}
