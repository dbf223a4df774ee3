// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command Tree
//!
//! [`CommandTree`] merges every registered [`Command`] into one trie
//! keyed by component sequence: commands sharing a literal prefix
//! (`economy pay`, `economy balance`) share the nodes for that prefix.
//! Routing an input walks the trie one component at a time, preferring
//! a literal match over an argument match at each node, until it lands
//! on a node with a bound command — or fails with a structured error.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::command::Command;
use crate::component::{ErasedComponent, LiteralComponent};
use crate::context::{Context, Permission};
use crate::error::CommandParseError;
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::suggestion::Suggestion;

/// `[A-Za-z0-9_-]+`, applied to command names, aliases, and component
/// names at registration.
fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A child node's slot key: literals and argument components occupy
/// separate namespaces at the same tree position (an argument named
/// `target` never collides with a literal subcommand also named
/// `target`), and within a namespace lookup is by case-folded name —
/// so a plain `String` key keeps both [`IndexMap::get`] lookups and
/// insertion-order iteration (needed so `describe()`/`suggest()` offer
/// children in registration order) on one map instead of a linear scan.
fn child_key(is_literal: bool, name: &str) -> String {
    format!("{}:{}", if is_literal { 'L' } else { 'A' }, name.to_ascii_lowercase())
}

struct TreeNode<C> {
    component: Option<Arc<dyn ErasedComponent<C>>>,
    children: RwLock<IndexMap<String, Arc<TreeNode<C>>>>,
    command: RwLock<Option<Arc<Command<C>>>>,
    /// The effective permission required to pass through this node,
    /// unioned at registration from every command whose path crosses
    /// it — a node is only as restrictive as the least restrictive
    /// command reachable below it, since blocking it would block every
    /// sibling path that shares it.
    permission: RwLock<Permission<C>>,
}

impl<C> TreeNode<C> {
    fn root() -> Self {
        TreeNode {
            component: None,
            children: RwLock::new(IndexMap::new()),
            command: RwLock::new(None),
            permission: RwLock::new(Permission::none()),
        }
    }

    fn leaf(component: Arc<dyn ErasedComponent<C>>) -> Self {
        TreeNode {
            component: Some(component),
            children: RwLock::new(IndexMap::new()),
            command: RwLock::new(None),
            permission: RwLock::new(Permission::none()),
        }
    }
}

/// Merges registered commands into a routable trie. Construction
/// ([`CommandTree::register`]) is the only phase that mutates node
/// state; nothing about routing or suggesting requires mutability,
/// which is why nodes use [`std::sync::RwLock`] rather than needing an
/// exclusive `&mut self` throughout the tree's lifetime.
pub struct CommandTree<C> {
    root: Arc<TreeNode<C>>,
    locked: std::sync::atomic::AtomicBool,
}

impl<C: Send + Sync + Clone + 'static> Default for CommandTree<C> {
    fn default() -> Self {
        CommandTree {
            root: Arc::new(TreeNode::root()),
            locked: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl<C: Send + Sync + Clone + 'static> CommandTree<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes the tree against further [`CommandTree::register`]
    /// calls. Reads never required the lock — this only documents
    /// intent and catches accidental late registration.
    pub fn lock_registration(&self) {
        self.locked.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn ensure_unlocked(&self) -> Result<(), CommandParseError> {
        if self.locked.load(std::sync::atomic::Ordering::SeqCst) {
            Err(CommandParseError::Internal)
        } else {
            Ok(())
        }
    }

    /// Merge `command` into the trie. Fails if the command's
    /// components aren't required-monotonic, if a greedy component
    /// isn't terminal, or if the exact same path is already bound to
    /// a command.
    pub fn register(&self, command: Command<C>) -> Result<(), CommandParseError> {
        self.ensure_unlocked()?;
        if !command.is_required_monotonic() {
            return Err(CommandParseError::InvalidSyntax {
                correct_syntax: format!("'{}': required components must precede optional ones", command.name()),
                matched_prefix: command.name().to_string(),
            });
        }
        if command.has_non_terminal_greedy() {
            return Err(CommandParseError::InvalidSyntax {
                correct_syntax: format!("'{}': a greedy component must be last", command.name()),
                matched_prefix: command.name().to_string(),
            });
        }
        if !is_valid_identifier(command.name()) {
            return Err(CommandParseError::InvalidSyntax {
                correct_syntax: format!("'{}' is not a valid command name, expected [A-Za-z0-9_-]+", command.name()),
                matched_prefix: command.name().to_string(),
            });
        }
        for alias in command.aliases() {
            if !is_valid_identifier(alias) {
                return Err(CommandParseError::InvalidSyntax {
                    correct_syntax: format!("alias '{}' of '{}' is not valid, expected [A-Za-z0-9_-]+ with no whitespace", alias, command.name()),
                    matched_prefix: command.name().to_string(),
                });
            }
        }
        for component in command.components() {
            if !is_valid_identifier(component.name()) {
                return Err(CommandParseError::InvalidSyntax {
                    correct_syntax: format!("component '{}' of '{}' is not a valid name, expected [A-Za-z0-9_-]+", component.name(), command.name()),
                    matched_prefix: command.name().to_string(),
                });
            }
        }

        let name_component: Arc<dyn ErasedComponent<C>> =
            Arc::new(LiteralComponent::with_aliases(command.name().to_string(), command.aliases().to_vec()));
        let first_optional = command.components().iter().position(|c| !c.is_required());
        let command = Arc::new(command);

        let mut path: Vec<Arc<dyn ErasedComponent<C>>> = vec![name_component];
        path.extend(command.components().iter().cloned());

        let mut nodes = vec![self.root.clone()];
        for component in path {
            let next = Self::insert_child(nodes.last().unwrap(), component)?;
            nodes.push(next);
        }

        // Attach this command's permission to the name node and every
        // node down its own path, unioned with whatever was already
        // there from other commands sharing those nodes.
        for node in &nodes[1..] {
            let mut slot = node.permission.write().expect("tree lock poisoned");
            *slot = slot.or(command.permission());
        }

        let terminal = nodes.last().unwrap();
        let mut slot = terminal.command.write().expect("tree lock poisoned");
        if slot.is_some() {
            return Err(CommandParseError::InvalidSyntax {
                correct_syntax: format!("'{}' is already registered", command.name()),
                matched_prefix: command.name().to_string(),
            });
        }
        *slot = Some(command.clone());
        drop(slot);

        // `nodes[k]` is the tree state after consuming `k` path
        // components (`nodes[0]` is the root, before anything). The
        // leading name component is always required, so the node
        // reached after every required component but before any
        // optional one is `nodes[first_optional + 1]` (path index
        // `first_optional + 1` for a `command.components()` index of
        // `first_optional`, offset by the name component at path[0]).
        // Binding the command there too lets a call that omits every
        // optional trailing component still resolve (optional
        // components are only meaningful as a trailing run, enforced
        // by `is_required_monotonic`).
        if let Some(first_optional) = first_optional {
            for node in &nodes[first_optional + 1..nodes.len() - 1] {
                let mut slot = node.command.write().expect("tree lock poisoned");
                if slot.is_none() {
                    *slot = Some(command.clone());
                }
            }
        }
        Ok(())
    }

    fn insert_child(parent: &Arc<TreeNode<C>>, component: Arc<dyn ErasedComponent<C>>) -> Result<Arc<TreeNode<C>>, CommandParseError> {
        let mut children = parent.children.write().expect("tree lock poisoned");
        let key = child_key(component.is_literal(), component.name());

        if component.is_literal() {
            if let Some(existing) = children.get(&key) {
                return Ok(existing.clone());
            }
            for child in children.values() {
                let existing = child.component.as_ref().expect("non-root node always has a component");
                if existing.is_literal() && literal_aliases_collide(existing, &component) {
                    return Err(CommandParseError::InvalidSyntax {
                        correct_syntax: format!("'{}' conflicts with an existing alias of '{}'", component.name(), existing.name()),
                        matched_prefix: component.name().to_string(),
                    });
                }
            }
        } else if let Some(existing) = children.get(&key) {
            // Same name at the same tree position is treated as the
            // same logical slot and merged — approximating the "equal
            // parser" ambiguity check from a name match rather than
            // comparing trait objects, which Rust has no generic way
            // to do (see DESIGN.md).
            return Ok(existing.clone());
        }

        // A name must be unique within its parent regardless of
        // namespace: a literal `pay` and an argument also named `pay`
        // at the same node would make the argument unreachable, since
        // a literal match is always preferred at that position.
        for child in children.values() {
            let existing = child.component.as_ref().expect("non-root node always has a component");
            if existing.is_literal() != component.is_literal() && existing.name().eq_ignore_ascii_case(component.name()) {
                return Err(CommandParseError::InvalidSyntax {
                    correct_syntax: format!("'{}' conflicts with an existing sibling component named '{}'", component.name(), existing.name()),
                    matched_prefix: component.name().to_string(),
                });
            }
        }

        let node = Arc::new(TreeNode::leaf(component));
        children.insert(key, node.clone());
        Ok(node)
    }

    /// Route `input` to its matching command, binding every positional
    /// and flag value into `ctx` along the way.
    pub fn route(&self, ctx: &mut Context<C>, input: &mut CommandInput) -> Result<Arc<Command<C>>, CommandParseError> {
        let mut node = self.root.clone();
        let mut depth = 0usize;

        loop {
            let permission = node.permission.read().expect("tree lock poisoned").clone();
            if !permission.is_satisfied_by(ctx.sender()) {
                return Err(CommandParseError::NoPermission {
                    target: node.component.as_ref().map(|c| c.name().to_string()).unwrap_or_default(),
                    missing: permission.label().to_string(),
                });
            }

            input.skip_whitespace_unbounded();

            if input.is_empty(true) {
                break;
            }

            let children = node.children.read().expect("tree lock poisoned").clone();
            let token = input.peek_token().to_string();

            let literal_match = children.values().find(|child| {
                child
                    .component
                    .as_ref()
                    .map(|c| c.is_literal() && literal_component_matches(c.as_ref(), &token))
                    .unwrap_or(false)
            });

            if let Some(child) = literal_match {
                let component = child.component.as_ref().unwrap();
                if !component.permission().is_satisfied_by(ctx.sender()) {
                    return Err(CommandParseError::NoPermission {
                        target: component.name().to_string(),
                        missing: component.permission().label().to_string(),
                    });
                }
                if component.try_parse(ctx, input).is_failure() {
                    return Err(CommandParseError::Internal);
                }
                node = child.clone();
                depth += 1;
                continue;
            }

            let mut last_failure = None;
            let argument_match = children.values().find_map(|child| {
                let component = child.component.as_ref()?;
                if component.is_literal() {
                    return None;
                }
                let checkpoint = input.cursor();
                match component.try_parse(ctx, input) {
                    ParseResult::Success(()) => Some(child.clone()),
                    ParseResult::Failure(cause) => {
                        input.set_cursor(checkpoint);
                        last_failure = Some(cause);
                        None
                    }
                }
            });

            if let Some(child) = argument_match {
                node = child;
                depth += 1;
                continue;
            }

            // No child matched. A typed child that ran and rejected the
            // token (rather than simply not being present) reports its
            // own parse error instead of the generic "no such command" /
            // "invalid syntax" the caller would otherwise see.
            if let Some(cause) = last_failure {
                return Err(CommandParseError::ArgumentParse { cause });
            }

            break;
        }

        let command = node.command.read().expect("tree lock poisoned").clone();
        let Some(command) = command else {
            return Err(if depth == 0 {
                CommandParseError::NoSuchCommand {
                    input: input.peek_token().to_string(),
                }
            } else {
                CommandParseError::InvalidSyntax {
                    correct_syntax: self.describe_node(&node, ""),
                    matched_prefix: String::new(),
                }
            });
        };

        // The terminal node's permission already includes this
        // command's own (see the union loop in `register`), checked
        // at loop entry above — nothing further to gate here.
        if let Some(flag_parser) = command.flag_parser() {
            let mut flags = std::mem::take(ctx.flags_mut());
            let result = flag_parser.parse(ctx, input, &mut flags);
            *ctx.flags_mut() = flags;
            result?;
        }

        input.skip_whitespace_unbounded();
        if !input.is_empty(true) {
            return Err(CommandParseError::InvalidSyntax {
                correct_syntax: self.describe_node(&node, command.name()),
                matched_prefix: command.name().to_string(),
            });
        }

        Ok(command)
    }

    /// Completion candidates for the partial input at the cursor:
    /// literal names, argument suggestions, and — once a command with
    /// flags has been reached — flag names or a flag's inner value
    /// suggestions. Requires `C: Clone` because probing argument
    /// children must run their parser against a scratch [`Context`]
    /// rather than binding values into the caller's real one.
    pub fn suggest(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        let mut input = input.clone();
        let mut node = self.root.clone();

        loop {
            let permission = node.permission.read().expect("tree lock poisoned").clone();
            if !permission.is_satisfied_by(ctx.sender()) {
                return Vec::new();
            }

            input.skip_whitespace_unbounded();
            let children = node.children.read().expect("tree lock poisoned").clone();

            if input.is_empty(true) {
                return self.suggest_children(ctx, &node, &children, "");
            }

            let token = input.peek_token().to_string();
            let is_last_token = input.last_remaining_token() == Some(token.as_str());

            if is_last_token {
                return self.suggest_children(ctx, &node, &children, &token);
            }

            let literal_match = children.values().find(|child| {
                child
                    .component
                    .as_ref()
                    .map(|c| c.is_literal() && literal_component_matches(c.as_ref(), &token))
                    .unwrap_or(false)
            });
            if let Some(child) = literal_match {
                input.read_token();
                node = child.clone();
                continue;
            }

            let mut ctx_scratch = Context::new(ctx.sender().clone());
            let argument_match = children.values().find_map(|child| {
                let component = child.component.as_ref()?;
                if component.is_literal() {
                    return None;
                }
                let checkpoint = input.cursor();
                match component.try_parse(&mut ctx_scratch, &mut input) {
                    ParseResult::Success(()) => Some(child.clone()),
                    ParseResult::Failure(_) => {
                        input.set_cursor(checkpoint);
                        None
                    }
                }
            });
            match argument_match {
                Some(child) => {
                    node = child;
                    continue;
                }
                None => return Vec::new(),
            }
        }
    }

    fn suggest_children(&self, ctx: &Context<C>, node: &Arc<TreeNode<C>>, children: &IndexMap<String, Arc<TreeNode<C>>>, partial: &str) -> Vec<Suggestion> {
        let mut out = Vec::new();
        for child in children.values() {
            let Some(component) = &child.component else { continue };
            let node_permission = child.permission.read().expect("tree lock poisoned").clone();
            if !component.permission().is_satisfied_by(ctx.sender()) || !node_permission.is_satisfied_by(ctx.sender()) {
                continue;
            }
            if component.is_literal() {
                if component.name().to_ascii_lowercase().starts_with(&partial.to_ascii_lowercase()) {
                    out.push(Suggestion::new(component.name().to_string()));
                }
            } else {
                let input = CommandInput::new(partial.to_string());
                out.extend(component.suggestions(ctx, &input));
            }
        }
        if let Some(command) = node.command.read().expect("tree lock poisoned").as_ref() {
            if let Some(flags) = command.flag_parser() {
                let input = CommandInput::new(partial.to_string());
                out.extend(flags.suggestions(ctx, &input, &crate::flag::LastParsedFlag::default()));
            }
        }
        out
    }

    /// Human-readable usage text for every command whose literal path
    /// starts with `prefix` (empty for the whole tree).
    pub fn describe(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_usage(&self.root, String::new(), &mut out);
        out.into_iter().filter(|line| line.starts_with(prefix)).collect()
    }

    fn collect_usage(&self, node: &Arc<TreeNode<C>>, so_far: String, out: &mut Vec<String>) {
        if node.command.read().expect("tree lock poisoned").is_some() {
            out.push(so_far.trim().to_string());
        }
        let children = node.children.read().expect("tree lock poisoned");
        for child in children.values() {
            let Some(component) = &child.component else { continue };
            let piece = if component.is_literal() {
                component.name().to_string()
            } else if component.is_required() {
                format!("<{}>", component.name())
            } else {
                format!("[{}]", component.name())
            };
            let next = format!("{} {}", so_far, piece);
            self.collect_usage(child, next, out);
        }
    }

    fn describe_node(&self, node: &Arc<TreeNode<C>>, fallback: &str) -> String {
        let mut out = Vec::new();
        self.collect_usage(node, fallback.to_string(), &mut out);
        if out.is_empty() {
            format!("usage: {}", fallback)
        } else {
            out.join(" | ")
        }
    }
}

fn literal_component_matches<C>(component: &dyn ErasedComponent<C>, token: &str) -> bool {
    component.name().eq_ignore_ascii_case(token)
}

fn literal_aliases_collide<C>(a: &Arc<dyn ErasedComponent<C>>, b: &Arc<dyn ErasedComponent<C>>) -> bool {
    a.name().eq_ignore_ascii_case(b.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::component::TypedComponent;
    use crate::parser::standard::IntParser;

    fn ctx() -> Context<()> {
        Context::new(())
    }

    #[test]
    fn routes_to_exact_command() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(Command::new("ping", |_| Ok(()))).unwrap();
        let mut ctx = ctx();
        let mut input = CommandInput::new("ping");
        let command = tree.route(&mut ctx, &mut input).unwrap();
        assert_eq!(command.name(), "ping");
    }

    #[test]
    fn shared_prefix_commands_route_independently() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(
            Command::new("economy", |_| Ok(()))
                .component(LiteralComponent::<()>::new("balance")),
        )
        .unwrap();
        tree.register(
            Command::new("economy", |_| Ok(()))
                .component(LiteralComponent::<()>::new("pay"))
                .component(TypedComponent::<(), i32>::new("amount", IntParser::new(0, 1_000_000))),
        )
        .unwrap();

        let mut ctx1 = ctx();
        let mut balance_input = CommandInput::new("economy balance");
        assert!(tree.route(&mut ctx1, &mut balance_input).is_ok());

        let mut ctx2 = ctx();
        let mut pay_input = CommandInput::new("economy pay 50");
        let command = tree.route(&mut ctx2, &mut pay_input).unwrap();
        assert_eq!(command.name(), "economy");
    }

    #[test]
    fn unknown_root_token_is_no_such_command() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(Command::new("ping", |_| Ok(()))).unwrap();
        let mut ctx = ctx();
        let mut input = CommandInput::new("pong");
        let err = tree.route(&mut ctx, &mut input).unwrap_err();
        assert!(matches!(err, CommandParseError::NoSuchCommand { .. }));
    }

    #[test]
    fn trailing_garbage_is_invalid_syntax() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(Command::new("ping", |_| Ok(()))).unwrap();
        let mut ctx = ctx();
        let mut input = CommandInput::new("ping extra");
        let err = tree.route(&mut ctx, &mut input).unwrap_err();
        assert!(matches!(err, CommandParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn trailing_optional_component_may_be_omitted() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(
            Command::new("greet", |_| Ok(()))
                .component(TypedComponent::<(), i32>::new("times", IntParser::new(1, 10)).optional()),
        )
        .unwrap();

        let mut ctx1 = ctx();
        let mut without = CommandInput::new("greet");
        assert!(tree.route(&mut ctx1, &mut without).is_ok());

        let mut ctx2 = ctx();
        let mut with = CommandInput::new("greet 3");
        assert!(tree.route(&mut ctx2, &mut with).is_ok());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(Command::new("ping", |_| Ok(()))).unwrap();
        assert!(tree.register(Command::new("ping", |_| Ok(()))).is_err());
    }

    #[test]
    fn invalid_command_name_is_rejected() {
        let tree: CommandTree<()> = CommandTree::new();
        let err = tree.register(Command::new("bad name!", |_| Ok(()))).unwrap_err();
        assert!(matches!(err, CommandParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn literal_and_argument_sharing_a_name_at_one_node_is_rejected() {
        let tree: CommandTree<()> = CommandTree::new();
        tree.register(
            Command::new("give", |_| Ok(()))
                .component(LiteralComponent::<()>::new("amount")),
        )
        .unwrap();
        let err = tree
            .register(
                Command::new("give", |_| Ok(()))
                    .component(TypedComponent::<(), i32>::new("amount", IntParser::new(0, 100))),
            )
            .unwrap_err();
        assert!(matches!(err, CommandParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn permission_gated_command_blocks_unsatisfying_sender() {
        let tree: CommandTree<u64> = CommandTree::new();
        tree.register(
            Command::new("shutdown", |_| Ok(()))
                .with_permission(Permission::new("admin", |sender: &u64| *sender == 1)),
        )
        .unwrap();

        let mut admin = Context::new(1u64);
        let mut input = CommandInput::new("shutdown");
        assert!(tree.route(&mut admin, &mut input).is_ok());

        let mut guest = Context::new(2u64);
        let mut input = CommandInput::new("shutdown");
        let err = tree.route(&mut guest, &mut input).unwrap_err();
        assert!(matches!(err, CommandParseError::NoPermission { .. }));
    }

    #[test]
    fn shared_node_stays_open_for_a_sibling_without_a_permission() {
        let tree: CommandTree<u64> = CommandTree::new();
        tree.register(
            Command::new("economy", |_| Ok(()))
                .component(LiteralComponent::<u64>::new("balance")),
        )
        .unwrap();
        tree.register(
            Command::new("economy", |_| Ok(()))
                .component(LiteralComponent::<u64>::new("reset"))
                .with_permission(Permission::new("admin", |sender: &u64| *sender == 1)),
        )
        .unwrap();

        let mut guest = Context::new(2u64);
        let mut input = CommandInput::new("economy balance");
        assert!(tree.route(&mut guest, &mut input).is_ok());
    }
}
