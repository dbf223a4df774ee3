// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Commands
//!
//! A reusable command dispatch core: build a tree of commands once,
//! then repeatedly route whitespace-delimited input through it to a
//! matched handler. Covers the full pipeline from raw text to handler
//! invocation — typed argument parsing, named flags, permissions,
//! preprocessing/postprocessing hooks, structured error reporting, and
//! tab-completion suggestions — independent of any one front-end
//! (chat bridge, terminal REPL, IDE plugin).
//!
//! Start with [`manager::CommandManager`], build commands with
//! [`command::Command`] and the [`component`] module, and register
//! them into a [`tree::CommandTree`].

#![warn(missing_docs)]
#![deny(
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub mod command;
pub mod component;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod exception;
pub mod flag;
pub mod input;
pub mod manager;
pub mod parse_result;
pub mod parser;
pub mod suggestion;
pub mod suggestion_factory;
pub mod tree;
pub mod typed_map;
pub mod util;
