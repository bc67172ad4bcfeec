// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the sqctx CLI

pub mod config;
pub mod context;
pub mod evaluate;

pub use self::config::ConfigCommand;
pub use self::context::ContextCommand;
pub use self::evaluate::EvaluateCommand;
