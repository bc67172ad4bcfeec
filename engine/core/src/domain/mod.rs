// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: snapshot types, derived metrics, provider contracts and the
//! pure policy rule sets.

pub mod config;
pub mod context;
pub mod decision;
pub mod derivation;
pub mod events;
pub mod providers;
pub mod rules;
