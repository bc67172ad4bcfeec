// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod channel_subscriber;
pub mod event_bus;
pub mod fixture_providers;
