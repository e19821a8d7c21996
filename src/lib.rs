// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

pub mod config;
pub mod event;
pub mod event_queue;
pub mod fidelity;
pub mod memory;
pub mod metrics;
pub mod network;
pub mod node;
pub mod output;
pub mod register;
pub mod routing;
pub mod scenario;
pub mod selector;
pub mod topology;
pub mod user_config;
pub mod utils;
