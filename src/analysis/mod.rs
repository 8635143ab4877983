// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Analysis module - windowed averaging of readings

mod window;

pub use window::{AggregateRecord, AggregationWindow, WindowConfig};
