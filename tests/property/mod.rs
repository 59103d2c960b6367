// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Each file generates arbitrary resources or stack graphs and checks one
//! guarantee against them.

mod free_tier;
mod least_privilege;
mod resolution;
mod tagging;
