// ABOUTME: HTTP middleware module declarations
// ABOUTME: Cross-origin resource sharing configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

pub mod cors;
