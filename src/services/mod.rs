// ABOUTME: Service layer module declarations
// ABOUTME: Orchestration logic shared by the chat and responses endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

pub mod orchestration;
