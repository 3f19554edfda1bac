//! Purpose: Shared core library crate used by the `jsoncast` CLI and tests.
//! Exports: `core` (schema model, coercion, decoders, errors) and `api`.
//! Role: Internal library backing the binary; `api` is the stable surface.
//! Invariants: Callers outside this crate go through `api`, not `core`.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
