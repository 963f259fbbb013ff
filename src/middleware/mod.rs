//! Middleware layer.
//!
//! Cross-cutting request concerns that wrap every dispatch. Currently one
//! built-in: [`trace`], a per-request span with method, path, status and
//! latency.

pub(crate) mod trace;
