//! Market Bridge Service
//!
//! Consumes normalized exchange feed events and republishes them, in a
//! canonical shape, onto the downstream transports:
//! - Per-market order book cache with incremental delta application
//! - Publish gating (BBO-change detection + per-market rate throttle)
//! - Internal → wire transformation (rounding, level capping, symbol mapping)
//! - Protobuf or JSON encoding for the pub/sub transport
//! - Fan-out to message queue, socket broadcast, and pub/sub sinks with
//!   per-sink failure isolation
//!
//! # Architecture
//!
//! ```text
//! Feed Events (ticker / snapshot / update / trade)
//!        │
//!    ┌───▼────┐
//!    │Handler │  ← captures BBO, mutates cache, evaluates gate
//!    └───┬────┘
//!        │
//!   ┌────┴──────┬───────────┐
//!   │           │           │
//! ┌─▼───┐  ┌───▼────┐  ┌───▼────┐
//! │Cache│  │ Gate   │  │Metrics │
//! └─┬───┘  └────────┘  └────────┘
//!   │
//! ┌─▼─────────┐   ┌─────────┐
//! │Transformer│──▶│ Encoder │
//! └─┬─────────┘   └────┬────┘
//!   │                  │
//! ┌─▼──────────────────▼──┐
//! │   Fan-Out Publisher   │  ← queue / broadcast / pub-sub
//! └───────────────────────┘
//! ```
//!
//! # Concurrency model
//!
//! One logical thread of control: events are handled one at a time, and all
//! cache reads and mutations for a handler invocation complete before the
//! first suspension point. The wire order book is an owned copy built before
//! fan-out, so a publish still in flight never observes a book mutated by a
//! later event for the same market. A hung sink stalls only that event's
//! fan-out; events queue behind it (head-of-line blocking is a documented
//! operational limitation).

pub mod config;
pub mod encode;
pub mod events;
pub mod gate;
pub mod handler;
pub mod metrics;
pub mod order_book;
pub mod proto;
pub mod publish;
pub mod symbols;
pub mod transform;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
