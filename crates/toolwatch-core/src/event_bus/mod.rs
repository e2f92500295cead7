//! # Event Bus Module
//!
//! Provides a typed event bus for decoupled communication between the
//! registry, the monitor and the host.
//!
//! ## Overview
//!
//! - Publishers emit typed events without knowing subscribers
//! - Subscribers filter and receive events of interest
//! - Supports both sync handlers and async `broadcast` receivers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolwatch_core::event_bus::{EventBus, EventFilter, ToolwatchEvent};
//!
//! let bus = Arc::new(EventBus::new());
//! let subscription = bus.subscribe(EventFilter::Warnings, |event| {
//!     println!("{}", event.description());
//! });
//!
//! // hand `bus.clone()` to the registry and the monitor
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
