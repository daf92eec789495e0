#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]
//!
//! A discrete event simulation kernel for network algorithms.
//!
//! `algosim` executes a user-supplied node behavior on a network of
//! message-passing nodes connected by directed, revalidated links. It models
//! message delay, unreliable delivery and radio interference, and supports
//! two execution models:
//!
//! - **Synchronous**: global time advances in rounds of length one. Every
//!   round each node is moved, its connections are revalidated, and its
//!   [`step`](node::Node) hooks run against a fully updated topology.
//! - **Asynchronous**: work is scheduled as time-stamped events in a global
//!   queue; the clock jumps from event to event and never moves backwards.
//!
//! # Building a simulation
//!
//! A simulation consists of a [`Node`](node::Node) implementation describing
//! the per-node behavior, an optional [`Scenario`](runtime::Scenario) with
//! the global hooks, and a [`Builder`](runtime::Builder) that wires both to
//! a [`Runtime`](runtime::Runtime).
//!
//! ```
//! use algosim::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Token(u32);
//! impl Message for Token {
//!     fn clone_message(&self) -> Box<dyn Message> {
//!         Box::new(self.clone())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Relay;
//! impl Node for Relay {
//!     fn handle_messages(&mut self, api: &mut Api<'_>, inbox: &Inbox) {
//!         for handle in inbox.iter() {
//!             if let Some(token) = api.message::<Token>(handle) {
//!                 let next = Token(token.0 + 1);
//!                 api.broadcast(&next);
//!             }
//!         }
//!     }
//! }
//!
//! fn main() {
//!     let mut rt = Builder::seeded(1)
//!         .max_rounds(100)
//!         .build(());
//!     let a = rt.world_mut().add_node(Box::new(Relay)).unwrap();
//!     let b = rt.world_mut().add_node(Box::new(Relay)).unwrap();
//!     rt.world_mut().add_bidirectional_edge(a, b, true);
//!     let summary = rt.run();
//!     assert_eq!(summary.rounds, 100);
//! }
//! ```
//!
//! The graph of connections is *revalidated* every round: an edge survives
//! only if the node's [`ConnectivityModel`](models::ConnectivityModel)
//! re-adds it before the next revalidation pass. Delivery failures can be
//! reported back to the sender as negative acknowledgements, and concurrent
//! transmissions can collide when interference modeling is enabled.
//!

pub mod air;
pub mod buffer;
pub mod config;
pub mod connections;
pub mod edge;
pub mod event;
pub mod message;
pub mod models;
pub mod node;
pub mod observer;
pub mod packet;
pub mod position;
pub mod runtime;
pub mod time;
pub mod timer;
pub mod tracing;
pub mod util;
pub mod world;

pub mod prelude;
