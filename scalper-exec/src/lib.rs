//! Scalper Execution Layer
//!
//! Talks to the upstream paper-trading brokerage.
//!
//! # Architecture
//!
//! ```text
//! Exit Decision → OrderGateway → BrokerPort → Ack
//! ```
//!
//! # Components
//!
//! - **Ports**: `BrokerPort` and the order/session types it speaks
//! - **Gateway**: Builds exit orders and bounds every call with a timeout
//! - **Stub**: Scriptable in-memory broker for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use scalper_exec::{OrderGateway, SessionContext, StubBroker};
//! use std::sync::Arc;
//!
//! let gateway = OrderGateway::new(Arc::new(StubBroker::new()), Duration::from_secs(5));
//! let session = SessionContext::new("portfolio-1", None);
//!
//! let ack = gateway.submit_exit(&session, &snapshot, &decision).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod gateway;
pub mod ports;
pub mod stub;

pub use error::{ExecError, ExecResult};
pub use gateway::OrderGateway;
pub use ports::{BrokerPort, OrderAck, OrderRequest, SessionContext};
pub use stub::StubBroker;
