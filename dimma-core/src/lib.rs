//! dimma-core: fog-computing task dispatch engine
//!
//! Accepts heterogeneous compute tasks, decides where each one runs (on the
//! local host, on a single remote worker node, or split across several),
//! enforces local resource budgets, executes local work inside containers
//! with CPU and memory limits, dispatches remote work over the worker HTTP
//! protocol, and records results on the task records it owns.
//!
//! The container runtime and the worker transport are injected capabilities;
//! `dimma-docker` provides the production [`ContainerRuntime`] backed by the
//! Docker daemon, and tests substitute in-memory mocks.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dimma_core::{
//!     catalog::TaskCatalog,
//!     config::EngineConfig,
//!     engine::DispatchEngine,
//!     node_registry::NodeRegistry,
//!     types::{ResourceEstimate, Task},
//!     worker_client::HttpWorkerClient,
//! };
//!
//! # async fn demo(runtime: Arc<dyn dimma_core::container::ContainerRuntime>) {
//! let config = EngineConfig::default();
//! let workers = Arc::new(HttpWorkerClient::new(config.remote_timeout_grace_secs));
//! let mut engine = DispatchEngine::new(
//!     config,
//!     NodeRegistry::new(vec![]),
//!     runtime,
//!     workers,
//!     TaskCatalog::default(),
//! );
//! engine.start();
//!
//! let task = Task::new(
//!     "text_analysis",
//!     serde_json::Map::new(),
//!     ResourceEstimate::new(1.0, 2.0, 0.0),
//!     false,
//!     60,
//! );
//! let id = engine.submit(task).await.unwrap();
//! let snapshot = engine.status(&id).await.unwrap();
//! println!("{:?}", snapshot.status);
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod node_registry;
pub mod resource_ledger;
pub mod scheduler;
pub mod types;
pub mod worker_client;

mod dispatcher;
pub mod executor;

pub use container::ContainerRuntime;
pub use engine::DispatchEngine;
pub use error::{DimmaError, DimmaResult};
