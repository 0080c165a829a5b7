//! Docker-backed container runtime for the dimma dispatch engine
//!
//! Implements `dimma_core::ContainerRuntime` against a local Docker daemon
//! via bollard. The engine stays unaware of the daemon; inject
//! [`DockerRuntime`] at construction.

pub mod docker_runtime;

pub use docker_runtime::DockerRuntime;
