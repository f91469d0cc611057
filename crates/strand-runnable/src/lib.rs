//! # strand-runnable
//!
//! Composition primitives built on the [`strand_core::Runnable`] contract:
//!
//! - [`Sequence`] / [`pipe2`] / [`pipe3`] / [`pipe4`]: statically typed
//!   pipelines, and [`DynSequence`] for pipelines assembled at runtime.
//! - [`Parallel`]: named fan-out with a per-call concurrency bound.
//! - [`Branch`]: first-match routing with an optional default.
//! - [`Lambda`] / [`sync_lambda`]: functions as units.
//! - [`Passthrough`] and [`Assign`]: identity and key augmentation.
//! - [`RetrieverRunnable`] and [`WithMemory`]: adapters for the retriever and
//!   memory collaborators.

#![deny(unsafe_code)]

pub mod branch;
pub mod dynamic;
pub mod lambda;
pub mod memory;
pub mod parallel;
pub mod passthrough;
pub mod retriever;
pub mod sequence;

pub use branch::Branch;
pub use dynamic::DynSequence;
pub use lambda::{Lambda, sync_lambda};
pub use memory::WithMemory;
pub use parallel::Parallel;
pub use passthrough::{Assign, Passthrough};
pub use retriever::RetrieverRunnable;
pub use sequence::{Sequence, pipe2, pipe3, pipe4};
