//! Engine module: drives the circom toolchain and the snarkjs backend through
//! a complete benchmark run.
//!
//! # Architecture
//!
//! - **Toolchain** (`toolchain`): circom-specific invocations (compile, witness
//!   generation).
//! - **Backend** (`crate::backend`): proving-system invocations (setup, prove,
//!   verify).
//! - **Workflow** (`workflow`): the `Pipeline` that runs them in order through a
//!   `CommandRunner`, consulting the stage cache and collecting timings.
//!
//! Neither the toolchain nor the backend spawns anything; both only describe
//! commands. `layout` names every artifact path and `cache` decides whether a
//! stage's artifacts are reusable.

pub mod cache;
pub mod fixture;
pub mod layout;
pub mod toolchain;
pub mod workflow;

pub use cache::{CacheCheck, CachedStage, StageCache};
pub use fixture::InputFixture;
pub use layout::OutputLayout;
pub use toolchain::CircomToolchain;
pub use workflow::{
    BenchmarkOutcome, Pipeline, PipelineConfig, PipelineState, StageReport, average_ms,
};
