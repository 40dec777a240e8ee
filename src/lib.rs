//! karst: an infinite procedurally-generated voxel world engine.
//!
//! The root crate hosts the per-frame world pipeline (chunk streaming,
//! edits, lighting, meshing), the block raycast, and configuration;
//! the engine subsystems live in the `karst-*` workspace crates.
#![forbid(unsafe_code)]

pub mod config;
pub mod pipeline;
pub mod raycast;

pub use config::EngineConfig;
pub use pipeline::{Action, FrameStats, MeshSink, NullMeshSink, ViewerPose, WorldPipeline};
pub use raycast::{RayHit, raycast_blocks};
