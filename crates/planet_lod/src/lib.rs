//! Planet LOD - adaptive cube-sphere quadtree terrain.
//!
//! A planet is six quadtrees, one per cube face. Every frame the tree is
//! walked against the viewpoint: nodes whose geometric or texel error is too
//! large for the screen ask to be split, stale subtrees are merged back, and
//! the height tiles everything is built from are synthesized a step at a time
//! under a fixed per-frame budget.
//!
//! ```text
//!  PlanetDescriptor ──► Planet::update(viewpoint)
//!                         │
//!      ┌──────────────────┼─────────────────────┐
//!      ▼                  ▼                     ▼
//!   QuadTree ◄──── RequestScheduler ────► TileSynthesizer ──► Tile
//!      │                                                        │
//!      └──────────────► PatchBuilder ◄──────────────────────────┘
//!                           │
//!                           ▼
//!                RenderBackend::submit(DrawCall)
//! ```
//!
//! The engine never touches a GPU; everything goes through [`RenderBackend`].
//! [`SoftwareBackend`] implements it on the CPU for tests and headless use.

pub mod backend;
pub mod bounds;
pub mod config;
pub mod constants;
pub mod error;
pub mod face;
pub mod frustum;
pub mod metrics;
pub mod patch;
pub mod planet;
pub mod quadtree;
pub mod scheduler;
pub mod tile;

pub use backend::{DrawCall, RenderBackend, SoftwareBackend};
pub use bounds::Aabb;
pub use config::{DebugFlags, PlanetConfig, PlanetDescriptor};
pub use error::ConfigError;
pub use face::{Edge, Face};
pub use frustum::Frustum;
pub use metrics::{MetricsSink, NullSink, PlanetStats, RecordingSink};
pub use patch::{LodState, Patch, PatchBuilder};
pub use planet::{Planet, Viewpoint};
pub use quadtree::{NodeId, NodeKey, QuadTree, QuadTreeNode};
pub use scheduler::{RequestKind, RequestScheduler, SchedulerBudget, SchedulerStats};
pub use tile::{BrushSet, Tile, TileSynthesizer};
