//! Geometric kernels: the broad-phase tree, GJK distance/shape-cast, time of
//! impact, and the pairwise manifold functions.

pub mod broad_phase;
pub mod collide_circle;
pub mod collide_edge;
pub mod collide_polygon;
pub mod distance;
pub mod dynamic_tree;
pub mod manifold;
pub mod time_of_impact;

pub use broad_phase::BroadPhase;
pub use distance::{
    distance, shape_cast, test_overlap, DistanceInput, DistanceOutput, DistanceProxy,
    ShapeCastInput, ShapeCastOutput, SimplexCache,
};
pub use dynamic_tree::{DynamicTree, NULL_NODE};
pub use manifold::{
    clip_segment_to_line, ClipVertex, ContactFeature, ContactPointId, FeatureType, Manifold,
    ManifoldPoint, ManifoldType, WorldManifold,
};
pub use time_of_impact::{time_of_impact, ToiInput, ToiOutput, ToiState};
