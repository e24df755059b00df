//! rigid2d: a 2D rigid-body physics engine
//!
//! Highlights
//! - Dynamic AABB tree broad-phase with move-buffer pair generation.
//! - Narrow-phase manifolds for circle/edge/polygon/chain pairs with
//!   persistent contact ids for warm starting.
//! - GJK distance and shape casting, conservative-advancement time of
//!   impact, and continuous collision for bullets.
//! - Warm-started sequential-impulse solver with a two-point block LCP and
//!   Baumgarte position correction.
//! - Twelve joint types with builder-style defs and stiffness/damping soft
//!   constraints.
//!
//! Quickstart
//! ```no_run
//! use rigid2d::prelude::*;
//!
//! let mut world = World::new(WorldDef::builder().gravity([0.0, -9.8]).build());
//!
//! let ground = world.create_body(BodyBuilder::new().position([0.0, -10.0]).build());
//! world.create_fixture(
//!     ground,
//!     &FixtureDef::builder().build(),
//!     shapes::box_polygon(50.0, 10.0).into(),
//! );
//!
//! let body = world.create_body(
//!     BodyBuilder::new()
//!         .body_type(BodyType::Dynamic)
//!         .position([0.0, 4.0])
//!         .build(),
//! );
//! world.create_fixture(
//!     body,
//!     &FixtureDef::builder().density(1.0).build(),
//!     shapes::box_polygon(0.5, 0.5).into(),
//! );
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0, 8, 3);
//! }
//! let _pos = world.body(body).position();
//! ```
//!
//! Units are MKS (meters, kilograms, seconds); angles are radians. Bodies,
//! fixtures, joints, and contacts are addressed by small copyable ids that
//! stay valid until the object is destroyed.
//!
//! Queries (AABB + ray cast)
//! ```no_run
//! use rigid2d::prelude::*;
//! let world = World::new(WorldDef::default());
//! let hits = world.overlap_aabb(
//!     Aabb::from_center_half_extents([0.0, 1.0], [1.0, 1.5]),
//!     QueryFilter::default(),
//! );
//! let closest = world.cast_ray_closest(
//!     Vec2::new(0.0, 5.0),
//!     Vec2::new(0.0, -10.0),
//!     QueryFilter::default(),
//! );
//! let _ = (hits, closest);
//! ```
//!
//! Feature Flags
//! - `serde`: serialization for plain value types (Vec2, Rot, Transform,
//!   Aabb, Filter, BodyType).
//! - `cgmath` / `nalgebra` / `glam`: conversions with their 2D math types.

pub mod body;
pub mod collision;
pub mod contact;
mod contact_manager;
mod contact_solver;
pub mod events;
pub mod filter;
pub mod fixture;
mod island;
pub mod joints;
pub mod prelude;
pub mod query;
pub mod shapes;
mod time_step;
pub mod tuning;
pub mod types;
pub mod world;
pub mod core {
    pub mod math;
}

pub use body::{Body, BodyBuilder, BodyDef, BodyType};
pub use contact::Contact;
pub use core::math::{Mat22, Mat33, Rot, Sweep, Transform, Vec3};
pub use events::{ContactFilter, ContactImpulse, ContactListener, DefaultContactFilter};
pub use filter::Filter;
pub use fixture::{Fixture, FixtureDef, FixtureDefBuilder};
pub use joints::{
    AngleJointDef, DistanceJointDef, FrictionJointDef, GearJointDef, Joint, JointBase, JointError,
    MotorJointDef, MouseJointDef, PrismaticJointDef, PulleyJointDef, RevoluteJointDef,
    RopeJointDef, WeldJointDef, WheelJointDef,
};
pub use query::{Aabb, QueryFilter, RayCastInput, RayCastOutput, RayResult};
pub use shapes::{
    ChainShape, CircleShape, EdgeShape, MassData, PolygonShape, Shape, ShapeError, ShapeType,
};
pub use types::{BodyId, ContactId, FixtureId, JointId, Vec2};
pub use world::{World, WorldBuilder, WorldDef};
