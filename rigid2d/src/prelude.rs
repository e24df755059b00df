//! Convenience re-exports for the common API surface.

pub use crate::body::{Body, BodyBuilder, BodyDef, BodyType};
pub use crate::events::{ContactFilter, ContactImpulse, ContactListener};
pub use crate::filter::Filter;
pub use crate::fixture::{Fixture, FixtureDef};
pub use crate::joints::{
    AngleJointDef, DistanceJointDef, FrictionJointDef, GearJointDef, Joint, JointBase,
    MotorJointDef, MouseJointDef, PrismaticJointDef, PulleyJointDef, RevoluteJointDef,
    RopeJointDef, WeldJointDef, WheelJointDef,
};
pub use crate::query::{Aabb, QueryFilter, RayResult};
pub use crate::shapes::{self, ChainShape, CircleShape, EdgeShape, PolygonShape, Shape};
pub use crate::types::{BodyId, ContactId, FixtureId, JointId, Vec2};
pub use crate::world::{World, WorldBuilder, WorldDef};
