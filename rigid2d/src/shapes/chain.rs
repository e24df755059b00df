//! Chain shape: an ordered vertex sequence yielding one edge child per
//! segment, with ghost vertices connecting neighbors so bodies slide across
//! the joints without snagging.

use crate::core::math::Transform;
use crate::query::Aabb;
use crate::shapes::{EdgeShape, MassData, ShapeError};
use crate::types::Vec2;

#[derive(Clone, Debug)]
pub struct ChainShape {
    vertices: Vec<Vec2>,
    prev_vertex: Vec2,
    next_vertex: Vec2,
    is_loop: bool,
}

impl ChainShape {
    /// Open chain. `prev` and `next` are ghost vertices adjacent to the first
    /// and last vertex; pass the neighboring terrain points, or the endpoints
    /// themselves for a free-standing chain.
    pub fn new<I, P>(points: I, prev: Vec2, next: Vec2) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec2>,
    {
        let vertices: Vec<Vec2> = points.into_iter().map(Into::into).collect();
        if vertices.len() < 2 {
            return Err(ShapeError::ChainTooShort {
                min: 2,
                got: vertices.len(),
            });
        }
        Ok(Self {
            vertices,
            prev_vertex: prev,
            next_vertex: next,
            is_loop: false,
        })
    }

    /// Closed loop; the last edge connects back to the first vertex and the
    /// ghost vertices wrap around.
    pub fn new_loop<I, P>(points: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec2>,
    {
        let mut vertices: Vec<Vec2> = points.into_iter().map(Into::into).collect();
        if vertices.len() < 3 {
            return Err(ShapeError::ChainTooShort {
                min: 3,
                got: vertices.len(),
            });
        }
        let first = vertices[0];
        vertices.push(first);
        let prev_vertex = vertices[vertices.len() - 2];
        let next_vertex = vertices[1];
        Ok(Self {
            vertices,
            prev_vertex,
            next_vertex,
            is_loop: true,
        })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn edge_count(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Materialize child `index` as a one-sided edge with its ghost vertices.
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        debug_assert!(index < self.edge_count());
        let v1 = self.vertices[index];
        let v2 = self.vertices[index + 1];
        let v0 = if index > 0 {
            self.vertices[index - 1]
        } else {
            self.prev_vertex
        };
        let v3 = if index + 2 < self.vertices.len() {
            self.vertices[index + 2]
        } else {
            self.next_vertex
        };
        EdgeShape::one_sided(v0, v1, v2, v3)
    }

    pub fn compute_mass(&self, _density: f32) -> MassData {
        MassData::default()
    }

    pub fn compute_aabb(&self, xf: &Transform, child: usize) -> Aabb {
        self.child_edge(child).compute_aabb(xf)
    }
}
