//! Broad phase: a move buffer on top of the dynamic tree that turns proxy
//! motion into deduplicated candidate pairs.

use crate::collision::dynamic_tree::{DynamicTree, NULL_NODE};
use crate::query::{Aabb, RayCastInput};
use crate::types::Vec2;

/// Candidate overlap pairs for proxies that moved since the last update.
#[derive(Clone, Debug)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    move_buffer: Vec<i32>,
    pair_buffer: Vec<(i32, i32)>,
}

impl<T: Copy> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> BroadPhase<T> {
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::new(),
            pair_buffer: Vec::new(),
        }
    }

    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> i32 {
        let id = self.tree.create_proxy(aabb, user_data);
        self.buffer_move(id);
        id
    }

    pub fn destroy_proxy(&mut self, id: i32) {
        self.unbuffer_move(id);
        self.tree.destroy_proxy(id);
    }

    pub fn move_proxy(&mut self, id: i32, aabb: Aabb, displacement: Vec2) {
        if self.tree.move_proxy(id, aabb, displacement) {
            self.buffer_move(id);
        }
    }

    /// Force the proxy onto the move buffer without moving it, so the next
    /// update re-tests its pairs. Used by fixture refiltering.
    pub fn touch_proxy(&mut self, id: i32) {
        self.buffer_move(id);
    }

    fn buffer_move(&mut self, id: i32) {
        self.move_buffer.push(id);
    }

    fn unbuffer_move(&mut self, id: i32) {
        for entry in &mut self.move_buffer {
            if *entry == id {
                *entry = NULL_NODE;
            }
        }
    }

    pub fn fat_aabb(&self, id: i32) -> Aabb {
        self.tree.fat_aabb(id)
    }

    pub fn user_data(&self, id: i32) -> T {
        self.tree.user_data(id)
    }

    pub fn test_overlap(&self, id_a: i32, id_b: i32) -> bool {
        self.tree.fat_aabb(id_a).overlaps(&self.tree.fat_aabb(id_b))
    }

    pub fn proxy_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Emit each candidate pair of overlapping proxies where at least one
    /// moved, ordered `(min, max)` and deduplicated.
    pub fn update_pairs<F: FnMut(T, T)>(&mut self, mut callback: F) {
        self.pair_buffer.clear();

        for i in 0..self.move_buffer.len() {
            let query_id = self.move_buffer[i];
            if query_id == NULL_NODE {
                continue;
            }

            // Query the tree against the moved proxy's fat AABB; pairs where
            // both proxies moved are reported twice and collapse in the sort.
            let fat_aabb = self.tree.fat_aabb(query_id);
            let tree = &self.tree;
            let pair_buffer = &mut self.pair_buffer;
            tree.query(fat_aabb, |id| {
                if id == query_id {
                    return true;
                }
                if tree.was_moved(id) && id > query_id {
                    // Both moved; the pair will be found from the other end.
                    return true;
                }
                pair_buffer.push((query_id.min(id), query_id.max(id)));
                true
            });
        }

        for &id in &self.move_buffer {
            if id != NULL_NODE {
                self.tree.clear_moved(id);
            }
        }
        self.move_buffer.clear();

        self.pair_buffer.sort_unstable();
        let mut i = 0;
        while i < self.pair_buffer.len() {
            let pair = self.pair_buffer[i];
            callback(self.tree.user_data(pair.0), self.tree.user_data(pair.1));
            i += 1;
            // Skip duplicates.
            while i < self.pair_buffer.len() && self.pair_buffer[i] == pair {
                i += 1;
            }
        }
    }

    pub fn query<F: FnMut(i32) -> bool>(&self, aabb: Aabb, callback: F) {
        self.tree.query(aabb, callback)
    }

    pub fn ray_cast<F: FnMut(&RayCastInput, i32) -> f32>(
        &self,
        input: &RayCastInput,
        callback: F,
    ) {
        self.tree.ray_cast(input, callback)
    }

    pub fn shift_origin(&mut self, new_origin: Vec2) {
        self.tree.shift_origin(new_origin);
    }

    pub fn tree(&self) -> &DynamicTree<T> {
        &self.tree
    }
}
