//! Dynamic AABB tree.
//!
//! A balanced binary tree over fattened AABBs, pooled in a contiguous node
//! array with a free list threaded through unused slots. Leaves are proxies;
//! internal nodes group children chosen by a surface-area heuristic and are
//! kept balanced with AVL-style single rotations.

use crate::query::{Aabb, RayCastInput};
use crate::tuning;
use crate::types::Vec2;

pub const NULL_NODE: i32 = -1;

#[derive(Clone, Debug)]
struct TreeNode<T> {
    aabb: Aabb,
    user_data: Option<T>,
    // parent for live nodes, next free slot otherwise
    parent_or_next: i32,
    child1: i32,
    child2: i32,
    // 0 for leaves, -1 for free slots
    height: i32,
    moved: bool,
}

impl<T> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// Spatial index over fattened AABBs with stable integer proxy ids.
#[derive(Clone, Debug)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: i32,
    free_list: i32,
    node_count: usize,
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> DynamicTree<T> {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
            node_count: 0,
        };
        tree.grow_pool(16);
        tree
    }

    fn grow_pool(&mut self, new_capacity: usize) {
        let old = self.nodes.len();
        debug_assert!(new_capacity > old);
        self.nodes.reserve(new_capacity - old);
        for i in old..new_capacity {
            let next = if i + 1 < new_capacity {
                (i + 1) as i32
            } else {
                self.free_list
            };
            self.nodes.push(TreeNode {
                aabb: Aabb {
                    lower: Vec2::ZERO,
                    upper: Vec2::ZERO,
                },
                user_data: None,
                parent_or_next: next,
                child1: NULL_NODE,
                child2: NULL_NODE,
                height: -1,
                moved: false,
            });
        }
        self.free_list = old as i32;
    }

    fn allocate_node(&mut self) -> i32 {
        if self.free_list == NULL_NODE {
            let capacity = self.nodes.len();
            self.grow_pool(capacity * 2);
        }
        let id = self.free_list;
        let node = &mut self.nodes[id as usize];
        self.free_list = node.parent_or_next;
        node.parent_or_next = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.height = 0;
        node.user_data = None;
        node.moved = false;
        self.node_count += 1;
        id
    }

    fn free_node(&mut self, id: i32) {
        debug_assert!((id as usize) < self.nodes.len());
        debug_assert!(self.node_count > 0);
        let node = &mut self.nodes[id as usize];
        node.parent_or_next = self.free_list;
        node.height = -1;
        node.user_data = None;
        self.free_list = id;
        self.node_count -= 1;
    }

    /// Insert a leaf for `aabb` fattened by [`tuning::AABB_EXTENSION`].
    /// The returned id is stable until [`destroy_proxy`](Self::destroy_proxy).
    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> i32 {
        debug_assert!(aabb.is_valid());
        let id = self.allocate_node();
        let node = &mut self.nodes[id as usize];
        node.aabb = aabb.extended(tuning::AABB_EXTENSION);
        node.user_data = Some(user_data);
        node.height = 0;
        node.moved = true;
        self.insert_leaf(id);
        id
    }

    pub fn destroy_proxy(&mut self, id: i32) {
        debug_assert!((id as usize) < self.nodes.len());
        debug_assert!(self.nodes[id as usize].is_leaf());
        self.remove_leaf(id);
        self.free_node(id);
    }

    /// Move a proxy to `aabb`, predicted to travel along `displacement`.
    ///
    /// Returns false without touching the tree when the stored fat AABB still
    /// contains `aabb` and has not drifted out of a huge envelope around it
    /// (the proxy is not moving fast enough to bother). Otherwise the leaf is
    /// reinserted with a fresh fat AABB stretched along the displacement.
    pub fn move_proxy(&mut self, id: i32, aabb: Aabb, displacement: Vec2) -> bool {
        debug_assert!((id as usize) < self.nodes.len());
        debug_assert!(self.nodes[id as usize].is_leaf());
        debug_assert!(aabb.is_valid());

        let mut fat_aabb = aabb.extended(tuning::AABB_EXTENSION);

        // Predict AABB movement.
        let d = displacement * tuning::AABB_MULTIPLIER;
        if d.x < 0.0 {
            fat_aabb.lower.x += d.x;
        } else {
            fat_aabb.upper.x += d.x;
        }
        if d.y < 0.0 {
            fat_aabb.lower.y += d.y;
        } else {
            fat_aabb.upper.y += d.y;
        }

        let tree_aabb = self.nodes[id as usize].aabb;
        if tree_aabb.contains(&aabb) {
            // The tree AABB still contains the object, but it might be too
            // large. Perhaps the object was moving fast but has since gone
            // to sleep. A huge AABB around the fat one catches that case.
            let huge_aabb = fat_aabb.extended(4.0 * tuning::AABB_EXTENSION);
            if huge_aabb.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(id);
        self.nodes[id as usize].aabb = fat_aabb;
        self.insert_leaf(id);
        self.nodes[id as usize].moved = true;
        true
    }

    pub fn user_data(&self, id: i32) -> T {
        debug_assert!((id as usize) < self.nodes.len());
        self.nodes[id as usize].user_data.expect("live proxy")
    }

    pub fn fat_aabb(&self, id: i32) -> Aabb {
        debug_assert!((id as usize) < self.nodes.len());
        self.nodes[id as usize].aabb
    }

    pub fn was_moved(&self, id: i32) -> bool {
        self.nodes[id as usize].moved
    }

    pub fn clear_moved(&mut self, id: i32) {
        self.nodes[id as usize].moved = false;
    }

    /// Visit every leaf whose fat AABB overlaps `aabb`. The callback returns
    /// false to terminate the query.
    pub fn query<F: FnMut(i32) -> bool>(&self, aabb: Aabb, mut callback: F) {
        let mut stack: Vec<i32> = Vec::with_capacity(64);
        stack.push(self.root);
        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if node.aabb.overlaps(&aabb) {
                if node.is_leaf() {
                    if !callback(id) {
                        return;
                    }
                } else {
                    stack.push(node.child1);
                    stack.push(node.child2);
                }
            }
        }
    }

    /// Cast a ray through the tree. The callback receives a clipped input and
    /// a leaf id and returns the new max fraction: 0 terminates, negative
    /// skips the leaf, positive tightens the clip.
    pub fn ray_cast<F: FnMut(&RayCastInput, i32) -> f32>(
        &self,
        input: &RayCastInput,
        mut callback: F,
    ) {
        let p1 = input.p1;
        let p2 = input.p2;
        let mut r = p2 - p1;
        debug_assert!(r.length_squared() > 0.0);
        r.normalize();

        // v is perpendicular to the segment.
        let v = crate::types::cross_scalar_vec(1.0, r);
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;

        let segment_aabb = |max_fraction: f32| {
            let t = p1 + (p2 - p1) * max_fraction;
            Aabb {
                lower: p1.min(t),
                upper: p1.max(t),
            }
        };
        let mut aabb = segment_aabb(max_fraction);

        let mut stack: Vec<i32> = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if !node.aabb.overlaps(&aabb) {
                continue;
            }

            // Separating axis: |dot(v, p1 - c)| > dot(|v|, h)
            let c = node.aabb.center();
            let h = node.aabb.extents();
            let separation = v.dot(p1 - c).abs() - abs_v.dot(h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };
                let value = callback(&sub_input, id);
                if value == 0.0 {
                    // The client has terminated the ray cast.
                    return;
                }
                if value > 0.0 {
                    max_fraction = value;
                    aabb = segment_aabb(max_fraction);
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    fn insert_leaf(&mut self, leaf: i32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent_or_next = NULL_NODE;
            return;
        }

        // Find the best sibling by descending along the cheaper SAH child.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            let area = self.nodes[index as usize].aabb.perimeter();
            let combined_area = self.nodes[index as usize].aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the new leaf.
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree.
            let inheritance_cost = 2.0 * (combined_area - area);

            let descend_cost = |tree: &Self, child: i32| {
                let child_aabb = &tree.nodes[child as usize].aabb;
                let combined = leaf_aabb.union(child_aabb);
                if tree.nodes[child as usize].is_leaf() {
                    combined.perimeter() + inheritance_cost
                } else {
                    combined.perimeter() - child_aabb.perimeter() + inheritance_cost
                }
            };
            let cost1 = descend_cost(self, child1);
            let cost2 = descend_cost(self, child2);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;

        // Create a new parent grouping the sibling and the leaf.
        let old_parent = self.nodes[sibling as usize].parent_or_next;
        let new_parent = self.allocate_node();
        {
            let aabb = leaf_aabb.union(&self.nodes[sibling as usize].aabb);
            let height = self.nodes[sibling as usize].height + 1;
            let node = &mut self.nodes[new_parent as usize];
            node.parent_or_next = old_parent;
            node.aabb = aabb;
            node.height = height;
        }

        if old_parent != NULL_NODE {
            let parent = &mut self.nodes[old_parent as usize];
            if parent.child1 == sibling {
                parent.child1 = new_parent;
            } else {
                parent.child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[new_parent as usize].child1 = sibling;
        self.nodes[new_parent as usize].child2 = leaf;
        self.nodes[sibling as usize].parent_or_next = new_parent;
        self.nodes[leaf as usize].parent_or_next = new_parent;

        // Walk back up refreshing heights and AABBs.
        let mut index = self.nodes[leaf as usize].parent_or_next;
        while index != NULL_NODE {
            index = self.balance(index);

            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;
            debug_assert!(child1 != NULL_NODE);
            debug_assert!(child2 != NULL_NODE);

            self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                .height
                .max(self.nodes[child2 as usize].height);
            self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                .aabb
                .union(&self.nodes[child2 as usize].aabb);

            index = self.nodes[index as usize].parent_or_next;
        }
    }

    fn remove_leaf(&mut self, leaf: i32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent_or_next;
        let grand_parent = self.nodes[parent as usize].parent_or_next;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_NODE {
            // Destroy the parent and connect the sibling to the grandparent.
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent_or_next = grand_parent;
            self.free_node(parent);

            // Adjust ancestor bounds.
            let mut index = grand_parent;
            while index != NULL_NODE {
                index = self.balance(index);

                let child1 = self.nodes[index as usize].child1;
                let child2 = self.nodes[index as usize].child2;
                self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                    .aabb
                    .union(&self.nodes[child2 as usize].aabb);
                self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                    .height
                    .max(self.nodes[child2 as usize].height);

                index = self.nodes[index as usize].parent_or_next;
            }
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent_or_next = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Perform a left or right rotation if node `a` is imbalanced.
    /// Returns the new subtree root.
    fn balance(&mut self, a: i32) -> i32 {
        debug_assert!(a != NULL_NODE);

        if self.nodes[a as usize].is_leaf() || self.nodes[a as usize].height < 2 {
            return a;
        }

        let b = self.nodes[a as usize].child1;
        let c = self.nodes[a as usize].child2;
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        // Rotate C up.
        if balance > 1 {
            let f = self.nodes[c as usize].child1;
            let g = self.nodes[c as usize].child2;

            // Swap A and C.
            self.nodes[c as usize].child1 = a;
            self.nodes[c as usize].parent_or_next = self.nodes[a as usize].parent_or_next;
            self.nodes[a as usize].parent_or_next = c;

            // A's old parent should point to C.
            let c_parent = self.nodes[c as usize].parent_or_next;
            if c_parent != NULL_NODE {
                if self.nodes[c_parent as usize].child1 == a {
                    self.nodes[c_parent as usize].child1 = c;
                } else {
                    debug_assert!(self.nodes[c_parent as usize].child2 == a);
                    self.nodes[c_parent as usize].child2 = c;
                }
            } else {
                self.root = c;
            }

            // Rotate, promoting the taller grandchild.
            let (keep, move_up) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
                (f, g)
            } else {
                (g, f)
            };
            self.nodes[c as usize].child2 = keep;
            self.nodes[a as usize].child2 = move_up;
            self.nodes[move_up as usize].parent_or_next = a;
            self.nodes[a as usize].aabb = self.nodes[b as usize]
                .aabb
                .union(&self.nodes[move_up as usize].aabb);
            self.nodes[c as usize].aabb = self.nodes[a as usize]
                .aabb
                .union(&self.nodes[keep as usize].aabb);
            self.nodes[a as usize].height = 1 + self.nodes[b as usize]
                .height
                .max(self.nodes[move_up as usize].height);
            self.nodes[c as usize].height = 1 + self.nodes[a as usize]
                .height
                .max(self.nodes[keep as usize].height);
            return c;
        }

        // Rotate B up.
        if balance < -1 {
            let d = self.nodes[b as usize].child1;
            let e = self.nodes[b as usize].child2;

            self.nodes[b as usize].child1 = a;
            self.nodes[b as usize].parent_or_next = self.nodes[a as usize].parent_or_next;
            self.nodes[a as usize].parent_or_next = b;

            let b_parent = self.nodes[b as usize].parent_or_next;
            if b_parent != NULL_NODE {
                if self.nodes[b_parent as usize].child1 == a {
                    self.nodes[b_parent as usize].child1 = b;
                } else {
                    debug_assert!(self.nodes[b_parent as usize].child2 == a);
                    self.nodes[b_parent as usize].child2 = b;
                }
            } else {
                self.root = b;
            }

            let (keep, move_up) = if self.nodes[d as usize].height > self.nodes[e as usize].height {
                (d, e)
            } else {
                (e, d)
            };
            self.nodes[b as usize].child2 = keep;
            self.nodes[a as usize].child1 = move_up;
            self.nodes[move_up as usize].parent_or_next = a;
            self.nodes[a as usize].aabb = self.nodes[c as usize]
                .aabb
                .union(&self.nodes[move_up as usize].aabb);
            self.nodes[b as usize].aabb = self.nodes[a as usize]
                .aabb
                .union(&self.nodes[keep as usize].aabb);
            self.nodes[a as usize].height = 1 + self.nodes[c as usize]
                .height
                .max(self.nodes[move_up as usize].height);
            self.nodes[b as usize].height = 1 + self.nodes[a as usize]
                .height
                .max(self.nodes[keep as usize].height);
            return b;
        }

        a
    }

    /// Height of the root, 0 for an empty tree.
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Maximum height difference between the two children of any node.
    pub fn max_balance(&self) -> i32 {
        let mut max_balance = 0;
        for node in &self.nodes {
            if node.height <= 1 {
                continue;
            }
            debug_assert!(!node.is_leaf());
            let balance = (self.nodes[node.child2 as usize].height
                - self.nodes[node.child1 as usize].height)
                .abs();
            max_balance = max_balance.max(balance);
        }
        max_balance
    }

    /// Ratio of total internal perimeter to root perimeter.
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_area = self.nodes[self.root as usize].aabb.perimeter();
        let mut total_area = 0.0;
        for node in &self.nodes {
            if node.height < 0 {
                continue;
            }
            total_area += node.aabb.perimeter();
        }
        total_area / root_area
    }

    /// Height recomputed bottom-up, for validation against the stored values.
    pub fn compute_height(&self) -> i32 {
        self.compute_node_height(self.root)
    }

    fn compute_node_height(&self, id: i32) -> i32 {
        if id == NULL_NODE {
            return 0;
        }
        let node = &self.nodes[id as usize];
        if node.is_leaf() {
            return 0;
        }
        let h1 = self.compute_node_height(node.child1);
        let h2 = self.compute_node_height(node.child2);
        1 + h1.max(h2)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the free list; with [`validate`](Self::validate) this checks the
    /// pool accounts for every slot.
    pub fn free_list_len(&self) -> usize {
        let mut count = 0;
        let mut id = self.free_list;
        while id != NULL_NODE {
            count += 1;
            id = self.nodes[id as usize].parent_or_next;
        }
        count
    }

    /// Structural self-check, intended for tests and debug builds.
    pub fn validate(&self) {
        self.validate_structure(self.root);
        self.validate_metrics(self.root);
        assert_eq!(self.free_list_len() + self.node_count, self.nodes.len());
        assert_eq!(self.height(), self.compute_height());
    }

    fn validate_structure(&self, id: i32) {
        if id == NULL_NODE {
            return;
        }
        if id == self.root {
            assert_eq!(self.nodes[id as usize].parent_or_next, NULL_NODE);
        }
        let node = &self.nodes[id as usize];
        let child1 = node.child1;
        let child2 = node.child2;

        if node.is_leaf() {
            assert_eq!(child1, NULL_NODE);
            assert_eq!(child2, NULL_NODE);
            assert_eq!(node.height, 0);
            return;
        }

        assert!((child1 as usize) < self.nodes.len());
        assert!((child2 as usize) < self.nodes.len());
        assert_eq!(self.nodes[child1 as usize].parent_or_next, id);
        assert_eq!(self.nodes[child2 as usize].parent_or_next, id);

        self.validate_structure(child1);
        self.validate_structure(child2);
    }

    fn validate_metrics(&self, id: i32) {
        if id == NULL_NODE {
            return;
        }
        let node = &self.nodes[id as usize];
        if node.is_leaf() {
            return;
        }
        let child1 = node.child1;
        let child2 = node.child2;

        let h1 = self.nodes[child1 as usize].height;
        let h2 = self.nodes[child2 as usize].height;
        assert_eq!(node.height, 1 + h1.max(h2));
        assert!((h2 - h1).abs() <= 1);

        let aabb = self.nodes[child1 as usize]
            .aabb
            .union(&self.nodes[child2 as usize].aabb);
        assert_eq!(aabb.lower, node.aabb.lower);
        assert_eq!(aabb.upper, node.aabb.upper);

        self.validate_metrics(child1);
        self.validate_metrics(child2);
    }

    /// Shift the origin of every stored bound, for re-centering long-lived
    /// worlds far from the origin.
    pub fn shift_origin(&mut self, new_origin: Vec2) {
        for node in &mut self.nodes {
            if node.height < 0 {
                continue;
            }
            node.aabb.lower -= new_origin;
            node.aabb.upper -= new_origin;
        }
    }
}
