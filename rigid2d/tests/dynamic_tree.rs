use rigid2d::collision::DynamicTree;
use rigid2d::{Aabb, Vec2};

// Small deterministic generator so the stress test is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let unit = ((self.0 >> 33) as f32) / (u32::MAX >> 1) as f32;
        lo + (hi - lo) * unit
    }
}

fn unit_box(center: Vec2) -> Aabb {
    Aabb::from_center_half_extents(center, [0.5, 0.5])
}

#[test]
fn create_move_destroy_is_balanced() {
    const EXTENT: f32 = 15.0;
    const COUNT: usize = 100;

    let mut tree: DynamicTree<usize> = DynamicTree::new();
    let mut rng = Lcg(42);

    let mut ids = Vec::with_capacity(COUNT);
    for i in 0..COUNT {
        let center = Vec2::new(
            rng.next_f32(-EXTENT, EXTENT),
            rng.next_f32(-EXTENT, EXTENT),
        );
        ids.push(tree.create_proxy(unit_box(center), i));
    }
    tree.validate();
    assert_eq!(tree.node_count(), 2 * COUNT - 1);

    for &id in &ids {
        let center = Vec2::new(
            rng.next_f32(-EXTENT, EXTENT),
            rng.next_f32(-EXTENT, EXTENT),
        );
        let displacement = Vec2::new(rng.next_f32(-1.0, 1.0), rng.next_f32(-1.0, 1.0));
        tree.move_proxy(id, unit_box(center), displacement);
    }
    tree.validate();

    for id in ids {
        tree.destroy_proxy(id);
    }
    tree.validate();
    assert_eq!(tree.compute_height(), 0);
    assert_eq!(tree.node_count(), 0);
    assert_eq!(tree.free_list_len(), tree.capacity());
}

#[test]
fn small_move_keeps_fat_aabb() {
    let mut tree: DynamicTree<i32> = DynamicTree::new();
    let id = tree.create_proxy(unit_box(Vec2::ZERO), 7);
    let fat = tree.fat_aabb(id);
    assert!(fat.contains(&unit_box(Vec2::ZERO)));

    // Same AABB, no displacement: the fat AABB absorbs the move.
    assert!(!tree.move_proxy(id, unit_box(Vec2::ZERO), Vec2::ZERO));
    assert_eq!(tree.fat_aabb(id), fat);

    // A far move must reinsert.
    assert!(tree.move_proxy(id, unit_box(Vec2::new(5.0, 0.0)), Vec2::new(5.0, 0.0)));
    assert!(tree
        .fat_aabb(id)
        .contains(&unit_box(Vec2::new(5.0, 0.0))));

    tree.destroy_proxy(id);
    assert_eq!(tree.node_count(), 0);
    assert_eq!(tree.free_list_len(), tree.capacity());
}

#[test]
fn height_invariant_after_mutations() {
    let mut tree: DynamicTree<usize> = DynamicTree::new();
    let mut ids = Vec::new();
    for i in 0..64 {
        // A line of boxes is a worst case for naive insertion order.
        let center = Vec2::new(i as f32 * 1.5, 0.0);
        ids.push(tree.create_proxy(unit_box(center), i));
        tree.validate();
    }
    assert_eq!(tree.height(), tree.compute_height());
    assert!(tree.max_balance() <= 1);
    assert!(tree.area_ratio() > 0.0);

    for id in ids {
        tree.destroy_proxy(id);
        tree.validate();
    }
}

#[test]
fn query_visits_overlapping_leaves() {
    let mut tree: DynamicTree<usize> = DynamicTree::new();
    for i in 0..10 {
        tree.create_proxy(unit_box(Vec2::new(i as f32 * 3.0, 0.0)), i);
    }

    let mut found = Vec::new();
    tree.query(
        Aabb::new([-1.0, -1.0], [7.0, 1.0]),
        |id| {
            found.push(tree.user_data(id));
            true
        },
    );
    found.sort_unstable();
    assert_eq!(found, vec![0, 1, 2]);

    // Early termination after the first visit.
    let mut visits = 0;
    tree.query(Aabb::new([-100.0, -100.0], [100.0, 100.0]), |_| {
        visits += 1;
        false
    });
    assert_eq!(visits, 1);
}

#[test]
fn ray_cast_walks_candidates() {
    let mut tree: DynamicTree<usize> = DynamicTree::new();
    for i in 0..5 {
        tree.create_proxy(unit_box(Vec2::new(i as f32 * 4.0, 0.0)), i);
    }

    let input = rigid2d::RayCastInput {
        p1: Vec2::new(-5.0, 0.0),
        p2: Vec2::new(20.0, 0.0),
        max_fraction: 1.0,
    };
    let mut hits = Vec::new();
    tree.ray_cast(&input, |sub_input, id| {
        hits.push(tree.user_data(id));
        sub_input.max_fraction
    });
    assert!(!hits.is_empty());
    // A perpendicular ray far away touches nothing.
    let input = rigid2d::RayCastInput {
        p1: Vec2::new(-5.0, 50.0),
        p2: Vec2::new(20.0, 50.0),
        max_fraction: 1.0,
    };
    let mut hits = 0;
    tree.ray_cast(&input, |sub_input, _| {
        hits += 1;
        sub_input.max_fraction
    });
    assert_eq!(hits, 0);
}

#[test]
fn shift_origin_moves_bounds() {
    let mut tree: DynamicTree<i32> = DynamicTree::new();
    let id = tree.create_proxy(unit_box(Vec2::new(10.0, 10.0)), 0);
    tree.shift_origin(Vec2::new(10.0, 10.0));
    let aabb = tree.fat_aabb(id);
    assert!(aabb.lower.x < 0.0 && aabb.upper.x > 0.0);
    let center = aabb.center();
    assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5);
}
