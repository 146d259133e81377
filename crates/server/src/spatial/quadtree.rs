//! QuadTree for spatial indexing.
//!
//! The tree never owns entities: each [`QuadItem`] carries an `id` that
//! indexes a side table owned by the caller for the duration of one tick.
//! It is rebuilt from scratch every tick, so there is no removal or
//! rebalancing.

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create bounds from a center and a half extent.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, half: f32) -> Self {
        Self {
            min_x: cx - half,
            min_y: cy - half,
            max_x: cx + half,
            max_y: cy + half,
        }
    }

    /// Check if two bounds intersect (touching edges count).
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// Check if a point lies inside, edges included.
    #[inline]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }

    /// The four child quadrants in insertion order: NW, NE, SW, SE.
    fn quadrants(&self) -> [Bounds; 4] {
        let cx = self.center_x();
        let cy = self.center_y();
        [
            Bounds::new(self.min_x, self.min_y, cx, cy),
            Bounds::new(cx, self.min_y, self.max_x, cy),
            Bounds::new(self.min_x, cy, cx, self.max_y),
            Bounds::new(cx, cy, self.max_x, self.max_y),
        ]
    }
}

/// A point-like object with a radius stored in the QuadTree.
#[derive(Debug, Clone, Copy)]
pub struct QuadItem {
    /// Index into the caller's side table.
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Radius.
    pub size: f32,
}

impl QuadItem {
    #[inline]
    pub fn new(id: u32, x: f32, y: f32, size: f32) -> Self {
        Self { id, x, y, size }
    }

    #[inline]
    fn bound(&self) -> Bounds {
        Bounds::from_center(self.x, self.y, self.size)
    }
}

#[derive(Debug)]
struct QuadNode {
    bounds: Bounds,
    depth: u32,
    items: Vec<QuadItem>,
    /// Index of the NW child; NE, SW, SE follow contiguously.
    children: Option<usize>,
}

impl QuadNode {
    fn new(bounds: Bounds, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

/// Region QuadTree over a fixed root area.
///
/// Nodes live in a flat arena. A node keeps up to `capacity` items; once
/// full it subdivides and further items descend into the first child
/// (NW, NE, SW, SE) whose bounds contain their center. Nodes at
/// `max_depth` never subdivide, which bounds recursion for any amount of
/// clustering.
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    capacity: usize,
    max_depth: u32,
    len: usize,
    /// Largest item radius inserted. Items can reach this far outside the
    /// node holding their center.
    max_size: f32,
}

impl QuadTree {
    /// Create an empty tree covering `bounds`.
    pub fn new(bounds: Bounds, capacity: usize, max_depth: u32) -> Self {
        Self {
            nodes: vec![QuadNode::new(bounds, 0)],
            capacity: capacity.max(1),
            max_depth,
            len: 0,
            max_size: 0.0,
        }
    }

    /// Root bounds.
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    /// Insert an item. Returns false if its center is outside the root.
    pub fn insert(&mut self, item: QuadItem) -> bool {
        if self.insert_at(0, item) {
            self.len += 1;
            self.max_size = self.max_size.max(item.size);
            true
        } else {
            false
        }
    }

    fn insert_at(&mut self, node_idx: usize, item: QuadItem) -> bool {
        if !self.nodes[node_idx].bounds.contains_point(item.x, item.y) {
            return false;
        }

        let node = &mut self.nodes[node_idx];
        if node.items.len() < self.capacity || node.depth >= self.max_depth {
            node.items.push(item);
            return true;
        }

        let children = node.children;
        let first_child = match children {
            Some(first) => first,
            None => self.subdivide(node_idx),
        };

        for child in first_child..first_child + 4 {
            if self.insert_at(child, item) {
                return true;
            }
        }

        // Only reachable through float rounding at a quadrant seam.
        self.nodes[node_idx].items.push(item);
        true
    }

    fn subdivide(&mut self, node_idx: usize) -> usize {
        let bounds = self.nodes[node_idx].bounds;
        let depth = self.nodes[node_idx].depth + 1;
        let first = self.nodes.len();
        for quadrant in bounds.quadrants() {
            self.nodes.push(QuadNode::new(quadrant, depth));
        }
        self.nodes[node_idx].children = Some(first);
        first
    }

    /// Find ids of all items whose bounds touch `range`.
    ///
    /// Broad phase only: results are unordered and callers must re-check
    /// exact geometry.
    pub fn query(&self, range: &Bounds) -> Vec<u32> {
        let reach = Bounds::new(
            range.min_x - self.max_size,
            range.min_y - self.max_size,
            range.max_x + self.max_size,
            range.max_y + self.max_size,
        );
        let mut result = Vec::new();
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(&reach) {
                continue;
            }
            for item in &node.items {
                if item.bound().intersects(range) {
                    result.push(item.id);
                }
            }
            if let Some(first) = node.children {
                stack.extend(first..first + 4);
            }
        }
        result
    }

    /// Number of items stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Deepest level reached so far.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

impl std::fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("items", &self.len)
            .field("nodes", &self.nodes.len())
            .field("bounds", &self.bounds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> QuadTree {
        QuadTree::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 4, 8)
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let c = Bounds::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn test_insert_outside_root_is_rejected() {
        let mut tree = world();
        assert!(!tree.insert(QuadItem::new(1, 150.0, 0.0, 5.0)));
        assert!(tree.insert(QuadItem::new(2, 100.0, -100.0, 5.0)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_quadtree_insert_find() {
        let mut tree = world();

        tree.insert(QuadItem::new(1, 0.0, 0.0, 10.0));
        tree.insert(QuadItem::new(2, 50.0, 50.0, 10.0));
        tree.insert(QuadItem::new(3, -50.0, -50.0, 10.0));

        assert_eq!(tree.len(), 3);

        let found = tree.query(&Bounds::from_center(0.0, 0.0, 20.0));
        assert!(found.contains(&1));
        assert!(!found.contains(&2));
        assert!(!found.contains(&3));

        let found = tree.query(&Bounds::from_center(50.0, 50.0, 20.0));
        assert!(!found.contains(&1));
        assert!(found.contains(&2));
        assert!(!found.contains(&3));
    }

    #[test]
    fn test_subdivided_tree_finds_everything() {
        let mut tree = world();
        let mut id = 0;
        for gx in -9..=9 {
            for gy in -9..=9 {
                assert!(tree.insert(QuadItem::new(id, gx as f32 * 10.0, gy as f32 * 10.0, 1.0)));
                id += 1;
            }
        }
        assert!(tree.depth() > 0);

        let mut all = tree.query(&tree.bounds());
        all.sort_unstable();
        assert_eq!(all, (0..id).collect::<Vec<_>>());

        // A small box around (30, 30) sees exactly that grid point.
        let found = tree.query(&Bounds::from_center(30.0, 30.0, 2.0));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_clustered_points_terminate_at_max_depth() {
        let mut tree = QuadTree::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 2, 3);
        for id in 0..500 {
            assert!(tree.insert(QuadItem::new(id, 1.0, 1.0, 1.0)));
        }
        assert!(tree.depth() <= 3);
        assert_eq!(tree.query(&Bounds::from_center(1.0, 1.0, 0.5)).len(), 500);
    }

    #[test]
    fn test_query_includes_items_reaching_into_range() {
        let mut tree = world();
        tree.insert(QuadItem::new(9, 30.0, 0.0, 15.0));
        // Center is outside the box but the radius reaches in.
        let found = tree.query(&Bounds::from_center(0.0, 0.0, 20.0));
        assert_eq!(found, vec![9]);
    }

    #[test]
    fn test_query_sees_large_items_from_neighbouring_nodes() {
        let mut tree = world();
        // Fill the +x/+y quadrant so the root subdivides.
        for id in 0..8 {
            tree.insert(QuadItem::new(id, 50.0 + id as f32, 50.0, 1.0));
        }
        tree.insert(QuadItem::new(100, 5.0, 5.0, 30.0));
        assert!(tree.depth() > 0);

        // The range lies in the -x/-y quadrant; item 100 is stored under +x/+y but reaches across.
        let found = tree.query(&Bounds::from_center(-20.0, -20.0, 2.0));
        assert_eq!(found, vec![100]);
    }
}
