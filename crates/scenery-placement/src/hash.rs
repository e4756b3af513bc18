//! Uniform bucket grid over mesh triangles.

use std::collections::BTreeSet;

use glam::DVec2;

/// Fixed `dims × dims` grid over a bounding box. A triangle is stored in
/// every bucket its bounding box touches, so a lookup may see it more
/// than once; callers deduplicate through the returned set.
#[derive(Debug, Clone)]
pub struct TriangleHash {
    dims: usize,
    lo: DVec2,
    hi: DVec2,
    buckets: Vec<Vec<usize>>,
}

impl TriangleHash {
    pub fn new(lo: DVec2, hi: DVec2, dims: usize) -> Self {
        let dims = dims.max(1);
        Self {
            dims,
            lo,
            hi,
            buckets: vec![Vec::new(); dims * dims],
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    fn cell(&self, c: f64, lo: f64, hi: f64) -> usize {
        let span = hi - lo;
        if span <= 0.0 {
            return 0;
        }
        // Saturating cast; NaN lands in bucket 0.
        let i = ((c - lo) * self.dims as f64 / span) as i64;
        i.clamp(0, self.dims as i64 - 1) as usize
    }

    pub fn hash_x(&self, x: f64) -> usize {
        self.cell(x, self.lo.x, self.hi.x)
    }

    pub fn hash_y(&self, y: f64) -> usize {
        self.cell(y, self.lo.y, self.hi.y)
    }

    fn bucket_range(&self, lo: DVec2, hi: DVec2) -> (usize, usize, usize, usize) {
        (self.hash_x(lo.x), self.hash_y(lo.y), self.hash_x(hi.x), self.hash_y(hi.y))
    }

    /// Store triangle `id`. Returns the number of buckets it went into.
    pub fn insert(&mut self, id: usize, corners: &[DVec2; 3]) -> usize {
        let lo = corners[0].min(corners[1]).min(corners[2]);
        let hi = corners[0].max(corners[1]).max(corners[2]);
        let (x1, y1, x2, y2) = self.bucket_range(lo, hi);
        for y in y1..=y2 {
            for x in x1..=x2 {
                self.buckets[x + y * self.dims].push(id);
            }
        }
        (x2 - x1 + 1) * (y2 - y1 + 1)
    }

    /// Every triangle stored in a bucket overlapping `[lo, hi]`, plus the
    /// number of bucket lookups made.
    pub fn fetch(&self, lo: DVec2, hi: DVec2) -> (BTreeSet<usize>, usize) {
        let (x1, y1, x2, y2) = self.bucket_range(lo, hi);
        let mut out = BTreeSet::new();
        for y in y1..=y2 {
            for x in x1..=x2 {
                out.extend(self.buckets[x + y * self.dims].iter().copied());
            }
        }
        (out, (x2 - x1 + 1) * (y2 - y1 + 1))
    }
}
