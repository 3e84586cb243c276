use shmoo_types::ShmooPoint;

/// How many recent points the activity panel shows
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Bounds how much point history is kept per address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_points: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_points: 1000 }
    }
}

impl RetentionPolicy {
    pub fn new(max_points: usize) -> Self {
        Self { max_points }
    }

    /// Drop the oldest points beyond the bound. `points` is newest-first.
    /// Returns how many were dropped.
    pub fn apply(&self, points: &mut Vec<ShmooPoint>) -> usize {
        let excess = points.len().saturating_sub(self.max_points);
        if excess > 0 {
            points.truncate(self.max_points);
        }
        excess
    }
}

/// The newest `limit` points of a newest-first history
pub fn recent_points(points: &[ShmooPoint], limit: usize) -> &[ShmooPoint] {
    &points[..points.len().min(limit)]
}
