use serde::{Deserialize, Serialize};

/// The same quantity computed at every reporting granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granularity<T> {
    /// Whole capture.
    pub overall: T,
    /// Per (camera, frame) pair.
    pub views: T,
    pub cameras: T,
    pub frames: T,
    pub boards: T,
}

/// Reduced axes of a `(camera, frame, board, point)` table per granularity.
pub const REDUCTION_AXES: Granularity<&[usize]> = Granularity {
    overall: &[0, 1, 2, 3],
    views: &[2, 3],
    cameras: &[1, 2, 3],
    frames: &[0, 2, 3],
    boards: &[0, 1, 3],
};

impl<T> Granularity<T> {
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Granularity<U> {
        Granularity {
            overall: f(&self.overall),
            views: f(&self.views),
            cameras: f(&self.cameras),
            frames: f(&self.frames),
            boards: f(&self.boards),
        }
    }

    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<Granularity<U>, E> {
        Ok(Granularity {
            overall: f(&self.overall)?,
            views: f(&self.views)?,
            cameras: f(&self.cameras)?,
            frames: f(&self.frames)?,
            boards: f(&self.boards)?,
        })
    }
}
