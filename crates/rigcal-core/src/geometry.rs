//! Broadcast pose composition and point transforms over tables.
//!
//! Conventions: camera poses are `camera_from_rig`, frame poses
//! `rig_from_board`, so a view pose `camera_from_rig * rig_from_board`
//! maps board points into the camera frame.

use ndarray::{ArrayD, IxDyn};

use crate::models::{Camera, DistortionModel, IntrinsicsModel, ProjectionModel};
use crate::table::{PointTable, PoseEstimates, PoseTable, Table};
use crate::{Error, Iso3, Pt3, Real, Result, Vec2};

/// A camera model that maps camera-frame points to image points.
pub trait ProjectPoints {
    /// Project every valid point; points behind the camera become invalid.
    fn project_points(&self, points: &PointTable<Pt3>) -> PointTable<Vec2>;
}

impl<P, D, K> ProjectPoints for Camera<Real, P, D, K>
where
    P: ProjectionModel<Real>,
    D: DistortionModel<Real>,
    K: IntrinsicsModel<Real>,
{
    fn project_points(&self, points: &PointTable<Pt3>) -> PointTable<Vec2> {
        points.filter_map(Vec2::repeat(Real::NAN), |p| self.project_point(p))
    }
}

/// Compose camera extrinsics with object poses into one view per (camera, frame).
///
/// `camera_poses` has shape `(C,)`. `object_poses` is either `(F,)`, shared by
/// every camera, or `(C, F)`, one pose per camera. The result has shape
/// `(C, F)` and is valid only where both operands are valid.
pub fn expand_views(camera_poses: &PoseTable, object_poses: &PoseTable) -> Result<PoseTable> {
    if camera_poses.rank() != 1 {
        return Err(Error::shape_mismatch(
            "camera_poses",
            &[camera_poses.len()],
            camera_poses.shape(),
        ));
    }
    let n_cameras = camera_poses.len();
    let (n_frames, per_camera) = match object_poses.shape() {
        [f] => (*f, false),
        [c, f] if *c == n_cameras => (*f, true),
        other => {
            return Err(Error::shape_mismatch(
                "object_poses",
                &[n_cameras, other.last().copied().unwrap_or(0)],
                other,
            ))
        }
    };

    let object_index = |c: usize, f: usize| if per_camera { vec![c, f] } else { vec![f] };
    let shape = IxDyn(&[n_cameras, n_frames]);
    let cameras = camera_poses.poses();
    let camera_valid = camera_poses.valid_poses();

    let poses = ArrayD::from_shape_fn(shape.clone(), |idx| {
        let obj = object_index(idx[0], idx[1]);
        cameras[[idx[0]].as_slice()] * object_poses.poses()[obj.as_slice()]
    });
    let valid = ArrayD::from_shape_fn(shape, |idx| {
        let obj = object_index(idx[0], idx[1]);
        camera_valid[[idx[0]].as_slice()] && object_poses.valid_poses()[obj.as_slice()]
    });
    PoseTable::create(poses, valid)
}

/// Full `(camera, frame)` pose table from compact estimates.
pub fn expand_poses(estimates: &PoseEstimates) -> Result<PoseTable> {
    expand_views(&estimates.camera, &estimates.frames)
}

/// Element-wise rigid inverse of a pose table.
pub fn inverse(poses: &PoseTable) -> PoseTable {
    poses.inverse()
}

/// Place several boards in the common board frame.
///
/// `board_poses` has shape `(B,)` (`base_from_board`); every board must have
/// the same number of points. Points of an invalid board are invalid.
pub fn transform_boards(board_poses: &PoseTable, boards: &[Vec<Pt3>]) -> Result<PointTable<Pt3>> {
    if board_poses.shape() != [boards.len()] {
        return Err(Error::shape_mismatch("board_poses", &[boards.len()], board_poses.shape()));
    }
    let n_points = boards.first().map_or(0, Vec::len);
    if let Some(board) = boards.iter().find(|b| b.len() != n_points) {
        return Err(Error::shape_mismatch("boards", &[n_points], &[board.len()]));
    }

    let shape = IxDyn(&[boards.len(), n_points]);
    let points = ArrayD::from_shape_fn(shape.clone(), |idx| {
        board_poses.poses()[[idx[0]].as_slice()].transform_point(&boards[idx[0]][idx[1]])
    });
    let valid = ArrayD::from_shape_fn(shape, |idx| board_poses.valid_poses()[[idx[0]].as_slice()]);
    PointTable::create(points, valid)
}

/// Apply each view transform to every board point.
///
/// `world_points` has shape `(B, P)` and `views` shape `(C, F)`; the result
/// has shape `(C, F, B, P)` and is valid where both the view and the world
/// point are valid, regardless of detections.
pub fn transform_points(world_points: &PointTable<Pt3>, views: &PoseTable) -> Result<PointTable<Pt3>> {
    let [n_boards, n_points] = *world_points.shape() else {
        return Err(Error::shape_mismatch("world_points", &[0, 0], world_points.shape()));
    };
    let [n_cameras, n_frames] = *views.shape() else {
        return Err(Error::shape_mismatch("views", &[0, 0], views.shape()));
    };

    let shape = IxDyn(&[n_cameras, n_frames, n_boards, n_points]);
    let view_poses = views.poses();
    let view_valid = views.valid_poses();
    let points = world_points.points();
    let point_valid = world_points.valid_points();

    let transformed = ArrayD::from_shape_fn(shape.clone(), |idx| {
        view_poses[[idx[0], idx[1]].as_slice()].transform_point(&points[[idx[2], idx[3]].as_slice()])
    });
    let valid = ArrayD::from_shape_fn(shape, |idx| {
        view_valid[[idx[0], idx[1]].as_slice()] && point_valid[[idx[2], idx[3]].as_slice()]
    });
    PointTable::create(transformed, valid)
}

/// Project camera-frame points `(C, F, B, P)` through each camera's model.
pub fn project_views<C: ProjectPoints>(
    cameras: &[C],
    transformed: &PointTable<Pt3>,
) -> Result<PointTable<Vec2>> {
    if transformed.rank() == 0 || transformed.len() != cameras.len() {
        return Err(Error::shape_mismatch(
            "cameras",
            &[transformed.len()],
            &[cameras.len()],
        ));
    }
    let per_camera: Vec<PointTable<Vec2>> = transformed
        .sequence(0)?
        .zip(cameras)
        .map(|(points, camera)| camera.project_points(&points))
        .collect();
    PointTable::stack(&per_camera)
}

/// Inverted view poses laid out per frame, per camera, `None` where invalid.
///
/// This is what a 3D viewer needs to place one marker per valid
/// (camera, frame) pair.
pub fn view_poses(estimates: &PoseEstimates) -> Result<Vec<Vec<Option<Iso3>>>> {
    let poses = inverse(&expand_poses(estimates)?);
    poses
        .sequence(1)?
        .map(|frame| {
            (0..frame.len())
                .map(|camera| frame.get(&[camera]))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}
