use rigcal_core::synthetic::{self, RigScene, UniformPixelNoise};
use rigcal_core::table::{PointTable, Table};
use rigcal_optim::{
    CameraPoses, Calibration, Cameras, MotionKind, OptimizeFlags, Parameters, ReprojectionProblem,
    RobustKernel,
};

fn scene(cameras: usize, frames: usize, nx: usize, ny: usize) -> RigScene {
    RigScene::new(
        vec![synthetic::default_camera(); cameras],
        synthetic::rig_layout(cameras, 0.2, 0.05),
        synthetic::board_sweep(frames, -0.2, 0.2, 1.0),
        vec![synthetic::grid_points(nx, ny, 0.05)],
    )
    .unwrap()
}

fn calibration(scene: &RigScene, kind: MotionKind, detections: PointTable) -> Calibration {
    Calibration::new(
        Cameras::from_params(&scene.cameras),
        CameraPoses::from_table(&scene.estimates.camera).unwrap(),
        kind.init(scene.num_cameras(), &scene.estimates.frames).unwrap(),
        scene.world_points().unwrap(),
        detections,
    )
    .unwrap()
}

#[test]
fn ground_truth_roundtrip_reports_clean_views() {
    // 2 cameras, 3 frames, 1 board of 4 points
    let scene = scene(2, 3, 2, 2);
    let calib = calibration(&scene, MotionKind::Static, scene.detections().unwrap());

    let restored = calib.with_params(&calib.params()).unwrap();
    assert_eq!(restored.params(), calib.params());

    let tables = restored.reprojection_tables(false).unwrap();
    assert_eq!(tables.views.shape(), &[2, 3]);
    for c in 0..2 {
        for f in 0..3 {
            let view = tables.views.get(&[c, f]).unwrap();
            assert_eq!(view.detected, 4, "view ({c}, {f})");
            assert_eq!(view.outliers, 0);
        }
    }
    let overall = tables.overall.get(&[]).unwrap();
    assert_eq!(overall.detected, 24);
    assert!(overall.mse < 1e-6, "mse {}", overall.mse);
}

#[test]
fn residuals_vanish_for_noiseless_scene() {
    let scene = scene(2, 3, 3, 2);
    for kind in [MotionKind::Static, MotionKind::Independent] {
        let calib = calibration(&scene, kind, scene.detections().unwrap());
        let problem = ReprojectionProblem::new(calib, RobustKernel::Huber { delta: 1.0 }).unwrap();
        assert_eq!(problem.num_residuals(), 2 * 36);

        let r = problem.residuals(&problem.initial_params()).unwrap();
        assert_eq!(r.len(), problem.num_residuals());
        assert!(r.amax() < 1e-6, "{kind:?}: max residual {}", r.amax());
        assert!(problem.cost(&problem.initial_params()).unwrap() < 1e-12);
    }
}

#[test]
fn jacobian_non_zeros_stay_inside_the_mask() {
    let scene = scene(2, 3, 2, 2);
    let calib = calibration(&scene, MotionKind::Static, scene.detections().unwrap());
    let problem = ReprojectionProblem::new(calib, RobustKernel::None).unwrap();
    let x = problem.initial_params();
    let mask = problem.sparsity().to_mask();
    let r0 = problem.residuals(&x).unwrap();

    // dense forward differences over every column
    let step = 1e-6;
    for col in 0..problem.num_params() {
        let mut xp = x.clone();
        xp[col] += step;
        let rp = problem.residuals(&xp).unwrap();
        for row in 0..problem.num_residuals() {
            if rp[row] != r0[row] {
                assert!(mask[(row, col)], "non-zero outside mask at ({row}, {col})");
            }
        }
    }

    let triplets = problem.jacobian_triplets(&x, step).unwrap();
    assert_eq!(triplets.len(), problem.sparsity().nnz());
    assert!(triplets.iter().all(|&(row, col, _)| mask[(row, col)]));
    // the intrinsics fx column moves x residuals of camera 0
    assert!(triplets.iter().any(|&(row, col, v)| col == 0 && row == 0 && v.abs() > 1e-3));
}

#[test]
fn absent_camera_keeps_its_parameters() {
    let scene = scene(3, 2, 2, 2);
    let missing: Vec<(usize, usize)> = (0..2).map(|f| (2, f)).collect();
    let calib = calibration(&scene, MotionKind::Static, scene.detections_without(&missing).unwrap());
    let problem = ReprojectionProblem::new(calib.clone(), RobustKernel::None).unwrap();

    let x = problem.initial_params();
    let triplets = problem.jacobian_triplets(&x, 1e-6).unwrap();
    // camera 2 intrinsics occupy columns 18..27
    assert!(triplets.iter().all(|&(_, col, _)| !(18..27).contains(&col)));

    let tables = calib.reprojection_tables(false).unwrap();
    assert_eq!(tables.cameras.get(&[2]).unwrap().detected, 0);
    assert!(tables.cameras.get(&[2]).unwrap().mse.is_nan());

    let mut moved = x.clone();
    for col in 0..18 {
        moved[col] *= 1.01;
    }
    let updated = calib.with_params(&moved).unwrap();
    assert_eq!(updated.cameras().models()[2], calib.cameras().models()[2]);
}

#[test]
fn robust_kernel_downweights_outliers() {
    let scene = scene(2, 2, 3, 3).with_noise(UniformPixelNoise::new(3, 0.2));
    let mut points = scene.detections().unwrap().points().clone();
    points[[1, 0, 0, 4].as_slice()] += nalgebra::Vector2::new(0.0, 30.0);
    let detections =
        PointTable::create(points, scene.detections().unwrap().valid_points().clone()).unwrap();
    let calib = calibration(&scene, MotionKind::Static, detections)
        .with_optimize(OptimizeFlags::poses_only());

    let plain = ReprojectionProblem::new(calib.clone(), RobustKernel::None).unwrap();
    let robust = ReprojectionProblem::new(calib, RobustKernel::Cauchy { c: 1.0 }).unwrap();
    let x = plain.initial_params();
    assert_eq!(x.len(), 2 * 6 + 2 * 6);

    let entry = plain
        .index()
        .entries()
        .iter()
        .position(|e| *e == [1, 0, 0, 4])
        .unwrap();
    let r_plain = plain.residuals(&x).unwrap();
    let r_robust = robust.residuals(&x).unwrap();
    assert!(r_plain[2 * entry + 1].abs() > 29.0);
    assert!(r_robust[2 * entry + 1].abs() < 1.5);

    let scales = robust.row_scales(&plain.residuals_unweighted(&x).unwrap());
    assert_eq!(scales[2 * entry], scales[2 * entry + 1]);
    assert_eq!(scales.iter().filter(|&&s| s < 0.5).count(), 2);
    assert!(plain.cost(&x).unwrap() > robust.cost(&x).unwrap());
}
