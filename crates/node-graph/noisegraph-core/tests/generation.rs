mod common;

use approx::assert_relative_eq;
use common::{grid_value, mock_context, mock_context_with};
use noisegraph_core::{
    normalize, normalize_field, BoundsTracker, Config, Field2D, Field3D, GenerationConfig,
    Geometry, NodeHandle, NoiseGraphError, NormalizeConfig, OutputMinMax,
};

#[test]
fn uniform_grid_is_row_major_with_x_fastest() {
    let (ctx, _) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut out = vec![0.0f32; 6];
    let bounds = node.gen_uniform_grid_2d(&mut out, [10, 20], [3, 2], 1.0, 0).unwrap();

    assert_eq!(out[1], grid_value(&[11, 20], 1.0, 0));
    assert_eq!(out[3], grid_value(&[10, 21], 1.0, 0));
    assert_eq!(bounds, OutputMinMax::from_values(&out));
}

#[test]
fn buffer_length_must_match_extent() {
    let (ctx, backend) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut out = vec![0.0f32; 5];
    assert_eq!(
        node.gen_uniform_grid_3d(&mut out, [0; 3], [2, 2, 2], 0.1, 3),
        Err(NoiseGraphError::BufferLength { expected: 8, actual: 5 })
    );
    assert_eq!(backend.gen_calls(), 0);
}

#[test]
fn zero_extent_skips_the_backend_and_keeps_bounds_empty() {
    let (ctx, backend) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut tracker = BoundsTracker::new();
    let bounds = node
        .generate_tracked(
            &Geometry::Grid2D {
                start: [0, 0],
                size: [0, 16],
                frequency: 0.02,
            },
            1,
            &mut [0.0f32; 0],
            &mut tracker,
        )
        .unwrap();
    assert!(bounds.is_empty());
    assert!(tracker.is_empty());
    assert_eq!(backend.gen_calls(), 0);

    let mut out = vec![0.0f32; 1];
    assert!(matches!(
        node.gen_tileable_2d(&mut out, [4, 0], 0.1, 1),
        Err(NoiseGraphError::BufferLength { expected: 0, actual: 1 })
    ));
}

#[test]
fn tracked_generation_accumulates_across_regions() {
    let (ctx, _) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut tracker = BoundsTracker::new();
    let mut left = vec![0.0f32; 4];
    let mut right = vec![0.0f32; 4];

    let a = node
        .generate_tracked(
            &Geometry::Grid2D { start: [0, 0], size: [2, 2], frequency: 1.0 },
            0,
            &mut left,
            &mut tracker,
        )
        .unwrap();
    let b = node
        .generate_tracked(
            &Geometry::Grid2D { start: [2, 0], size: [2, 2], frequency: 1.0 },
            0,
            &mut right,
            &mut tracker,
        )
        .unwrap();
    assert_eq!(tracker.bounds(), Some(a.merged(b)));
    assert_eq!(tracker.bounds().unwrap().min, 0.0);
    assert_eq!(tracker.bounds().unwrap().max, grid_value(&[3, 1], 1.0, 0));

    // normalizing both regions with the shared bounds yields one coherent range
    let transform = tracker.optimise().unwrap();
    transform.apply_slice(&mut left);
    transform.apply_slice(&mut right);
    assert_eq!(left[0], 0.0);
    assert_relative_eq!(right[3], 1.0);

    let err = node
        .generate_tracked(
            &Geometry::Grid2D { start: [4, 0], size: [2, 2], frequency: 1.0 },
            0,
            &mut left,
            &mut tracker,
        )
        .unwrap_err();
    assert_eq!(err, NoiseGraphError::BoundsAlreadyOptimised);
}

#[test]
fn position_arrays_need_matching_axis_lengths() {
    let (ctx, backend) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let xs = [0.0f32, 1.0, 2.0];
    let ys = [5.0f32, 5.0];
    let mut out = vec![0.0f32; 3];

    assert_eq!(
        node.gen_position_array_2d(&mut out, [&xs, &ys], [0.0, 0.0], 0),
        Err(NoiseGraphError::PositionArrayLength { axis: 1, expected: 3, actual: 2 })
    );
    assert_eq!(backend.gen_calls(), 0);

    let ys = [5.0f32, 5.0, 5.0];
    assert_eq!(
        node.gen_positions(&[&xs[..], &ys[..]], &[0.0, 0.0, 0.0], 0, &mut out),
        Err(NoiseGraphError::OffsetLength { axes: 2, actual: 3 })
    );
    assert_eq!(backend.gen_calls(), 0);

    let bounds = node
        .gen_position_array_2d(&mut out, [&xs, &ys], [1.0, -1.0], 2)
        .unwrap();
    assert_eq!(out, vec![7.0, 8.0, 9.0]);
    assert_eq!(bounds, OutputMinMax::new(7.0, 9.0));
}

#[test]
fn single_samples_have_no_bounds_side_effects() {
    let (ctx, _) = mock_context();
    let node = ctx.create("Constant").unwrap();
    assert_eq!(node.gen_single_3d(1.0, 2.0, 3.0, 4), Ok(10.0));
    assert_eq!(
        node.gen_single(&[1.0], 0),
        Err(NoiseGraphError::UnsupportedDimension(1))
    );
}

#[test]
fn generation_faults_name_the_request() {
    let (ctx, _) = mock_context();
    let fractal = ctx.create("Fractal FBm").unwrap();
    let mut out = vec![0.0f32; 4];
    match fractal.gen_uniform_grid_2d(&mut out, [0, 0], [2, 2], 0.1, 1) {
        Err(NoiseGraphError::BackendRejected { operation, reason }) => {
            assert_eq!(operation, "uniform grid 2D");
            assert_eq!(reason, "source is not set");
        }
        other => panic!("expected backend rejection, got {other:?}"),
    }
    assert!(matches!(
        NodeHandle::invalid().gen_single_2d(0.0, 0.0, 0),
        Err(NoiseGraphError::InvalidHandle)
    ));
}

#[test]
fn chunked_fill_matches_single_call_fill() {
    let config = Config {
        generation: GenerationConfig { rows_per_chunk: 3 },
        ..Config::default()
    };
    let (ctx, backend) = mock_context_with(config);
    let node = ctx.create("Constant").unwrap();

    let mut single = Field2D::new([7, 10]).unwrap();
    let mut chunked = Field2D::new([7, 10]).unwrap();
    let a = node.fill_uniform_grid_2d(&mut single, [-3, 4], 0.5, 9).unwrap();
    let b = node.fill_uniform_grid_2d_chunked(&mut chunked, [-3, 4], 0.5, 9).unwrap();

    assert_eq!(single.data(), chunked.data());
    assert_eq!(a, b);
    assert_eq!(single.bounds(), chunked.bounds());
    // one call for the single fill plus four bands of at most three rows
    assert_eq!(backend.gen_calls(), 5);

    let mut single = Field3D::new([3, 2, 5]).unwrap();
    let mut chunked = Field3D::new([3, 2, 5]).unwrap();
    node.fill_uniform_grid_3d(&mut single, [1, 2, 3], 1.0, 0).unwrap();
    node.fill_uniform_grid_3d_chunked(&mut chunked, [1, 2, 3], 1.0, 0).unwrap();
    assert_eq!(single.data(), chunked.data());
    assert_eq!(single.bounds(), chunked.bounds());
}

#[test]
fn oversized_bands_cover_the_whole_field_in_one_call() {
    let config = Config {
        generation: GenerationConfig {
            rows_per_chunk: usize::MAX / 2 + 1,
        },
        ..Config::default()
    };
    let (ctx, backend) = mock_context_with(config);
    let node = ctx.create("Constant").unwrap();

    let mut single = Field2D::new([4, 4]).unwrap();
    let mut chunked = Field2D::new([4, 4]).unwrap();
    node.fill_uniform_grid_2d(&mut single, [0, 0], 1.0, 3).unwrap();
    node.fill_uniform_grid_2d_chunked(&mut chunked, [0, 0], 1.0, 3).unwrap();
    assert_eq!(single.data(), chunked.data());
    assert_eq!(backend.gen_calls(), 2);

    let mut single = Field3D::new([2, 3, 4]).unwrap();
    let mut chunked = Field3D::new([2, 3, 4]).unwrap();
    node.fill_uniform_grid_3d(&mut single, [0, 0, 0], 1.0, 3).unwrap();
    node.fill_uniform_grid_3d_chunked(&mut chunked, [0, 0, 0], 1.0, 3).unwrap();
    assert_eq!(single.data(), chunked.data());
    assert_eq!(backend.gen_calls(), 4);
}

#[test]
fn fill_resets_previous_bounds() {
    let (ctx, _) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut field = Field2D::new([2, 2]).unwrap();
    field.bounds_mut().widen(OutputMinMax::new(-1000.0, 1000.0)).unwrap();

    node.fill_tileable_2d(&mut field, 1.0, 0).unwrap();
    assert_eq!(field.bounds().bounds(), Some(OutputMinMax::from_values(field.data())));
}

#[test]
fn generate_then_normalize_maps_into_unit_range() {
    let (ctx, _) = mock_context();
    let node = ctx.create("Constant").unwrap();
    let mut field = Field2D::new([16, 16]).unwrap();
    node.fill_uniform_grid_2d(&mut field, [0, 0], 0.25, 11).unwrap();

    let transform = normalize_field(&mut field, &ctx.config().normalize).unwrap();
    assert_eq!(transform.min, 11.0);
    let (lo, hi) = field
        .data()
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    assert_eq!(lo, 0.0);
    assert_relative_eq!(hi, 1.0, epsilon = 1e-6);
    assert!(field.bounds().is_empty());

    // a second normalize without new generation has nothing to work with
    assert_eq!(
        normalize_field(&mut field, &NormalizeConfig::default()),
        Err(NoiseGraphError::EmptyBounds)
    );
}

#[test]
fn normalize_with_constant_output_collapses_to_zero() {
    let mut values = vec![4.0f32; 8];
    let mut tracker = BoundsTracker::new();
    tracker.widen(OutputMinMax::new(4.0, 4.0)).unwrap();
    let transform = normalize(&mut values, &mut tracker, &NormalizeConfig::default()).unwrap();
    assert_eq!(transform.scale, 0.0);
    assert!(values.iter().all(|v| *v == 0.0));
}
