use approx::assert_relative_eq;
use noisegraph_core::{
    normalize_field, Config, Field2D, Field3D, GenerationConfig, HybridInput, MemberKind,
    NodeHandle, NoiseContext, NoiseGraphError, NormalizeConfig, SIMD_SCALAR,
};
use noisegraph_soft::SoftBackend;
use noisegraph_test_fixtures::graphs;

fn context() -> NoiseContext {
    NoiseContext::new(SoftBackend::new()).expect("soft registry loads")
}

fn value_range(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

/// Smooth max of an FBm field and a lifted cellular field, bound by name
/// with spelling variations throughout.
fn layered_tree(ctx: &NoiseContext) -> Result<NodeHandle, NoiseGraphError> {
    let mut cellular = ctx.create("CellularDistance")?;
    cellular.set("ReturnType", "Index0Add1")?;
    cellular.set("DistanceIndex0", 2)?;

    let mut fractal = ctx.create("FractalFBm")?;
    fractal.set("Source", &ctx.create("Perlin")?)?;
    fractal.set("Gain", 0.3f32)?;
    fractal.set("Lacunarity", 0.6f32)?;

    let mut add_dim = ctx.create("Add Dimension")?;
    add_dim.set("Source", &cellular)?;
    add_dim.set("NewDimensionPosition", 0.5f32)?;

    let mut max_smooth = ctx.create("maxsmooth")?;
    max_smooth.set("LHS", &fractal)?;
    max_smooth.set("RHS", &add_dim)?;
    Ok(max_smooth)
}

#[test]
fn layered_tree_generates_and_normalizes() {
    let ctx = context();
    let tree = layered_tree(&ctx).unwrap();
    assert_eq!(tree.simd_level(), Ok(SIMD_SCALAR));

    let mut field = Field2D::new([64, 64]).unwrap();
    let bounds = tree.fill_uniform_grid_2d(&mut field, [0, 0], 0.02, 1337).unwrap();
    assert!(!bounds.is_empty());
    assert!(field.data().iter().all(|v| v.is_finite()));

    normalize_field(&mut field, &ctx.config().normalize).unwrap();
    let (lo, hi) = value_range(field.data());
    assert_eq!(lo, 0.0);
    assert_relative_eq!(hi, 1.0, epsilon = 1e-6);
}

#[test]
fn reference_blob_decodes_and_re_encodes_identically() {
    let ctx = context();
    let blob = graphs::encoded("reference-add").unwrap();
    let tree = ctx.decode(&blob);
    assert!(tree.is_valid());
    assert_eq!(tree.kind_name(), Ok("add"));
    assert_eq!(tree.encode(), Ok(Some(blob)));
}

#[test]
fn every_fixture_graph_decodes() {
    let ctx = context();
    for name in graphs::keys() {
        let graph = graphs::load(&name).unwrap();
        let tree = ctx.decode(&graph.encoded);
        assert!(tree.is_valid(), "{name} ({}) failed to decode", graph.description);

        let mut out = vec![0.0f32; 16 * 16];
        tree.gen_uniform_grid_2d(&mut out, [0, 0], [16, 16], 0.05, 7)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert!(out.iter().all(|v| v.is_finite()), "{name} produced non-finite output");
    }
}

#[test]
fn corrupted_blobs_yield_the_invalid_handle() {
    let ctx = context();
    let blob = graphs::encoded("dunes").unwrap();
    let truncated = &blob[..blob.len() - 8];

    for bad in [truncated, "", "%%%%", "DQAFAAAAAAAAQAgAAAAAAD8AAAAAAAAA"] {
        let handle = ctx.decode(bad);
        assert!(!handle.is_valid(), "{bad:?} should not decode");
        assert_eq!(
            handle.gen_single_2d(0.0, 0.0, 1),
            Err(NoiseGraphError::InvalidHandle)
        );
    }
}

#[test]
fn generation_is_deterministic_for_a_seed() {
    let ctx = context();
    let tree = ctx.decode(&graphs::encoded("terrain-fbm").unwrap());

    let mut a = vec![0.0f32; 32 * 32];
    let mut b = vec![0.0f32; 32 * 32];
    let mut c = vec![0.0f32; 32 * 32];
    let ba = tree.gen_uniform_grid_2d(&mut a, [5, -5], [32, 32], 0.03, 42).unwrap();
    let bb = tree.gen_uniform_grid_2d(&mut b, [5, -5], [32, 32], 0.03, 42).unwrap();
    tree.gen_uniform_grid_2d(&mut c, [5, -5], [32, 32], 0.03, 43).unwrap();

    assert_eq!(a, b);
    assert_eq!(ba, bb);
    assert_ne!(a, c);
}

#[test]
fn single_samples_match_grid_samples() {
    let ctx = context();
    let tree = ctx.decode(&graphs::encoded("dunes").unwrap());
    let mut out = vec![0.0f32; 8 * 4];
    tree.gen_uniform_grid_2d(&mut out, [0, 0], [8, 4], 0.5, 3).unwrap();

    let single = tree.gen_single_2d(3.0 * 0.5, 2.0 * 0.5, 3).unwrap();
    assert_eq!(single, out[2 * 8 + 3]);
}

#[test]
fn hybrid_members_take_constants_or_nodes() {
    let ctx = context();
    let mut waves = ctx.create("Sine Waves").unwrap();
    waves.set("Scale", 0.25f32).unwrap();
    let constant = waves.gen_single_2d(1.0, 1.0, 0).unwrap();
    assert_relative_eq!(constant, (std::f32::consts::TAU * 0.25).sin(), epsilon = 1e-6);

    let mut driver = ctx.create("Constant").unwrap();
    driver.set("Value", 0.5f32).unwrap();
    waves.set_hybrid("Scale", HybridInput::Node(&driver)).unwrap();
    drop(driver);
    let driven = waves.gen_single_2d(0.5, 0.5, 0).unwrap();
    assert_relative_eq!(driven, (std::f32::consts::TAU * 0.25).sin(), epsilon = 1e-6);
}

#[test]
fn binder_errors_surface_before_and_after_the_backend() {
    let ctx = context();
    let perlin = ctx.create("Perlin").unwrap();
    let mut remap = ctx.create("Remap").unwrap();

    assert!(matches!(
        remap.set("From Min", &perlin),
        Err(NoiseGraphError::TypeMismatch { expected: MemberKind::Float, .. })
    ));
    assert!(matches!(
        remap.set("Source", 1.0f32),
        Err(NoiseGraphError::TypeMismatch { expected: MemberKind::NodeLookup, .. })
    ));

    let mut fbm = ctx.create("Fractal FBm").unwrap();
    assert!(matches!(
        fbm.set("Octaves", 0),
        Err(NoiseGraphError::BackendRejected { .. })
    ));
    assert!(matches!(
        fbm.set("Lacunarity", f32::NAN),
        Err(NoiseGraphError::BackendRejected { .. })
    ));

    // lookups left unset are reported when generating
    let mut out = vec![0.0f32; 4];
    match remap.gen_uniform_grid_2d(&mut out, [0, 0], [2, 2], 1.0, 0) {
        Err(NoiseGraphError::BackendRejected { reason, .. }) => {
            assert!(reason.contains("'Source'"), "{reason}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn cyclic_bindings_are_refused() {
    let ctx = context();
    let mut a = ctx.create("Abs").unwrap();
    let mut b = ctx.create("Abs").unwrap();
    a.set("Source", &b).unwrap();
    assert!(matches!(
        b.set("Source", &a),
        Err(NoiseGraphError::BackendRejected { .. })
    ));

    // the rejected binding left b untouched
    let mut out = vec![0.0f32; 4];
    assert!(b.gen_uniform_grid_2d(&mut out, [0, 0], [2, 2], 1.0, 0).is_err());
}

#[test]
fn every_enum_name_resolves() {
    let ctx = context();
    for descriptor in ctx.registry().iter() {
        for member in descriptor.members_of(MemberKind::Enum) {
            let values = member.enum_values.as_ref().expect("enum values");
            for (name, ordinal) in values {
                let mut node = ctx.create(&descriptor.name).unwrap();
                node.set(&member.name, name.as_str()).unwrap();
                assert_eq!(member.enum_ordinal(name), Some(*ordinal));
            }
        }
    }
}

#[test]
fn tileable_output_samples_a_torus() {
    let ctx = context();
    let tree = ctx.decode(&graphs::encoded("terrain-fbm").unwrap());
    let mut field = Field2D::new([32, 16]).unwrap();
    tree.fill_tileable_2d(&mut field, 0.1, 9).unwrap();

    // the origin sits at angle zero on both circles
    let tau = std::f32::consts::TAU;
    let rx = 32.0 * 0.1 / tau;
    let ry = 16.0 * 0.1 / tau;
    let origin = tree.gen_single_4d(rx, 0.0, ry, 0.0, 9).unwrap();
    assert_relative_eq!(field.get([0, 0]).unwrap(), origin, epsilon = 1e-6);

    let mut again = Field2D::new([32, 16]).unwrap();
    tree.fill_tileable_2d(&mut again, 0.1, 9).unwrap();
    assert_eq!(field.data(), again.data());
    let (lo, hi) = value_range(field.data());
    assert!(lo < hi);
}

#[test]
fn position_arrays_sample_without_frequency() {
    let ctx = context();
    let tree = ctx.decode(&graphs::encoded("gradient").unwrap());
    let xs = [0.0f32, 1.0, 2.0];
    let ys = [0.5f32, 0.5, 0.5];
    let mut out = vec![0.0f32; 3];
    let bounds = tree
        .gen_position_array_2d(&mut out, [&xs[..], &ys[..]], [1.0, 0.0], 0)
        .unwrap();
    assert_eq!(out, vec![2.0, 3.0, 4.0]);
    assert_eq!((bounds.min, bounds.max), (2.0, 4.0));
}

#[test]
fn chunked_generation_is_bit_identical() {
    let config = Config {
        generation: GenerationConfig { rows_per_chunk: 5 },
        normalize: NormalizeConfig {
            min_parallel_len: 64,
            ..NormalizeConfig::default()
        },
    };
    let ctx = NoiseContext::with_config(SoftBackend::new(), config).unwrap();
    let tree = ctx.decode(&graphs::encoded("dunes").unwrap());

    let mut single = Field2D::new([48, 37]).unwrap();
    let mut chunked = Field2D::new([48, 37]).unwrap();
    tree.fill_uniform_grid_2d(&mut single, [-10, 3], 0.04, 5).unwrap();
    tree.fill_uniform_grid_2d_chunked(&mut chunked, [-10, 3], 0.04, 5).unwrap();
    assert_eq!(single.data(), chunked.data());
    assert_eq!(single.bounds(), chunked.bounds());

    normalize_field(&mut single, &ctx.config().normalize).unwrap();
    normalize_field(&mut chunked, &ctx.config().normalize).unwrap();
    assert_eq!(single.data(), chunked.data());

    let mut single = Field3D::new([9, 8, 11]).unwrap();
    let mut chunked = Field3D::new([9, 8, 11]).unwrap();
    tree.fill_uniform_grid_3d(&mut single, [0, 0, 0], 0.1, 5).unwrap();
    tree.fill_uniform_grid_3d_chunked(&mut chunked, [0, 0, 0], 0.1, 5).unwrap();
    assert_eq!(single.data(), chunked.data());
}

#[test]
fn handles_release_their_nodes() {
    let backend = std::sync::Arc::new(SoftBackend::new());
    let ctx = NoiseContext::from_shared(backend.clone(), Config::default()).unwrap();
    {
        let tree = layered_tree(&ctx).unwrap();
        assert!(tree.is_valid());
    }
    assert_eq!(backend.live_nodes(), 0);

    let bad = ctx.decode("AAAA");
    assert!(!bad.is_valid());
    assert_eq!(backend.live_nodes(), 0);
}
