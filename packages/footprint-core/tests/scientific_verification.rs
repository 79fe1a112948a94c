use approx::assert_relative_eq;
use footprint_core::{
    crop_window, forward_filter, inverse_filter, kernel_impute, mirror_pad, sensor_footprint,
    FilterError, FootprintParameters, InverseConfig, Kernel, MaskedImage, Regularizer,
};
use ndarray::{Array2, Array3};

fn textured(width: usize, height: usize, channels: usize) -> Array3<f64> {
    Array3::from_shape_fn((width, height, channels), |(x, y, c)| {
        5.0 + (0.9 * x as f64).sin() + (0.4 * y as f64).cos() + c as f64
    })
}

fn sparse_mask(width: usize, height: usize) -> Array2<bool> {
    Array2::from_shape_fn((width, height), |(x, y)| (x * 7 + y * 3) % 5 == 0)
}

fn footprint_for(width: usize, height: usize) -> Kernel {
    FootprintParameters::for_image(width, height, 1.0, 1.0, 3.0, 0.01).kernel()
}

#[test]
fn test_transforms_preserve_shape() {
    for &(w, h, c) in &[(2, 2, 1), (3, 6, 1), (8, 5, 3)] {
        let kernel = footprint_for(w, h);
        let masked = MaskedImage::new(textured(w, h, c), sparse_mask(w, h)).unwrap();
        let observed = MaskedImage::fully_observed(textured(w, h, c));

        assert_eq!(forward_filter(&masked, &kernel).unwrap().dim(), (w, h, c));
        assert_eq!(kernel_impute(&masked, &kernel).unwrap().dim(), (w, h, c));
        assert_eq!(
            inverse_filter(&observed, &kernel, &InverseConfig::default()).unwrap().dim(),
            (w, h, c)
        );
    }
}

#[test]
fn test_forward_filter_preserves_mask() {
    let (w, h) = (7, 6);
    let mask = sparse_mask(w, h);
    let image = MaskedImage::new(textured(w, h, 2), mask.clone()).unwrap();
    let out = forward_filter(&image, &footprint_for(w, h)).unwrap();
    assert_eq!(out.mask(), &mask);
    for ((x, y, _), v) in out.data().indexed_iter() {
        if mask[[x, y]] {
            assert_eq!(*v, 0.0);
        }
    }
}

#[test]
fn test_imputer_is_complete_and_exact_on_observed_pixels() {
    let (w, h) = (6, 9);
    let data = textured(w, h, 2);
    let mask = sparse_mask(w, h);
    let image = MaskedImage::new(data.clone(), mask.clone()).unwrap();
    let out = kernel_impute(&image, &footprint_for(w, h)).unwrap();

    assert!(out.is_fully_observed());
    for ((x, y, c), v) in out.data().indexed_iter() {
        if !mask[[x, y]] {
            assert_eq!(*v, data[[x, y, c]]);
        } else {
            assert!(v.is_finite());
        }
    }
}

#[test]
fn test_constant_field_is_a_fixpoint() {
    let (w, h) = (6, 4);
    // Arbitrary positive, asymmetric kernel.
    let kernel = Kernel::new(Array2::from_shape_fn((2 * w - 1, 2 * h - 1), |(i, j)| {
        1.5 + (1.3 * i as f64 + 0.7 * j as f64).sin()
    }));
    let image = MaskedImage::fully_observed(Array3::from_elem((w, h, 2), 4.25));
    let out = forward_filter(&image, &kernel).unwrap();
    for v in out.data().iter() {
        assert_relative_eq!(*v, 4.25, epsilon = 1e-9);
    }
}

#[test]
fn test_footprint_is_positive_and_radially_non_increasing() {
    let params = FootprintParameters {
        half_width: 6,
        half_height: 4,
        res_x: 2.0,
        res_y: 3.0,
        height: 5.0,
        mu_air: 0.02,
    };
    let kernel = sensor_footprint(&params);
    assert_eq!(kernel.dim(), (11, 7));

    let radius = |i: usize, j: usize| {
        let dx = (i as f64 - 5.0) * params.res_x;
        let dy = (j as f64 - 3.0) * params.res_y;
        (dx * dx + dy * dy).sqrt()
    };
    let cells: Vec<(f64, f64)> = kernel
        .values()
        .indexed_iter()
        .map(|((i, j), &v)| (radius(i, j), v))
        .collect();

    let centre = kernel.values()[[5, 3]];
    for &(r1, v1) in &cells {
        assert!(v1 > 0.0);
        assert!(v1 <= centre);
        for &(r2, v2) in &cells {
            if r1 < r2 {
                assert!(v1 >= v2, "r {} -> {}, r {} -> {}", r1, v1, r2, v2);
            }
        }
    }
}

#[test]
fn test_padding_round_trip() {
    let (w, h) = (5, 3);
    let image = MaskedImage::new(textured(w, h, 2), sparse_mask(w, h)).unwrap();
    let padded = mirror_pad(&image).unwrap();
    assert_eq!(padded.dim(), (9, 5, 2));
    assert_eq!(crop_window(&padded, (0, 0), (w, h)), image);
}

#[test]
fn test_inverse_rejects_any_masked_pixel() {
    let (w, h) = (4, 4);
    let mut mask = Array2::from_elem((w, h), false);
    mask[[3, 3]] = true;
    let image = MaskedImage::new(textured(w, h, 1), mask).unwrap();
    let result = inverse_filter(&image, &footprint_for(w, h), &InverseConfig::default());
    assert_eq!(result.unwrap_err(), FilterError::PreconditionViolation { masked: 1 });
}

#[test]
fn test_scenario_constant_forward() {
    let image = MaskedImage::fully_observed(Array3::from_elem((5, 5, 1), 10.0));
    let kernel = FootprintParameters::for_image(5, 5, 1.0, 1.0, 10.0, 0.0).kernel();
    let out = forward_filter(&image, &kernel).unwrap();
    assert_eq!(out.dim(), (5, 5, 1));
    for v in out.data().iter() {
        assert_relative_eq!(*v, 10.0, epsilon = 1e-9);
    }
}

#[test]
fn test_scenario_constant_impute() {
    let mut mask = Array2::from_elem((5, 5), false);
    mask[[2, 2]] = true;
    let image = MaskedImage::new(Array3::from_elem((5, 5, 1), 10.0), mask).unwrap();
    let kernel = FootprintParameters::for_image(5, 5, 1.0, 1.0, 10.0, 0.0).kernel();
    let out = kernel_impute(&image, &kernel).unwrap();
    assert!(out.is_fully_observed());
    for v in out.data().iter() {
        assert_relative_eq!(*v, 10.0, epsilon = 1e-9);
    }
}

#[test]
fn test_inverse_regularizers_agree_on_constant_field() {
    let (w, h) = (6, 6);
    let image = MaskedImage::fully_observed(Array3::from_elem((w, h, 1), 2.0));
    let kernel = footprint_for(w, h);
    for regularizer in [Regularizer::Identity, Regularizer::Laplacian] {
        let config = InverseConfig {
            regularizer,
            ..InverseConfig::default()
        };
        let out = inverse_filter(&image, &kernel, &config).unwrap();
        for v in out.data().iter() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-6);
        }
    }
}
