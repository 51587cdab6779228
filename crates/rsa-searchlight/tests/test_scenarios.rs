// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
End-to-end searchlight scenarios:
- structured signal: two noise-free conditions give a positive score
- pure noise with random labels: mean score stays near zero
- edge clipping: corner patches have fewer rows than the full sphere
*/

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use rsa_compute::{build_data_rdm, build_model_rdm};
use rsa_config::CenterSelection;
use rsa_searchlight::{extract_patch, sphere_offsets, SearchlightEngine, SearchlightParams};
use rsa_structures::{Mask, Volume, VoxelCoordinate};

const CONDITIONS: [&str; 6] = ["face", "house", "face", "house", "face", "house"];

/// Every face observation shows pattern `p`, every house observation pattern `q`
fn two_condition_volume() -> Volume {
    let data = Array4::from_shape_fn((4, 4, 4, 6), |(x, y, z, t)| {
        if CONDITIONS[t] == "face" {
            (x + z) as f64
        } else {
            ((x + 2 * y) % 3) as f64
        }
    });
    Volume::new(data).unwrap()
}

#[test]
fn structured_conditions_score_positive() {
    let volume = two_condition_volume();
    let model = build_model_rdm(&CONDITIONS);
    let center = VoxelCoordinate::new(2, 2, 2);

    let patch = extract_patch(&volume, center, &sphere_offsets(1)).unwrap();
    let data = build_data_rdm(patch.data.view()).unwrap();
    assert_eq!(data.constant_patterns, 0);
    for i in 0..6 {
        for j in 0..6 {
            let d = data.rdm.get(i, j);
            if CONDITIONS[i] == CONDITIONS[j] {
                assert!(d.abs() < 1e-12, "within-condition ({}, {}) = {}", i, j, d);
            } else {
                assert!(d > 0.0, "across-condition ({}, {}) = {}", i, j, d);
            }
        }
    }

    let mask = Mask::from_coordinates((4, 4, 4), &[center]).unwrap();
    let engine = SearchlightEngine::new(SearchlightParams {
        radius: 1,
        ..SearchlightParams::default()
    })
    .unwrap();
    let output = engine.run(&volume, &model, Some(&mask)).unwrap();

    assert_eq!(output.summary.analyzed_voxels, 1);
    let score = output.result.get(center).unwrap();
    assert!(score > 0.9, "score = {}", score);
}

#[test]
fn random_labels_on_noise_average_to_zero() {
    let trials = 10;
    let mut means = Vec::with_capacity(trials);

    for seed in 0..trials as u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = Array4::from_shape_fn((6, 6, 6, 12), |_| rng.gen_range(-1.0..1.0));
        let volume = Volume::new(data).unwrap();

        let mut conditions: Vec<&str> = [["a"; 6], ["b"; 6]].concat();
        conditions.shuffle(&mut rng);
        let model = build_model_rdm(&conditions);

        let engine = SearchlightEngine::new(SearchlightParams {
            radius: 1,
            centers: CenterSelection::FullGrid,
            ..SearchlightParams::default()
        })
        .unwrap();
        let output = engine.run(&volume, &model, None).unwrap();
        assert_eq!(output.summary.degenerate_voxels, 0);
        means.push(output.result.statistics().unwrap().mean);
    }

    let grand_mean = means.iter().sum::<f64>() / means.len() as f64;
    assert!(grand_mean.abs() < 0.1, "grand mean = {}", grand_mean);
}

#[test]
fn corner_patch_is_smaller_than_sphere() {
    let volume = Volume::zeros((5, 5, 5), 3).unwrap();
    let offsets = sphere_offsets(2);
    assert_eq!(offsets.len(), 33);

    // Corner: only the non-negative octant survives
    let corner = extract_patch(&volume, VoxelCoordinate::new(0, 0, 0), &offsets).unwrap();
    assert_eq!(corner.data.nrows(), 11);
    assert!(corner.clipped);

    // Touching one face: only offsets with dx < 0 are lost
    let face = extract_patch(&volume, VoxelCoordinate::new(0, 2, 2), &sphere_offsets(1)).unwrap();
    assert_eq!(face.data.nrows(), 6);

    let interior = extract_patch(&volume, VoxelCoordinate::new(2, 2, 2), &offsets).unwrap();
    assert_eq!(interior.data.nrows(), 33);
    assert!(!interior.clipped);
}
