// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Property tests for spherical neighborhoods and boundary clipping:
- the sphere holds exactly the offsets with dx² + dy² + dz² <= r²
- it is symmetric about the origin and always contains it
- clipping never invents voxels and never drops in-bounds ones
*/

use proptest::prelude::*;
use rsa_searchlight::{apply_offset, sphere_offsets, NeighborhoodBuilder};
use rsa_structures::VoxelCoordinate;

proptest! {
    #[test]
    fn sphere_matches_integer_distance(radius in 0u32..7) {
        let n = sphere_offsets(radius);
        let r = radius as i32;
        let mut expected = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    if dx * dx + dy * dy + dz * dz <= r * r {
                        expected.push((dx, dy, dz));
                    }
                }
            }
        }
        prop_assert_eq!(n.offsets(), expected.as_slice());
    }

    #[test]
    fn sphere_is_symmetric_with_origin(radius in 0u32..7) {
        let n = sphere_offsets(radius);
        prop_assert!(n.contains((0, 0, 0)));
        for &(dx, dy, dz) in n.iter() {
            prop_assert!(n.contains((-dx, -dy, -dz)));
        }
    }

    #[test]
    fn builder_returns_same_offsets(radius in 0u32..7) {
        let builder = NeighborhoodBuilder::new();
        prop_assert_eq!(&*builder.build(radius), &sphere_offsets(radius));
    }

    #[test]
    fn offsets_only_land_in_bounds(
        shape in (1usize..6, 1usize..6, 1usize..6),
        center in (0usize..6, 0usize..6, 0usize..6),
        radius in 0u32..4,
    ) {
        let center = VoxelCoordinate::new(
            center.0 % shape.0,
            center.1 % shape.1,
            center.2 % shape.2,
        );
        for &offset in sphere_offsets(radius).iter() {
            let x = center.x as i64 + offset.0 as i64;
            let y = center.y as i64 + offset.1 as i64;
            let z = center.z as i64 + offset.2 as i64;
            let inside = x >= 0 && y >= 0 && z >= 0
                && (x as usize) < shape.0 && (y as usize) < shape.1 && (z as usize) < shape.2;
            match apply_offset(center, offset, shape) {
                Some(v) => {
                    prop_assert!(inside);
                    prop_assert_eq!(v, VoxelCoordinate::new(x as usize, y as usize, z as usize));
                }
                None => prop_assert!(!inside),
            }
        }
    }
}
