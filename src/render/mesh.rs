use crate::core::{NULL_VALUE, TriSurface};
use crate::view::Scaler;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};
use glam::DVec3;

/// Triangle mesh of a surface in view space. Triangles touching a null node are dropped.
pub fn surface_mesh(surface: &TriSurface, scaler: &Scaler) -> Option<Mesh> {
    let usable = |k: u32| {
        surface
            .nodes
            .get(k as usize)
            .is_some_and(|n| n[2].abs() <= NULL_VALUE)
    };
    let indices: Vec<u32> = surface
        .triangles
        .iter()
        .filter(|t| t.iter().all(|&k| usable(k)))
        .flatten()
        .copied()
        .collect();
    if indices.is_empty() {
        return None;
    }

    let positions: Vec<[f32; 3]> = surface
        .nodes
        .iter()
        .map(|n| scaler.scale_point(DVec3::from_array(*n)).as_vec3().to_array())
        .collect();
    let normals = vertex_normals(&positions, &indices);

    Some(
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
            .with_inserted_indices(Indices::U32(indices)),
    )
}

/// Area-weighted average of the adjacent face normals.
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let pos = |i: u32| Vec3::from_array(positions[i as usize]);

    for tri in indices.chunks_exact(3) {
        let n = (pos(tri[1]) - pos(tri[0])).cross(pos(tri[2]) - pos(tri[0]));
        for &i in tri {
            normals[i as usize] += n;
        }
    }

    normals
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}
