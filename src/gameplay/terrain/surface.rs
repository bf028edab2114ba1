use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

use super::stream::TerrainSegment;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainSurface {
    pub vertices: Vec<Vec2>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub boundary: Vec<Vec2>,
}

impl TerrainSurface {
    pub fn from_segments<'a>(
        segments: impl ExactSizeIterator<Item = &'a TerrainSegment>,
        uv_scale: f32,
    ) -> Self {
        let count = segments.len();
        if count < 2 {
            return Self::default();
        }

        let mut surface = Self {
            vertices: Vec::with_capacity(count * 2),
            uvs: Vec::with_capacity(count * 2),
            indices: Vec::with_capacity((count - 1) * 6),
            boundary: Vec::with_capacity(count),
        };

        for (index, segment) in segments.enumerate() {
            surface.vertices.push(segment.top);
            surface.vertices.push(segment.bottom);
            surface.uvs.push(segment.top * uv_scale);
            surface.uvs.push(segment.bottom * uv_scale);
            surface.boundary.push(segment.top);

            if index + 1 < count {
                let base = (index * 2) as u32;
                // top-left, bottom-left, top-right / bottom-left, bottom-right, top-right
                surface
                    .indices
                    .extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
            }
        }

        surface
    }

    pub fn is_empty(&self) -> bool {
        self.boundary.len() < 2
    }

    #[cfg(test)]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn to_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self
            .vertices
            .iter()
            .map(|vertex| [vertex.x, vertex.y, 0.0])
            .collect();
        let normals = vec![[0.0, 0.0, 1.0]; positions.len()];
        let uvs: Vec<[f32; 2]> = self.uvs.iter().map(|uv| [uv.x, uv.y]).collect();

        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}
