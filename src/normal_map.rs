//! Conversion of grayscale height buffers into tangent-space normal maps.

use glam::Vec3;

use crate::error::FxError;

/// Intensity used when callers have no preference.
pub const DEFAULT_INTENSITY: f32 = 1.0;

/// Raw RGBA pixels read back from a baked face. Rows are stored bottom to top,
/// the order GL-style readback produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl HeightBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FxError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(FxError::HeightBufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Mean of the RGB channels in `[0, 1]` scaled by `intensity`. Coordinates
    /// past the last column or row reuse the boundary pixel.
    pub fn sample(&self, x: u32, y: u32, intensity: f32) -> f32 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let offset = (y * self.width as usize + x) * 4;
        let rgb = &self.data[offset..offset + 3];
        (rgb[0] as f32 / 255.0 + rgb[1] as f32 / 255.0 + rgb[2] as f32 / 255.0) / 3.0 * intensity
    }
}

/// Packed RGB normal map; each texel is `(n / 2 + 0.5) * 255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalMap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl NormalMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decoded direction stored at pixel index `index`.
    pub fn normal_at(&self, index: usize) -> Vec3 {
        let texel = &self.data[index * 3..index * 3 + 3];
        Vec3::new(
            (texel[0] as f32 / 255.0 - 0.5) * 2.0,
            (texel[1] as f32 / 255.0 - 0.5) * 2.0,
            (texel[2] as f32 / 255.0 - 0.5) * 2.0,
        )
    }

    /// Expands to RGBA8 with opaque alpha for upload as a GPU texture.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .flat_map(|texel| [texel[0], texel[1], texel[2], 255])
            .collect()
    }
}

/// Derives per-pixel surface normals from the local height gradient.
///
/// Pixel `i` samples row `height - i / width`: the inversion matches the
/// bottom-up row order of the buffer and must be kept or lighting flips.
pub fn height_to_normal_map(map: &HeightBuffer, intensity: f32) -> NormalMap {
    let width = map.width;
    let height = map.height;
    let len = width as usize * height as usize;
    let mut data = vec![0u8; len * 3];

    for i in 0..len {
        let x = (i % width as usize) as u32;
        let y = height - (i / width as usize) as u32;

        let pixel00 = Vec3::new(0.0, 0.0, map.sample(x, y, intensity));
        let pixel01 = Vec3::new(0.0, 1.0, map.sample(x, y + 1, intensity));
        let pixel10 = Vec3::new(1.0, 0.0, map.sample(x + 1, y, intensity));
        let normal = (pixel10 - pixel00).cross(pixel01 - pixel00).normalize();

        data[i * 3] = pack(normal.x);
        data[i * 3 + 1] = pack(normal.y);
        data[i * 3 + 2] = pack(normal.z);
    }

    NormalMap {
        width,
        height,
        data,
    }
}

fn pack(component: f32) -> u8 {
    ((component / 2.0 + 0.5) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32, step: u8) -> HeightBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _y in 0..height {
            for x in 0..width {
                let value = (x as u8).saturating_mul(step);
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }
        HeightBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn flat_buffer_points_straight_up() {
        let map = HeightBuffer::new(4, 4, vec![90; 64]).unwrap();
        let normals = height_to_normal_map(&map, DEFAULT_INTENSITY);
        for texel in normals.as_bytes().chunks_exact(3) {
            assert_eq!(texel, &[127, 127, 255]);
        }
    }

    #[test]
    fn packed_normals_are_unit_length() {
        let mut data = Vec::new();
        for i in 0..(16 * 16) {
            let value = ((i * 37) % 251) as u8;
            data.extend_from_slice(&[value, value / 2, 255 - value, 255]);
        }
        let map = HeightBuffer::new(16, 16, data).unwrap();
        let normals = height_to_normal_map(&map, 2.0);
        for index in 0..(16 * 16) {
            let length = normals.normal_at(index).length();
            assert!((length - 1.0).abs() < 0.02, "pixel {index}: {length}");
        }
    }

    #[test]
    fn conversion_is_deterministic() {
        let map = ramp(32, 8, 7);
        let first = height_to_normal_map(&map, 1.5);
        let second = height_to_normal_map(&map, 1.5);
        assert_eq!(first, second);
    }

    #[test]
    fn last_column_reuses_boundary_sample() {
        let map = ramp(8, 4, 30);
        assert_eq!(map.sample(8, 2, 1.0), map.sample(7, 2, 1.0));
        assert_eq!(map.sample(3, 4, 1.0), map.sample(3, 3, 1.0));

        let normals = height_to_normal_map(&map, 1.0);
        // Interior pixels tilt against the rising slope.
        assert!(normals.as_bytes()[0] < 127);
        // The clamped column sees no slope at all.
        let last = 7 * 3;
        assert_eq!(&normals.as_bytes()[last..last + 3], &[127, 127, 255]);
    }

    #[test]
    fn rows_are_sampled_bottom_up() {
        // Only the top stored row is raised; with the inverted walk, output
        // row 1 samples stored rows 3 and 4 (clamped to 3) and stays flat,
        // while output row 2 sees the step between stored rows 2 and 3.
        let (width, height) = (2u32, 4u32);
        let mut data = vec![0u8; (width * height * 4) as usize];
        for x in 0..width as usize {
            let offset = (3 * width as usize + x) * 4;
            data[offset..offset + 3].copy_from_slice(&[255, 255, 255]);
        }
        let map = HeightBuffer::new(width, height, data).unwrap();
        let normals = height_to_normal_map(&map, 1.0);
        let row = |r: usize| &normals.as_bytes()[r * 6..r * 6 + 3];
        assert_eq!(row(1), &[127, 127, 255]);
        assert!(row(2)[1] < 127);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let err = HeightBuffer::new(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(
            err,
            FxError::HeightBufferSize {
                expected: 64,
                actual: 10,
                ..
            }
        ));
    }

    #[test]
    fn rgba_expansion_adds_opaque_alpha() {
        let map = HeightBuffer::new(1, 1, vec![0, 0, 0, 0]).unwrap();
        let normals = height_to_normal_map(&map, 1.0);
        assert_eq!(normals.to_rgba(), vec![127, 127, 255, 255]);
    }
}
