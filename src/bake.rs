//! Per-face texture baking: one colour texture and one readable height buffer
//! for each of the six cube faces.

use crate::error::FxError;
use crate::mesh::CubeFace;
use crate::normal_map::HeightBuffer;
use crate::procedural::face_texel;

/// Resolution of each baked face texture.
pub const DEFAULT_RESOLUTION: u32 = 1024;

/// Opaque reference to a colour texture kept alive by the baker that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

/// Output of one bake: the retained colour texture and its pixels read back
/// to the CPU.
#[derive(Debug, Clone)]
pub struct BakedFace {
    pub face: CubeFace,
    pub texture: TextureHandle,
    pub heights: HeightBuffer,
}

/// Renders the procedural pattern of one cube face and reads it back.
///
/// Bakes share a single rendering context and must run one after another.
#[allow(async_fn_in_trait)]
pub trait FaceBaker {
    async fn bake_face(&mut self, face: CubeFace, resolution: u32) -> Result<BakedFace, FxError>;
}

/// Bakes the six faces in cube order, stopping at the first failure.
pub async fn bake_all_faces<B: FaceBaker>(
    baker: &mut B,
    resolution: u32,
) -> Result<Vec<BakedFace>, FxError> {
    let mut faces = Vec::with_capacity(CubeFace::ALL.len());
    for face in CubeFace::ALL {
        let baked = baker.bake_face(face, resolution).await?;
        log::debug!(
            "baked face {} ({}) at {resolution}x{resolution}",
            face.index(),
            face.label()
        );
        faces.push(baked);
    }
    Ok(faces)
}

/// RGBA8 image stored top row first, like a rendered colour target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Baker that evaluates the surface pattern on the CPU. Used when no GPU is
/// available and by the headless CLI.
#[derive(Debug, Default)]
pub struct SoftwareFaceBaker {
    textures: Vec<ColorImage>,
}

impl SoftwareFaceBaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&ColorImage> {
        self.textures.get(handle.0)
    }

    fn render(face: CubeFace, resolution: u32) -> ColorImage {
        let size = resolution as usize;
        let mut data = Vec::with_capacity(size * size * 4);
        for row in 0..resolution {
            let t = 1.0 - (row as f32 + 0.5) / resolution as f32;
            for column in 0..resolution {
                let s = (column as f32 + 0.5) / resolution as f32;
                data.extend_from_slice(&face_texel(face, s, t));
            }
        }
        ColorImage {
            width: resolution,
            height: resolution,
            data,
        }
    }
}

impl FaceBaker for SoftwareFaceBaker {
    async fn bake_face(&mut self, face: CubeFace, resolution: u32) -> Result<BakedFace, FxError> {
        if resolution == 0 {
            return Err(FxError::Readback {
                face: face.index(),
                reason: "resolution must be positive".to_string(),
            });
        }
        let image = Self::render(face, resolution);
        let heights = HeightBuffer::new(resolution, resolution, flip_rows(&image.data, resolution))?;
        let texture = TextureHandle(self.textures.len());
        self.textures.push(image);
        Ok(BakedFace {
            face,
            texture,
            heights,
        })
    }
}

/// Reverses the row order of a tightly packed RGBA8 image.
pub fn flip_rows(data: &[u8], width: u32) -> Vec<u8> {
    let row = width as usize * 4;
    data.chunks_exact(row).rev().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_resolution_face_reads_back_every_pixel() {
        let mut baker = SoftwareFaceBaker::new();
        let baked = pollster::block_on(baker.bake_face(CubeFace::PosY, DEFAULT_RESOLUTION)).unwrap();
        assert_eq!(baked.heights.as_bytes().len(), 1024 * 1024 * 4);
        assert_eq!(baked.heights.width(), 1024);
        assert_eq!(baked.texture, TextureHandle(0));
    }

    #[test]
    fn heights_are_the_texture_flipped_vertically() {
        let mut baker = SoftwareFaceBaker::new();
        let baked = pollster::block_on(baker.bake_face(CubeFace::NegZ, 8)).unwrap();
        let image = baker.texture(baked.texture).unwrap();
        assert_eq!(&baked.heights.as_bytes()[..32], &image.data[7 * 32..8 * 32]);
        assert_eq!(flip_rows(baked.heights.as_bytes(), 8), image.data);
    }

    #[test]
    fn bakes_all_faces_in_order() {
        let mut baker = SoftwareFaceBaker::new();
        let faces = pollster::block_on(bake_all_faces(&mut baker, 4)).unwrap();
        let order: Vec<CubeFace> = faces.iter().map(|f| f.face).collect();
        assert_eq!(order, CubeFace::ALL.to_vec());
        assert!(faces.iter().enumerate().all(|(i, f)| f.texture == TextureHandle(i)));
    }

    #[test]
    fn zero_resolution_fails_loudly() {
        let mut baker = SoftwareFaceBaker::new();
        let err = pollster::block_on(baker.bake_face(CubeFace::PosX, 0)).unwrap_err();
        assert!(matches!(err, FxError::Readback { face: 0, .. }));
    }
}
