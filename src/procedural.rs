//! CPU evaluation of the planet surface pattern drawn by the
//! `planet-texture` shader, used by the headless baker.

use glam::{IVec3, Vec3};

use crate::mesh::CubeFace;

fn hash3(cell: IVec3) -> f32 {
    let mut h = (cell.x as u32).wrapping_mul(0x8da6_b343)
        ^ (cell.y as u32).wrapping_mul(0xd816_3841)
        ^ (cell.z as u32).wrapping_mul(0xcb1a_b31f);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    (h & 0x00ff_ffff) as f32 / 16_777_215.0
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn value_noise(p: Vec3) -> f32 {
    let base = p.floor();
    let cell = base.as_ivec3();
    let f = p - base;
    let w = f * f * (Vec3::splat(3.0) - 2.0 * f);

    let corner = |x, y, z| hash3(cell + IVec3::new(x, y, z));
    let x00 = mix(corner(0, 0, 0), corner(1, 0, 0), w.x);
    let x10 = mix(corner(0, 1, 0), corner(1, 1, 0), w.x);
    let x01 = mix(corner(0, 0, 1), corner(1, 0, 1), w.x);
    let x11 = mix(corner(0, 1, 1), corner(1, 1, 1), w.x);
    mix(mix(x00, x10, w.y), mix(x01, x11, w.y), w.z)
}

pub fn fbm(p: Vec3, octaves: u32) -> f32 {
    let mut sum = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    let mut norm = 0.0;
    for _ in 0..octaves {
        sum += value_noise(p * frequency) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    sum / norm
}

/// Terrain elevation in `[0, 1]` for a direction on the unit sphere.
pub fn terrain_height(direction: Vec3) -> f32 {
    let warp = Vec3::new(
        value_noise(direction * 1.7 + Vec3::new(11.3, 0.0, 0.0)),
        value_noise(direction * 1.7 + Vec3::new(0.0, 27.1, 0.0)),
        value_noise(direction * 1.7 + Vec3::new(0.0, 0.0, 41.9)),
    );
    fbm(direction * 2.5 + warp * 0.6, 6)
}

pub fn surface_color(h: f32) -> Vec3 {
    const SEA: f32 = 0.5;
    if h < SEA {
        return Vec3::new(0.02, 0.05, 0.20).lerp(Vec3::new(0.10, 0.30, 0.55), h / SEA);
    }
    let land = (h - SEA) / (1.0 - SEA);
    if land < 0.08 {
        Vec3::new(0.76, 0.70, 0.50)
    } else if land < 0.45 {
        Vec3::new(0.20, 0.45, 0.15).lerp(Vec3::new(0.35, 0.40, 0.20), (land - 0.08) / 0.37)
    } else if land < 0.75 {
        Vec3::new(0.40, 0.36, 0.30).lerp(Vec3::new(0.55, 0.52, 0.50), (land - 0.45) / 0.30)
    } else {
        Vec3::new(0.95, 0.95, 0.97)
    }
}

/// RGBA8 texel for face coordinates `(s, t)`, `t` growing upward.
pub fn face_texel(face: CubeFace, s: f32, t: f32) -> [u8; 4] {
    let direction = face.point(s, t).normalize();
    let color = surface_color(terrain_height(direction));
    let [r, g, b] = color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    [r, g, b, 255]
}
