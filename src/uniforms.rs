use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

/// Tagged uniform value, mirroring the shader-side declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3(Vec3),
    Color(Vec3),
}

impl UniformValue {
    pub fn type_tag(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "f",
            UniformValue::Int(_) => "i",
            UniformValue::Vec3(_) => "v3",
            UniformValue::Color(_) => "c",
        }
    }

    fn write_slot(&self, slot: &mut [u8]) {
        match *self {
            UniformValue::Float(value) => slot[..4].copy_from_slice(&value.to_le_bytes()),
            UniformValue::Int(value) => slot[..4].copy_from_slice(&value.to_le_bytes()),
            UniformValue::Vec3(value) | UniformValue::Color(value) => {
                slot[..12].copy_from_slice(bytemuck::cast_slice(&value.to_array()))
            }
        }
    }
}

/// Ordered set of named uniforms.
///
/// On the GPU every entry occupies one 16-byte slot in declaration order, so a
/// WGSL struct declaring each field as a `vec4` (reading `.x` for scalars)
/// matches [`UniformBlock::to_bytes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBlock {
    entries: Vec<(String, UniformValue)>,
}

impl UniformBlock {
    pub const SLOT_SIZE: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: UniformValue) -> Self {
        self.set(name, value);
        self
    }

    /// Replaces the value of an existing entry or appends a new one.
    pub fn set(&mut self, name: &str, value: UniformValue) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.entries.len() * Self::SLOT_SIZE];
        for (slot, (_, value)) in bytes
            .chunks_exact_mut(Self::SLOT_SIZE)
            .zip(self.entries.iter())
        {
            value.write_slot(slot);
        }
        bytes
    }
}

/// Shared handle to one uniform block.
///
/// Every clone refers to the same block: a write through any handle is seen
/// by all objects rendering with it.
#[derive(Debug, Clone, Default)]
pub struct SharedUniforms {
    inner: Arc<RwLock<UniformBlock>>,
}

impl SharedUniforms {
    pub fn new(block: UniformBlock) -> Self {
        Self {
            inner: Arc::new(RwLock::new(block)),
        }
    }

    pub fn set(&self, name: &str, value: UniformValue) {
        self.inner.write().set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.inner.read().get(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.inner.read().float(name)
    }

    pub fn snapshot(&self) -> UniformBlock {
        self.inner.read().clone()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.read().to_bytes()
    }

    pub fn ptr_eq(&self, other: &SharedUniforms) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_each_others_writes() {
        let sphere = SharedUniforms::new(UniformBlock::new().with("time", UniformValue::Float(0.0)));
        let halo = sphere.clone();
        sphere.set("time", UniformValue::Float(16.0));
        assert_eq!(halo.float("time"), Some(16.0));
        assert!(sphere.ptr_eq(&halo));
    }

    #[test]
    fn set_keeps_declaration_order() {
        let mut block = UniformBlock::new()
            .with("a", UniformValue::Float(1.0))
            .with("b", UniformValue::Int(2));
        block.set("a", UniformValue::Float(3.0));
        assert_eq!(block.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(block.get("b").map(|v| v.type_tag()), Some("i"));
    }

    #[test]
    fn bytes_use_one_slot_per_entry() {
        let block = UniformBlock::new()
            .with("radius", UniformValue::Float(1.5))
            .with("position", UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)));
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &3.0f32.to_le_bytes());
    }
}
