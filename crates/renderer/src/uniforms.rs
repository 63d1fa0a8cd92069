//! Named uniforms the viewer feeds to every shader program.
//!
//! Programs declare these as plain `uniform` globals; the compiler gathers
//! them into one std140 block and [`UniformTable`] records where each one
//! landed. [`UniformBlock`] is the CPU copy of that block.

use std::fmt;

/// The fixed set of uniforms every program must declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Resolution,
    CameraPosition,
    CameraRotation,
    Time,
    BlendStrength,
}

impl Uniform {
    pub const ALL: [Uniform; 5] = [
        Uniform::Resolution,
        Uniform::CameraPosition,
        Uniform::CameraRotation,
        Uniform::Time,
        Uniform::BlendStrength,
    ];

    /// Identifier as written in GLSL.
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Resolution => "u_resolution",
            Uniform::CameraPosition => "u_camera_position",
            Uniform::CameraRotation => "u_camera_rotation",
            Uniform::Time => "u_time",
            Uniform::BlendStrength => "u_blend_strength",
        }
    }

    /// Number of `float` components (`1` for `float`, `2` for `vec2`, ...).
    pub fn components(self) -> u32 {
        match self {
            Uniform::Resolution | Uniform::CameraRotation => 2,
            Uniform::CameraPosition => 3,
            Uniform::Time | Uniform::BlendStrength => 1,
        }
    }

    fn index(self) -> usize {
        match self {
            Uniform::Resolution => 0,
            Uniform::CameraPosition => 1,
            Uniform::CameraRotation => 2,
            Uniform::Time => 3,
            Uniform::BlendStrength => 4,
        }
    }
}

impl fmt::Display for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

impl UniformValue {
    pub fn as_slice(&self) -> &[f32] {
        match self {
            UniformValue::Float(value) => std::slice::from_ref(value),
            UniformValue::Vec2(values) => values,
            UniformValue::Vec3(values) => values,
        }
    }
}

/// Byte offset and width of one uniform inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub components: u32,
}

impl UniformSlot {
    pub fn size(&self) -> u32 {
        self.components * std::mem::size_of::<f32>() as u32
    }
}

/// Resolved locations for every [`Uniform`] in a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformTable {
    slots: [UniformSlot; 5],
    block_size: u32,
}

impl UniformTable {
    pub(crate) fn new(slots: [UniformSlot; 5], block_size: u32) -> Self {
        Self { slots, block_size }
    }

    pub fn slot(&self, uniform: Uniform) -> UniformSlot {
        self.slots[uniform.index()]
    }

    /// Size of the block in bytes, padded to 16 for uniform buffer binding.
    pub fn block_size(&self) -> u32 {
        self.block_size.max(16).next_multiple_of(16)
    }
}

/// CPU mirror of the uniform block.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(table: &UniformTable) -> Self {
        Self {
            bytes: vec![0; table.block_size() as usize],
        }
    }

    /// Writes `values` into `slot`, truncated to the slot width. Returns the
    /// bytes that changed so callers can forward exactly that range.
    pub fn write(&mut self, slot: UniformSlot, values: &[f32]) -> &[u8] {
        let count = values.len().min(slot.components as usize);
        let data: &[u8] = bytemuck::cast_slice(&values[..count]);
        let start = slot.offset as usize;
        let end = start + data.len();
        self.bytes[start..end].copy_from_slice(data);
        &self.bytes[start..end]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(block: &UniformBlock, slot: UniformSlot) -> Vec<f32> {
        let start = slot.offset as usize;
        let end = start + slot.size() as usize;
        block.as_bytes()[start..end]
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn table() -> UniformTable {
        UniformTable::new(
            [
                UniformSlot { offset: 0, components: 2 },
                UniformSlot { offset: 16, components: 3 },
                UniformSlot { offset: 32, components: 2 },
                UniformSlot { offset: 40, components: 1 },
                UniformSlot { offset: 44, components: 1 },
            ],
            48,
        )
    }

    #[test]
    fn slots_follow_uniform_order() {
        let table = table();
        assert_eq!(table.slot(Uniform::CameraPosition).offset, 16);
        assert_eq!(table.slot(Uniform::BlendStrength).offset, 44);
        assert_eq!(table.block_size(), 48);
    }

    #[test]
    fn writing_one_slot_leaves_neighbours_alone() {
        let table = table();
        let mut block = UniformBlock::new(&table);
        block.write(table.slot(Uniform::Time), &[1.5]);
        block.write(table.slot(Uniform::BlendStrength), &[2.0]);
        block.write(table.slot(Uniform::Resolution), &[800.0, 600.0]);

        assert_eq!(read(&block, table.slot(Uniform::Time)), vec![1.5]);
        assert_eq!(read(&block, table.slot(Uniform::BlendStrength)), vec![2.0]);
        assert_eq!(read(&block, table.slot(Uniform::Resolution)), vec![800.0, 600.0]);
        assert_eq!(read(&block, table.slot(Uniform::CameraRotation)), vec![0.0, 0.0]);
    }

    #[test]
    fn write_returns_the_changed_bytes() {
        let table = table();
        let mut block = UniformBlock::new(&table);
        let written = block.write(table.slot(Uniform::CameraPosition), &[1.0, 2.0, 3.0]);
        assert_eq!(written.len(), 12);
        assert_eq!(written, bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn oversized_values_are_truncated_to_the_slot() {
        let table = table();
        let mut block = UniformBlock::new(&table);
        block.write(table.slot(Uniform::Time), &[3.0, 99.0]);
        assert_eq!(read(&block, table.slot(Uniform::Time)), vec![3.0]);
        assert_eq!(read(&block, table.slot(Uniform::BlendStrength)), vec![0.0]);
    }

    #[test]
    fn block_size_is_padded_to_sixteen_bytes() {
        let table = UniformTable::new([UniformSlot { offset: 0, components: 1 }; 5], 4);
        assert_eq!(table.block_size(), 16);
    }

    #[test]
    fn value_slices_match_component_counts() {
        assert_eq!(UniformValue::Float(1.0).as_slice().len(), 1);
        assert_eq!(UniformValue::Vec2([1.0, 2.0]).as_slice().len(), 2);
        assert_eq!(UniformValue::Vec3([1.0, 2.0, 3.0]).as_slice(), &[1.0, 2.0, 3.0]);
    }
}
