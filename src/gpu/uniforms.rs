//! CPU-side uniform staging.
//!
//! Each program stages its uniform struct in a byte block sized from
//! reflection and uploads the whole block when a bound member changes.
//! Writes against an unbound slot (`None`) return `false` and leave the
//! block untouched — the silent-skip contract that lets one setter interface
//! serve shader variants implementing any subset of the uniforms.

use glam::{Mat4, Vec4};

use super::reflect::UniformSlot;

/// Round `span` up to a 16-byte boundary, with a 16-byte floor so programs
/// without uniforms still get a valid (if unused) buffer.
fn padded_len(span: u32) -> usize {
    ((span.max(16) as usize) + 15) & !15
}

/// Staging block mirroring a program's uniform struct byte-for-byte.
pub(crate) struct UniformBlock {
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub(crate) fn new(span: u32) -> Self {
        Self {
            bytes: vec![0; padded_len(span)],
        }
    }

    /// The staged bytes, ready for `queue.write_buffer`.
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy `data` into the slot. Returns `false` (leaving the block
    /// untouched) when the slot is unbound or its reflected size does not
    /// match the payload.
    pub(crate) fn write(
        &mut self,
        slot: Option<UniformSlot>,
        data: &[u8],
    ) -> bool {
        let Some(slot) = slot else { return false };
        if slot.size as usize != data.len() {
            return false;
        }
        let start = slot.offset as usize;
        let Some(dst) = self.bytes.get_mut(start..start + data.len()) else {
            return false;
        };
        dst.copy_from_slice(data);
        true
    }

    pub(crate) fn write_f32(
        &mut self,
        slot: Option<UniformSlot>,
        value: f32,
    ) -> bool {
        self.write(slot, &value.to_le_bytes())
    }

    pub(crate) fn write_u32(
        &mut self,
        slot: Option<UniformSlot>,
        value: u32,
    ) -> bool {
        self.write(slot, &value.to_le_bytes())
    }

    pub(crate) fn write_vec4(
        &mut self,
        slot: Option<UniformSlot>,
        value: Vec4,
    ) -> bool {
        self.write(slot, bytemuck::cast_slice(&value.to_array()))
    }

    pub(crate) fn write_mat4(
        &mut self,
        slot: Option<UniformSlot>,
        value: &Mat4,
    ) -> bool {
        self.write(slot, bytemuck::cast_slice(&value.to_cols_array()))
    }
}

/// Matrix applied to normals so they stay perpendicular under non-uniform
/// scale: the inverse of the transposed model matrix.
pub(crate) fn normal_matrix(model: &Mat4) -> Mat4 {
    model.transpose().inverse()
}
