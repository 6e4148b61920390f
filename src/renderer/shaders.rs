pub mod packed_structs;

/// Binding index of the frame uniform block inside the frame bind group.
pub const FRAME_DATA_BINDING: u32 = 0;
/// Binding index of the point light storage buffer inside the frame bind group.
pub const LIGHT_BUFFER_BINDING: u32 = 1;
/// Vertex buffer slot the per-instance model matrices are bound to.
pub const INSTANCE_BUFFER_SLOT: u32 = 2;

/// A registry of bind group layouts used by this renderer.
pub struct BindGroupLayouts {
    pub per_frame_layout: wgpu::BindGroupLayout,
    pub shadow_cascade_layout: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    /// Create a new bind group layout registry.
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            per_frame_layout: device.create_bind_group_layout(&Self::per_frame_desc()),
            shadow_cascade_layout: device
                .create_bind_group_layout(&Self::shadow_cascade_desc()),
        }
    }

    /// Gets the bind group layout shared by every pass in a frame.
    ///
    /// Expected bind group inputs:
    ///  0 - `FrameData` uniform block
    ///  1 - read only array of `PackedPointLight`
    pub fn per_frame_desc() -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            label: Some("per-frame bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: FRAME_DATA_BINDING,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: LIGHT_BUFFER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        }
    }

    /// Gets the bind group layout holding the view projection matrix of a
    /// single shadow cascade, used by the depth only shadow pass.
    pub fn shadow_cascade_desc() -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow cascade bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout_binds_uniforms_then_lights() {
        let desc = BindGroupLayouts::per_frame_desc();

        assert_eq!(2, desc.entries.len());
        assert_eq!(FRAME_DATA_BINDING, desc.entries[0].binding);
        assert_eq!(LIGHT_BUFFER_BINDING, desc.entries[1].binding);
        assert!(matches!(
            desc.entries[1].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                ..
            }
        ));
    }
}
