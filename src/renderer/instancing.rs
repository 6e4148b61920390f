use glam::Mat4;

/// Per-instance data consumed by one instanced draw. Each instance carries
/// only its local to world transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRawData {
    pub model: [[f32; 4]; 4],
}

impl InstanceRawData {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// Get a vertex buffer layout which is used when creating `VertexState`
    /// descriptons for `RenderPipeline`.
    pub fn layout_desc() -> wgpu::VertexBufferLayout<'static> {
        // NOTE: The transform matrix is represented in the GPU buffer as 4 vec4
        // column vectors at shader locations 5 through 8.
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRawData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

impl From<Mat4> for InstanceRawData {
    fn from(value: Mat4) -> Self {
        InstanceRawData {
            model: value.to_cols_array_2d(),
        }
    }
}

impl From<&Mat4> for InstanceRawData {
    fn from(value: &Mat4) -> Self {
        (*value).into()
    }
}
