/// How fragments written by a material are combined with the render target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    None,
    Alpha,
    Additive,
}

impl BlendMode {
    /// The wgpu blend state for this mode, or `None` when blending is off.
    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::None => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }

    /// Opaque geometry is back face culled, blended geometry is double sided.
    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        match self {
            BlendMode::None => Some(wgpu::Face::Back),
            BlendMode::Alpha | BlendMode::Additive => None,
        }
    }
}

/// Depth test applied when drawing with a material.
///
/// The renderer uses reverse-Z, so `Standard` keeps fragments that are
/// *greater or equal* to the stored depth and `Reversed` keeps fragments that
/// are farther away (used when drawing back faces of light volumes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthTestMode {
    #[default]
    Standard,
    Reversed,
    Equal,
    None,
}

impl DepthTestMode {
    /// The wgpu comparison function, or `None` when depth testing is disabled.
    pub fn compare_function(&self) -> Option<wgpu::CompareFunction> {
        match self {
            DepthTestMode::Standard => Some(wgpu::CompareFunction::GreaterEqual),
            DepthTestMode::Reversed => Some(wgpu::CompareFunction::LessEqual),
            DepthTestMode::Equal => Some(wgpu::CompareFunction::Equal),
            DepthTestMode::None => None,
        }
    }
}

/// Opaque identifier of a texture owned by the GPU resource provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Describes the shader program a material binds. Program compilation is
/// handled outside the renderer; this only records the sources and defines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramDesc {
    pub fragment: String,
    pub vertex: String,
    pub defines: Vec<String>,
}

impl ProgramDesc {
    pub fn new(fragment: &str, vertex: &str) -> Self {
        Self {
            fragment: fragment.to_string(),
            vertex: vertex.to_string(),
            defines: Vec::new(),
        }
    }
}

/// A GPU program plus its bound textures and fixed function state.
///
/// Two materials only batch together when they are the same material in the
/// resource arena, never because their values happen to be equal.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    program: ProgramDesc,
    textures: Vec<(u32, TextureId)>,
    blend_mode: BlendMode,
    depth_test_mode: DepthTestMode,
    depth_writing: bool,
}

impl Material {
    /// A material with only a program set.
    pub fn material(program: ProgramDesc, defines: &[&str]) -> Self {
        MaterialBuilder::new(program).defines(defines).build()
    }

    /// A material whose program samples an albedo texture.
    pub fn textured_material(program: ProgramDesc, defines: &[&str]) -> Self {
        MaterialBuilder::new(program)
            .define("TEXTURED")
            .defines(defines)
            .build()
    }

    /// A material whose program samples albedo and normal map textures.
    pub fn textured_normal_mapped_material(program: ProgramDesc, defines: &[&str]) -> Self {
        MaterialBuilder::new(program)
            .define("TEXTURED")
            .define("NORMAL_MAPPED")
            .defines(defines)
            .build()
    }

    pub fn set_program(&mut self, program: ProgramDesc) {
        self.program = program;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn set_depth_test_mode(&mut self, depth_test_mode: DepthTestMode) {
        self.depth_test_mode = depth_test_mode;
    }

    pub fn set_depth_writing(&mut self, enabled: bool) {
        self.depth_writing = enabled;
    }

    /// Bind `texture` to `slot`, replacing any texture already in that slot.
    pub fn set_texture(&mut self, slot: u32, texture: TextureId) {
        match self.textures.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = texture,
            None => self.textures.push((slot, texture)),
        }
    }

    pub fn program(&self) -> &ProgramDesc {
        &self.program
    }

    /// Bound textures as `(slot, texture)` pairs in the order they were added.
    pub fn textures(&self) -> &[(u32, TextureId)] {
        &self.textures
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn depth_test_mode(&self) -> DepthTestMode {
        self.depth_test_mode
    }

    pub fn depth_writing(&self) -> bool {
        self.depth_writing
    }

    /// The depth stencil state a pipeline drawing this material should use.
    pub fn depth_stencil_state(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_writing,
            depth_compare: self
                .depth_test_mode
                .compare_function()
                .unwrap_or(wgpu::CompareFunction::Always),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// A fluent builder for creating Materials without having to specify every
/// optional property.
#[derive(Debug)]
pub struct MaterialBuilder {
    program: ProgramDesc,
    textures: Vec<(u32, TextureId)>,
    blend_mode: Option<BlendMode>,
    depth_test_mode: Option<DepthTestMode>,
    depth_writing: Option<bool>,
}

impl MaterialBuilder {
    pub const DEFAULT_BLEND_MODE: BlendMode = BlendMode::None;
    pub const DEFAULT_DEPTH_TEST_MODE: DepthTestMode = DepthTestMode::Standard;
    pub const DEFAULT_DEPTH_WRITING: bool = true;

    /// Create a new material builder.
    pub fn new(program: ProgramDesc) -> Self {
        Self {
            program,
            textures: Vec::new(),
            blend_mode: None,
            depth_test_mode: None,
            depth_writing: None,
        }
    }

    /// Append a preprocessor define to the material's program.
    pub fn define(mut self, define: &str) -> Self {
        self.program.defines.push(define.to_string());
        self
    }

    /// Append several preprocessor defines to the material's program.
    pub fn defines(mut self, defines: &[&str]) -> Self {
        self.program
            .defines
            .extend(defines.iter().map(|d| d.to_string()));
        self
    }

    pub fn texture(mut self, slot: u32, texture: TextureId) -> Self {
        self.textures.retain(|(s, _)| *s != slot);
        self.textures.push((slot, texture));
        self
    }

    pub fn blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = Some(blend_mode);
        self
    }

    pub fn depth_test_mode(mut self, depth_test_mode: DepthTestMode) -> Self {
        self.depth_test_mode = Some(depth_test_mode);
        self
    }

    pub fn depth_writing(mut self, enabled: bool) -> Self {
        self.depth_writing = Some(enabled);
        self
    }

    /// Use the properties of this material builder to construct a new material.
    pub fn build(self) -> Material {
        Material {
            program: self.program,
            textures: self.textures,
            blend_mode: self.blend_mode.unwrap_or(Self::DEFAULT_BLEND_MODE),
            depth_test_mode: self
                .depth_test_mode
                .unwrap_or(Self::DEFAULT_DEPTH_TEST_MODE),
            depth_writing: self.depth_writing.unwrap_or(Self::DEFAULT_DEPTH_WRITING),
        }
    }
}
