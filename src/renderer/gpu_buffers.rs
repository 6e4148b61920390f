use std::{cell::Cell, ops::Range};

use super::{
    frame::FramePacket,
    instancing::InstanceRawData,
    shaders::{
        packed_structs::{FrameData, PackedPointLight},
        FRAME_DATA_BINDING, INSTANCE_BUFFER_SLOT, LIGHT_BUFFER_BINDING,
    },
};

/// Trait for objects that represent a GPU buffer that can be updated from the
/// CPU.
pub trait DynamicGpuBuffer {
    /// Copy data stored in this buffer to the GPU.
    ///
    /// Updating the GPU will also clear the dirty flag on this buffer.
    fn update_gpu(&self, queue: &wgpu::Queue);

    /// Check if this buffer has values that have not yet been copied to the GPU.
    fn is_dirty(&self) -> bool;
}

/// A utility struct that simplifies mapping a Rust struct of uniform values to
/// a wgpu uniform value accessible via shader.
///
/// Once created a program can update the values stored in the buffer by calling
/// `values_mut()`, and then calling `update_gpu()` to ensure the new values are
/// copied to the GPU.
#[derive(Debug)]
pub struct GenericUniformBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    /// The values stored in this uniform buffer.
    values: T,
    /// The GPU buffer storing a copy of this uniform buffer's values.
    gpu_buffer: wgpu::Buffer,
    /// True if `values` is potentially out of sync with the GPU buffer and
    /// should be sent to the GPU during the next update phase.
    is_dirty: Cell<bool>,
}

impl<T> GenericUniformBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    /// Create a new generic uniform buffer.
    ///
    /// `device`: The wgpu device owning this uniform buffer.
    /// `label`: Optional name representing this uniform buffer.
    /// `values`: Initial values to store in this uniform buffer.
    pub fn new(device: &wgpu::Device, label: Option<&str>, values: T) -> Self {
        let gpu_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::bytes_of(&values),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        Self {
            values,
            gpu_buffer,
            is_dirty: Cell::new(false),
        }
    }

    /// Access the values stored in this uniform buffer.
    pub fn values(&self) -> &T {
        &self.values
    }

    /// Access the values stored in this uniform buffer with a mutable ref.
    ///
    /// Calling this method will set the buffer's dirty flag even if no values
    /// are changed.
    pub fn values_mut(&mut self) -> &mut T {
        self.is_dirty.set(true);
        &mut self.values
    }

    pub fn gpu_buffer(&self) -> &wgpu::Buffer {
        &self.gpu_buffer
    }
}

impl<T> DynamicGpuBuffer for GenericUniformBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    fn update_gpu(&self, queue: &wgpu::Queue) {
        self.is_dirty.set(false);
        queue.write_buffer(&self.gpu_buffer, 0, bytemuck::bytes_of(&self.values));
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }
}

/// Number of elements to allocate so that `len` elements fit and the buffer is
/// never empty.
fn element_capacity(len: usize) -> usize {
    len.max(1).next_power_of_two()
}

/// A growable array of `T` stored in a GPU buffer.
///
/// The GPU buffer always holds room for at least one element so it can be
/// bound even when there are no values. When more values are written than
/// fit, a larger buffer is created and `generation()` changes so that bind
/// groups referencing the old buffer can be rebuilt.
#[derive(Debug)]
pub struct ArrayBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    label: Option<String>,
    usage: wgpu::BufferUsages,
    values: Vec<T>,
    capacity: usize,
    gpu_buffer: wgpu::Buffer,
    generation: u32,
    is_dirty: Cell<bool>,
}

impl<T> ArrayBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    fn new(device: &wgpu::Device, label: Option<&str>, usage: wgpu::BufferUsages) -> Self {
        let capacity = element_capacity(0);

        Self {
            label: label.map(str::to_string),
            usage,
            values: Vec::new(),
            capacity,
            gpu_buffer: Self::create_gpu_buffer(device, label, usage, capacity),
            generation: 0,
            is_dirty: Cell::new(false),
        }
    }

    fn create_gpu_buffer(
        device: &wgpu::Device,
        label: Option<&str>,
        usage: wgpu::BufferUsages,
        capacity: usize,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size: (capacity * std::mem::size_of::<T>()) as wgpu::BufferAddress,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Replace the buffer's values, growing the GPU buffer if needed.
    pub fn set_values(&mut self, device: &wgpu::Device, values: &[T]) {
        if values.len() > self.capacity {
            self.capacity = element_capacity(values.len());
            self.gpu_buffer =
                Self::create_gpu_buffer(device, self.label.as_deref(), self.usage, self.capacity);
            self.generation = self.generation.wrapping_add(1);
        }

        self.values.clear();
        self.values.extend_from_slice(values);
        self.is_dirty.set(true);
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes every time the underlying GPU buffer is recreated.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn gpu_buffer(&self) -> &wgpu::Buffer {
        &self.gpu_buffer
    }
}

impl<T> DynamicGpuBuffer for ArrayBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    fn update_gpu(&self, queue: &wgpu::Queue) {
        self.is_dirty.set(false);
        if !self.values.is_empty() {
            queue.write_buffer(&self.gpu_buffer, 0, bytemuck::cast_slice(&self.values));
        }
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }
}

/// Read only storage buffer, such as the packed light list.
pub type StorageBuffer<T> = ArrayBuffer<T>;

/// Per-instance vertex data. Every batch of a frame shares one buffer and
/// draws from its own range.
pub type InstanceBuffer<T> = ArrayBuffer<T>;

impl<T> ArrayBuffer<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    pub fn new_storage(device: &wgpu::Device, label: Option<&str>) -> Self {
        Self::new(device, label, wgpu::BufferUsages::STORAGE)
    }

    pub fn new_instances(device: &wgpu::Device, label: Option<&str>) -> Self {
        Self::new(device, label, wgpu::BufferUsages::VERTEX)
    }

    /// Byte range of the elements `range` for binding a slice of the buffer.
    pub fn byte_range(range: &Range<u32>) -> Range<wgpu::BufferAddress> {
        let stride = std::mem::size_of::<T>() as wgpu::BufferAddress;
        (range.start as wgpu::BufferAddress * stride)..(range.end as wgpu::BufferAddress * stride)
    }
}

/// Lay every batch's instances out back to back, returning the combined list
/// and the instance range of each batch.
pub fn pack_instances<'a, I>(batches: I) -> (Vec<InstanceRawData>, Vec<Range<u32>>)
where
    I: IntoIterator<Item = &'a [InstanceRawData]>,
{
    let mut packed = Vec::new();
    let mut ranges = Vec::new();

    for instances in batches {
        let start = packed.len() as u32;
        packed.extend_from_slice(instances);
        ranges.push(start..packed.len() as u32);
    }

    (packed, ranges)
}

/// Where every instanced draw of a frame finds its instances inside the shared
/// instance buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceLayout {
    /// One range per visible batch, in draw order.
    pub batches: Vec<Range<u32>>,
    /// One range per shadow caster batch, in draw order.
    pub shadow_batches: Vec<Range<u32>>,
    pub light_volumes: Range<u32>,
}

impl InstanceLayout {
    /// Pack the instances of every draw in `packet` into one list: visible
    /// batches first, then shadow casters, then light volumes.
    pub fn pack(packet: &FramePacket) -> (Vec<InstanceRawData>, Self) {
        let draws = packet
            .batches
            .iter()
            .map(|b| b.transforms.as_slice())
            .chain(packet.shadow_batches.iter().map(|b| b.transforms.as_slice()))
            .chain(std::iter::once(packet.light_volumes.as_slice()));

        let (instances, mut ranges) = pack_instances(draws);
        let light_volumes = ranges.pop().unwrap_or(0..0);
        let shadow_batches = ranges.split_off(packet.batches.len());

        (
            instances,
            Self {
                batches: ranges,
                shadow_batches,
                light_volumes,
            },
        )
    }
}

/// GPU copies of a frame packet: the frame uniforms (slot 0), the light buffer
/// (slot 1) and the instances of every instanced draw.
pub struct FrameBindings {
    frame: GenericUniformBuffer<FrameData>,
    lights: StorageBuffer<PackedPointLight>,
    instances: InstanceBuffer<InstanceRawData>,
    instance_layout: InstanceLayout,
    bind_group: wgpu::BindGroup,
    bound_light_generation: u32,
}

impl FrameBindings {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let frame = GenericUniformBuffer::new(device, Some("frame uniforms"), FrameData::default());
        let lights = StorageBuffer::new_storage(device, Some("point lights"));
        let instances = InstanceBuffer::new_instances(device, Some("frame instances"));
        let bind_group = Self::create_bind_group(device, layout, &frame, &lights);
        let bound_light_generation = lights.generation();

        Self {
            frame,
            lights,
            instances,
            instance_layout: Default::default(),
            bind_group,
            bound_light_generation,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        frame: &GenericUniformBuffer<FrameData>,
        lights: &StorageBuffer<PackedPointLight>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("per-frame bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: FRAME_DATA_BINDING,
                    resource: frame.gpu_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: LIGHT_BUFFER_BINDING,
                    resource: lights.gpu_buffer().as_entire_binding(),
                },
            ],
        })
    }

    /// Copy `packet` into the GPU buffers.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        packet: &FramePacket,
    ) {
        *self.frame.values_mut() = packet.frame_data;
        self.lights.set_values(device, &packet.lights);

        let (instances, instance_layout) = InstanceLayout::pack(packet);
        self.instances.set_values(device, &instances);
        self.instance_layout = instance_layout;

        if self.bound_light_generation != self.lights.generation() {
            self.bind_group = Self::create_bind_group(device, layout, &self.frame, &self.lights);
            self.bound_light_generation = self.lights.generation();
        }

        let buffers: [&dyn DynamicGpuBuffer; 3] = [&self.frame, &self.lights, &self.instances];
        for buffer in buffers {
            if buffer.is_dirty() {
                buffer.update_gpu(queue);
            }
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Instance ranges of the last uploaded packet.
    pub fn instance_layout(&self) -> &InstanceLayout {
        &self.instance_layout
    }

    /// Bind the instances in `range` to the instance vertex buffer slot of
    /// `pass`. An empty range binds nothing.
    pub fn set_instances<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, range: &Range<u32>) {
        if range.is_empty() {
            return;
        }

        pass.set_vertex_buffer(
            INSTANCE_BUFFER_SLOT,
            self.instances
                .gpu_buffer()
                .slice(InstanceBuffer::<InstanceRawData>::byte_range(range)),
        );
    }
}
