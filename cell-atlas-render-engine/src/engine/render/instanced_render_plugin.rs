use crate::engine::assets::surface_textures::CellSurfaceTextures;
use crate::engine::render::CellRenderState;
use crate::engine::scene::cell_batches::CellBatchSide;
use bevy::{
    core_pipeline::core_3d::Transparent3d,
    ecs::system::{SystemParamItem, lifetimeless::*},
    pbr::{
        MeshPipeline, MeshPipelineKey, RenderMeshInstances, SetMeshBindGroup, SetMeshViewBindGroup,
    },
    prelude::*,
    render::{
        Render, RenderApp, RenderSet,
        extract_component::{ExtractComponent, ExtractComponentPlugin},
        extract_resource::ExtractResourcePlugin,
        mesh::{
            MeshVertexBufferLayoutRef, RenderMesh, RenderMeshBufferInfo, allocator::MeshAllocator,
        },
        render_asset::RenderAssets,
        render_phase::{
            AddRenderCommand, DrawFunctions, PhaseItem, PhaseItemExtraIndex, RenderCommand,
            RenderCommandResult, SetItemPipeline, TrackedRenderPass, ViewSortedRenderPhases,
        },
        render_resource::*,
        renderer::RenderDevice,
        sync_world::MainEntity,
        texture::GpuImage,
        view::ExtractedView,
    },
};
use bytemuck::{Pod, Zeroable};

const CELL_INSTANCE_SHADER_PATH: &str = "shaders/cell_instances.wgsl";

pub struct CellInstancedRenderPlugin;

impl Plugin for CellInstancedRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ExtractComponentPlugin::<CellInstanceData>::default())
            .add_plugins(ExtractComponentPlugin::<CellBatchSide>::default())
            .add_plugins(ExtractResourcePlugin::<CellRenderState>::default())
            .add_plugins(ExtractResourcePlugin::<CellSurfaceTextures>::default());

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .add_render_command::<Transparent3d, DrawCellBatches>()
            .init_resource::<SpecializedMeshPipelines<CellInstancePipeline>>()
            .init_resource::<PreparedCellBindGroups>()
            .add_systems(
                Render,
                (
                    prepare_cell_bind_groups.in_set(RenderSet::PrepareBindGroups),
                    queue_cell_batches.in_set(RenderSet::QueueMeshes),
                    prepare_cell_instance_buffers.in_set(RenderSet::PrepareResources),
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        render_app.init_resource::<CellInstancePipeline>();
    }
}

/// Per-cell GPU record: world position, uniform scale, straight RGBA colour
/// with the batch opacity in the alpha channel.
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
#[repr(C)]
pub struct CellInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub colour: [f32; 4],
}

#[derive(Component, Deref, Clone, ExtractComponent)]
pub struct CellInstanceData(pub Vec<CellInstance>);

#[derive(Component)]
pub struct CellInstanceBuffer {
    pub buffer: Buffer,
    pub length: usize,
}

#[derive(Resource)]
struct CellInstancePipeline {
    shader: Handle<Shader>,
    mesh_pipeline: MeshPipeline,
    material_bind_group_layout: BindGroupLayout,
}

impl FromWorld for CellInstancePipeline {
    fn from_world(world: &mut World) -> Self {
        let mesh_pipeline = world.resource::<MeshPipeline>();
        let render_device = world.resource::<RenderDevice>();

        Self {
            shader: world.load_asset(CELL_INSTANCE_SHADER_PATH),
            mesh_pipeline: mesh_pipeline.clone(),
            material_bind_group_layout: create_cell_material_bind_group_layout(render_device),
        }
    }
}

impl SpecializedMeshPipeline for CellInstancePipeline {
    type Key = (MeshPipelineKey, CellBatchSide);

    fn specialize(
        &self,
        (key, side): Self::Key,
        layout: &MeshVertexBufferLayoutRef,
    ) -> Result<RenderPipelineDescriptor, SpecializedMeshPipelineError> {
        let mut descriptor = self.mesh_pipeline.specialize(key, layout)?;
        descriptor.label = Some("cell_instance_pipeline".into());
        descriptor.vertex.shader = self.shader.clone();
        descriptor.vertex.buffers.push(VertexBufferLayout {
            array_stride: std::mem::size_of::<CellInstance>() as u64,
            step_mode: VertexStepMode::Instance,
            attributes: vec![
                // Position + uniform scale
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 3,
                },
                // Colour with batch opacity in alpha
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 16,
                    shader_location: 4,
                },
            ],
        });

        descriptor.fragment.as_mut().unwrap().shader = self.shader.clone();

        // The translucent pass shows front faces, the opaque inner pass the
        // back faces of the same spheres.
        descriptor.primitive.cull_mode = Some(match side {
            CellBatchSide::Front => Face::Back,
            CellBatchSide::Back => Face::Front,
        });

        descriptor
            .layout
            .push(self.material_bind_group_layout.clone());

        Ok(descriptor)
    }
}

#[derive(Resource, Default)]
struct PreparedCellBindGroups {
    material_bind_group: Option<BindGroup>,
}

fn prepare_cell_instance_buffers(
    mut commands: Commands,
    query: Query<(Entity, &CellInstanceData)>,
    render_device: Res<RenderDevice>,
) {
    for (entity, instance_data) in &query {
        let buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("cell_instance_buffer"),
            contents: bytemuck::cast_slice(instance_data.as_slice()),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        });
        commands.entity(entity).insert(CellInstanceBuffer {
            buffer,
            length: instance_data.len(),
        });
    }
}

fn prepare_cell_bind_groups(
    mut bind_groups: ResMut<PreparedCellBindGroups>,
    render_device: Res<RenderDevice>,
    gpu_images: Res<RenderAssets<GpuImage>>,
    textures: Option<Res<CellSurfaceTextures>>,
    pipeline: Res<CellInstancePipeline>,
    render_state: Res<CellRenderState>,
) {
    let Some(textures) = textures else {
        return;
    };
    // Fall back to the flat normal while the real map is still in flight.
    let Some(normal_gpu) = gpu_images
        .get(&textures.normal_map)
        .or_else(|| gpu_images.get(&textures.flat_fallback))
    else {
        return;
    };

    let camera_pos = render_state.camera_position;
    let camera_uniform = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("cell_camera_uniform"),
        contents: bytemuck::cast_slice(&[camera_pos.x, camera_pos.y, camera_pos.z, 0.0f32]),
        usage: BufferUsages::UNIFORM,
    });

    let material_bind_group = render_device.create_bind_group(
        "cell_instance_material_bind_group",
        &pipeline.material_bind_group_layout,
        &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&normal_gpu.texture_view),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&normal_gpu.sampler),
            },
            BindGroupEntry {
                binding: 2,
                resource: camera_uniform.as_entire_binding(),
            },
        ],
    );

    bind_groups.material_bind_group = Some(material_bind_group);
}

fn queue_cell_batches(
    transparent_3d_draw_functions: Res<DrawFunctions<Transparent3d>>,
    cell_instance_pipeline: Res<CellInstancePipeline>,
    mut pipelines: ResMut<SpecializedMeshPipelines<CellInstancePipeline>>,
    pipeline_cache: Res<PipelineCache>,
    meshes: Res<RenderAssets<RenderMesh>>,
    render_mesh_instances: Res<RenderMeshInstances>,
    cell_batches: Query<(Entity, &MainEntity, &CellBatchSide), With<CellInstanceData>>,
    mut transparent_render_phases: ResMut<ViewSortedRenderPhases<Transparent3d>>,
    views: Query<(&ExtractedView, &Msaa)>,
) {
    let draw_cell_batches = transparent_3d_draw_functions.read().id::<DrawCellBatches>();

    for (view, msaa) in &views {
        let Some(transparent_phase) = transparent_render_phases.get_mut(&view.retained_view_entity)
        else {
            continue;
        };

        let msaa_key = MeshPipelineKey::from_msaa_samples(msaa.samples());
        let view_key = msaa_key | MeshPipelineKey::from_hdr(view.hdr) | MeshPipelineKey::BLEND_ALPHA;
        let rangefinder = view.rangefinder3d();

        for (entity, main_entity, side) in &cell_batches {
            let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(*main_entity)
            else {
                continue;
            };
            let Some(mesh) = meshes.get(mesh_instance.mesh_asset_id) else {
                continue;
            };

            let key =
                view_key | MeshPipelineKey::from_primitive_topology(mesh.primitive_topology());
            let Ok(pipeline) = pipelines.specialize(
                &pipeline_cache,
                &cell_instance_pipeline,
                (key, *side),
                &mesh.layout,
            ) else {
                continue;
            };

            transparent_phase.add(Transparent3d {
                entity: (entity, *main_entity),
                pipeline,
                draw_function: draw_cell_batches,
                distance: rangefinder.distance_translation(&mesh_instance.translation),
                batch_range: 0..1,
                extra_index: PhaseItemExtraIndex::None,
                indexed: true,
            });
        }
    }
}

type DrawCellBatches = (
    SetItemPipeline,
    SetMeshViewBindGroup<0>,
    SetMeshBindGroup<1>,
    SetCellMaterialBindGroup<2>,
    DrawMeshCellInstances,
);

struct SetCellMaterialBindGroup<const I: usize>;

impl<P: PhaseItem, const I: usize> RenderCommand<P> for SetCellMaterialBindGroup<I> {
    type Param = SRes<PreparedCellBindGroups>;
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        _item: &P,
        _view: (),
        _entity: Option<()>,
        bind_groups: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let bind_groups = bind_groups.into_inner();
        if let Some(material_bind_group) = &bind_groups.material_bind_group {
            pass.set_bind_group(I, material_bind_group, &[]);
            RenderCommandResult::Success
        } else {
            RenderCommandResult::Failure("missing cell material bind group")
        }
    }
}

struct DrawMeshCellInstances;

impl<P: PhaseItem> RenderCommand<P> for DrawMeshCellInstances {
    type Param = (
        SRes<RenderAssets<RenderMesh>>,
        SRes<RenderMeshInstances>,
        SRes<MeshAllocator>,
    );
    type ViewQuery = ();
    type ItemQuery = Read<CellInstanceBuffer>;

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        instance_buffer: Option<&'w CellInstanceBuffer>,
        (meshes, render_mesh_instances, mesh_allocator): SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let mesh_allocator = mesh_allocator.into_inner();

        let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(item.main_entity())
        else {
            return RenderCommandResult::Skip;
        };
        let Some(gpu_mesh) = meshes.into_inner().get(mesh_instance.mesh_asset_id) else {
            return RenderCommandResult::Skip;
        };
        let Some(instance_buffer) = instance_buffer else {
            return RenderCommandResult::Skip;
        };
        let Some(vertex_buffer_slice) =
            mesh_allocator.mesh_vertex_slice(&mesh_instance.mesh_asset_id)
        else {
            return RenderCommandResult::Skip;
        };

        pass.set_vertex_buffer(0, vertex_buffer_slice.buffer.slice(..));
        pass.set_vertex_buffer(1, instance_buffer.buffer.slice(..));

        match &gpu_mesh.buffer_info {
            RenderMeshBufferInfo::Indexed {
                index_format,
                count,
            } => {
                let Some(index_buffer_slice) =
                    mesh_allocator.mesh_index_slice(&mesh_instance.mesh_asset_id)
                else {
                    return RenderCommandResult::Skip;
                };

                pass.set_index_buffer(index_buffer_slice.buffer.slice(..), 0, *index_format);
                pass.draw_indexed(
                    index_buffer_slice.range.start..(index_buffer_slice.range.start + count),
                    vertex_buffer_slice.range.start as i32,
                    0..instance_buffer.length as u32,
                );
            }
            RenderMeshBufferInfo::NonIndexed => {
                pass.draw(vertex_buffer_slice.range, 0..instance_buffer.length as u32);
            }
        }
        RenderCommandResult::Success
    }
}

fn create_cell_material_bind_group_layout(render_device: &RenderDevice) -> BindGroupLayout {
    render_device.create_bind_group_layout(
        "cell_instance_material_layout",
        &[
            // Surface detail normal map
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
            // Camera position for rim shading
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    )
}
