//! GPU force layout using wgpu compute shaders
//!
//! Two node buffers live on the device. Each frame dispatches the repulsion
//! pass (A -> B) and the attraction pass (B -> A) as separate compute passes
//! in one encoder; wgpu orders them with a storage barrier, so every
//! repulsion invocation finishes before any attraction invocation starts.

use std::sync::Arc;

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::shaders::PassShaders;
use super::types::PassUniforms;
use crate::buffer::{RawNode, decode_nodes, encode_nodes};
use crate::config::{RepulsionMode, SimulationConfig};
use crate::edge::{EdgeIndex, validate_adjacency};
use crate::error::{LayoutError, LayoutResult};
use crate::node::Node;

const WORKGROUP_SIZE: u32 = 128;

/// GPU-accelerated force layout
pub struct GpuLayout {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    repulsion_pipeline: wgpu::ComputePipeline,
    attraction_pipeline: wgpu::ComputePipeline,

    // Node buffers A and B
    node_buffers: [wgpu::Buffer; 2],
    // Kept alive to maintain GPU resource (referenced by bind groups)
    _edge_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,

    // [A -> B, B -> A]
    bind_groups: [wgpu::BindGroup; 2],
    // Kept alive to maintain GPU resource
    _bind_group_layout: wgpu::BindGroupLayout,

    staging_buffer: wgpu::Buffer,

    config: SimulationConfig,
    node_count: u32,
    edge_count: u32,
    frame: u64,
}

impl GpuLayout {
    /// Create a layout on the default adapter
    pub fn new(
        nodes: Vec<Node>,
        index: &EdgeIndex,
        config: SimulationConfig,
    ) -> LayoutResult<Self> {
        check_config(&config)?;
        let (device, queue) = pollster::block_on(Self::create_device())?;
        Self::with_device(Arc::new(device), Arc::new(queue), nodes, index, config)
    }

    /// Create a layout using an existing device and queue
    pub fn with_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        mut nodes: Vec<Node>,
        index: &EdgeIndex,
        config: SimulationConfig,
    ) -> LayoutResult<Self> {
        check_config(&config)?;
        index.install(&mut nodes)?;
        validate_adjacency(&nodes, index.edges())?;

        let shaders = PassShaders::new();
        let raw_nodes = encode_nodes(&nodes);
        let node_count = raw_nodes.len() as u32;
        let edge_count = index.edge_count() as u32;

        let repulsion_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Repulsion Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.repulsion.into()),
        });

        let attraction_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Attraction Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.attraction.into()),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layout Pass Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                storage_entry(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Layout Pass Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let repulsion_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Repulsion Pipeline"),
            layout: Some(&pipeline_layout),
            module: &repulsion_module,
            entry_point: Some("repulsion"),
            compilation_options: Default::default(),
            cache: None,
        });

        let attraction_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Attraction Pipeline"),
            layout: Some(&pipeline_layout),
            module: &attraction_module,
            entry_point: Some("attraction"),
            compilation_options: Default::default(),
            cache: None,
        });

        let node_buffer_size = (std::mem::size_of_val(raw_nodes.as_slice()) as u64).max(16);
        let node_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;
        let make_node_buffer = |label: &str| {
            if raw_nodes.is_empty() {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: 16,
                    usage: node_usage,
                    mapped_at_creation: false,
                })
            } else {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(&raw_nodes),
                    usage: node_usage,
                })
            }
        };
        let node_buffers = [make_node_buffer("Node Buffer A"), make_node_buffer("Node Buffer B")];

        let edge_buffer = if index.edges().is_empty() {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Edge Buffer (empty)"),
                size: 16,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Edge Buffer"),
                contents: bytemuck::cast_slice(index.edges()),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        };

        let uniforms = PassUniforms::new(&config, node_count, edge_count);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let make_bind_group = |label: &str, input: &wgpu::Buffer, output: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: input.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: output.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: edge_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [
            make_bind_group("A -> B Bind Group", &node_buffers[0], &node_buffers[1]),
            make_bind_group("B -> A Bind Group", &node_buffers[1], &node_buffers[0]),
        ];

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: node_buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        info!(nodes = node_count, edges = edge_count, "uploaded graph to GPU");

        Ok(Self {
            device,
            queue,
            repulsion_pipeline,
            attraction_pipeline,
            node_buffers,
            _edge_buffer: edge_buffer,
            uniform_buffer,
            bind_groups,
            _bind_group_layout: bind_group_layout,
            staging_buffer,
            config,
            node_count,
            edge_count,
            frame: 0,
        })
    }

    async fn create_device() -> LayoutResult<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| LayoutError::Gpu("no suitable GPU adapter".to_string()))?;

        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Force Layout Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None, // trace path
            )
            .await
            .map_err(|e| LayoutError::Gpu(e.to_string()))
    }

    /// Run one frame: repulsion (A -> B), then attraction (B -> A)
    pub fn step(&mut self) -> LayoutResult<()> {
        check_config(&self.config)?;
        let uniforms = PassUniforms::new(&self.config, self.node_count, self.edge_count);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let workgroups = self.node_count.div_ceil(WORKGROUP_SIZE).max(1);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Layout Frame Encoder"),
            });

        if self.node_count > 0 {
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Repulsion Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.repulsion_pipeline);
                pass.set_bind_group(0, &self.bind_groups[0], &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Attraction Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.attraction_pipeline);
                pass.set_bind_group(0, &self.bind_groups[1], &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.frame += 1;
        debug!(frame = self.frame, "dispatched GPU frame");
        Ok(())
    }

    /// Run `frames` frames
    pub fn run(&mut self, frames: usize) -> LayoutResult<()> {
        for _ in 0..frames {
            self.step()?;
        }
        Ok(())
    }

    /// Read back the current node buffer
    pub fn read_nodes(&self) -> LayoutResult<Vec<Node>> {
        if self.node_count == 0 {
            return Ok(Vec::new());
        }

        let size = (self.node_count as usize * std::mem::size_of::<RawNode>()) as u64;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Nodes Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.node_buffers[0], 0, &self.staging_buffer, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.staging_buffer.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| LayoutError::Gpu(e.to_string()))?
            .map_err(|e| LayoutError::Gpu(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let nodes = decode_nodes(bytemuck::cast_slice(&data));
        drop(data);
        self.staging_buffer.unmap();

        Ok(nodes)
    }

    /// Number of completed frames
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Get number of nodes
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Get number of edges
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Mutable configuration; picked up on the next frame
    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }
}

/// The shaders sum repulsion exactly and read the bound as a plain float
fn check_config(config: &SimulationConfig) -> LayoutResult<()> {
    config.validate()?;
    if let RepulsionMode::BarnesHut { .. } = config.repulsion_mode {
        return Err(LayoutError::InvalidConfig(
            "Barnes-Hut repulsion is only available on the CPU".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::simulation::Simulation;

    // Tests skip silently on machines without a usable adapter.
    fn layout(nodes: Vec<Node>, edges: &[Edge]) -> Option<GpuLayout> {
        let index = EdgeIndex::build_undirected(nodes.len(), edges.iter().copied()).ok()?;
        GpuLayout::new(nodes, &index, SimulationConfig::default()).ok()
    }

    #[test]
    fn test_rejects_cpu_only_config() {
        let config = SimulationConfig::default().with_repulsion_mode(RepulsionMode::barnes_hut());
        assert!(matches!(check_config(&config), Err(LayoutError::InvalidConfig(_))));

        let config = SimulationConfig::default().with_stability_bound(Some(0.5));
        assert!(check_config(&config).is_err());
        assert!(check_config(&SimulationConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_graph() {
        let Some(mut gpu) = layout(vec![], &[]) else {
            return;
        };
        gpu.step().unwrap();
        assert!(gpu.read_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_matches_cpu_layout() {
        let nodes = vec![
            Node::new(0.3, 0.0, 0.0),
            Node::new(-0.2, 0.1, 0.0),
            Node::new(0.0, 0.4, -0.1),
            Node::new(0.1, -0.3, 0.2),
        ];
        let edges = [Edge::new(0, 1), Edge::new(1, 2), Edge::new(0, 3)];
        let Some(mut gpu) = layout(nodes.clone(), &edges) else {
            return;
        };

        let index = EdgeIndex::build_undirected(nodes.len(), edges).unwrap();
        let mut cpu = Simulation::from_index(nodes, index, SimulationConfig::default()).unwrap();

        gpu.run(5).unwrap();
        cpu.run(5).unwrap();

        let gpu_nodes = gpu.read_nodes().unwrap();
        for (g, c) in gpu_nodes.iter().zip(cpu.nodes()) {
            assert!((g.position - c.position).length() < 1e-4);
            assert_eq!(g.first_edge, c.first_edge);
        }
    }
}
