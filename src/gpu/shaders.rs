//! WGSL compute shaders for the two force passes
//!
//! Both passes read `nodes_in` and write `nodes_out`; the host binds the two
//! node buffers in opposite order for each pass. One invocation per node.

/// Common type definitions and bindings shared by both shaders
pub const TYPES: &str = r#"
struct Node {
    position: vec3<f32>,
    flag: i32,
    velocity: vec3<f32>,
    density: f32,
    edge_start: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct Edge {
    n0: u32,
    n1: u32,
}

struct Params {
    node_count: u32,
    edge_count: u32,
    repulsion: f32,
    edge_attraction: f32,
    repulsion_scale: f32,
    center_strength: f32,
    spring_constant: f32,
    repulsion_epsilon: f32,
    attraction_epsilon: f32,
    attraction_gate: f32,
    stability_bound: f32,
    _padding: f32,
}

@group(0) @binding(0) var<storage, read> nodes_in: array<Node>;
@group(0) @binding(1) var<storage, read_write> nodes_out: array<Node>;
@group(0) @binding(2) var<storage, read> edges: array<Edge>;
@group(0) @binding(3) var<uniform> params: Params;
"#;

/// Repulsion from every other node plus the centering pull, then the
/// stability clamp (a bound <= 0 disables it)
pub const REPULSION: &str = r#"
@compute @workgroup_size(128)
fn repulsion(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let id = global_id.x;
    if (id >= params.node_count) {
        return;
    }

    let node = nodes_in[id];
    let k2 = params.repulsion * params.repulsion;
    var force = vec3<f32>(0.0, 0.0, 0.0);

    for (var j = 0u; j < params.node_count; j++) {
        if (j == id) {
            continue;
        }
        let d = nodes_in[j].position - node.position;
        let dist_sq = dot(d, d);
        if (dist_sq < params.repulsion_epsilon) {
            continue;
        }
        force -= normalize(d) * (params.repulsion_scale * k2 / dist_sq);
    }

    let len = length(node.position);
    if (len > 0.0) {
        force -= node.position / len * len * params.center_strength;
    }

    var candidate = node.position + force;
    if (params.stability_bound > 0.0 && length(candidate) > params.stability_bound) {
        candidate = normalize(candidate);
    }

    var result = node;
    result.position = candidate;
    nodes_out[id] = result;
}
"#;

/// Mean spring force over the node's run of edges, applied only below the gate.
///
/// The host validates adjacency before upload; the bounds checks here only
/// stop the walk.
pub const ATTRACTION: &str = r#"
@compute @workgroup_size(128)
fn attraction(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let id = global_id.x;
    if (id >= params.node_count) {
        return;
    }

    let node = nodes_in[id];
    var result = node;

    if (node.edge_start != 0u) {
        let stiffness = params.spring_constant * params.edge_attraction;
        var force = vec3<f32>(0.0, 0.0, 0.0);
        var visited = 0u;
        var e = node.edge_start - 1u;

        loop {
            if (e >= params.edge_count) {
                break;
            }
            let edge = edges[e];
            if (edge.n0 != id) {
                break;
            }
            if (edge.n1 < params.node_count) {
                let d = node.position - nodes_in[edge.n1].position;
                let dist = length(d);
                if (dist >= params.attraction_epsilon) {
                    force -= d / dist * dist * stiffness;
                }
            }
            visited += 1u;
            e += 1u;
        }

        if (visited > 0u) {
            force /= f32(visited);
            if (length(force) < params.attraction_gate) {
                result.position = node.position + force;
            }
        }
    }

    nodes_out[id] = result;
}
"#;

/// Shader sources for pipeline creation
pub struct PassShaders {
    pub repulsion: String,
    pub attraction: String,
}

impl PassShaders {
    pub fn new() -> Self {
        Self {
            repulsion: format!("{}\n{}", TYPES, REPULSION),
            attraction: format!("{}\n{}", TYPES, ATTRACTION),
        }
    }
}

impl Default for PassShaders {
    fn default() -> Self {
        Self::new()
    }
}
