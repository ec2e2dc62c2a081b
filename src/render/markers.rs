//! Projection of node positions into screen-space markers, and SVG output

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use glam::{Mat4, Vec2};

use crate::edge::Edge;
use crate::node::Node;

/// Marker appearance for one flag value
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLook {
    /// Radius in pixels
    pub radius: f32,
    /// CSS color
    pub color: String,
}

/// Maps node flags to marker looks
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    /// Look for flag 0 and any flag without its own entry
    pub default: MarkerLook,
    /// Look for nodes with a non-zero flag
    pub highlighted: MarkerLook,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            default: MarkerLook {
                radius: 2.0,
                color: "#6ea8fe".to_string(),
            },
            highlighted: MarkerLook {
                radius: 4.0,
                color: "#ff6b6b".to_string(),
            },
        }
    }
}

impl MarkerStyle {
    /// Look for a node flag
    pub fn look(&self, flag: i32) -> &MarkerLook {
        if flag == 0 {
            &self.default
        } else {
            &self.highlighted
        }
    }
}

/// A projected node ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Node index
    pub node: usize,
    /// Pixel coordinates (origin top-left)
    pub screen: Vec2,
    /// NDC depth, used for back-to-front ordering
    pub depth: f32,
    pub radius: f32,
    pub color: String,
}

/// Project every visible node through `view_proj` onto a `viewport`-sized
/// raster. Nodes behind the camera or outside the clip volume are dropped.
/// Markers come back sorted far to near.
pub fn project_markers(
    nodes: &[Node],
    view_proj: Mat4,
    viewport: Vec2,
    style: &MarkerStyle,
) -> Vec<Marker> {
    let mut markers: Vec<Marker> = nodes
        .iter()
        .enumerate()
        .filter_map(|(id, node)| {
            let screen = to_screen(node, view_proj, viewport)?;
            let look = style.look(node.flag);
            Some(Marker {
                node: id,
                screen: screen.0,
                depth: screen.1,
                radius: look.radius,
                color: look.color.clone(),
            })
        })
        .collect();

    markers.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    markers
}

fn to_screen(node: &Node, view_proj: Mat4, viewport: Vec2) -> Option<(Vec2, f32)> {
    let clip = view_proj * node.position.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
        return None;
    }
    let screen = Vec2::new((ndc.x + 1.0) * 0.5 * viewport.x, (1.0 - ndc.y) * 0.5 * viewport.y);
    Some((screen, ndc.z))
}

/// Render markers (and optionally the edges between visible nodes) as an SVG
/// document
pub fn markers_to_svg(markers: &[Marker], edges: &[Edge], viewport: Vec2) -> String {
    let mut svg = String::new();
    let (w, h) = (viewport.x, viewport.y);
    let _ = write!(svg, r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}""#);
    let _ = writeln!(svg, r#" viewBox="0 0 {w} {h}">"#);
    let _ = writeln!(
        svg,
        r##"<rect width="100%" height="100%" fill="#1a1a2e"/>"##
    );

    let mut by_node = HashMap::with_capacity(markers.len());
    for marker in markers {
        by_node.insert(marker.node, marker.screen);
    }
    let mut drawn = HashSet::with_capacity(edges.len());
    for edge in edges {
        // Undirected graphs carry both directions; draw each pair once
        if !drawn.insert((edge.n0.min(edge.n1), edge.n0.max(edge.n1))) {
            continue;
        }
        let endpoints = (
            by_node.get(&(edge.n0 as usize)),
            by_node.get(&(edge.n1 as usize)),
        );
        if let (Some(a), Some(b)) = endpoints {
            let _ = write!(
                svg,
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}""#,
                a.x, a.y, b.x, b.y
            );
            let _ = writeln!(svg, r##" stroke="#44475a" stroke-width="0.5"/>"##);
        }
    }

    for marker in markers {
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}"/>"#,
            marker.screen.x, marker.screen.y, marker.radius, marker.color
        );
    }
    svg.push_str("</svg>\n");
    svg
}
