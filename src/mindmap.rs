//! Mindmap layouts of a [`DocumentAnalysis`].
//!
//! Two layouts share one output type:
//!
//! - [`layout_mindmap`]: the radial map. The centre node sits in the middle
//!   of a canvas that grows with the document, one node per top-level heading
//!   ("section") on a ring around it, and the focused section's subheadings
//!   fanned out around it.
//! - [`layout_flowchart`]: the fixed-canvas concept map. Headings on a ring
//!   starting at 3 o'clock, every subheading shown, and a keyword cluster
//!   below the root.
//!
//! Only geometry is computed here; drawing is left to the caller.

use crate::output::DocumentAnalysis;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const BASE_WIDTH: f64 = 1600.0;
pub const BASE_HEIGHT: f64 = 1200.0;

/// Extra height per section when nothing is focused.
const HEIGHT_PER_SECTION: f64 = 50.0;
const MIN_FOCUS_EXTRA_WIDTH: f64 = 600.0;
const WIDTH_PER_SUBHEADING: f64 = 100.0;
const HEIGHT_PER_SUBHEADING: f64 = 80.0;

const RING_FRACTION: f64 = 0.3;
const MIN_RING_RADIUS: f64 = 400.0;
const SUBHEADING_DISTANCE: f64 = 220.0;
const SUBHEADING_SPREAD: f64 = PI / 6.0;

const SECTION_RADIUS: (f64, f64) = (35.0, 0.8);
const SUBHEADING_RADIUS: (f64, f64) = (28.0, 0.6);

pub const CENTER_ID: &str = "center";
pub const CENTER_LABEL: &str = "Analysis";

// ── Concept-map constants ────────────────────────────────────────────────────

pub const FLOWCHART_WIDTH: f64 = 1000.0;
pub const FLOWCHART_HEIGHT: f64 = 800.0;
const FLOWCHART_ROOT: (f64, f64) = (500.0, 350.0);
const FLOWCHART_RING: f64 = 250.0;
const FLOWCHART_SUB_DISTANCE: f64 = 120.0;
const FLOWCHART_SUB_STEP_DEG: f64 = 30.0;

const KEYWORD_HUB: (f64, f64) = (500.0, 550.0);
const KEYWORD_RING: f64 = 80.0;
/// Keywords beyond this many are left off the concept map.
pub const MAX_KEYWORD_NODES: usize = 8;

/// Node radii by depth: root, heading or keyword hub, leaf.
const FLOWCHART_RADII: [f64; 3] = [60.0, 50.0, 40.0];

pub const FLOWCHART_ROOT_ID: &str = "root";
pub const FLOWCHART_ROOT_LABEL: &str = "Document Analysis";
pub const KEYWORD_HUB_ID: &str = "keywords";
pub const KEYWORD_HUB_LABEL: &str = "Keywords";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Center,
    Section,
    Subheading,
    /// Parent of the keyword nodes on the concept map.
    KeywordGroup,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapNode {
    /// `center`, `section-{i}`, `sub-{i}-{j}` on the radial map;
    /// `root`, `heading-{i}`, `subheading-{i}-{j}`, `keywords`, `keyword-{k}`
    /// on the concept map.
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
    /// Direction from the parent node, in radians.
    pub angle: f64,
    pub radius: f64,
    /// Subheadings are only shown under the focused section.
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindmapEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapLayout {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<MindmapNode>,
    /// Edges between visible nodes only.
    pub edges: Vec<MindmapEdge>,
}

impl MindmapLayout {
    pub fn node(&self, id: &str) -> Option<&MindmapNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Lay out `analysis`, optionally with section `focus` (0-based) expanded.
///
/// An out-of-range `focus` is treated as no focus.
pub fn layout_mindmap(analysis: &DocumentAnalysis, focus: Option<usize>) -> MindmapLayout {
    let sections = &analysis.headings;
    let focus = focus.filter(|&i| i < sections.len());

    let (width, height) = match focus {
        Some(i) => {
            let n = sections[i].subheadings.len() as f64;
            (
                BASE_WIDTH + MIN_FOCUS_EXTRA_WIDTH.max(n * WIDTH_PER_SUBHEADING),
                BASE_HEIGHT.max(BASE_HEIGHT + n * HEIGHT_PER_SUBHEADING),
            )
        }
        None => (
            BASE_WIDTH,
            BASE_HEIGHT + sections.len() as f64 * HEIGHT_PER_SECTION,
        ),
    };

    let (cx, cy) = (width / 2.0, height / 2.0);
    let ring = (width.min(height) * RING_FRACTION).max(MIN_RING_RADIUS);

    let mut nodes = vec![MindmapNode {
        id: CENTER_ID.to_string(),
        kind: NodeKind::Center,
        label: CENTER_LABEL.to_string(),
        x: cx,
        y: cy,
        angle: 0.0,
        radius: node_radius(CENTER_LABEL, SECTION_RADIUS),
        visible: true,
    }];
    let mut edges = Vec::new();

    let count = sections.len() as f64;
    for (i, section) in sections.iter().enumerate() {
        let angle = (i as f64 * 2.0 * PI) / count - PI / 2.0;
        let (x, y) = (cx + angle.cos() * ring, cy + angle.sin() * ring);
        let section_id = format!("section-{i}");
        nodes.push(MindmapNode {
            id: section_id.clone(),
            kind: NodeKind::Section,
            label: section.title.clone(),
            x,
            y,
            angle,
            radius: node_radius(&section.title, SECTION_RADIUS),
            visible: true,
        });
        edges.push(MindmapEdge {
            from: CENTER_ID.to_string(),
            to: section_id.clone(),
        });

        let visible = focus == Some(i);
        let m = section.subheadings.len() as f64;
        for (j, sub) in section.subheadings.iter().enumerate() {
            let sub_angle = angle + (j as f64 - (m - 1.0) / 2.0) * SUBHEADING_SPREAD;
            let sub_id = format!("sub-{i}-{j}");
            nodes.push(MindmapNode {
                id: sub_id.clone(),
                kind: NodeKind::Subheading,
                label: sub.title.clone(),
                x: x + sub_angle.cos() * SUBHEADING_DISTANCE,
                y: y + sub_angle.sin() * SUBHEADING_DISTANCE,
                angle: sub_angle,
                radius: node_radius(&sub.title, SUBHEADING_RADIUS),
                visible,
            });
            if visible {
                edges.push(MindmapEdge {
                    from: section_id.clone(),
                    to: sub_id,
                });
            }
        }
    }

    MindmapLayout {
        width,
        height,
        nodes,
        edges,
    }
}

fn node_radius(text: &str, (base, factor): (f64, f64)) -> f64 {
    base.max(base + text.chars().count() as f64 * factor)
}

/// Lay out `analysis` as a concept map on a fixed 1000 × 800 canvas.
///
/// Heading `i` of `N` sits 250 from the root at `360·i/N` degrees, clockwise
/// from 3 o'clock. Subheading `j` of `m` sits 120 from its heading at
/// `(j − m/2)·30` degrees off the heading's angle. Up to
/// [`MAX_KEYWORD_NODES`] keywords ring a hub below the root. Every node is
/// visible.
pub fn layout_flowchart(analysis: &DocumentAnalysis) -> MindmapLayout {
    let (rx, ry) = FLOWCHART_ROOT;
    let mut nodes = vec![MindmapNode {
        id: FLOWCHART_ROOT_ID.to_string(),
        kind: NodeKind::Center,
        label: FLOWCHART_ROOT_LABEL.to_string(),
        x: rx,
        y: ry,
        angle: 0.0,
        radius: FLOWCHART_RADII[0],
        visible: true,
    }];
    let mut edges = Vec::new();

    let count = analysis.headings.len() as f64;
    for (i, heading) in analysis.headings.iter().enumerate() {
        let degrees = i as f64 * 360.0 / count;
        let angle = degrees.to_radians();
        let (x, y) = (
            rx + FLOWCHART_RING * angle.cos(),
            ry + FLOWCHART_RING * angle.sin(),
        );
        let heading_id = format!("heading-{i}");
        nodes.push(MindmapNode {
            id: heading_id.clone(),
            kind: NodeKind::Section,
            label: label_or(&heading.title, || format!("Heading {}", i + 1)),
            x,
            y,
            angle,
            radius: FLOWCHART_RADII[1],
            visible: true,
        });
        edges.push(MindmapEdge {
            from: FLOWCHART_ROOT_ID.to_string(),
            to: heading_id.clone(),
        });

        let m = heading.subheadings.len() as f64;
        for (j, sub) in heading.subheadings.iter().enumerate() {
            let sub_angle =
                (degrees + (j as f64 - m / 2.0) * FLOWCHART_SUB_STEP_DEG).to_radians();
            let sub_id = format!("subheading-{i}-{j}");
            nodes.push(MindmapNode {
                id: sub_id.clone(),
                kind: NodeKind::Subheading,
                label: label_or(&sub.title, || format!("Subheading {}", j + 1)),
                x: x + FLOWCHART_SUB_DISTANCE * sub_angle.cos(),
                y: y + FLOWCHART_SUB_DISTANCE * sub_angle.sin(),
                angle: sub_angle,
                radius: FLOWCHART_RADII[2],
                visible: true,
            });
            edges.push(MindmapEdge {
                from: heading_id.clone(),
                to: sub_id,
            });
        }
    }

    if !analysis.keywords.is_empty() {
        let (hx, hy) = KEYWORD_HUB;
        nodes.push(MindmapNode {
            id: KEYWORD_HUB_ID.to_string(),
            kind: NodeKind::KeywordGroup,
            label: KEYWORD_HUB_LABEL.to_string(),
            x: hx,
            y: hy,
            angle: (hy - ry).atan2(hx - rx),
            radius: FLOWCHART_RADII[1],
            visible: true,
        });
        edges.push(MindmapEdge {
            from: FLOWCHART_ROOT_ID.to_string(),
            to: KEYWORD_HUB_ID.to_string(),
        });

        let shown = analysis.keywords.len().min(MAX_KEYWORD_NODES);
        for (k, keyword) in analysis.keywords.iter().take(shown).enumerate() {
            let angle = (k as f64 * 360.0 / shown as f64).to_radians();
            let keyword_id = format!("keyword-{k}");
            nodes.push(MindmapNode {
                id: keyword_id.clone(),
                kind: NodeKind::Keyword,
                label: keyword.clone(),
                x: hx + KEYWORD_RING * angle.cos(),
                y: hy + KEYWORD_RING * angle.sin(),
                angle,
                radius: FLOWCHART_RADII[2],
                visible: true,
            });
            edges.push(MindmapEdge {
                from: KEYWORD_HUB_ID.to_string(),
                to: keyword_id,
            });
        }
    }

    MindmapLayout {
        width: FLOWCHART_WIDTH,
        height: FLOWCHART_HEIGHT,
        nodes,
        edges,
    }
}

fn label_or(title: &str, fallback: impl FnOnce() -> String) -> String {
    if title.trim().is_empty() {
        fallback()
    } else {
        title.to_string()
    }
}
