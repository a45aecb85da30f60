//! Geometry binders: output-only views over the node array
//!
//! A binder references nodes exactly like a goal does but never takes part
//! in the solve. It turns the current node positions into [`Geometry`] for
//! whoever displays the result.

use crate::simulation::states::{Node, NVec3};

/// Display geometry produced from node positions
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(NVec3),
    Line(NVec3, NVec3),
    Polyline { vertices: Vec<NVec3>, closed: bool },
}

#[derive(Debug, Clone)]
pub struct BinderData {
    pub node_indices: Vec<usize>,
    pub starting_positions: Vec<NVec3>,
    pub show: bool, // hidden binders are skipped by `Solver::geometries`
}

impl BinderData {
    pub fn new(starting_positions: Vec<NVec3>) -> Self {
        Self {
            node_indices: Vec::with_capacity(starting_positions.len()),
            starting_positions,
            show: true,
        }
    }

    pub fn node_count(&self) -> usize {
        self.starting_positions.len()
    }

    pub fn position(&self, nodes: &[Node], slot: usize) -> NVec3 {
        let index = self.node_indices[slot];
        debug_assert!(index < nodes.len(), "stale node index {index}");
        nodes[index].position
    }
}

/// Trait for output-only geometry producers
pub trait GeometryBinder: Send + Sync {
    fn data(&self) -> &BinderData;

    fn data_mut(&mut self) -> &mut BinderData;

    fn node_count(&self) -> usize {
        self.data().node_count()
    }

    fn show(&self) -> bool {
        self.data().show
    }

    fn create_geometry(&self, nodes: &[Node]) -> Vec<Geometry>;
}

/// One point per node
#[derive(Debug, Clone)]
pub struct PointBinder {
    data: BinderData,
}

impl PointBinder {
    pub fn new(positions: Vec<NVec3>) -> Self {
        Self { data: BinderData::new(positions) }
    }
}

impl GeometryBinder for PointBinder {
    fn data(&self) -> &BinderData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut BinderData {
        &mut self.data
    }

    fn create_geometry(&self, nodes: &[Node]) -> Vec<Geometry> {
        (0..self.data.node_count())
            .map(|i| Geometry::Point(self.data.position(nodes, i)))
            .collect()
    }
}

/// A straight segment between two nodes
#[derive(Debug, Clone)]
pub struct LineBinder {
    data: BinderData,
}

impl LineBinder {
    pub fn new(start: NVec3, end: NVec3) -> Self {
        Self { data: BinderData::new(vec![start, end]) }
    }
}

impl GeometryBinder for LineBinder {
    fn data(&self) -> &BinderData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut BinderData {
        &mut self.data
    }

    fn create_geometry(&self, nodes: &[Node]) -> Vec<Geometry> {
        vec![Geometry::Line(
            self.data.position(nodes, 0),
            self.data.position(nodes, 1),
        )]
    }
}

/// A polyline through its nodes, optionally closed
#[derive(Debug, Clone)]
pub struct PolylineBinder {
    data: BinderData,
    pub closed: bool,
}

impl PolylineBinder {
    pub fn new(vertices: Vec<NVec3>, closed: bool) -> Self {
        Self { data: BinderData::new(vertices), closed }
    }
}

impl GeometryBinder for PolylineBinder {
    fn data(&self) -> &BinderData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut BinderData {
        &mut self.data
    }

    fn create_geometry(&self, nodes: &[Node]) -> Vec<Geometry> {
        let vertices = (0..self.data.node_count())
            .map(|i| self.data.position(nodes, i))
            .collect();
        vec![Geometry::Polyline { vertices, closed: self.closed }]
    }
}
