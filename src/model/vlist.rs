//! Vector lists: the kernel's evaluated drawing commands for one object.

use serde::{Deserialize, Serialize};

/// A point or direction in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// One drawing command of a vector list.
///
/// Point-carrying variants hold a model-space position; `*Start` and
/// `*VertexNormal` variants hold a normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Element {
    PointDraw(Vec3),
    PointSize(f32),
    LineMove(Vec3),
    LineDraw(Vec3),
    LineWidth(f32),
    TriangleStart(Vec3),
    TriangleMove(Vec3),
    TriangleDraw(Vec3),
    TriangleEnd(Vec3),
    TriangleVertexNormal(Vec3),
    PolygonStart(Vec3),
    PolygonMove(Vec3),
    PolygonDraw(Vec3),
    PolygonEnd(Vec3),
    PolygonVertexNormal(Vec3),
    /// Switch to display space anchored at the given model point.
    DisplaySpace(Vec3),
    /// Return from display space.
    ModelSpace,
}

/// Ordered sequence of drawing elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorList {
    elements: Vec<Element>,
}

impl VectorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // === Builders used by geometry producers ===

    /// Append a polyline through `points`.
    pub fn polyline(&mut self, points: &[Vec3]) {
        let mut iter = points.iter();
        if let Some(first) = iter.next() {
            self.push(Element::LineMove(*first));
            for p in iter {
                self.push(Element::LineDraw(*p));
            }
        }
    }

    /// Append a flat triangle with the given face normal.
    pub fn triangle(&mut self, normal: Vec3, a: Vec3, b: Vec3, c: Vec3) {
        self.push(Element::TriangleStart(normal));
        self.push(Element::TriangleMove(a));
        self.push(Element::TriangleDraw(b));
        self.push(Element::TriangleEnd(c));
    }

    /// Append a closed polygon. The first vertex is repeated by the end marker.
    pub fn polygon(&mut self, normal: Vec3, vertices: &[Vec3]) {
        let Some((first, rest)) = vertices.split_first() else {
            return;
        };
        self.push(Element::PolygonStart(normal));
        self.push(Element::PolygonMove(*first));
        for v in rest {
            self.push(Element::PolygonDraw(*v));
        }
        self.push(Element::PolygonEnd(*first));
    }
}

impl FromIterator<Element> for VectorList {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VectorList {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
