//! Vector-list traversal.
//!
//! Drawing is a fold over the elements. Each [`step`] takes the cursor
//! produced by the previous element and returns the next one, so the only
//! state shared between elements is the value threaded through the fold.
//! An error stops the traversal; there is no way to resume it mid-list.

use tracing::trace;

use crate::backend::{GraphicsContext, Primitive};
use crate::error::Result;
use crate::model::{Element, MaterialClass, Matrix4, MatrixMode, RenderState, Vec3};

/// Running state of one draw pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawCursor {
    /// Primitive currently open on the context. `None` means the next
    /// geometry element starts a fresh primitive.
    pub open: Option<Primitive>,
    /// Material last applied during this pass.
    pub material: Option<MaterialClass>,
    /// Set once the pass changed line width or point size on the context.
    pub touched_attributes: bool,
    /// Inside a display-space section (matrix pushed).
    pub display_space: bool,
}

impl DrawCursor {
    /// Whether the next element is the first of a new primitive.
    pub fn is_first(&self) -> bool {
        self.open.is_none()
    }
}

/// Inputs that stay fixed for a whole pass.
#[derive(Debug, Clone, Copy)]
pub struct Pass<'a> {
    pub state: &'a RenderState,
    /// Current model-view matrix, used to anchor display-space sections.
    pub model: &'a Matrix4,
}

fn material_class(primitive: Primitive) -> MaterialClass {
    match primitive {
        Primitive::LineStrip | Primitive::Points => MaterialClass::Wire,
        Primitive::Polygon | Primitive::Triangles => MaterialClass::Surface,
    }
}

fn close<G: GraphicsContext + ?Sized>(ctx: &mut G, mut cursor: DrawCursor) -> Result<DrawCursor> {
    if cursor.open.take().is_some() {
        ctx.end_primitive()?;
    }
    Ok(cursor)
}

fn open<G: GraphicsContext + ?Sized>(
    ctx: &mut G,
    pass: &Pass<'_>,
    cursor: DrawCursor,
    primitive: Primitive,
) -> Result<DrawCursor> {
    let mut cursor = close(ctx, cursor)?;
    let class = material_class(primitive);
    if pass.state.lighting && cursor.material != Some(class) {
        ctx.set_material(&pass.state.material(class))?;
        cursor.material = Some(class);
    }
    ctx.begin_primitive(primitive)?;
    cursor.open = Some(primitive);
    Ok(cursor)
}

/// Continue the open batch of `primitive`, or start a new one.
fn batch<G: GraphicsContext + ?Sized>(
    ctx: &mut G,
    pass: &Pass<'_>,
    cursor: DrawCursor,
    primitive: Primitive,
) -> Result<DrawCursor> {
    if cursor.open == Some(primitive) {
        Ok(cursor)
    } else {
        open(ctx, pass, cursor, primitive)
    }
}

fn vertex<G: GraphicsContext + ?Sized>(ctx: &mut G, cursor: DrawCursor, p: Vec3) -> Result<DrawCursor> {
    if cursor.is_first() {
        trace!("Dropping vertex outside of a primitive");
    } else {
        ctx.vertex(p)?;
    }
    Ok(cursor)
}

fn normal<G: GraphicsContext + ?Sized>(ctx: &mut G, cursor: DrawCursor, n: Vec3) -> Result<DrawCursor> {
    if !cursor.is_first() {
        ctx.normal(n)?;
    }
    Ok(cursor)
}

/// Apply one element, returning the cursor for the next.
pub fn step<G: GraphicsContext + ?Sized>(
    ctx: &mut G,
    pass: &Pass<'_>,
    cursor: DrawCursor,
    element: &Element,
) -> Result<DrawCursor> {
    match *element {
        Element::LineMove(p) => {
            let cursor = open(ctx, pass, cursor, Primitive::LineStrip)?;
            vertex(ctx, cursor, p)
        }
        Element::LineDraw(p)
        | Element::PolygonMove(p)
        | Element::PolygonDraw(p)
        | Element::TriangleMove(p)
        | Element::TriangleDraw(p)
        | Element::TriangleEnd(p) => vertex(ctx, cursor, p),
        Element::PolygonStart(n) => {
            let cursor = open(ctx, pass, cursor, Primitive::Polygon)?;
            normal(ctx, cursor, n)
        }
        Element::PolygonEnd(p) => {
            let cursor = vertex(ctx, cursor, p)?;
            close(ctx, cursor)
        }
        Element::TriangleStart(n) => {
            let cursor = batch(ctx, pass, cursor, Primitive::Triangles)?;
            normal(ctx, cursor, n)
        }
        Element::TriangleVertexNormal(n) | Element::PolygonVertexNormal(n) => normal(ctx, cursor, n),
        Element::PointDraw(p) => {
            let cursor = batch(ctx, pass, cursor, Primitive::Points)?;
            vertex(ctx, cursor, p)
        }
        Element::LineWidth(width) => {
            let mut cursor = close(ctx, cursor)?;
            ctx.set_line_width(width)?;
            cursor.touched_attributes = true;
            Ok(cursor)
        }
        Element::PointSize(size) => {
            let mut cursor = close(ctx, cursor)?;
            ctx.set_point_size(size)?;
            cursor.touched_attributes = true;
            Ok(cursor)
        }
        Element::DisplaySpace(anchor) => {
            let mut cursor = close(ctx, cursor)?;
            if cursor.display_space {
                ctx.pop_matrix()?;
            }
            let origin = pass.model.transform_point(anchor);
            ctx.push_matrix()?;
            ctx.load_matrix(MatrixMode::ModelView, &Matrix4::translation(origin))?;
            cursor.display_space = true;
            Ok(cursor)
        }
        Element::ModelSpace => {
            let mut cursor = close(ctx, cursor)?;
            if cursor.display_space {
                ctx.pop_matrix()?;
                cursor.display_space = false;
            } else {
                trace!("Model-space marker without display space");
            }
            Ok(cursor)
        }
    }
}

/// Close whatever the pass left open.
pub fn finish<G: GraphicsContext + ?Sized>(ctx: &mut G, cursor: DrawCursor) -> Result<DrawCursor> {
    let mut cursor = close(ctx, cursor)?;
    if cursor.display_space {
        ctx.pop_matrix()?;
        cursor.display_space = false;
    }
    Ok(cursor)
}

/// Fold a whole element sequence into the context in one pass.
pub fn draw_elements<'e, G, I>(ctx: &mut G, pass: &Pass<'_>, elements: I) -> Result<DrawCursor>
where
    G: GraphicsContext + ?Sized,
    I: IntoIterator<Item = &'e Element>,
{
    let cursor = elements
        .into_iter()
        .try_fold(DrawCursor::default(), |cursor, element| {
            step(&mut *ctx, pass, cursor, element)
        })?;
    finish(ctx, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, RecordingContext};
    use crate::config::ViewportConfig;
    use crate::model::VectorList;
    use pretty_assertions::assert_eq;

    fn v(x: f64, y: f64) -> Vec3 {
        Vec3::new(x, y, 0.0)
    }

    fn run(state: &RenderState, list: &VectorList) -> (RecordingContext, DrawCursor) {
        let mut ctx = RecordingContext::new();
        let model = Matrix4::IDENTITY;
        let pass = Pass {
            state,
            model: &model,
        };
        let cursor = draw_elements(&mut ctx, &pass, list).unwrap();
        (ctx, cursor)
    }

    fn wire_state() -> RenderState {
        RenderState::from_config(&ViewportConfig::wireframe())
    }

    #[test]
    fn test_each_line_move_starts_a_strip() {
        let mut list = VectorList::new();
        list.polyline(&[v(0.0, 0.0), v(1.0, 0.0)]);
        list.polyline(&[v(0.0, 1.0), v(1.0, 1.0)]);

        let (ctx, cursor) = run(&wire_state(), &list);
        assert_eq!(
            ctx.commands(),
            &[
                Command::BeginPrimitive(Primitive::LineStrip),
                Command::Vertex(v(0.0, 0.0)),
                Command::Vertex(v(1.0, 0.0)),
                Command::EndPrimitive,
                Command::BeginPrimitive(Primitive::LineStrip),
                Command::Vertex(v(0.0, 1.0)),
                Command::Vertex(v(1.0, 1.0)),
                Command::EndPrimitive,
            ]
        );
        assert!(cursor.is_first());
    }

    #[test]
    fn test_consecutive_triangles_share_one_batch() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let mut list = VectorList::new();
        list.triangle(n, v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0));
        list.triangle(n, v(1.0, 1.0), v(2.0, 1.0), v(1.0, 2.0));

        let (ctx, _) = run(&wire_state(), &list);
        assert_eq!(ctx.primitive_count(), 1);
        assert_eq!(
            ctx.commands()
                .iter()
                .filter(|c| matches!(c, Command::Vertex(_)))
                .count(),
            6
        );
    }

    #[test]
    fn test_polygon_end_closes_primitive() {
        let mut list = VectorList::new();
        list.polygon(Vec3::new(0.0, 0.0, 1.0), &[v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)]);
        list.push(Element::PointDraw(v(5.0, 5.0)));
        list.push(Element::PointDraw(v(6.0, 6.0)));

        let (ctx, _) = run(&wire_state(), &list);
        assert_eq!(ctx.primitive_count(), 2);
        assert_eq!(ctx.commands()[0], Command::BeginPrimitive(Primitive::Polygon));
        assert_eq!(ctx.commands()[1], Command::Normal(Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(ctx.commands().last(), Some(&Command::EndPrimitive));
    }

    #[test]
    fn test_lighting_applies_material_when_class_changes() {
        let state = RenderState::default();
        let mut list = VectorList::new();
        list.polyline(&[v(0.0, 0.0), v(1.0, 0.0)]);
        list.polyline(&[v(0.0, 1.0), v(1.0, 1.0)]);
        list.triangle(Vec3::new(0.0, 0.0, 1.0), v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0));

        let (ctx, cursor) = run(&state, &list);
        let materials: Vec<_> = ctx
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Material(m) => Some(*m),
                _ => None,
            })
            .collect();
        assert_eq!(
            materials,
            vec![state.material(MaterialClass::Wire), state.material(MaterialClass::Surface)]
        );
        assert_eq!(cursor.material, Some(MaterialClass::Surface));
    }

    #[test]
    fn test_line_width_element_marks_attributes() {
        let list: VectorList = [
            Element::LineMove(v(0.0, 0.0)),
            Element::LineWidth(3.0),
            Element::LineDraw(v(1.0, 0.0)),
        ]
        .into_iter()
        .collect();

        let (ctx, cursor) = run(&wire_state(), &list);
        assert!(cursor.touched_attributes);
        assert_eq!(
            ctx.commands(),
            &[
                Command::BeginPrimitive(Primitive::LineStrip),
                Command::Vertex(v(0.0, 0.0)),
                Command::EndPrimitive,
                Command::LineWidth(3.0),
            ]
        );
    }

    #[test]
    fn test_display_space_is_balanced() {
        let list: VectorList = [
            Element::DisplaySpace(v(2.0, 3.0)),
            Element::LineMove(v(0.0, 0.0)),
            Element::LineDraw(v(0.1, 0.0)),
        ]
        .into_iter()
        .collect();

        let (ctx, cursor) = run(&wire_state(), &list);
        assert!(!cursor.display_space);
        assert_eq!(ctx.commands()[0], Command::PushMatrix);
        assert_eq!(
            ctx.commands()[1],
            Command::LoadMatrix {
                mode: MatrixMode::ModelView,
                matrix: Matrix4::translation(v(2.0, 3.0)),
            }
        );
        assert_eq!(ctx.commands().last(), Some(&Command::PopMatrix));
    }

    #[test]
    fn test_stray_model_space_is_ignored() {
        let list: VectorList = [Element::ModelSpace].into_iter().collect();
        let (ctx, _) = run(&wire_state(), &list);
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_error_stops_traversal() {
        let mut ctx = RecordingContext::new();
        ctx.lose_context("gone");
        let state = wire_state();
        let model = Matrix4::IDENTITY;
        let pass = Pass {
            state: &state,
            model: &model,
        };
        let mut list = VectorList::new();
        list.polyline(&[v(0.0, 0.0), v(1.0, 0.0)]);
        let err = draw_elements(&mut ctx, &pass, &list).unwrap_err();
        assert!(err.is_frame_fatal());
    }
}
