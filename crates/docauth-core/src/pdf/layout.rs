//! Placement of image XObjects on a page.

use lopdf::content::Content;
use lopdf::Object;

use crate::models::BoundingBox;

/// Affine transform `[a b c d e f]` as used by the PDF `cm` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Six numeric operands, as for `cm` or a form's `/Matrix`.
    pub(crate) fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut values = [0.0; 6];
        for (slot, operand) in values.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        let [a, b, c, d, e, f] = values;
        Some(Self::new(a, b, c, d, e, f))
    }

    /// Transform that applies `inner` first, then `self`.
    pub fn concat(self, inner: Matrix) -> Matrix {
        Matrix {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounds `(x0, y0, x1, y1)` of the unit square under this transform.
    ///
    /// Images are drawn into the unit square, so this is the image footprint
    /// in user space.
    pub fn unit_square_bounds(&self) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Walk `content` starting from the transform `base`, handing every `Do`
/// operand and the CTM in effect to `on_do`. The first `Some` it returns
/// ends the walk.
pub(crate) fn find_placement<F>(content: &Content, base: Matrix, mut on_do: F) -> Option<Matrix>
where
    F: FnMut(&[u8], Matrix) -> Option<Matrix>,
{
    let mut ctm = base;
    let mut ctm_stack: Vec<Matrix> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(prev) = ctm_stack.pop() {
                    ctm = prev;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    ctm = ctm.concat(m);
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    continue;
                };
                if let Some(found) = on_do(name, ctm) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Map user-space bounds into page coordinates with a top-left origin.
pub(crate) fn to_page_box(bounds: (f64, f64, f64, f64), media_box: [f64; 4]) -> BoundingBox {
    let (x0, y0, x1, y1) = bounds;
    let [left, _bottom, _right, top] = media_box;
    BoundingBox::new(x0 - left, top - y1, x1 - left, top - y0)
}
