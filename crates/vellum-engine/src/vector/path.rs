use crate::coords::{Rect, Vec2};

/// Winding rule used to fill a path.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathVerb {
    MoveTo(Vec2),
    LineTo(Vec2),
    CubicTo(Vec2, Vec2, Vec2),
    Close,
}

/// Retained path handed to `Renderer::draw_path` and `Renderer::clip_path`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    verbs: Vec<PathVerb>,
    fill_rule: FillRule,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed axis-aligned rectangle.
    pub fn rect(rect: Rect) -> Self {
        let [a, b, c, d] = rect.corners();
        let mut path = Path::new();
        path.move_to(a).line_to(b).line_to(c).line_to(d).close();
        path
    }

    /// Closed ellipse inscribed in `rect`, approximated with four cubics.
    pub fn ellipse(rect: Rect) -> Self {
        const K: f32 = 0.552_284_8;
        let c = rect.center();
        let rx = rect.width() * 0.5;
        let ry = rect.height() * 0.5;
        let (ox, oy) = (rx * K, ry * K);

        let mut path = Path::new();
        path.move_to(Vec2::new(c.x + rx, c.y))
            .cubic_to(Vec2::new(c.x + rx, c.y + oy), Vec2::new(c.x + ox, c.y + ry), Vec2::new(c.x, c.y + ry))
            .cubic_to(Vec2::new(c.x - ox, c.y + ry), Vec2::new(c.x - rx, c.y + oy), Vec2::new(c.x - rx, c.y))
            .cubic_to(Vec2::new(c.x - rx, c.y - oy), Vec2::new(c.x - ox, c.y - ry), Vec2::new(c.x, c.y - ry))
            .cubic_to(Vec2::new(c.x + ox, c.y - ry), Vec2::new(c.x + rx, c.y - oy), Vec2::new(c.x + rx, c.y))
            .close();
        path
    }

    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.fill_rule = fill_rule;
        self
    }

    pub fn move_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::MoveTo(p));
        self
    }

    pub fn line_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::LineTo(p));
        self
    }

    pub fn cubic_to(&mut self, c1: Vec2, c2: Vec2, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::CubicTo(c1, c2, p));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.verbs.push(PathVerb::Close);
        self
    }

    #[inline]
    pub fn verbs(&self) -> &[PathVerb] {
        &self.verbs
    }

    #[inline]
    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Bounds of all points, control points included.
    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(self.verbs.iter().flat_map(|v| match *v {
            PathVerb::MoveTo(p) | PathVerb::LineTo(p) => vec![p],
            PathVerb::CubicTo(a, b, p) => vec![a, b, p],
            PathVerb::Close => Vec::new(),
        }))
    }
}
