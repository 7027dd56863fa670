use super::{Mat2D, Rect, Vec2};

/// How artboard content is scaled into its frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Fit {
    /// Stretch both axes independently.
    Fill,
    /// Uniform scale so the content fits inside the frame.
    #[default]
    Contain,
    /// Uniform scale so the content covers the frame.
    Cover,
    FitWidth,
    FitHeight,
    /// Native size.
    None,
    /// Like `Contain`, but never upscales.
    ScaleDown,
}

impl Fit {
    /// Parses the lowercase names used by host inspectors.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "fill" => Fit::Fill,
            "contain" => Fit::Contain,
            "cover" => Fit::Cover,
            "fit_width" | "fitWidth" => Fit::FitWidth,
            "fit_height" | "fitHeight" => Fit::FitHeight,
            "none" => Fit::None,
            "scale_down" | "scaleDown" => Fit::ScaleDown,
            _ => return None,
        })
    }
}

/// Normalized anchor inside a frame, each axis in `[-1, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Alignment {
    pub x: f32,
    pub y: f32,
}

impl Alignment {
    pub const TOP_LEFT: Alignment = Alignment::new(-1.0, -1.0);
    pub const TOP_CENTER: Alignment = Alignment::new(0.0, -1.0);
    pub const TOP_RIGHT: Alignment = Alignment::new(1.0, -1.0);
    pub const CENTER_LEFT: Alignment = Alignment::new(-1.0, 0.0);
    pub const CENTER: Alignment = Alignment::new(0.0, 0.0);
    pub const CENTER_RIGHT: Alignment = Alignment::new(1.0, 0.0);
    pub const BOTTOM_LEFT: Alignment = Alignment::new(-1.0, 1.0);
    pub const BOTTOM_CENTER: Alignment = Alignment::new(0.0, 1.0);
    pub const BOTTOM_RIGHT: Alignment = Alignment::new(1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// The point of `rect` this alignment selects.
    #[inline]
    pub fn anchor_in(self, rect: Rect) -> Vec2 {
        rect.center() + rect.size.scale(self.as_vec2()) * 0.5
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::CENTER
    }
}

/// Transform placing `content` inside `frame` according to `fit` and `alignment`.
///
/// The content anchor selected by `alignment` lands on the matching frame anchor.
pub fn compute_alignment(fit: Fit, alignment: Alignment, frame: Rect, content: Rect) -> Mat2D {
    let cw = content.width();
    let ch = content.height();
    if cw <= 0.0 || ch <= 0.0 {
        return Mat2D::IDENTITY;
    }

    let anchor = -alignment.anchor_in(content);
    let wr = frame.width() / cw;
    let hr = frame.height() / ch;
    let (sx, sy) = match fit {
        Fit::Fill => (wr, hr),
        Fit::Contain => {
            let s = wr.min(hr);
            (s, s)
        }
        Fit::Cover => {
            let s = wr.max(hr);
            (s, s)
        }
        Fit::FitWidth => (wr, wr),
        Fit::FitHeight => (hr, hr),
        Fit::None => (1.0, 1.0),
        Fit::ScaleDown => {
            let s = wr.min(hr).min(1.0);
            (s, s)
        }
    };

    let placement = alignment.anchor_in(frame);

    Mat2D::from_translate(placement.x, placement.y)
        * Mat2D::from_scale(sx, sy)
        * Mat2D::from_translate(anchor.x, anchor.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Rect { Rect::new(0.0, 0.0, 200.0, 100.0) }
    fn content() -> Rect { Rect::new(0.0, 0.0, 50.0, 50.0) }

    // ── fit ───────────────────────────────────────────────────────────────

    #[test]
    fn contain_centers_and_scales_to_short_side() {
        let m = compute_alignment(Fit::Contain, Alignment::CENTER, frame(), content());
        let r = m.map_rect(content());
        assert_eq!(r, Rect::new(50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn cover_scales_to_long_side() {
        let m = compute_alignment(Fit::Cover, Alignment::CENTER, frame(), content());
        let r = m.map_rect(content());
        assert_eq!(r, Rect::new(0.0, -50.0, 200.0, 200.0));
    }

    #[test]
    fn fill_stretches_both_axes() {
        let m = compute_alignment(Fit::Fill, Alignment::CENTER, frame(), content());
        assert_eq!(m.map_rect(content()), frame());
    }

    #[test]
    fn scale_down_never_upscales() {
        let m = compute_alignment(Fit::ScaleDown, Alignment::CENTER, frame(), content());
        let r = m.map_rect(content());
        assert_eq!(r.size, Vec2::new(50.0, 50.0));
        assert_eq!(r.center(), frame().center());
    }

    // ── alignment ─────────────────────────────────────────────────────────

    #[test]
    fn top_left_pins_origin() {
        let m = compute_alignment(Fit::None, Alignment::TOP_LEFT, frame(), Rect::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(m.map_point(Vec2::new(10.0, 10.0)), Vec2::zero());
    }

    #[test]
    fn bottom_right_pins_far_corner() {
        let m = compute_alignment(Fit::Contain, Alignment::BOTTOM_RIGHT, frame(), content());
        assert_eq!(m.map_point(Vec2::new(50.0, 50.0)), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn anchors_span_the_rect() {
        let r = Rect::new(10.0, 20.0, 40.0, 60.0);
        assert_eq!(Alignment::TOP_LEFT.anchor_in(r), Vec2::new(10.0, 20.0));
        assert_eq!(Alignment::CENTER.anchor_in(r), Vec2::new(30.0, 50.0));
        assert_eq!(Alignment::BOTTOM_RIGHT.anchor_in(r), Vec2::new(50.0, 80.0));
    }

    #[test]
    fn degenerate_content_is_identity() {
        let m = compute_alignment(Fit::Cover, Alignment::CENTER, frame(), Rect::default());
        assert_eq!(m, Mat2D::IDENTITY);
    }

    #[test]
    fn fit_names_parse() {
        assert_eq!(Fit::from_name("scaleDown"), Some(Fit::ScaleDown));
        assert_eq!(Fit::from_name("fit_width"), Some(Fit::FitWidth));
        assert_eq!(Fit::from_name("stretch"), None);
    }
}
