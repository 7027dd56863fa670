use resvg::tiny_skia as sk;

use crate::coords::Mat2D;
use crate::paint::{Paint, SpreadMode};
use crate::vector::{FillRule, Path, PathVerb, RenderImage, Renderer};

use super::library::SoftImage;

#[derive(Clone, Default)]
struct RasterState {
    transform: Mat2D,
    clip: Option<sk::Mask>,
}

/// CPU renderer over a tiny-skia pixmap.
///
/// Anti-aliasing is off so that axis-aligned fills produce exact pixel
/// values.
#[derive(Default)]
pub struct SoftRenderer {
    pixmap: Option<sk::Pixmap>,
    state: RasterState,
    stack: Vec<RasterState>,
}

fn to_sk_transform(m: Mat2D) -> sk::Transform {
    let [xx, xy, yx, yy, tx, ty] = m.0;
    sk::Transform::from_row(xx, xy, yx, yy, tx, ty)
}

fn to_sk_rule(rule: FillRule) -> sk::FillRule {
    match rule {
        FillRule::NonZero => sk::FillRule::Winding,
        FillRule::EvenOdd => sk::FillRule::EvenOdd,
    }
}

fn to_sk_path(path: &Path) -> Option<sk::Path> {
    let mut pb = sk::PathBuilder::new();
    for verb in path.verbs() {
        match *verb {
            PathVerb::MoveTo(p) => pb.move_to(p.x, p.y),
            PathVerb::LineTo(p) => pb.line_to(p.x, p.y),
            PathVerb::CubicTo(a, b, p) => pb.cubic_to(a.x, a.y, b.x, b.y, p.x, p.y),
            PathVerb::Close => pb.close(),
        }
    }
    pb.finish()
}

fn to_sk_color(color: crate::paint::Color) -> Option<sk::Color> {
    let (r, g, b, a) = color.to_straight();
    sk::Color::from_rgba(r, g, b, a)
}

fn to_sk_paint(paint: &Paint) -> Option<sk::Paint<'static>> {
    let mut out = sk::Paint { anti_alias: false, ..sk::Paint::default() };
    match paint {
        Paint::Solid(color) => out.set_color(to_sk_color(*color)?),
        Paint::LinearGradient(g) => {
            if !g.is_valid() {
                return None;
            }
            let stops = g
                .stops
                .iter()
                .map(|s| Some(sk::GradientStop::new(s.t, to_sk_color(s.color)?)))
                .collect::<Option<Vec<_>>>()?;
            let spread = match g.spread {
                SpreadMode::Pad => sk::SpreadMode::Pad,
                SpreadMode::Repeat => sk::SpreadMode::Repeat,
                SpreadMode::Reflect => sk::SpreadMode::Reflect,
            };
            out.shader = sk::LinearGradient::new(
                sk::Point::from_xy(g.start.x, g.start.y),
                sk::Point::from_xy(g.end.x, g.end.y),
                stops,
                spread,
                sk::Transform::identity(),
            )?;
        }
    }
    Some(out)
}

impl SoftRenderer {
    /// Starts a frame on a fresh pixmap filled with `clear` (straight RGBA).
    /// A zero-sized frame records nothing.
    pub fn begin(&mut self, width: u32, height: u32, clear: [u8; 4]) {
        self.pixmap = sk::Pixmap::new(width, height);
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(sk::Color::from_rgba8(clear[0], clear[1], clear[2], clear[3]));
        }
        self.state = RasterState::default();
        self.stack.clear();
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixmap.as_ref().map_or((0, 0), |p| (p.width(), p.height()))
    }

    /// Straight RGBA rows of the current frame, top to bottom.
    pub fn to_rgba(&self) -> Vec<u8> {
        let Some(pixmap) = self.pixmap.as_ref() else {
            return Vec::new();
        };
        pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    fn image_pixmap(image: &dyn RenderImage) -> Option<sk::Pixmap> {
        let soft = image.as_any().downcast_ref::<SoftImage>()?;
        let rgba = soft.rgba()?;
        let premultiplied: Vec<u8> = rgba
            .chunks_exact(4)
            .flat_map(|c| {
                let p = sk::ColorU8::from_rgba(c[0], c[1], c[2], c[3]).premultiply();
                [p.red(), p.green(), p.blue(), p.alpha()]
            })
            .collect();
        sk::Pixmap::from_vec(premultiplied, sk::IntSize::from_wh(soft.width(), soft.height())?)
    }
}

impl Renderer for SoftRenderer {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn transform(&mut self, transform: &Mat2D) {
        self.state.transform = self.state.transform * *transform;
    }

    fn draw_path(&mut self, path: &Path, paint: &Paint) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let (Some(sk_path), Some(sk_paint)) = (to_sk_path(path), to_sk_paint(paint)) else {
            return;
        };
        pixmap.fill_path(
            &sk_path,
            &sk_paint,
            to_sk_rule(path.fill_rule()),
            to_sk_transform(self.state.transform),
            self.state.clip.as_ref(),
        );
    }

    fn clip_path(&mut self, path: &Path) {
        let (width, height) = self.size();
        let Some(sk_path) = to_sk_path(path) else {
            return;
        };
        let rule = to_sk_rule(path.fill_rule());
        let transform = to_sk_transform(self.state.transform);
        let clip = match self.state.clip.take() {
            Some(mut mask) => {
                mask.intersect_path(&sk_path, rule, false, transform);
                Some(mask)
            }
            None => sk::Mask::new(width, height).map(|mut mask| {
                mask.fill_path(&sk_path, rule, false, transform);
                mask
            }),
        };
        self.state.clip = clip;
    }

    fn draw_image(&mut self, image: &dyn RenderImage, opacity: f32) {
        let Some(source) = Self::image_pixmap(image) else {
            log::debug!("soft renderer: skipping foreign or unreadable image");
            return;
        };
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let paint = sk::PixmapPaint { opacity: opacity.clamp(0.0, 1.0), ..sk::PixmapPaint::default() };
        pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            to_sk_transform(self.state.transform),
            self.state.clip.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Rect, Vec2};
    use crate::paint::{Color, LinearGradient};

    fn pixel(r: &SoftRenderer, x: u32, y: u32) -> [u8; 4] {
        let (w, _) = r.size();
        let i = ((y * w + x) * 4) as usize;
        let rgba = r.to_rgba();
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn clear_color_fills_frame() {
        let mut r = SoftRenderer::default();
        r.begin(4, 4, [0, 0, 255, 255]);
        assert!(r.to_rgba().chunks_exact(4).all(|p| p == [0, 0, 255, 255]));
    }

    #[test]
    fn transform_moves_fill() {
        let mut r = SoftRenderer::default();
        r.begin(8, 8, [0, 0, 0, 0]);
        r.save();
        r.transform(&Mat2D::from_translate(4.0, 0.0));
        r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 4.0, 8.0)), &Paint::argb(0xFFFF_0000));
        r.restore();
        assert_eq!(pixel(&r, 1, 1), [0, 0, 0, 0]);
        assert_eq!(pixel(&r, 5, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn clip_limits_fill_until_restore() {
        let mut r = SoftRenderer::default();
        r.begin(8, 8, [0, 0, 0, 0]);
        r.save();
        r.clip_path(&Path::rect(Rect::new(0.0, 0.0, 2.0, 2.0)));
        r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 8.0, 8.0)), &Paint::argb(0xFF00_FF00));
        r.restore();
        assert_eq!(pixel(&r, 1, 1), [0, 255, 0, 255]);
        assert_eq!(pixel(&r, 4, 4), [0, 0, 0, 0]);

        r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 8.0, 8.0)), &Paint::argb(0xFF00_FF00));
        assert_eq!(pixel(&r, 4, 4), [0, 255, 0, 255]);
    }

    #[test]
    fn gradient_runs_between_stops() {
        let mut r = SoftRenderer::default();
        r.begin(16, 1, [0, 0, 0, 0]);
        let g = LinearGradient::between(
            Vec2::new(0.0, 0.0),
            Vec2::new(16.0, 0.0),
            Color::from_srgb_u8(0, 0, 0, 255),
            Color::from_srgb_u8(255, 255, 255, 255),
        );
        r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 16.0, 1.0)), &Paint::LinearGradient(g));
        let left = pixel(&r, 0, 0);
        let right = pixel(&r, 15, 0);
        assert!(left[0] < 32 && right[0] > 223, "{left:?} {right:?}");
    }

    #[test]
    fn zero_sized_frame_ignores_draws() {
        let mut r = SoftRenderer::default();
        r.begin(0, 4, [0, 0, 0, 0]);
        r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 4.0, 4.0)), &Paint::argb(0xFFFF_FFFF));
        assert!(r.to_rgba().is_empty());
    }
}
