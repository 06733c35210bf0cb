// Line sampling over a decoded RGB frame
use super::geometry::{Point, Rgb};
use image::RgbImage;

/// Ordered pixel colors read along one line of one frame.
pub type SampleSet = Vec<Rgb>;

/// Sample the pixel colors along the segment `a -> b`.
///
/// Both endpoints are clamped into the frame independently before traversal.
/// Returns an empty set for a zero-sized frame; the caller skips the cycle.
pub fn sample(image: &RgbImage, a: Point, b: Point) -> SampleSet {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let a = clamp(a, width, height);
    let b = clamp(b, width, height);

    trace_line(a, b)
        .into_iter()
        .filter_map(|p| {
            let x = u32::try_from(p.x).ok()?;
            let y = u32::try_from(p.y).ok()?;
            image.get_pixel_checked(x, y).map(|px| Rgb::from(*px))
        })
        .collect()
}

fn clamp(p: Point, width: u32, height: u32) -> Point {
    Point::new(
        p.x.clamp(0, i64::from(width) - 1),
        p.y.clamp(0, i64::from(height) - 1),
    )
}

/// Integer line traversal from `a` to `b`, both endpoints included once.
///
/// The walk always runs from the lexicographically smaller endpoint so that
/// swapping `a` and `b` yields exactly the reversed sequence.
pub fn trace_line(a: Point, b: Point) -> Vec<Point> {
    if (b.x, b.y) < (a.x, a.y) {
        let mut points = bresenham(b, a);
        points.reverse();
        points
    } else {
        bresenham(a, b)
    }
}

// Error term is kept doubled so the half-step start stays integral.
fn bresenham(from: Point, to: Point) -> Vec<Point> {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x > to.x { -1 } else { 1 };
    let sy = if from.y > to.y { -1 } else { 1 };

    let mut points = Vec::with_capacity(dx.max(dy) as usize + 1);
    let (mut x, mut y) = (from.x, from.y);

    if dx > dy {
        let mut err = dx;
        while x != to.x {
            points.push(Point::new(x, y));
            err -= 2 * dy;
            if err < 0 {
                y += sy;
                err += 2 * dx;
            }
            x += sx;
        }
    } else {
        let mut err = dy;
        while y != to.y {
            points.push(Point::new(x, y));
            err -= 2 * dx;
            if err < 0 {
                x += sx;
                err += 2 * dy;
            }
            y += sy;
        }
    }

    points.push(Point::new(x, y));
    points
}
