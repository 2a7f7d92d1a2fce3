//! Planar geometry shared by placement checks, targeting and path following.

use glam::Vec2;

/// Location on the playfield expressed in world units.
///
/// `x` grows to the right and `y` grows downwards.
pub type Point = Vec2;

/// Moves `step` units from `from` towards `target`, never overshooting it.
#[must_use]
pub fn step_towards(from: Point, target: Point, step: f32) -> Point {
    let offset = target - from;
    let distance = offset.length();
    if distance <= step || distance <= f32::EPSILON {
        return target;
    }
    from + offset * (step / distance)
}

/// Shortest distance between `point` and the segment `a`–`b`.
///
/// Degenerate segments collapse to the distance from `a`.
#[must_use]
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= f32::EPSILON {
        return point.distance(a);
    }

    let t = (point - a).dot(ab) / length_sq;
    point.distance(a.lerp(b, t.clamp(0.0, 1.0)))
}

/// Shortest distance between `point` and any segment of the polyline.
///
/// Returns `None` when the polyline is empty. A single waypoint is treated
/// as a degenerate segment.
#[must_use]
pub fn distance_to_polyline(point: Point, polyline: &[Point]) -> Option<f32> {
    match polyline {
        [] => None,
        [only] => Some(point.distance(*only)),
        _ => polyline
            .windows(2)
            .map(|pair| distance_to_segment(point, pair[0], pair[1]))
            .reduce(f32::min),
    }
}

/// Position of an entity along a waypoint polyline.
///
/// Progress is tracked as absolute distance travelled along the current
/// segment so that integral speeds accumulate without rounding drift; the
/// normalised fraction is derived on demand.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathProgress {
    segment: usize,
    travelled: f32,
}

impl PathProgress {
    /// Progress anchored at the first waypoint.
    #[must_use]
    pub const fn start() -> Self {
        Self {
            segment: 0,
            travelled: 0.0,
        }
    }

    /// Index of the waypoint that starts the current segment.
    #[must_use]
    pub const fn segment(&self) -> usize {
        self.segment
    }

    /// Fraction of the current segment already covered, in `[0, 1)`.
    #[must_use]
    pub fn fraction(&self, path: &[Point]) -> f32 {
        match segment_length(path, self.segment) {
            Some(length) if length > f32::EPSILON => self.travelled / length,
            _ => 0.0,
        }
    }

    /// Reports whether the final waypoint has been reached.
    #[must_use]
    pub fn is_finished(&self, path: &[Point]) -> bool {
        path.len() < 2 || self.segment >= path.len() - 1
    }

    /// Absolute position on the polyline.
    #[must_use]
    pub fn position(&self, path: &[Point]) -> Point {
        if self.is_finished(path) {
            return path.last().copied().unwrap_or_default();
        }
        let from = path[self.segment];
        let to = path[self.segment + 1];
        from.lerp(to, self.fraction(path))
    }
}

/// Outcome of a single [`advance_along_path`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStep {
    /// Position after the advance.
    pub position: Point,
    /// Indicates that the entity arrived at the last waypoint.
    pub reached_end: bool,
}

/// Advances `progress` by `step` world units along `path`.
///
/// Crossing the end of a segment moves onto the next one with progress reset
/// to zero; the overshoot is discarded. Zero-length segments are skipped
/// without consuming the step.
pub fn advance_along_path(progress: &mut PathProgress, path: &[Point], step: f32) -> PathStep {
    skip_degenerate_segments(progress, path);
    if progress.is_finished(path) {
        return PathStep {
            position: progress.position(path),
            reached_end: true,
        };
    }

    let length = segment_length(path, progress.segment).unwrap_or(0.0);
    progress.travelled += step.max(0.0);
    if progress.travelled >= length {
        progress.segment += 1;
        progress.travelled = 0.0;
    }

    PathStep {
        position: progress.position(path),
        reached_end: progress.is_finished(path),
    }
}

fn skip_degenerate_segments(progress: &mut PathProgress, path: &[Point]) {
    while !progress.is_finished(path) {
        match segment_length(path, progress.segment) {
            Some(length) if length <= f32::EPSILON => {
                progress.segment += 1;
                progress.travelled = 0.0;
            }
            _ => break,
        }
    }
}

fn segment_length(path: &[Point], segment: usize) -> Option<f32> {
    let from = path.get(segment)?;
    let to = path.get(segment + 1)?;
    Some(from.distance(*to))
}
