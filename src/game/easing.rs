//! Easing shapes, their renormalized partial windows, and closed-form integrals.
//!
//! Every shape `f` maps `[0, 1]` onto `[0, 1]` with `f(0) = 0` and `f(1) = 1`.
//! An event may use only the slice `[left, right]` of a shape; the slice is
//! stretched back onto `[0, 1]` in both axes before use. Speed events need the
//! area under that stretched curve, so each shape also carries an
//! antiderivative `F` with `F(0) = 0`.

use std::f64::consts::{LN_2, PI};

const BACK_C1: f64 = 1.70158;
const BACK_C3: f64 = BACK_C1 + 1.0;
const BACK_C2: f64 = BACK_C1 * 1.525;
const ELASTIC_C4: f64 = 2.0 * PI / 3.0;
const BOUNCE_N1: f64 = 7.5625;
const BOUNCE_D1: f64 = 2.75;

const DEGENERATE_EPSILON: f64 = 1e-12;
const DERIVATIVE_EPSILON: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EasingKind {
    #[default]
    Linear = 1,
    SineOut,
    SineIn,
    QuadOut,
    QuadIn,
    SineInOut,
    QuadInOut,
    CubicOut,
    CubicIn,
    QuartOut,
    QuartIn,
    CubicInOut,
    QuartInOut,
    QuintOut,
    QuintIn,
    ExpoOut,
    ExpoIn,
    CircOut,
    CircIn,
    BackOut,
    BackIn,
    CircInOut,
    BackInOut,
    ElasticOut,
    ElasticIn,
    BounceOut,
    BounceIn,
    BounceInOut,
}

impl EasingKind {
    pub const ALL: [EasingKind; 28] = [
        EasingKind::Linear,
        EasingKind::SineOut,
        EasingKind::SineIn,
        EasingKind::QuadOut,
        EasingKind::QuadIn,
        EasingKind::SineInOut,
        EasingKind::QuadInOut,
        EasingKind::CubicOut,
        EasingKind::CubicIn,
        EasingKind::QuartOut,
        EasingKind::QuartIn,
        EasingKind::CubicInOut,
        EasingKind::QuartInOut,
        EasingKind::QuintOut,
        EasingKind::QuintIn,
        EasingKind::ExpoOut,
        EasingKind::ExpoIn,
        EasingKind::CircOut,
        EasingKind::CircIn,
        EasingKind::BackOut,
        EasingKind::BackIn,
        EasingKind::CircInOut,
        EasingKind::BackInOut,
        EasingKind::ElasticOut,
        EasingKind::ElasticIn,
        EasingKind::BounceOut,
        EasingKind::BounceIn,
        EasingKind::BounceInOut,
    ];

    /// Looks up a chart easing index. Anything outside `1..=28` is linear.
    pub fn from_index(index: i64) -> Self {
        if (1..=Self::ALL.len() as i64).contains(&index) {
            Self::ALL[(index - 1) as usize]
        } else {
            EasingKind::Linear
        }
    }

    #[inline(always)]
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            EasingKind::Linear => x,
            EasingKind::SineOut => (x * PI / 2.0).sin(),
            EasingKind::SineIn => 1.0 - (x * PI / 2.0).cos(),
            EasingKind::QuadOut => 1.0 - (1.0 - x).powi(2),
            EasingKind::QuadIn => x.powi(2),
            EasingKind::SineInOut => -((PI * x).cos() - 1.0) / 2.0,
            EasingKind::QuadInOut => {
                if x < 0.5 { 2.0 * x * x } else { 1.0 - (-2.0 * x + 2.0).powi(2) / 2.0 }
            }
            EasingKind::CubicOut => 1.0 - (1.0 - x).powi(3),
            EasingKind::CubicIn => x.powi(3),
            EasingKind::QuartOut => 1.0 - (1.0 - x).powi(4),
            EasingKind::QuartIn => x.powi(4),
            EasingKind::CubicInOut => {
                if x < 0.5 { 4.0 * x.powi(3) } else { 1.0 - (-2.0 * x + 2.0).powi(3) / 2.0 }
            }
            EasingKind::QuartInOut => {
                if x < 0.5 { 8.0 * x.powi(4) } else { 1.0 - (-2.0 * x + 2.0).powi(4) / 2.0 }
            }
            EasingKind::QuintOut => 1.0 - (1.0 - x).powi(5),
            EasingKind::QuintIn => x.powi(5),
            EasingKind::ExpoOut => {
                if x == 1.0 { 1.0 } else { 1.0 - 2f64.powf(-10.0 * x) }
            }
            EasingKind::ExpoIn => {
                if x == 0.0 { 0.0 } else { 2f64.powf(10.0 * x - 10.0) }
            }
            EasingKind::CircOut => (1.0 - (x - 1.0).powi(2)).max(0.0).sqrt(),
            EasingKind::CircIn => 1.0 - (1.0 - x.powi(2)).max(0.0).sqrt(),
            EasingKind::BackOut => {
                1.0 + BACK_C3 * (x - 1.0).powi(3) + BACK_C1 * (x - 1.0).powi(2)
            }
            EasingKind::BackIn => BACK_C3 * x.powi(3) - BACK_C1 * x.powi(2),
            EasingKind::CircInOut => {
                if x < 0.5 {
                    (1.0 - (1.0 - (2.0 * x).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * x + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            EasingKind::BackInOut => {
                if x < 0.5 {
                    ((2.0 * x).powi(2) * ((BACK_C2 + 1.0) * 2.0 * x - BACK_C2)) / 2.0
                } else {
                    ((2.0 * x - 2.0).powi(2) * ((BACK_C2 + 1.0) * (x * 2.0 - 2.0) + BACK_C2) + 2.0)
                        / 2.0
                }
            }
            EasingKind::ElasticOut => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else {
                    2f64.powf(-10.0 * x) * ((x * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            EasingKind::ElasticIn => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else {
                    -(2f64.powf(10.0 * x - 10.0)) * ((x * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            EasingKind::BounceOut => bounce_out(x),
            EasingKind::BounceIn => 1.0 - bounce_out(1.0 - x),
            EasingKind::BounceInOut => {
                if x < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * x)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * x - 1.0)) / 2.0
                }
            }
        }
    }

    /// `∫₀ˣ apply(u) du`.
    pub fn antiderivative(self, x: f64) -> f64 {
        let g = |f: &dyn Fn(f64) -> f64| f(x) - f(0.0);
        match self {
            EasingKind::Linear => x * x / 2.0,
            EasingKind::SineOut => g(&|u| -(2.0 / PI) * (u * PI / 2.0).cos()),
            EasingKind::SineIn => g(&|u| u - (2.0 / PI) * (u * PI / 2.0).sin()),
            EasingKind::QuadOut => g(&|u| u + (1.0 - u).powi(3) / 3.0),
            EasingKind::QuadIn => x.powi(3) / 3.0,
            EasingKind::SineInOut => x / 2.0 - (PI * x).sin() / (2.0 * PI),
            EasingKind::QuadInOut => split_at_half(
                x,
                |u| 2.0 * u.powi(3) / 3.0,
                |u| u + 2.0 * (1.0 - u).powi(3) / 3.0,
            ),
            EasingKind::CubicOut => g(&|u| u + (1.0 - u).powi(4) / 4.0),
            EasingKind::CubicIn => x.powi(4) / 4.0,
            EasingKind::QuartOut => g(&|u| u + (1.0 - u).powi(5) / 5.0),
            EasingKind::QuartIn => x.powi(5) / 5.0,
            EasingKind::CubicInOut => split_at_half(x, |u| u.powi(4), |u| u + (1.0 - u).powi(4)),
            EasingKind::QuartInOut => split_at_half(
                x,
                |u| 8.0 * u.powi(5) / 5.0,
                |u| u + 8.0 * (1.0 - u).powi(5) / 5.0,
            ),
            EasingKind::QuintOut => g(&|u| u + (1.0 - u).powi(6) / 6.0),
            EasingKind::QuintIn => x.powi(6) / 6.0,
            EasingKind::ExpoOut => g(&|u| u + 2f64.powf(-10.0 * u) / (10.0 * LN_2)),
            EasingKind::ExpoIn => g(&|u| 2f64.powf(10.0 * u - 10.0) / (10.0 * LN_2)),
            EasingKind::CircOut => g(&|u| circle_area(u - 1.0)),
            EasingKind::CircIn => g(&|u| u - circle_area(u)),
            EasingKind::BackOut => g(&|u| {
                u + BACK_C3 * (u - 1.0).powi(4) / 4.0 + BACK_C1 * (u - 1.0).powi(3) / 3.0
            }),
            EasingKind::BackIn => BACK_C3 * x.powi(4) / 4.0 - BACK_C1 * x.powi(3) / 3.0,
            EasingKind::CircInOut => split_at_half(
                x,
                |u| u / 2.0 - circle_area(2.0 * u) / 4.0,
                |u| u / 2.0 + circle_area(2.0 * u - 2.0) / 4.0,
            ),
            EasingKind::BackInOut => split_at_half(
                x,
                |u| {
                    let v = 2.0 * u;
                    ((BACK_C2 + 1.0) * v.powi(4) / 4.0 - BACK_C2 * v.powi(3) / 3.0) / 4.0
                },
                |u| {
                    let w = 2.0 * u - 2.0;
                    ((BACK_C2 + 1.0) * w.powi(4) / 4.0 + BACK_C2 * w.powi(3) / 3.0 + 2.0 * w) / 4.0
                },
            ),
            EasingKind::ElasticOut => g(&|u| {
                u + exp_sin_integral(-10.0 * LN_2, 10.0 * ELASTIC_C4, -0.75 * ELASTIC_C4, u)
            }),
            EasingKind::ElasticIn => g(&|u| {
                -(2f64.powi(-10))
                    * exp_sin_integral(10.0 * LN_2, 10.0 * ELASTIC_C4, -10.75 * ELASTIC_C4, u)
            }),
            EasingKind::BounceOut => bounce_out_integral(x),
            EasingKind::BounceIn => x - bounce_out_integral(1.0) + bounce_out_integral(1.0 - x),
            EasingKind::BounceInOut => split_at_half(
                x,
                |u| u / 2.0 + bounce_out_integral(1.0 - 2.0 * u) / 4.0,
                |u| u / 2.0 + bounce_out_integral(2.0 * u - 1.0) / 4.0,
            ),
        }
    }
}

/// Antiderivative of a two-piece shape split at `x = 0.5`, anchored at 0.
fn split_at_half(x: f64, lower: impl Fn(f64) -> f64, upper: impl Fn(f64) -> f64) -> f64 {
    if x < 0.5 {
        lower(x) - lower(0.0)
    } else {
        lower(0.5) - lower(0.0) + upper(x) - upper(0.5)
    }
}

/// `∫ sqrt(1 - u²) du`.
fn circle_area(u: f64) -> f64 {
    let u = u.clamp(-1.0, 1.0);
    (u * (1.0 - u * u).max(0.0).sqrt() + u.asin()) / 2.0
}

/// `∫ e^(a·u) sin(b·u + phase) du`.
fn exp_sin_integral(a: f64, b: f64, phase: f64, u: f64) -> f64 {
    let angle = b * u + phase;
    (a * u).exp() * (a * angle.sin() - b * angle.cos()) / (a * a + b * b)
}

fn bounce_out(x: f64) -> f64 {
    if x < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * x * x
    } else if x < 2.0 / BOUNCE_D1 {
        let x = x - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * x * x + 0.75
    } else if x < 2.5 / BOUNCE_D1 {
        let x = x - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * x * x + 0.9375
    } else {
        let x = x - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * x * x + 0.984375
    }
}

/// `∫₀ˣ bounce_out`, summed piece by piece.
fn bounce_out_integral(x: f64) -> f64 {
    const PIECES: [(f64, f64, f64, f64); 4] = [
        (0.0, 1.0 / BOUNCE_D1, 0.0, 0.0),
        (1.0 / BOUNCE_D1, 2.0 / BOUNCE_D1, 1.5 / BOUNCE_D1, 0.75),
        (2.0 / BOUNCE_D1, 2.5 / BOUNCE_D1, 2.25 / BOUNCE_D1, 0.9375),
        (2.5 / BOUNCE_D1, f64::INFINITY, 2.625 / BOUNCE_D1, 0.984375),
    ];
    let piece = |u: f64, shift: f64, lift: f64| BOUNCE_N1 * (u - shift).powi(3) / 3.0 + lift * u;

    let mut total = 0.0;
    for (start, end, shift, lift) in PIECES {
        if x <= start {
            break;
        }
        let upper = x.min(end);
        total += piece(upper, shift, lift) - piece(start, shift, lift);
    }
    total
}

/// A unit cubic Bézier through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    ax: f64,
    bx: f64,
    cx: f64,
    ay: f64,
    by: f64,
    cy: f64,
}

impl CubicBezier {
    pub fn new(points: [f64; 4]) -> Self {
        let [x1, y1, x2, y2] = points;
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    /// Builds a curve from chart data, rejecting short or non-finite point lists.
    pub fn from_slice(points: &[f64]) -> Option<Self> {
        match points {
            [x1, y1, x2, y2, ..] if points[..4].iter().all(|p| p.is_finite()) => {
                Some(Self::new([*x1, *y1, *x2, *y2]))
            }
            _ => None,
        }
    }

    #[inline(always)]
    fn x_at(&self, t: f64) -> f64 {
        ((self.ax * t + self.bx) * t + self.cx) * t
    }

    #[inline(always)]
    fn y_at(&self, t: f64) -> f64 {
        ((self.ay * t + self.by) * t + self.cy) * t
    }

    #[inline(always)]
    fn dx_at(&self, t: f64) -> f64 {
        (3.0 * self.ax * t + 2.0 * self.bx) * t + self.cx
    }

    /// The curve parameter whose x coordinate is `x`.
    fn solve_t(&self, x: f64) -> f64 {
        let mut t = x;
        for _ in 0..8 {
            let err = self.x_at(t) - x;
            if err.abs() < 1e-9 {
                return t;
            }
            let slope = self.dx_at(t);
            if slope.abs() < 1e-9 {
                break;
            }
            t -= err / slope;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        t = x.clamp(0.0, 1.0);
        for _ in 0..64 {
            let value = self.x_at(t);
            if (value - x).abs() < 1e-9 {
                break;
            }
            if value < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) / 2.0;
        }
        t
    }

    pub fn apply(&self, x: f64) -> f64 {
        self.y_at(self.solve_t(x))
    }

    /// `∫₀ˣ y dx`, taken as `∫₀ᵗ y(s)·x'(s) ds` in the curve parameter.
    pub fn antiderivative(&self, x: f64) -> f64 {
        let t = self.solve_t(x);
        // y(s)·x'(s) expanded as a degree-5 polynomial, integrated term by term.
        let (ay, by, cy) = (self.ay, self.by, self.cy);
        let (dx2, dx1, dx0) = (3.0 * self.ax, 2.0 * self.bx, self.cx);
        let c5 = ay * dx2;
        let c4 = ay * dx1 + by * dx2;
        let c3 = ay * dx0 + by * dx1 + cy * dx2;
        let c2 = by * dx0 + cy * dx1;
        let c1 = cy * dx0;
        t * t * (c1 / 2.0 + t * (c2 / 3.0 + t * (c3 / 4.0 + t * (c4 / 5.0 + t * c5 / 6.0))))
    }
}

/// The shaping half of an event: a catalog shape or a Bézier, plus the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Easing {
    pub curve: Curve,
    pub left: f64,
    pub right: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    Named(EasingKind),
    Bezier(CubicBezier),
}

impl Default for Easing {
    fn default() -> Self {
        Self::linear()
    }
}

impl Easing {
    pub const fn linear() -> Self {
        Self {
            curve: Curve::Named(EasingKind::Linear),
            left: 0.0,
            right: 1.0,
        }
    }

    pub fn named(kind: EasingKind, left: f64, right: f64) -> Self {
        Self { curve: Curve::Named(kind), left, right }
    }

    /// Chart-side constructor: a usable Bézier wins over the easing index.
    pub fn from_chart(index: i64, left: f64, right: f64, bezier: Option<&[f64]>) -> Self {
        match bezier.and_then(CubicBezier::from_slice) {
            Some(curve) => Self { curve: Curve::Bezier(curve), left: 0.0, right: 1.0 },
            None => Self::named(EasingKind::from_index(index), left, right),
        }
    }

    #[inline(always)]
    fn shape(&self, x: f64) -> f64 {
        match &self.curve {
            Curve::Named(kind) => kind.apply(x),
            Curve::Bezier(bezier) => bezier.apply(x),
        }
    }

    #[inline(always)]
    fn shape_integral(&self, x: f64) -> f64 {
        match &self.curve {
            Curve::Named(kind) => kind.antiderivative(x),
            Curve::Bezier(bezier) => bezier.antiderivative(x),
        }
    }

    /// The window actually used, or `None` when it cannot be renormalized.
    fn window(&self) -> Option<(f64, f64, f64, f64)> {
        let (left, right) = match self.curve {
            Curve::Bezier(_) => (0.0, 1.0),
            Curve::Named(_) => (clamp_unit(self.left), clamp_unit(self.right)),
        };
        if right - left <= DEGENERATE_EPSILON {
            return None;
        }
        let (low, high) = (self.shape(left), self.shape(right));
        if (high - low).abs() <= DEGENERATE_EPSILON {
            return None;
        }
        Some((left, right, low, high))
    }

    /// Maps progress through the renormalized window; always `0 → 0` and `1 → 1`.
    pub fn ease(&self, x: f64) -> f64 {
        let x = clamp_unit(x);
        match self.window() {
            Some((left, right, low, high)) => (self.shape(left + (right - left) * x) - low) / (high - low),
            None => x,
        }
    }

    /// `∫₀ˣ ease(u) du` in closed form.
    pub fn integral(&self, x: f64) -> f64 {
        let x = clamp_unit(x);
        match self.window() {
            Some((left, right, low, high)) => {
                let span = right - left;
                let area = (self.shape_integral(left + span * x) - self.shape_integral(left)) / span;
                (area - low * x) / (high - low)
            }
            None => x * x / 2.0,
        }
    }

    /// Slope of `ease` at `x`, by centered difference kept inside `[0, 1]`.
    pub fn derivative(&self, x: f64) -> f64 {
        let x = clamp_unit(x);
        let lo = (x - DERIVATIVE_EPSILON).max(0.0);
        let hi = (x + DERIVATIVE_EPSILON).min(1.0);
        (self.ease(hi) - self.ease(lo)) / (hi - lo)
    }
}

#[inline(always)]
fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn midpoint_area(easing: &Easing, x: f64) -> f64 {
        let steps = 20_000;
        let h = x / steps as f64;
        (0..steps).map(|i| easing.ease((i as f64 + 0.5) * h) * h).sum()
    }

    #[test]
    fn every_shape_is_anchored_at_both_ends() {
        for kind in EasingKind::ALL {
            assert!(kind.apply(0.0).abs() < 1e-9, "{:?} at 0", kind);
            assert!((kind.apply(1.0) - 1.0).abs() < 1e-9, "{:?} at 1", kind);
        }
    }

    #[test]
    fn out_of_range_index_is_linear() {
        assert_eq!(EasingKind::from_index(0), EasingKind::Linear);
        assert_eq!(EasingKind::from_index(29), EasingKind::Linear);
        assert_eq!(EasingKind::from_index(-3), EasingKind::Linear);
        assert_eq!(EasingKind::from_index(28), EasingKind::BounceInOut);
        assert_eq!(EasingKind::from_index(4).index(), 4);
    }

    #[test]
    fn closed_form_integral_matches_midpoint_sum_for_every_shape() {
        for kind in EasingKind::ALL {
            let easing = Easing::named(kind, 0.0, 1.0);
            for x in [0.3, 0.5, 0.77, 1.0] {
                let expected = midpoint_area(&easing, x);
                let actual = easing.integral(x);
                assert!(
                    (expected - actual).abs() < 1e-5,
                    "{:?} at {}: {} vs {}",
                    kind,
                    x,
                    actual,
                    expected
                );
            }
        }
    }

    #[test]
    fn partial_window_is_renormalized() {
        let easing = Easing::named(EasingKind::QuadIn, 0.5, 1.0);
        assert_eq!(easing.ease(0.0), 0.0);
        assert!((easing.ease(1.0) - 1.0).abs() < 1e-12);
        // x² over [0.5, 1]: (0.75² - 0.25) / 0.75
        assert!((easing.ease(0.5) - (0.5625 - 0.25) / 0.75).abs() < 1e-12);
        let expected = midpoint_area(&easing, 0.6);
        assert!((easing.integral(0.6) - expected).abs() < 1e-6);
    }

    #[test]
    fn degenerate_window_falls_back_to_linear() {
        let easing = Easing::named(EasingKind::CubicIn, 0.7, 0.7);
        assert_eq!(easing.ease(0.25), 0.25);
        assert_eq!(easing.integral(1.0), 0.5);
    }

    #[test]
    fn bezier_tracks_its_control_polygon() {
        let linear = Easing::from_chart(5, 0.2, 0.8, Some(&[0.25, 0.25, 0.75, 0.75][..]));
        assert!(matches!(linear.curve, Curve::Bezier(_)));
        assert!((linear.ease(0.4) - 0.4).abs() < 1e-6);
        assert!((linear.integral(1.0) - 0.5).abs() < 1e-6);

        let ease_in_out = Easing::from_chart(1, 0.0, 1.0, Some(&[0.42, 0.0, 0.58, 1.0][..]));
        assert!(ease_in_out.ease(0.2) < 0.2);
        assert!((ease_in_out.ease(0.5) - 0.5).abs() < 1e-6);
        let expected = midpoint_area(&ease_in_out, 0.9);
        assert!((ease_in_out.integral(0.9) - expected).abs() < 1e-5);
    }

    #[test]
    fn short_bezier_list_uses_named_shape() {
        let easing = Easing::from_chart(5, 0.0, 1.0, Some(&[0.1, 0.2][..]));
        assert_eq!(easing.curve, Curve::Named(EasingKind::QuadIn));
    }

    #[test]
    fn derivative_matches_analytic_slope() {
        let quad = Easing::named(EasingKind::QuadIn, 0.0, 1.0);
        assert!((quad.derivative(0.5) - 1.0).abs() < 1e-6);
        // One-sided at the edges.
        assert!((quad.derivative(1.0) - 2.0).abs() < 1e-3);
        assert!(quad.derivative(0.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn integral_is_monotonic_for_non_overshooting_shapes(
            index in prop::sample::select(vec![1i64, 2, 3, 4, 5, 6, 7, 8, 9, 12, 16, 17, 18, 19, 22]),
            left in 0.0f64..0.45,
            right in 0.55f64..1.0,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let easing = Easing::named(EasingKind::from_index(index), left, right);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(easing.integral(hi) + 1e-12 >= easing.integral(lo));
            prop_assert!(easing.integral(1.0) <= 1.0 + 1e-9);
        }
    }
}
