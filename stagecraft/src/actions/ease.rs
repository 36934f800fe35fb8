//! Easing curves and the class-style ease decorator.
//!
//! [`Easing`] is the stateless form: a curve value that can be attached to any
//! action's ease chain with [`ActionExt::easing`](super::ActionExt::easing).
//! [`EaseAction`] is the decorator form that wraps an inner action.
//!
//! Every curve maps 0 to 0 and 1 to 1. Back and elastic curves overshoot in
//! between.

use std::f32::consts::PI;

use super::action::{Action, ActionCore};
use super::composite::drive_child;
use super::target::ActionTarget;

const BACK_OVERSHOOT: f32 = 1.70158;
const DEFAULT_ELASTIC_PERIOD: f32 = 0.3;

/// A remapping of normalized time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    /// `t^rate`
    In(f32),
    /// `t^(1/rate)`
    Out(f32),
    InOut(f32),
    ExponentialIn,
    ExponentialOut,
    ExponentialInOut,
    SineIn,
    SineOut,
    SineInOut,
    /// Elastic curves carry their period.
    ElasticIn(f32),
    ElasticOut(f32),
    ElasticInOut(f32),
    BounceIn,
    BounceOut,
    BounceInOut,
    BackIn,
    BackOut,
    BackInOut,
    /// Cubic Bezier through four control values.
    Bezier(f32, f32, f32, f32),
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    CircIn,
    CircOut,
    CircInOut,
}

impl Easing {
    pub fn elastic_in() -> Self {
        Easing::ElasticIn(DEFAULT_ELASTIC_PERIOD)
    }

    pub fn elastic_out() -> Self {
        Easing::ElasticOut(DEFAULT_ELASTIC_PERIOD)
    }

    pub fn elastic_in_out() -> Self {
        Easing::ElasticInOut(DEFAULT_ELASTIC_PERIOD)
    }

    pub fn ease(&self, t: f32) -> f32 {
        match *self {
            Easing::In(rate) => t.powf(rate),
            Easing::Out(rate) => t.powf(1.0 / rate),
            Easing::InOut(rate) => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t.powf(rate)
                } else {
                    1.0 - 0.5 * (2.0 - t).powf(rate)
                }
            }
            Easing::ExponentialIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * (t - 1.0))
                }
            }
            Easing::ExponentialOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::ExponentialInOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * 2f32.powf(10.0 * (t - 1.0))
                } else {
                    0.5 * (2.0 - 2f32.powf(-10.0 * (t - 1.0)))
                }
            }
            Easing::SineIn => endpoints(t).unwrap_or_else(|| 1.0 - (t * PI / 2.0).cos()),
            Easing::SineOut => endpoints(t).unwrap_or_else(|| (t * PI / 2.0).sin()),
            Easing::SineInOut => endpoints(t).unwrap_or_else(|| -0.5 * ((PI * t).cos() - 1.0)),
            Easing::ElasticIn(period) => endpoints(t).unwrap_or_else(|| {
                let t = t - 1.0;
                -(2f32.powf(10.0 * t)) * ((t - period / 4.0) * PI * 2.0 / period).sin()
            }),
            Easing::ElasticOut(period) => endpoints(t).unwrap_or_else(|| {
                2f32.powf(-10.0 * t) * ((t - period / 4.0) * PI * 2.0 / period).sin() + 1.0
            }),
            Easing::ElasticInOut(period) => endpoints(t).unwrap_or_else(|| {
                let s = period / 4.0;
                let t = t * 2.0 - 1.0;
                if t < 0.0 {
                    -0.5 * 2f32.powf(10.0 * t) * ((t - s) * PI * 2.0 / period).sin()
                } else {
                    2f32.powf(-10.0 * t) * ((t - s) * PI * 2.0 / period).sin() * 0.5 + 1.0
                }
            }),
            Easing::BounceIn => 1.0 - bounce_time(1.0 - t),
            Easing::BounceOut => bounce_time(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_time(1.0 - t * 2.0)) * 0.5
                } else {
                    bounce_time(t * 2.0 - 1.0) * 0.5 + 0.5
                }
            }
            Easing::BackIn => endpoints(t)
                .unwrap_or_else(|| t * t * ((BACK_OVERSHOOT + 1.0) * t - BACK_OVERSHOOT)),
            Easing::BackOut => {
                let t = t - 1.0;
                t * t * ((BACK_OVERSHOOT + 1.0) * t + BACK_OVERSHOOT) + 1.0
            }
            Easing::BackInOut => {
                let overshoot = BACK_OVERSHOOT * 1.525;
                let t = t * 2.0;
                if t < 1.0 {
                    (t * t * ((overshoot + 1.0) * t - overshoot)) / 2.0
                } else {
                    let t = t - 2.0;
                    (t * t * ((overshoot + 1.0) * t + overshoot)) / 2.0 + 1.0
                }
            }
            Easing::Bezier(a, b, c, d) => bezier_at(a, b, c, d, t),
            Easing::QuadIn => t * t,
            Easing::QuadOut => -t * (t - 2.0),
            Easing::QuadInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    t * t * 0.5
                } else {
                    let t = t - 1.0;
                    -0.5 * (t * (t - 2.0) - 1.0)
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let t = t - 1.0;
                t * t * t + 1.0
            }
            Easing::CubicInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * t + 2.0)
                }
            }
            Easing::QuartIn => t * t * t * t,
            Easing::QuartOut => {
                let t = t - 1.0;
                -(t * t * t * t - 1.0)
            }
            Easing::QuartInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t * t
                } else {
                    let t = t - 2.0;
                    -0.5 * (t * t * t * t - 2.0)
                }
            }
            Easing::QuintIn => t * t * t * t * t,
            Easing::QuintOut => {
                let t = t - 1.0;
                t * t * t * t * t + 1.0
            }
            Easing::QuintInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t * t * t * t
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * t * t * t + 2.0)
                }
            }
            Easing::CircIn => -((1.0 - t * t).sqrt() - 1.0),
            Easing::CircOut => {
                let t = t - 1.0;
                (1.0 - t * t).sqrt()
            }
            Easing::CircInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    -0.5 * ((1.0 - t * t).sqrt() - 1.0)
                } else {
                    let t = t - 2.0;
                    0.5 * ((1.0 - t * t).sqrt() + 1.0)
                }
            }
        }
    }

    /// The curve to use when the owning action plays backwards.
    ///
    /// Paired In/Out curves swap; symmetric InOut curves return themselves.
    pub fn reverse(&self) -> Easing {
        match *self {
            Easing::In(rate) => Easing::In(1.0 / rate),
            Easing::Out(rate) => Easing::Out(1.0 / rate),
            Easing::InOut(rate) => Easing::InOut(rate),
            Easing::ExponentialIn => Easing::ExponentialOut,
            Easing::ExponentialOut => Easing::ExponentialIn,
            Easing::SineIn => Easing::SineOut,
            Easing::SineOut => Easing::SineIn,
            Easing::ElasticIn(period) => Easing::ElasticOut(period),
            Easing::ElasticOut(period) => Easing::ElasticIn(period),
            Easing::BounceIn => Easing::BounceOut,
            Easing::BounceOut => Easing::BounceIn,
            Easing::BackIn => Easing::BackOut,
            Easing::BackOut => Easing::BackIn,
            Easing::Bezier(a, b, c, d) => Easing::Bezier(d, c, b, a),
            Easing::QuadIn => Easing::QuadOut,
            Easing::QuadOut => Easing::QuadIn,
            Easing::CubicIn => Easing::CubicOut,
            Easing::CubicOut => Easing::CubicIn,
            Easing::QuartIn => Easing::QuartOut,
            Easing::QuartOut => Easing::QuartIn,
            Easing::QuintIn => Easing::QuintOut,
            Easing::QuintOut => Easing::QuintIn,
            Easing::CircIn => Easing::CircOut,
            Easing::CircOut => Easing::CircIn,
            symmetric => symmetric,
        }
    }
}

fn endpoints(t: f32) -> Option<f32> {
    (t == 0.0 || t == 1.0).then_some(t)
}

fn bounce_time(t: f32) -> f32 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

/// Cubic Bezier in Bernstein form.
pub fn bezier_at(a: f32, b: f32, c: f32, d: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u.powi(3) * a + 3.0 * t * u.powi(2) * b + 3.0 * t.powi(2) * u * c + t.powi(3) * d
}

/// Decorator that remaps time before it reaches the inner action.
#[derive(Debug)]
pub struct EaseAction {
    core: ActionCore,
    inner: Box<dyn Action>,
    curve: Easing,
}

impl EaseAction {
    pub fn new(inner: Box<dyn Action>, curve: Easing) -> Self {
        Self {
            core: ActionCore::new(inner.core().effective_duration()),
            inner,
            curve,
        }
    }

    pub fn inner(&self) -> &dyn Action {
        self.inner.as_ref()
    }

    pub fn curve(&self) -> Easing {
        self.curve
    }
}

impl Action for EaseAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.inner.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        drive_child(self.inner.as_mut(), self.curve.ease(t), target);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.inner.stop(target);
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.reverse_config(),
            inner: self.inner.reverse(),
            curve: self.curve.reverse(),
        })
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            inner: self.inner.clone_action(),
            curve: self.curve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn all_curves() -> Vec<Easing> {
        vec![
            Easing::In(2.0),
            Easing::Out(2.0),
            Easing::InOut(3.0),
            Easing::ExponentialIn,
            Easing::ExponentialOut,
            Easing::ExponentialInOut,
            Easing::SineIn,
            Easing::SineOut,
            Easing::SineInOut,
            Easing::elastic_in(),
            Easing::elastic_out(),
            Easing::elastic_in_out(),
            Easing::BounceIn,
            Easing::BounceOut,
            Easing::BounceInOut,
            Easing::BackIn,
            Easing::BackOut,
            Easing::BackInOut,
            Easing::Bezier(0.0, 0.2, 0.8, 1.0),
            Easing::QuadIn,
            Easing::QuadOut,
            Easing::QuadInOut,
            Easing::CubicIn,
            Easing::CubicOut,
            Easing::CubicInOut,
            Easing::QuartIn,
            Easing::QuartOut,
            Easing::QuartInOut,
            Easing::QuintIn,
            Easing::QuintOut,
            Easing::QuintInOut,
            Easing::CircIn,
            Easing::CircOut,
            Easing::CircInOut,
        ]
    }

    #[test]
    fn every_curve_fixes_the_endpoints() {
        for curve in all_curves() {
            // Bounce and back land on the endpoints up to rounding.
            let start = curve.ease(0.0);
            let end = curve.ease(1.0);
            assert!(start.abs() < 1e-3, "{curve:?} at 0 gave {start}");
            assert!((end - 1.0).abs() < 1e-3, "{curve:?} at 1 gave {end}");
        }
    }

    #[test]
    fn overshoot_curves_are_exact_at_the_endpoints() {
        for curve in [
            Easing::BackIn,
            Easing::BackOut,
            Easing::BackInOut,
            Easing::elastic_in(),
            Easing::elastic_out(),
            Easing::elastic_in_out(),
        ] {
            assert_eq!(curve.ease(0.0), 0.0, "{curve:?}");
            assert_eq!(curve.ease(1.0), 1.0, "{curve:?}");
        }
        assert!(Easing::BackIn.ease(0.2) < 0.0);
        assert!(Easing::BackOut.ease(0.8) > 1.0);
    }

    #[test]
    fn quadratic_values() {
        assert!(approx_eq(Easing::QuadIn.ease(0.5), 0.25));
        assert!(approx_eq(Easing::QuadOut.ease(0.5), 0.75));
        assert!(approx_eq(Easing::QuadInOut.ease(0.25), 0.125));
        assert!(approx_eq(Easing::QuadInOut.ease(0.5), 0.5));
        assert!(approx_eq(Easing::QuadInOut.ease(0.75), 0.875));
    }

    #[test]
    fn rate_curves() {
        assert!(approx_eq(Easing::In(2.0).ease(0.5), 0.25));
        assert!(approx_eq(Easing::Out(2.0).ease(0.25), 0.5));
        assert!(approx_eq(Easing::InOut(2.0).ease(0.25), 0.125));
    }

    #[test]
    fn bounce_breakpoints_are_continuous() {
        for bp in [1.0 / 2.75, 2.0 / 2.75, 2.5 / 2.75] {
            let below = bounce_time(bp - 1e-4);
            let above = bounce_time(bp + 1e-4);
            assert!((below - above).abs() < 1e-2, "jump at {bp}");
        }
    }

    #[test]
    fn bezier_matches_bernstein_form() {
        let curve = Easing::Bezier(0.0, 0.5, 0.5, 1.0);
        // (3*0.25*0.5*0.5) + (3*0.25*0.5*0.5) + 0.125
        assert!(approx_eq(curve.ease(0.5), 0.5));
        assert_eq!(curve.reverse(), Easing::Bezier(1.0, 0.5, 0.5, 0.0));
    }

    #[test]
    fn paired_curves_swap_and_symmetric_curves_stay() {
        assert_eq!(Easing::QuadIn.reverse(), Easing::QuadOut);
        assert_eq!(Easing::BounceOut.reverse(), Easing::BounceIn);
        assert_eq!(Easing::elastic_in().reverse(), Easing::elastic_out());
        assert_eq!(Easing::SineInOut.reverse(), Easing::SineInOut);
        assert_eq!(Easing::QuadInOut.reverse(), Easing::QuadInOut);
        assert_eq!(Easing::In(2.0).reverse(), Easing::In(0.5));
        for curve in all_curves() {
            let round_trip = curve.reverse().reverse();
            for t in [0.1, 0.4, 0.9] {
                assert!(approx_eq(round_trip.ease(t), curve.ease(t)), "{curve:?}");
            }
        }
    }
}
