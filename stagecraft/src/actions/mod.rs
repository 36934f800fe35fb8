//! The action engine: time-driven behaviors applied to scene nodes.
//!
//! Leaf actions animate one property. Composites ([`Sequence`], [`Spawn`],
//! [`Repeat`], [`RepeatForever`], [`ReverseTime`], [`Speed`]) drive other
//! actions with redistributed normalized time, and [`EaseAction`] or an
//! action's own ease chain reshapes that time. [`ActionManager`] steps
//! everything once per frame.

mod action;
mod composite;
mod ease;
mod instant;
mod interval;
mod manager;
mod target;

pub use action::{
    step_instant, step_interval, Action, ActionCore, ActionExt, ActionKind, RepeatPolicy,
    INVALID_TAG,
};
pub use composite::{Repeat, RepeatForever, ReverseTime, Sequence, Spawn, Speed};
pub use ease::{bezier_at, EaseAction, Easing};
pub use instant::{
    CallFunc, Callback, ExtraAction, FlipX, FlipY, Hide, Place, RemoveSelf, Show,
    ToggleVisibility,
};
pub use interval::{
    BezierBy, BezierConfig, BezierTo, Blink, DelayTime, FadeIn, FadeOut, FadeTo, InertAction,
    JumpBy, JumpTo, MoveBy, MoveTo, RotateBy, RotateTo, ScaleBy, ScaleTo, SkewBy, SkewTo,
    TintBy, TintTo,
};
pub use manager::ActionManager;
pub use target::ActionTarget;
