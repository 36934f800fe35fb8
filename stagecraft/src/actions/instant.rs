//! Zero-length actions that apply their whole effect on the first step.

use std::fmt;
use std::rc::Rc;

use super::action::{step_instant, Action, ActionCore, ActionKind};
use super::target::ActionTarget;
use crate::math::Vec2;

macro_rules! instant_action {
    () => {
        action_core!();

        fn kind(&self) -> ActionKind {
            ActionKind::Instant
        }

        fn step(&mut self, _dt: f32, target: &mut dyn ActionTarget) {
            step_instant(self, target);
        }

        fn is_done(&self) -> bool {
            true
        }
    };
}

#[derive(Debug)]
pub struct Show {
    core: ActionCore,
}

impl Show {
    pub fn new() -> Self {
        Self {
            core: ActionCore::instant(),
        }
    }
}

impl Default for Show {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for Show {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.set_visible(true);
    }

    fn reverse(&self) -> Box<dyn Action> {
        Box::new(Hide {
            core: self.core.reverse_config(),
        })
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}

#[derive(Debug)]
pub struct Hide {
    core: ActionCore,
}

impl Hide {
    pub fn new() -> Self {
        Self {
            core: ActionCore::instant(),
        }
    }
}

impl Default for Hide {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for Hide {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.set_visible(false);
    }

    fn reverse(&self) -> Box<dyn Action> {
        Box::new(Show {
            core: self.core.reverse_config(),
        })
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}

#[derive(Debug)]
pub struct ToggleVisibility {
    core: ActionCore,
}

impl ToggleVisibility {
    pub fn new() -> Self {
        Self {
            core: ActionCore::instant(),
        }
    }
}

impl Default for ToggleVisibility {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for ToggleVisibility {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        let visible = target.is_visible();
        target.set_visible(!visible);
    }

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}

/// Detaches the target from its parent.
#[derive(Debug)]
pub struct RemoveSelf {
    core: ActionCore,
    cleanup: bool,
}

impl RemoveSelf {
    pub fn new(cleanup: bool) -> Self {
        Self {
            core: ActionCore::instant(),
            cleanup,
        }
    }
}

impl Action for RemoveSelf {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.remove_from_parent(self.cleanup);
    }

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            cleanup: self.cleanup,
        })
    }
}

#[derive(Debug)]
pub struct FlipX {
    core: ActionCore,
    flipped: bool,
}

impl FlipX {
    pub fn new(flipped: bool) -> Self {
        Self {
            core: ActionCore::instant(),
            flipped,
        }
    }
}

impl Action for FlipX {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.set_flipped_x(self.flipped);
    }

    fn reverse(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.reverse_config(),
            flipped: !self.flipped,
        })
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            flipped: self.flipped,
        })
    }
}

#[derive(Debug)]
pub struct FlipY {
    core: ActionCore,
    flipped: bool,
}

impl FlipY {
    pub fn new(flipped: bool) -> Self {
        Self {
            core: ActionCore::instant(),
            flipped,
        }
    }
}

impl Action for FlipY {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.set_flipped_y(self.flipped);
    }

    fn reverse(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.reverse_config(),
            flipped: !self.flipped,
        })
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            flipped: self.flipped,
        })
    }
}

/// Sets the target position.
#[derive(Debug)]
pub struct Place {
    core: ActionCore,
    position: Vec2,
}

impl Place {
    pub fn new(position: impl Into<Vec2>) -> Self {
        Self {
            core: ActionCore::instant(),
            position: position.into(),
        }
    }
}

impl Action for Place {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        target.set_position(self.position);
    }

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            position: self.position,
        })
    }
}

pub type Callback = Rc<dyn Fn(&mut dyn ActionTarget)>;

/// Invokes a callback with the target.
pub struct CallFunc {
    core: ActionCore,
    callback: Callback,
}

impl CallFunc {
    pub fn new(callback: impl Fn(&mut dyn ActionTarget) + 'static) -> Self {
        Self {
            core: ActionCore::instant(),
            callback: Rc::new(callback),
        }
    }
}

impl fmt::Debug for CallFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFunc")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Action for CallFunc {
    instant_action!();

    fn apply(&mut self, _t: f32, target: &mut dyn ActionTarget) {
        (self.callback)(target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            callback: Rc::clone(&self.callback),
        })
    }
}

/// Does nothing. Pads single-action sequences.
#[derive(Debug)]
pub struct ExtraAction {
    core: ActionCore,
}

impl ExtraAction {
    pub fn new() -> Self {
        Self {
            core: ActionCore::instant(),
        }
    }
}

impl Default for ExtraAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for ExtraAction {
    instant_action!();

    fn apply(&mut self, _t: f32, _target: &mut dyn ActionTarget) {}

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}
