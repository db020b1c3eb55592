use std::fmt;
use std::rc::Rc;

use crate::domain::ActionError;

/// Outcome of a node action.
pub type ActionResult = Result<(), ActionError>;

/// Zero-argument callable stored on a node.
///
/// Cloning shares the callable, so copied nodes run the same action.
#[derive(Clone)]
pub struct Action(Rc<dyn Fn() -> ActionResult>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> ActionResult + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self) -> ActionResult {
        (self.0)()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// Confirms that a node has really been reached.
#[derive(Clone)]
pub struct Checkin(Rc<dyn Fn() -> bool>);

impl Checkin {
    pub fn confirm(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for Checkin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Checkin(..)")
    }
}

/// Payload of an action node.
///
/// `to` runs when navigation enters the node from its parent, `back` when it
/// leaves the node toward its parent. Both are mandatory.
#[derive(Debug, Clone)]
pub struct Actions {
    to: Action,
    back: Action,
    on_reached: Option<Action>,
    checkin: Option<Checkin>,
}

impl Actions {
    pub fn new<F, B>(to: F, back: B) -> Self
    where
        F: Fn() -> ActionResult + 'static,
        B: Fn() -> ActionResult + 'static,
    {
        Self {
            to: Action::new(to),
            back: Action::new(back),
            on_reached: None,
            checkin: None,
        }
    }

    /// Runs every time the node becomes the current node, from either direction.
    pub fn with_on_reached<F>(mut self, f: F) -> Self
    where
        F: Fn() -> ActionResult + 'static,
    {
        self.on_reached = Some(Action::new(f));
        self
    }

    /// Polled after entering the node; the step only counts once it returns true.
    pub fn with_checkin<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.checkin = Some(Checkin(Rc::new(f)));
        self
    }

    pub fn to(&self) -> ActionResult {
        self.to.call()
    }

    pub fn back(&self) -> ActionResult {
        self.back.call()
    }

    pub fn reached(&self) -> ActionResult {
        match &self.on_reached {
            Some(action) => action.call(),
            None => Ok(()),
        }
    }

    pub fn checkin(&self) -> Option<&Checkin> {
        self.checkin.as_ref()
    }
}
