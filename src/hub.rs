//! The hub screen: a handful of click targets that lead into rooms, and a
//! back button that returns from a room to the hub.

use serde::{Deserialize, Serialize};

use crate::types::Vec2;

pub const TARGET_SIZE: f32 = 60.0;
pub const BACK_BUTTON_SIZE: Vec2 = Vec2::new(154.0, 51.0);
pub const BACK_BUTTON_AT: Vec2 = Vec2::new(25.0, 430.0);

/// Top-left corners of the hub targets.
pub const TARGET_POSITIONS: [Vec2; 6] = [
    Vec2::new(185.0, 220.0),
    Vec2::new(257.0, 160.0),
    Vec2::new(370.0, 150.0),
    Vec2::new(430.0, 190.0),
    Vec2::new(530.0, 220.0),
    Vec2::new(555.0, 270.0),
];

/// Axis-aligned click box, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickBox {
    pub origin: Vec2,
    pub size: Vec2,
}

impl ClickBox {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.origin.x
            && p.x <= self.origin.x + self.size.x
            && p.y >= self.origin.y
            && p.y <= self.origin.y + self.size.y
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubTarget {
    pub index: usize,
    pub area: ClickBox,
    /// Room entered through this target; `None` leads to an empty challenge.
    pub room: Option<String>,
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubState {
    Hub,
    Challenge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Enter { target: usize, room: Option<String> },
    BackToHub,
}

#[derive(Debug, Clone)]
pub struct Hub {
    state: HubState,
    targets: Vec<HubTarget>,
    back_button: ClickBox,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new([(0, "room_beach")])
    }
}

impl Hub {
    /// Hub with the standard targets; `rooms` maps target index → room.
    pub fn new<'a>(rooms: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        let mut targets: Vec<HubTarget> = TARGET_POSITIONS
            .iter()
            .enumerate()
            .map(|(index, origin)| HubTarget {
                index,
                area: ClickBox {
                    origin: *origin,
                    size: Vec2::new(TARGET_SIZE, TARGET_SIZE),
                },
                room: None,
                visited: false,
            })
            .collect();
        for (index, room) in rooms {
            if let Some(t) = targets.get_mut(index) {
                t.room = Some(room.to_string());
            }
        }

        Self {
            state: HubState::Hub,
            targets,
            back_button: ClickBox {
                origin: BACK_BUTTON_AT,
                size: BACK_BUTTON_SIZE,
            },
        }
    }

    pub fn state(&self) -> &HubState {
        &self.state
    }

    pub fn targets(&self) -> &[HubTarget] {
        &self.targets
    }

    /// Handle a click in canvas coordinates.
    ///
    /// Targets only react on the hub screen, the back button only inside a
    /// challenge.
    pub fn click(&mut self, p: Vec2) -> Option<Transition> {
        match self.state {
            HubState::Hub => {
                let target = self.targets.iter_mut().find(|t| t.area.contains(p))?;
                target.visited = true;
                self.state = HubState::Challenge(target.index);
                Some(Transition::Enter {
                    target: target.index,
                    room: target.room.clone(),
                })
            }
            HubState::Challenge(_) => {
                if self.back_button.contains(p) {
                    self.state = HubState::Hub;
                    Some(Transition::BackToHub)
                } else {
                    None
                }
            }
        }
    }
}
