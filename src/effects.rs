//! Floating popup texts. Each popup rises and fades out over its lifetime.

use crate::protocol::{PopupShown, PopupView};

#[derive(Debug, Clone)]
struct Popup {
    text: String,
    x: f32,
    y: f32,
    age_ms: f32,
}

#[derive(Debug, Clone)]
pub struct PopupBoard {
    lifetime_ms: f32,
    rise_per_ms: f32,
    popups: Vec<Popup>,
}

impl PopupBoard {
    pub fn new(lifetime_ms: f32, rise_per_ms: f32) -> Self {
        Self {
            lifetime_ms,
            rise_per_ms,
            popups: Vec::new(),
        }
    }

    pub fn show(&mut self, shown: &PopupShown) {
        self.popups.push(Popup {
            text: shown.text.clone(),
            x: shown.x,
            y: shown.y,
            age_ms: 0.0,
        });
    }

    /// Age every popup and drop the expired ones.
    pub fn advance(&mut self, delta_ms: f32) {
        let rise = self.rise_per_ms * delta_ms;
        for popup in &mut self.popups {
            popup.age_ms += delta_ms;
            popup.y -= rise;
        }
        let lifetime = self.lifetime_ms;
        self.popups.retain(|p| p.age_ms < lifetime);
    }

    pub fn views(&self) -> Vec<PopupView> {
        self.popups
            .iter()
            .map(|p| PopupView {
                text: p.text.clone(),
                x: p.x,
                y: p.y,
                alpha: (1.0 - p.age_ms / self.lifetime_ms).clamp(0.0, 1.0),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub fn clear(&mut self) {
        self.popups.clear();
    }
}
