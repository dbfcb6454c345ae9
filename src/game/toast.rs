use std::collections::VecDeque;
use crate::game::achievements::Achievement;

/// Shows one achievement at a time; later unlocks wait in FIFO order.
#[derive(Debug, Default)]
pub struct ToastController {
    showing: Option<Achievement>,
    pending: VecDeque<Achievement>,
}

impl ToastController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, achievement: Achievement) {
        if self.showing.is_none() {
            self.showing = Some(achievement);
        } else {
            self.pending.push_back(achievement);
        }
    }

    /// Hide the visible toast and promote the next queued one, if any.
    /// Returns the dismissed achievement.
    pub fn dismiss(&mut self) -> Option<Achievement> {
        let dismissed = self.showing.take();
        self.showing = self.pending.pop_front();
        dismissed
    }

    pub fn current(&self) -> Option<&Achievement> {
        self.showing.as_ref()
    }

    pub fn is_showing(&self) -> bool {
        self.showing.is_some()
    }

    /// `(achievement, show)` pair handed to the presentation layer.
    pub fn view(&self) -> (Option<&Achievement>, bool) {
        (self.showing.as_ref(), self.showing.is_some())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::achievements::CATALOG;

    fn achievement(idx: usize) -> Achievement {
        Achievement::from(&CATALOG[idx])
    }

    #[test]
    fn test_idle_to_showing() {
        let mut toast = ToastController::new();
        assert!(!toast.is_showing());
        assert_eq!(toast.view(), (None, false));

        toast.enqueue(achievement(0));
        assert!(toast.is_showing());
        assert_eq!(toast.current().unwrap().id, "first_prediction");
    }

    #[test]
    fn test_fifo_without_interrupting() {
        let mut toast = ToastController::new();
        toast.enqueue(achievement(0));
        toast.enqueue(achievement(1));
        toast.enqueue(achievement(2));

        assert_eq!(toast.current().unwrap().id, "first_prediction");
        assert_eq!(toast.pending(), 2);

        assert_eq!(toast.dismiss().unwrap().id, "first_prediction");
        assert_eq!(toast.current().unwrap().id, "getting_started");
        toast.dismiss();
        assert_eq!(toast.current().unwrap().id, "hot_streak");
        toast.dismiss();
        assert!(!toast.is_showing());
    }

    #[test]
    fn test_dismiss_when_idle() {
        let mut toast = ToastController::new();
        assert!(toast.dismiss().is_none());
        assert!(!toast.is_showing());
    }
}
