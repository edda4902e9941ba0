//! Hub navigation and popup board unit tests

#[cfg(test)]
mod tests {
    use tidepool::effects::PopupBoard;
    use tidepool::hub::{
        HubState, BACK_BUTTON_AT, BACK_BUTTON_SIZE, TARGET_POSITIONS, TARGET_SIZE,
    };
    use tidepool::protocol::PopupShown;
    use tidepool::types::Vec2;
    use tidepool::{Hub, Transition};

    fn centre_of(index: usize) -> Vec2 {
        TARGET_POSITIONS[index] + Vec2::new(TARGET_SIZE / 2.0, TARGET_SIZE / 2.0)
    }

    // -----------------------------------------------------------------------
    // Hub
    // -----------------------------------------------------------------------

    #[test]
    fn default_hub_leads_to_the_beach() {
        let mut hub = Hub::default();
        assert_eq!(hub.state(), &HubState::Hub);
        assert_eq!(hub.targets().len(), TARGET_POSITIONS.len());

        let t = hub.click(centre_of(0)).unwrap();
        assert_eq!(
            t,
            Transition::Enter {
                target: 0,
                room: Some("room_beach".into())
            }
        );
        assert_eq!(hub.state(), &HubState::Challenge(0));
        assert!(hub.targets()[0].visited);
        assert!(!hub.targets()[1].visited);
    }

    #[test]
    fn unmapped_targets_enter_an_empty_challenge() {
        let mut hub = Hub::default();
        let t = hub.click(centre_of(3)).unwrap();
        assert_eq!(t, Transition::Enter { target: 3, room: None });
    }

    #[test]
    fn target_edges_are_inclusive() {
        let mut hub = Hub::new([(5, "room_cave")]);
        let corner = TARGET_POSITIONS[5] + Vec2::new(TARGET_SIZE, TARGET_SIZE);
        assert!(hub.click(corner).is_some());

        let mut hub = Hub::default();
        let outside = TARGET_POSITIONS[0] - Vec2::new(0.5, 0.0);
        assert!(hub.click(outside).is_none());
        assert_eq!(hub.state(), &HubState::Hub);
    }

    #[test]
    fn back_button_only_works_inside_a_challenge() {
        let mut hub = Hub::default();
        let back = BACK_BUTTON_AT + BACK_BUTTON_SIZE * 0.5;
        assert!(hub.click(back).is_none());

        hub.click(centre_of(0)).unwrap();
        // Targets are inert while a challenge is open.
        assert!(hub.click(centre_of(1)).is_none());
        assert_eq!(hub.click(back), Some(Transition::BackToHub));
        assert_eq!(hub.state(), &HubState::Hub);
        assert!(hub.targets()[0].visited);
    }

    // -----------------------------------------------------------------------
    // Popups
    // -----------------------------------------------------------------------

    fn shown(text: &str) -> PopupShown {
        PopupShown {
            text: text.into(),
            x: 100.0,
            y: 200.0,
        }
    }

    #[test]
    fn popups_rise_and_fade() {
        let mut board = PopupBoard::new(1000.0, 0.05);
        board.show(&shown("Yum!"));

        let fresh = board.views();
        assert_eq!(fresh[0].alpha, 1.0);
        assert_eq!(fresh[0].y, 200.0);

        board.advance(500.0);
        let half = board.views();
        assert!((half[0].alpha - 0.5).abs() < 1e-5);
        assert!((half[0].y - 175.0).abs() < 1e-4);
        assert_eq!(half[0].x, 100.0);
    }

    #[test]
    fn expired_popups_are_dropped() {
        let mut board = PopupBoard::new(1000.0, 0.05);
        board.show(&shown("old"));
        board.advance(600.0);
        board.show(&shown("new"));
        board.advance(400.0);

        let views = board.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].text, "new");

        board.clear();
        assert!(board.is_empty());
    }
}
