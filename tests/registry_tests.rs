//! BodyRegistry unit tests

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tidepool::error::RegistryError;
    use tidepool::physics::{BodyParams, PhysicsConfig, PhysicsWorld, Shape};
    use tidepool::protocol::BodyMetadata;
    use tidepool::registry::BodyRegistry;
    use tidepool::types::Vec2;

    fn registry() -> BodyRegistry {
        BodyRegistry::new(PhysicsWorld::new(PhysicsConfig::default()))
    }

    fn crab(x: f32) -> BodyParams {
        BodyParams::new("crab", Shape::Circle { radius: 10.0 }, Vec2::new(x, 100.0))
            .with_metadata(BodyMetadata::with_group("crab"))
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut reg = registry();
        reg.register("crab_1", crab(0.0), None).unwrap();
        let err = reg.register("crab_1", crab(50.0), None).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("crab_1".into()));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.physics().len(), 1);
    }

    #[test]
    fn unregister_removes_from_physics_synchronously() {
        let mut reg = registry();
        let h = reg.register("crab_1", crab(0.0), None).unwrap();
        reg.physics_mut().add_tether(h, 15.0).unwrap();

        assert!(reg.unregister("crab_1").is_some());
        assert!(!reg.contains("crab_1"));
        assert!(reg.physics().get(h).is_none());
        assert!(reg.physics().tethers().is_empty());
        assert!(reg.id_of(h).is_none());
        assert!(reg.unregister("crab_1").is_none());
    }

    #[test]
    fn ids_can_be_reused_after_unregister() {
        let mut reg = registry();
        let first = reg.register("crab_1", crab(0.0), None).unwrap();
        reg.unregister("crab_1");
        let second = reg.register("crab_1", crab(0.0), None).unwrap();
        assert_ne!(first, second);
        assert_eq!(reg.handle_of("crab_1"), Some(second));
    }

    #[test]
    fn group_lookup_is_in_creation_order() {
        let mut reg = registry();
        reg.register("c", crab(0.0), None).unwrap();
        reg.register(
            "rock",
            BodyParams::new("rock", Shape::Circle { radius: 5.0 }, Vec2::zero()),
            None,
        )
        .unwrap();
        reg.register("a", crab(20.0), None).unwrap();
        reg.register("b", crab(40.0), None).unwrap();

        assert_eq!(reg.ids_with_group("crab"), vec!["c", "a", "b"]);
        assert_eq!(reg.all_with_group("nobody").count(), 0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/crab.png".into()))
            .unwrap();
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.physics().is_empty());
        assert!(reg.take_asset_requests().is_empty());
    }

    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    #[test]
    fn texture_requests_resolve_into_assets() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/crab.png".into()))
            .unwrap();
        assert!(reg.asset_pending("a"));

        let tickets = reg.take_asset_requests();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].path, "/img/crab.png");
        assert!(reg.take_asset_requests().is_empty());

        assert!(reg.resolve_asset(&tickets[0], Ok(Bytes::from_static(b"png"))));
        assert!(!reg.asset_pending("a"));
        let asset = reg.asset("a").unwrap();
        assert_eq!(asset.data.as_ref(), b"png");
        assert_eq!(reg.texture("a"), Some("/img/crab.png"));
    }

    #[test]
    fn failed_loads_leave_the_slot_empty() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/missing.png".into()))
            .unwrap();
        let tickets = reg.take_asset_requests();
        assert!(reg.resolve_asset(&tickets[0], Err("not found".into())));
        assert!(reg.asset("a").is_none());
        assert!(!reg.asset_pending("a"));
    }

    #[test]
    fn completions_for_removed_bodies_are_discarded() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/crab.png".into()))
            .unwrap();
        let tickets = reg.take_asset_requests();
        reg.unregister("a");

        assert!(!reg.resolve_asset(&tickets[0], Ok(Bytes::from_static(b"png"))));
        assert!(reg.asset("a").is_none());
    }

    #[test]
    fn stale_tickets_do_not_touch_a_reused_id() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/old.png".into()))
            .unwrap();
        let old = reg.take_asset_requests();
        reg.unregister("a");
        reg.register("a", crab(0.0), Some("/img/new.png".into()))
            .unwrap();

        assert!(!reg.resolve_asset(&old[0], Ok(Bytes::from_static(b"old"))));
        assert!(reg.asset_pending("a"));

        let fresh = reg.take_asset_requests();
        assert!(reg.resolve_asset(&fresh[0], Ok(Bytes::from_static(b"new"))));
        assert_eq!(reg.asset("a").unwrap().path, "/img/new.png");
    }

    #[test]
    fn unregister_drops_queued_requests() {
        let mut reg = registry();
        reg.register("a", crab(0.0), Some("/img/crab.png".into()))
            .unwrap();
        reg.unregister("a");
        assert!(reg.take_asset_requests().is_empty());
    }
}
