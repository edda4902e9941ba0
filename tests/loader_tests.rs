//! Room source unit tests

#[cfg(test)]
mod tests {
    use tidepool::error::LoadError;
    use tidepool::loader::{MemoryRoomSource, RoomData, RoomSource};
    use tidepool::protocol::{ActionDescriptor, TriggerKind};

    const LAYOUT: &str = r#"[
        { "id": "crab_1", "type": "circle", "x": "120", "y": 300.5, "radius": "18",
          "options": { "render": { "sprite": { "texture": "/img/crab.png", "yScale": 0.4 } } },
          "metadata": { "group": "crab", "mood": "grumpy" } }
    ]"#;

    const RULES: &str = r#"[
        { "trigger": "collision", "groups": ["crab", "rock"],
          "actions": [{ "type": "removeSelf" }] }
    ]"#;

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parses_layout_and_rules() {
        let data = RoomData::from_json_strs("beach", LAYOUT, Some(RULES)).unwrap();
        assert_eq!(data.name, "beach");
        assert_eq!(data.bodies.len(), 1);

        let crab = &data.bodies[0];
        assert_eq!(crab.x, 120.0);
        assert_eq!(crab.y, 300.5);
        assert_eq!(crab.radius, Some(18.0));
        assert_eq!(crab.options.texture(), Some("/img/crab.png"));
        assert_eq!(crab.metadata.extra.get("mood").and_then(|v| v.as_str()), Some("grumpy"));

        assert_eq!(data.rules.len(), 1);
        assert_eq!(data.rules[0].trigger, TriggerKind::Collision);
        assert_eq!(data.rules[0].actions, vec![ActionDescriptor::RemoveSelf]);
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let data = RoomData::from_json_strs("beach", LAYOUT, None).unwrap();
        let out = serde_json::to_value(&data.bodies[0]).unwrap();
        assert_eq!(out["metadata"]["mood"], "grumpy");
        assert_eq!(out["options"]["render"]["sprite"]["yScale"], 0.4);
    }

    #[test]
    fn missing_rules_mean_no_rules() {
        let data = RoomData::from_json_strs("beach", LAYOUT, None).unwrap();
        assert!(data.rules.is_empty());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = RoomData::from_json_strs("beach", "[{", None).unwrap_err();
        assert!(matches!(err, LoadError::Json { file: "layout", .. }));

        let err = RoomData::from_json_strs("beach", LAYOUT, Some("{}")).unwrap_err();
        assert!(matches!(err, LoadError::Json { file: "interactions", .. }));
        assert!(err.to_string().contains("beach"));
    }

    #[test]
    fn digest_tracks_both_documents() {
        let a = RoomData::from_json_strs("beach", LAYOUT, Some(RULES)).unwrap();
        let b = RoomData::from_json_strs("other", LAYOUT, Some(RULES)).unwrap();
        let c = RoomData::from_json_strs("beach", LAYOUT, Some("[]")).unwrap();

        assert_eq!(a.digest.len(), 32);
        assert!(a.digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a.digest, b.digest);
        assert_ne!(a.digest, c.digest);
    }

    // -----------------------------------------------------------------------
    // Memory source
    // -----------------------------------------------------------------------

    #[test]
    fn memory_source_serves_inserted_rooms() {
        let source = MemoryRoomSource::new().with_room("beach", LAYOUT, RULES);
        let data = tokio_test::block_on(source.fetch("beach")).unwrap();
        assert_eq!(data.bodies[0].id, "crab_1");
        assert_eq!(data.rules.len(), 1);
    }

    #[test]
    fn memory_source_reports_unknown_rooms() {
        let mut source = MemoryRoomSource::new();
        source.insert("beach", LAYOUT, None);
        let err = tokio_test::block_on(source.fetch("cave")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(room) if room == "cave"));

        let data = tokio_test::block_on(source.fetch("beach")).unwrap();
        assert!(data.rules.is_empty());
    }

    // -----------------------------------------------------------------------
    // Filesystem source
    // -----------------------------------------------------------------------

    #[cfg(feature = "runtime")]
    mod fs {
        use super::*;
        use std::path::PathBuf;
        use tidepool::loader::FsRoomSource;

        fn scratch_dir(name: &str) -> PathBuf {
            let dir = std::env::temp_dir()
                .join(format!("tidepool-loader-{}-{}", name, std::process::id()));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }

        #[test]
        fn reads_both_files() {
            let dir = scratch_dir("both");
            std::fs::write(dir.join("beach.json"), LAYOUT).unwrap();
            std::fs::write(dir.join("beach.interactions.json"), RULES).unwrap();

            let source = FsRoomSource::new(&dir);
            let data = tokio_test::block_on(source.fetch("beach")).unwrap();
            assert_eq!(data.bodies.len(), 1);
            assert_eq!(data.rules.len(), 1);
            assert_eq!(
                data.digest,
                RoomData::from_json_strs("beach", LAYOUT, Some(RULES))
                    .unwrap()
                    .digest
            );
            std::fs::remove_dir_all(&dir).unwrap();
        }

        #[test]
        fn missing_interactions_file_is_allowed() {
            let dir = scratch_dir("layout-only");
            std::fs::write(dir.join("beach.json"), LAYOUT).unwrap();

            let data = tokio_test::block_on(FsRoomSource::new(&dir).fetch("beach")).unwrap();
            assert!(data.rules.is_empty());
            std::fs::remove_dir_all(&dir).unwrap();
        }

        #[test]
        fn missing_layout_is_not_found() {
            let dir = scratch_dir("empty");
            let err = tokio_test::block_on(FsRoomSource::new(&dir).fetch("beach")).unwrap_err();
            assert!(matches!(err, LoadError::NotFound(_)));
            std::fs::remove_dir_all(&dir).unwrap();
        }

        #[test]
        fn bundled_beach_room_loads() {
            let rooms = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("rooms");
            let data = tokio_test::block_on(FsRoomSource::new(rooms).fetch("room_beach")).unwrap();
            assert!(!data.bodies.is_empty());
            assert!(!data.rules.is_empty());

            let mut svc = tidepool::RoomService::new(Default::default());
            svc.load_room(&data).unwrap();
            assert_eq!(svc.room(), Some("room_beach"));
        }
    }
}
