use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LiikeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        LiikeError::encode("x")
            .to_string()
            .contains("encode session error:")
    );
    assert!(
        LiikeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        LiikeError::resource("mem://a.png", "gone")
            .to_string()
            .contains("'mem://a.png'")
    );
}

#[test]
fn codes_are_machine_readable() {
    assert_eq!(LiikeError::Cancelled.code(), "cancelled");
    assert_eq!(LiikeError::missing_root("x").code(), "missing_scene_root");
    assert_eq!(
        LiikeError::MediaSeekTimeout {
            target_ms: 10,
            waited_ms: 200
        }
        .code(),
        "media_seek_timeout"
    );
    assert_eq!(
        LiikeError::Other(anyhow::anyhow!("boom")).code(),
        "internal"
    );
}

#[test]
fn recoverable_kinds_are_not_fatal() {
    assert!(!LiikeError::resource("u", "r").is_fatal());
    assert!(
        !LiikeError::MediaSeekTimeout {
            target_ms: 0,
            waited_ms: 0
        }
        .is_fatal()
    );
    assert!(LiikeError::encode("pipe closed").is_fatal());
    assert!(LiikeError::Cancelled.is_cancelled());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LiikeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
