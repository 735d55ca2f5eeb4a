use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LyrisyncError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        LyrisyncError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        LyrisyncError::decode("x")
            .to_string()
            .contains("audio decode error:")
    );
    assert!(
        LyrisyncError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        LyrisyncError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LyrisyncError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
