use super::*;
use crate::assets::optimize::ContentType;

fn asset(uri: &str, bytes: Vec<u8>) -> CachedAsset {
    CachedAsset {
        uri: uri.to_string(),
        bytes: Arc::new(bytes),
        content_type: ContentType::Font,
        width: 0,
        height: 0,
    }
}

#[test]
fn empty_registry_has_no_fallback() {
    let mut reg = FontRegistry::empty();
    assert!(!reg.has_family("Manrope"));
    assert_eq!(reg.resolve_family("Manrope"), None);
    assert_eq!(reg.fontdb().len(), 0);
}

#[test]
fn garbage_font_data_is_rejected() {
    let mut reg = FontRegistry::empty();
    assert!(reg.register(&asset("bad.ttf", b"OTTO garbage".to_vec())).is_err());
    assert!(reg.families().is_empty());
}

#[test]
fn system_fallback_is_stable_when_available() {
    let mut reg = FontRegistry::new();
    let Some(first) = reg.resolve_family("Definitely Not Installed") else {
        eprintln!("skipping: no system fonts available");
        return;
    };
    assert_eq!(reg.resolve_family("Another Missing Family"), Some(first.clone()));
    assert!(reg.has_family(&first));
}
