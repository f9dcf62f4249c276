//! The definitions shipped in `platform-definitions/` load and validate.

use lookout_core::{Platform, PostKind};
use lookout_scanner::definition::LoginStep;
use lookout_scanner::{PlatformLoader, PlatformRegistry};
use std::path::PathBuf;

fn shipped_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../platform-definitions")
}

fn registry() -> PlatformRegistry {
    let loader = PlatformLoader::new(shipped_dir()).expect("definitions dir exists");
    PlatformRegistry::load_from(&loader).expect("load definitions")
}

#[test]
fn test_every_platform_has_a_valid_definition() {
    let registry = registry();
    assert_eq!(registry.platforms(), Platform::ALL.to_vec());
}

#[test]
fn test_login_flows_type_both_credentials() {
    for definition in registry().get_all() {
        let typed = definition
            .login
            .steps
            .iter()
            .filter(|step| matches!(step, LoginStep::Type { .. }))
            .count();
        assert_eq!(typed, 2, "{} login types username and password", definition.id());
    }
}

#[test]
fn test_platform_specific_pacing() {
    let registry = registry();

    let linkedin = registry.get(Platform::LinkedIn).unwrap();
    assert_eq!(linkedin.sources[0].scroll_viewports, Some(1.5));
    assert_eq!(linkedin.sources[0].settle_min_ms, Some(4000));

    let reddit = registry.get(Platform::Reddit).unwrap();
    assert!(reddit
        .sources
        .iter()
        .all(|s| s.settle_min_ms == Some(4000) && s.settle_max_ms == Some(7000)));

    let twitter = registry.get(Platform::Twitter).unwrap();
    assert_eq!(twitter.sources[0].scroll_budget, 10);
    assert!(twitter.sources[1..].iter().all(|s| s.scroll_budget == 3));
}

#[test]
fn test_youtube_kinds() {
    let youtube = registry().get(Platform::YouTube).unwrap();
    assert_eq!(
        youtube.extraction("community").unwrap().kind,
        PostKind::CommunityPost
    );
    assert_eq!(youtube.extraction("comments").unwrap().kind, PostKind::Comment);
    assert_eq!(youtube.sources.len(), 10);
}

#[test]
fn test_youtube_follows_video_listings() {
    let youtube = registry().get(Platform::YouTube).unwrap();
    let followed: Vec<_> = youtube
        .sources
        .iter()
        .filter_map(|s| s.follow.as_ref().map(|f| (s, f)))
        .collect();
    assert_eq!(followed.len(), 7);
    for (source, follow) in followed {
        assert_eq!(source.extraction, "comments");
        if source.url.contains("/results?") {
            assert_eq!(follow.selector, "a#video-title");
            assert_eq!(follow.limit, 2);
        } else {
            assert!(source.url.ends_with("/videos"));
            assert_eq!(follow.selector, "#video-title-link");
            assert_eq!(follow.limit, 3);
        }
    }
}
