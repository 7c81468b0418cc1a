//! Planning: turning registry, directory and YAML sources into a plan.

mod common;

use common::*;
use regsync::progress::{SkipReason, SyncEvent};
use regsync::{
    DestinationTransport, ImageReference, OptionalBool, SourceTransport, SyncError,
};

fn names(plan: &regsync::SyncPlan) -> Vec<String> {
    plan.image_refs().map(ImageReference::to_string).collect()
}

#[tokio::test]
async fn test_tagged_registry_source_is_single_reference() {
    let harness = TestHarness::new();
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let plan = harness.plan("quay.io/foo/bar:v1", &opts).await.unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(names(&plan), vec!["docker://quay.io/foo/bar:v1"]);
    assert!(harness.tags.listed().is_empty());
    assert_eq!(
        harness.progress.count(|e| matches!(
            e,
            SyncEvent::TagPresenceChecked { tagged: true, .. }
        )),
        1
    );
}

#[tokio::test]
async fn test_digest_registry_source_is_single_reference() {
    let harness = TestHarness::new();
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let source = format!("quay.io/foo/bar@{}", DIGEST);
    let plan = harness.plan(&source, &opts).await.unwrap();

    assert_eq!(names(&plan), vec![format!("docker://{}", source)]);
}

#[tokio::test]
async fn test_bare_repository_lists_tags_in_order() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_tags("quay.io/foo/bar", &["v3", "latest", "v1"]),
        FakeTransfer::new(),
    );
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let plan = harness.plan("quay.io/foo/bar", &opts).await.unwrap();

    assert_eq!(
        names(&plan),
        vec![
            "docker://quay.io/foo/bar:v3",
            "docker://quay.io/foo/bar:latest",
            "docker://quay.io/foo/bar:v1",
        ]
    );
}

#[tokio::test]
async fn test_docker_hub_short_name_is_normalized() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_tags("docker.io/library/busybox", &["1.36"]),
        FakeTransfer::new(),
    );
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let plan = harness.plan("busybox", &opts).await.unwrap();
    assert_eq!(names(&plan), vec!["docker://docker.io/library/busybox:1.36"]);
}

#[tokio::test]
async fn test_unauthorized_listing_means_no_images() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_listing("quay.io/private/app", Listing::Unauthorized),
        FakeTransfer::new(),
    );
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let err = harness.plan("quay.io/private/app", &opts).await.unwrap_err();

    assert!(matches!(err, SyncError::NoImagesFound(ref s) if s == "quay.io/private/app"));
    assert_eq!(
        harness
            .progress
            .count(|e| matches!(e, SyncEvent::TagListingDenied { .. })),
        1
    );
}

#[tokio::test]
async fn test_listing_error_is_fatal_for_registry_source() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_listing("quay.io/foo/bar", Listing::Status(400)),
        FakeTransfer::new(),
    );
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let err = harness.plan("quay.io/foo/bar", &opts).await.unwrap_err();
    assert!(matches!(err, SyncError::TagListing { .. }));
    assert_eq!(harness.tags.listed().len(), 1);
}

#[tokio::test]
async fn test_transient_listing_error_retries_whole_plan() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_listing(
            "quay.io/foo/bar",
            Listing::Flaky {
                failures: 2,
                tags: vec!["v1".to_string()],
            },
        ),
        FakeTransfer::new(),
    );
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let plan = harness.plan("quay.io/foo/bar", &opts).await.unwrap();
    assert_eq!(names(&plan), vec!["docker://quay.io/foo/bar:v1"]);
    assert_eq!(harness.tags.listed().len(), 3);
}

#[tokio::test]
async fn test_invalid_registry_source() {
    let harness = TestHarness::new();
    let opts = options(SourceTransport::Docker, DestinationTransport::Dir);

    let err = harness.plan("quay.io/Foo/bar:v1", &opts).await.unwrap_err();
    assert!(matches!(err, SyncError::Reference(_)));
}

#[tokio::test]
async fn test_directory_walk_stops_at_image_directories() {
    let harness = TestHarness::new();
    let a = harness.create_image_dir("a");
    harness.create_image_dir("a/b");
    let c = harness.create_image_dir("nested/c:v1");
    let opts = options(SourceTransport::Dir, DestinationTransport::Docker);

    let plan = harness
        .plan(harness.source_dir.to_str().unwrap(), &opts)
        .await
        .unwrap();

    assert_eq!(plan.len(), 1);
    let descriptor = &plan.descriptors()[0];
    assert_eq!(descriptor.dir_base_path(), Some(harness.source_dir.as_path()));
    let dirs: Vec<_> = descriptor
        .image_refs
        .iter()
        .map(|r| r.as_directory().unwrap().path().to_path_buf())
        .collect();
    assert_eq!(dirs, vec![a, c]);
}

#[tokio::test]
async fn test_missing_directory_source() {
    let harness = TestHarness::new();
    let opts = options(SourceTransport::Dir, DestinationTransport::Docker);
    let missing = harness.base_path().join("missing");

    let err = harness
        .plan(missing.to_str().unwrap(), &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidSource { .. }));
}

#[tokio::test]
async fn test_directory_without_images() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(harness.source_dir.join("empty/deeper")).unwrap();
    let opts = options(SourceTransport::Dir, DestinationTransport::Docker);

    let err = harness
        .plan(harness.source_dir.to_str().unwrap(), &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NoImagesFound(_)));
}

#[tokio::test]
async fn test_yaml_explicit_tag_and_digest() {
    let orders = [
        [DIGEST.to_string(), "latest".to_string()],
        ["latest".to_string(), DIGEST.to_string()],
    ];

    for refs in orders {
        let harness = TestHarness::new();
        let config = harness.write_config(
            "sync.yaml",
            &format!(
                r#"
quay.io:
  images:
    foo/bar:
      - "{}"
      - "{}"
"#,
                refs[0], refs[1]
            ),
        );
        let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);

        let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();

        assert_eq!(plan.len(), 1, "order {:?}", refs);
        let planned: Vec<_> = plan
            .image_refs()
            .map(|r| r.as_registry().unwrap().clone())
            .collect();
        assert_eq!(planned.len(), 2, "order {:?}", refs);
        assert_eq!(planned.iter().filter(|r| r.digest().is_some()).count(), 1);
        assert_eq!(
            planned.iter().filter(|r| r.tag() == Some("latest")).count(),
            1
        );
        // Declared order is kept.
        assert_eq!(planned[0].digest().is_some(), refs[0] == DIGEST);
        assert!(harness.tags.listed().is_empty());
    }
}

#[tokio::test]
async fn test_yaml_bad_ref_skips_only_that_ref() {
    let harness = TestHarness::new();
    let config = harness.write_config(
        "sync.yaml",
        r#"
quay.io:
  images:
    foo/bar:
      - "v1"
      - "not a tag!"
      - "sha256:short"
"#,
    );
    let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);

    let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();

    assert_eq!(names(&plan), vec!["docker://quay.io/foo/bar:v1"]);
    assert_eq!(
        harness
            .progress
            .count(|e| matches!(e, SyncEvent::RefSkipped { .. })),
        2
    );
}

#[tokio::test]
async fn test_yaml_tag_regex_uses_search_semantics() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new().with_tags(
            "registry.example.com/team/app",
            &["v1.0", "v1.1", "latest", "release-v1.2"],
        ),
        FakeTransfer::new(),
    );
    let config = harness.write_config(
        "sync.yaml",
        r#"
registry.example.com:
  images-by-tag-regex:
    team/app: "v1\\.[0-9]"
"#,
    );
    let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);

    let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();

    assert_eq!(
        names(&plan),
        vec![
            "docker://registry.example.com/team/app:v1.0",
            "docker://registry.example.com/team/app:v1.1",
            "docker://registry.example.com/team/app:release-v1.2",
        ]
    );
}

#[tokio::test]
async fn test_yaml_unauthorized_registry_does_not_block_others() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new()
            .with_listing("locked.example.com/secret", Listing::Unauthorized)
            .with_tags("open.example.com/public", &["1", "2"]),
        FakeTransfer::new(),
    );
    let config = harness.write_config(
        "sync.yaml",
        r#"
locked.example.com:
  images:
    secret: []
open.example.com:
  images:
    public: []
"#,
    );
    let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);

    let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();

    assert_eq!(
        names(&plan),
        vec![
            "docker://open.example.com/public:1",
            "docker://open.example.com/public:2",
        ]
    );
    assert!(harness.progress.events().iter().any(|e| matches!(
        e,
        SyncEvent::RepositorySkipped {
            reason: SkipReason::NoRefsFound,
            ..
        }
    )));
}

#[tokio::test]
async fn test_yaml_repository_failures_are_skipped() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new()
            .with_listing("quay.io/broken", Listing::Status(500))
            .with_tags("quay.io/good", &["stable"]),
        FakeTransfer::new(),
    );
    let config = harness.write_config(
        "sync.yaml",
        r#"
quay.io:
  images:
    broken: []
    good: []
    Invalid_Name: [v1]
  images-by-tag-regex:
    good: "(unclosed"
empty.example.com:
  credentials:
    username: nobody
"#,
    );
    let mut opts = options(SourceTransport::Yaml, DestinationTransport::Dir);
    opts.retry = regsync::RetryPolicy::none();

    let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();

    assert_eq!(names(&plan), vec!["docker://quay.io/good:stable"]);

    let events = harness.progress.events();
    let skipped: Vec<&SkipReason> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::RepositorySkipped { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 3);
    assert!(skipped
        .iter()
        .any(|r| matches!(r, SkipReason::TagListingFailed(_))));
    assert!(skipped.iter().any(|r| matches!(r, SkipReason::InvalidName(_))));
    assert!(skipped.iter().any(|r| matches!(r, SkipReason::InvalidRegex(_))));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::RegistrySkipped { registry } if registry == "empty.example.com"
    )));
}

#[tokio::test]
async fn test_yaml_registry_context_overrides() {
    let harness = TestHarness::with_collaborators(
        FakeTagLister::new()
            .with_tags("insecure.example.com/app", &["1"])
            .with_tags("secure.example.com/app", &["1"]),
        FakeTransfer::new(),
    );
    let config = harness.write_config(
        "sync.yaml",
        r#"
insecure.example.com:
  tls-verify: false
  cert-dir: /etc/certs/insecure
  credentials:
    username: alice
    password: secret
  images:
    app: []
secure.example.com:
  images:
    app: []
"#,
    );
    let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);

    let plan = harness.plan(config.to_str().unwrap(), &opts).await.unwrap();
    assert_eq!(plan.len(), 2);

    let insecure = harness.tags.context_for("insecure.example.com/app").unwrap();
    assert_eq!(insecure.insecure_skip_tls_verify, OptionalBool::True);
    assert!(insecure.daemon_insecure_skip_tls_verify);
    assert_eq!(
        insecure.cert_dir.as_deref(),
        Some(std::path::Path::new("/etc/certs/insecure"))
    );
    assert_eq!(insecure.credentials.unwrap().username, "alice");

    let secure = harness.tags.context_for("secure.example.com/app").unwrap();
    assert_eq!(secure.insecure_skip_tls_verify, OptionalBool::Unset);
    assert!(secure.credentials.is_none());

    assert_eq!(
        plan.descriptors()[0].context.insecure_skip_tls_verify,
        OptionalBool::True
    );
    assert_eq!(
        plan.descriptors()[1].context.insecure_skip_tls_verify,
        OptionalBool::Unset
    );
}

#[tokio::test]
async fn test_yaml_unreadable_config_is_fatal() {
    let harness = TestHarness::new();
    let opts = options(SourceTransport::Yaml, DestinationTransport::Dir);
    let missing = harness.config_dir.join("missing.yaml");

    let err = harness
        .plan(missing.to_str().unwrap(), &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));

    let bad = harness.write_config("bad.yaml", "quay.io:\n  imagez: {}\n");
    let err = harness.plan(bad.to_str().unwrap(), &opts).await.unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}
