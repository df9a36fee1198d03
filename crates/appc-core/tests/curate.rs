mod support;

use appc_core::{AppCreatorError, NullReporter, curate, persist_state};
use appc_schema::{AppDependency, InitialDeps, UpdateNumber, UpdatePolicy};
use support::{Recorder, Workspace};

fn names(deps: &[AppDependency]) -> Vec<String> {
    deps.iter().map(|d| d.artifact.to_string()).collect()
}

#[test]
fn test_resolves_declared_dependencies_transitively() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &["org.lib:util:2.0"], &[("core/Core.class", "core")]);
    ws.publish("org.lib:util:2.0", &[], &[("util/Util.class", "util")]);
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);

    let outcome = curate(&ws.curate_config(&app), &NullReporter).unwrap();
    assert_eq!(outcome.app_artifact.to_string(), "org.app:greeting:1.0");
    assert_eq!(names(&outcome.initial_deps), ["org.lib:core:1.0", "org.lib:util:2.0"]);
    assert!(outcome.updates.is_empty());
    assert!(outcome.updated_deps.is_none());
    assert!(outcome.state_artifact.is_none());
}

#[test]
fn test_last_update_without_state_falls_back_to_application() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core")]);
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);

    let fresh = curate(&ws.curate_config(&app), &NullReporter).unwrap();

    let mut config = ws.curate_config(&app);
    config.initial_deps = InitialDeps::LastUpdate;
    let recorder = Recorder::default();
    let fallback = curate(&config, &recorder).unwrap();

    assert_eq!(fallback.initial_deps, fresh.initial_deps);
    assert!(fallback.state_artifact.is_none());
    assert!(recorder.warnings().is_empty());
}

#[test]
fn test_latest_update_within_minor_bound() {
    let ws = Workspace::new();
    for version in ["1.0", "1.1", "1.5", "2.0"] {
        ws.publish(&format!("org.lib:core:{version}"), &[], &[("core/Core.class", "core")]);
    }
    let app = ws.app_jar(
        "org.app:greeting:1.0",
        "<properties><core.version>1.0</core.version></properties>\
         <dependencies><dependency><groupId>org.lib</groupId><artifactId>core</artifactId>\
         <version>${core.version}</version></dependency></dependencies>",
    );

    let mut config = ws.curate_config(&app);
    config.update = UpdatePolicy::Latest;
    config.update_number = UpdateNumber::Minor;
    let recorder = Recorder::default();
    let outcome = curate(&config, &recorder).unwrap();

    assert_eq!(names(&outcome.initial_deps), ["org.lib:core:1.0"]);
    assert_eq!(outcome.updates.len(), 1);
    assert_eq!(outcome.updates[0].new_version, "1.5");
    assert_eq!(recorder.updates.lock().unwrap().len(), 1);
    assert_eq!(names(outcome.effective_deps()), ["org.lib:core:1.5"]);
}

#[test]
fn test_next_update_takes_the_closest_version() {
    let ws = Workspace::new();
    for version in ["1.0", "1.1", "1.5"] {
        ws.publish(&format!("org.lib:core:{version}"), &[], &[("core/Core.class", "core")]);
    }
    let app = ws.app_jar(
        "org.app:greeting:1.0",
        "<properties><core.version>1.0</core.version></properties>\
         <dependencies><dependency><groupId>org.lib</groupId><artifactId>core</artifactId>\
         <version>${core.version}</version></dependency></dependencies>",
    );

    let mut config = ws.curate_config(&app);
    config.update = UpdatePolicy::Next;
    config.update_number = UpdateNumber::Major;
    let outcome = curate(&config, &NullReporter).unwrap();
    assert_eq!(names(outcome.effective_deps()), ["org.lib:core:1.1"]);
}

#[test]
fn test_persisted_state_is_reproduced_by_last_update() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core-1.0")]);
    ws.publish("org.lib:core:1.1", &[], &[("core/Core.class", "core-1.1")]);

    let first = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);
    let outcome = curate(&ws.curate_config(&first), &NullReporter).unwrap();
    let state = persist_state(&outcome, &NullReporter).unwrap();
    assert_eq!(state.to_string(), "org.app:greeting:pom:state:1.0");
    assert!(
        ws.repo()
            .join("org/app/greeting/1.0/greeting-1.0-state.pom")
            .is_file()
    );

    let second = ws.app_with_deps("org.app:greeting:1.0.1", &["org.lib:core:1.1"]);
    let mut config = ws.curate_config(&second);
    config.initial_deps = InitialDeps::LastUpdate;
    let outcome = curate(&config, &NullReporter).unwrap();

    assert_eq!(outcome.state_artifact, Some(state));
    assert_eq!(names(&outcome.initial_deps), ["org.lib:core:1.0"]);
}

#[test]
fn test_single_component_app_version_falls_back_quietly() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core")]);
    let app = ws.app_with_deps("org.app:greeting:1", &["org.lib:core:1.0"]);

    let fresh = curate(&ws.curate_config(&app), &NullReporter).unwrap();

    let mut config = ws.curate_config(&app);
    config.initial_deps = InitialDeps::LastUpdate;
    assert_eq!(config.update_number, UpdateNumber::Micro);
    let recorder = Recorder::default();
    let fallback = curate(&config, &recorder).unwrap();

    assert_eq!(fallback.initial_deps, fresh.initial_deps);
    assert!(fallback.state_artifact.is_none());
    assert!(recorder.warnings().is_empty());
}

#[test]
fn test_single_component_dependency_version_can_be_updated() {
    let ws = Workspace::new();
    for version in ["1", "1.0.5", "1.2"] {
        ws.publish(&format!("javax.inject:javax.inject:{version}"), &[], &[("javax/inject/Inject.class", "i")]);
    }
    let app = ws.app_jar(
        "org.app:greeting:1.0",
        "<properties><inject.version>1</inject.version></properties>\
         <dependencies><dependency><groupId>javax.inject</groupId><artifactId>javax.inject</artifactId>\
         <version>${inject.version}</version></dependency></dependencies>",
    );

    let mut config = ws.curate_config(&app);
    config.update = UpdatePolicy::Latest;
    let outcome = curate(&config, &NullReporter).unwrap();
    assert_eq!(names(outcome.effective_deps()), ["javax.inject:javax.inject:1.0.5"]);
}

#[test]
fn test_dependencies_inherited_from_parent_are_update_candidates() {
    let ws = Workspace::new();
    ws.publish("org.app:parent:1.0", &["org.lib:core:1.0"], &[]);
    for version in ["1.0", "1.2"] {
        ws.publish(&format!("org.lib:core:{version}"), &[], &[("core/Core.class", "core")]);
    }
    let app = ws.app_jar(
        "org.app:greeting:1.0",
        "<parent><groupId>org.app</groupId><artifactId>parent</artifactId><version>1.0</version></parent>",
    );

    let mut config = ws.curate_config(&app);
    config.update = UpdatePolicy::Latest;
    config.update_number = UpdateNumber::Major;
    let outcome = curate(&config, &NullReporter).unwrap();

    assert_eq!(names(&outcome.initial_deps), ["org.lib:core:1.0"]);
    assert_eq!(outcome.updates.len(), 1);
    assert_eq!(outcome.updates[0].new_version, "1.2");
    assert_eq!(names(outcome.effective_deps()), ["org.lib:core:1.2"]);
}

#[test]
fn test_literal_versions_in_the_application_are_not_updated() {
    let ws = Workspace::new();
    for version in ["1.0", "1.2"] {
        ws.publish(&format!("org.lib:core:{version}"), &[], &[("core/Core.class", "core")]);
    }
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);

    let mut config = ws.curate_config(&app);
    config.update = UpdatePolicy::Latest;
    let outcome = curate(&config, &NullReporter).unwrap();
    assert!(outcome.updates.is_empty());
    assert!(outcome.updated_deps.is_none());
}

/// Curation with a mock server standing in as the only remote repository.
#[cfg(feature = "network")]
fn online_config(ws: &Workspace, app: &std::path::Path, url: String) -> appc_core::CurateConfig {
    let mut config = ws.curate_config(app);
    config.offline = false;
    config.remote_repositories = vec![url];
    config.initial_deps = InitialDeps::LastUpdate;
    config
}

#[cfg(feature = "network")]
#[test]
fn test_state_lookup_server_error_falls_back_with_warning() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core")]);
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);
    let fresh = curate(&ws.curate_config(&app), &NullReporter).unwrap();

    let mut server = mockito::Server::new();
    let _meta = server
        .mock("GET", "/org/app/greeting/maven-metadata.xml")
        .with_status(500)
        .create();

    let recorder = Recorder::default();
    let fallback = curate(&online_config(&ws, &app, server.url()), &recorder).unwrap();

    assert_eq!(fallback.initial_deps, fresh.initial_deps);
    assert!(fallback.state_artifact.is_none());
    let warnings = recorder.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("500"), "{warnings:?}");
}

#[cfg(feature = "network")]
#[test]
fn test_state_lookup_ignores_unparsable_metadata() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core")]);
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:core:1.0"]);
    let fresh = curate(&ws.curate_config(&app), &NullReporter).unwrap();

    let mut server = mockito::Server::new();
    let _meta = server
        .mock("GET", "/org/app/greeting/maven-metadata.xml")
        .with_body("<html><body>proxy login</body")
        .create();

    let fallback = curate(&online_config(&ws, &app, server.url()), &NullReporter).unwrap();
    assert_eq!(fallback.initial_deps, fresh.initial_deps);
    assert!(fallback.state_artifact.is_none());
}

#[test]
fn test_non_numeric_version_fails_before_resolution() {
    let ws = Workspace::new();
    let app = ws.app_with_deps("org.app:greeting:x.1", &[]);
    let mut config = ws.curate_config(&app);
    config.initial_deps = InitialDeps::LastUpdate;
    config.update_number = UpdateNumber::Minor;

    assert!(matches!(
        curate(&config, &NullReporter),
        Err(AppCreatorError::Version(_))
    ));
}

#[test]
fn test_missing_application_jar() {
    let ws = Workspace::new();
    let config = ws.curate_config(&ws.path("target/missing.jar"));
    assert!(matches!(
        curate(&config, &NullReporter),
        Err(AppCreatorError::MissingInput { .. })
    ));
}

#[test]
fn test_unresolvable_dependency_is_fatal() {
    let ws = Workspace::new();
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.lib:absent:1.0"]);
    assert!(curate(&ws.curate_config(&app), &NullReporter).is_err());
}
