mod support;

use std::fs;
use std::path::PathBuf;

use appc_core::runner::manifest::{CLASS_PATH, MAIN_CLASS, MULTI_RELEASE, Manifest};
use appc_core::{
    AppCreatorError, AugmentOutcome, CurateOutcome, NullReporter, RunnerJarConfig,
    build_runner_jar, curate,
};
use support::{Recorder, Workspace, entry_names, read_entry, write_file};

const SERVICE: &str = "META-INF/services/com.foo.Svc";

/// Two dependencies that collide on a class, a resource and a service file.
fn conflicting_deps(ws: &Workspace) -> (PathBuf, PathBuf) {
    let a = ws.publish(
        "org.a:a:1.0",
        &[],
        &[
            ("x/", ""),
            ("x/Y.class", "from-a"),
            ("shared.txt", "a"),
            ("META-INF/FOO.SF", "signature"),
            ("META-INF/core.kotlin_module", "k"),
            ("LICENSE", "license"),
            (SERVICE, "a.Impl"),
        ],
    );
    let b = ws.publish(
        "org.b:b:1.0",
        &[],
        &[
            ("x/", ""),
            ("x/Y.class", "from-b"),
            ("x/Z.class", "only-b"),
            ("shared.txt", "b"),
            (SERVICE, "b.Impl"),
        ],
    );
    (a, b)
}

fn curated(ws: &Workspace) -> CurateOutcome {
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.a:a:1.0", "org.b:b:1.0"]);
    curate(&ws.curate_config(&app), &NullReporter).unwrap()
}

fn uber() -> RunnerJarConfig {
    RunnerJarConfig {
        uber_jar: true,
        ..RunnerJarConfig::default()
    }
}

fn manifest_of(jar: &std::path::Path) -> Manifest {
    Manifest::parse(&read_entry(jar, "META-INF/MANIFEST.MF").unwrap())
}

#[test]
fn test_uber_jar_merges_dependencies_first_writer_wins() {
    let ws = Workspace::new();
    conflicting_deps(&ws);
    let curate = curated(&ws);
    let augment = ws.augment_outcome();
    write_file(&augment.app_classes_dir.join("org/app/Main.class"), b"main");
    write_file(&augment.app_classes_dir.join(SERVICE), b"app.Impl");
    write_file(&augment.wiring_classes_dir.join("io/quarkus/runner/GeneratedMain.class"), b"gen");

    let config = RunnerJarConfig {
        ignored_entries: vec!["META-INF/*.kotlin_module".to_string()],
        ..uber()
    };
    let recorder = Recorder::default();
    let outcome = build_runner_jar(&config, &curate, &augment, &recorder).unwrap();

    let jar = &outcome.runner_jar;
    assert_eq!(jar, &ws.path("target/greeting-1.0-runner.jar"));
    assert_eq!(read_entry(jar, "x/Y.class").unwrap(), b"from-a");
    assert_eq!(read_entry(jar, "x/Z.class").unwrap(), b"only-b");
    assert_eq!(read_entry(jar, "shared.txt").unwrap(), b"a");
    assert_eq!(read_entry(jar, SERVICE).unwrap(), b"a.Impl\nb.Impl\napp.Impl\n");
    assert_eq!(read_entry(jar, "org/app/Main.class").unwrap(), b"main");

    let names = entry_names(jar);
    assert_eq!(&names[..2], ["META-INF/", "META-INF/MANIFEST.MF"]);
    for dropped in ["META-INF/FOO.SF", "META-INF/core.kotlin_module", "LICENSE"] {
        assert!(!names.iter().any(|n| n == dropped), "{dropped} should be dropped");
    }

    // One grouped report for the {a, b} pair, one individual warning for the
    // non-class duplicate.
    assert_eq!(outcome.duplicates.len(), 1);
    let group: Vec<String> = outcome.duplicates[0]
        .dependencies
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(group, ["org.a:a:1.0", "org.b:b:1.0"]);
    assert_eq!(recorder.duplicates.lock().unwrap().len(), 1);
    let warnings = recorder.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(
        warnings[0],
        "Duplicate entry shared.txt from org.b:b:1.0 will be ignored. \
         Existing file was provided by org.a:a:1.0"
    );

    let manifest = manifest_of(jar);
    assert_eq!(manifest.get(MAIN_CLASS), Some("io.quarkus.runner.GeneratedMain"));
    assert_eq!(manifest.get(CLASS_PATH), Some(""));
    assert_eq!(manifest.get("Implementation-Title"), Some("greeting"));
    assert_eq!(manifest.get("Implementation-Version"), Some("1.0"));
    assert_eq!(manifest.get(MULTI_RELEASE), None);

    assert!(outcome.lib_dir.is_none());
    let original = ws.path("target/greeting-1.0.jar.original");
    assert_eq!(outcome.original_jar.as_deref(), Some(original.as_path()));
    assert!(original.is_file());
    assert!(!ws.path("target/greeting-1.0.jar").exists());
    assert_eq!(outcome.sha256.len(), 64);
}

#[test]
fn test_transformed_classes_shadow_dependency_copies() {
    let ws = Workspace::new();
    let (a, _) = conflicting_deps(&ws);
    let curate = curated(&ws);
    let mut augment = ws.augment_outcome();
    augment.transformed_classes.insert(&a, "x/Y.class");
    write_file(&augment.transformed_classes_dir.join("x/Y.class"), b"transformed");

    let outcome = build_runner_jar(&uber(), &curate, &augment, &NullReporter).unwrap();
    assert_eq!(read_entry(&outcome.runner_jar, "x/Y.class").unwrap(), b"transformed");
}

#[test]
fn test_thin_jar_layout() {
    let ws = Workspace::new();
    let (a, _) = conflicting_deps(&ws);
    let curate = curated(&ws);
    let mut augment = ws.augment_outcome();
    augment.transformed_classes.insert(&a, "x/Y.class");
    write_file(&augment.transformed_classes_dir.join("x/Y.class"), b"transformed");
    write_file(&augment.app_classes_dir.join("org/app/Main.class"), b"main");

    let lib = ws.path("target/lib");
    write_file(&lib.join("stale.jar"), b"old");

    let outcome =
        build_runner_jar(&RunnerJarConfig::default(), &curate, &augment, &NullReporter).unwrap();
    assert_eq!(outcome.lib_dir.as_deref(), Some(lib.as_path()));
    assert!(!lib.join("stale.jar").exists());

    let modified = lib.join("modified-org.a.a-1.0.jar");
    let names = entry_names(&modified);
    assert!(!names.iter().any(|n| n == "x/Y.class"));
    assert!(names.iter().any(|n| n == "shared.txt"));
    assert!(lib.join("org.b.b-1.0.jar").is_file());

    let jar = &outcome.runner_jar;
    assert_eq!(
        manifest_of(jar).get(CLASS_PATH),
        Some("lib/modified-org.a.a-1.0.jar lib/org.b.b-1.0.jar")
    );
    assert_eq!(read_entry(jar, "x/Y.class").unwrap(), b"transformed");
    assert!(read_entry(jar, "x/Z.class").is_none());
    assert_eq!(read_entry(jar, "org/app/Main.class").unwrap(), b"main");

    // Thin mode leaves the plain jar where it is.
    let plain = ws.path("target/greeting-1.0.jar");
    assert_eq!(outcome.original_jar.as_deref(), Some(plain.as_path()));
    assert!(plain.is_file());
}

#[test]
fn test_reassembly_is_reproducible() {
    let ws = Workspace::new();
    conflicting_deps(&ws);
    let curate = curated(&ws);
    let augment = ws.augment_outcome();
    write_file(&augment.app_classes_dir.join("org/app/Main.class"), b"main");

    let first = build_runner_jar(&uber(), &curate, &augment, &NullReporter).unwrap();
    let first_names = entry_names(&first.runner_jar);
    let first_class_path = manifest_of(&first.runner_jar).get(CLASS_PATH).map(str::to_string);
    fs::remove_file(&first.runner_jar).unwrap();

    let second = build_runner_jar(&uber(), &curate, &augment, &NullReporter).unwrap();
    assert_eq!(entry_names(&second.runner_jar), first_names);
    assert_eq!(
        manifest_of(&second.runner_jar).get(CLASS_PATH).map(str::to_string),
        first_class_path
    );
    assert_eq!(second.sha256, first.sha256);
}

#[test]
fn test_existing_main_class_is_replaced_with_one_warning() {
    let ws = Workspace::new();
    let app = ws.app_with_deps("org.app:greeting:1.0", &[]);
    let curate = curate(&ws.curate_config(&app), &NullReporter).unwrap();
    let augment = ws.augment_outcome();
    write_file(
        &augment.app_classes_dir.join("META-INF/MANIFEST.MF"),
        b"Manifest-Version: 1.0\r\nMain-Class: org.other.Main\r\nX-Custom: kept\r\n\r\n",
    );

    let config = RunnerJarConfig {
        main_class: "org.app.Main".to_string(),
        ..RunnerJarConfig::default()
    };
    let recorder = Recorder::default();
    let outcome = build_runner_jar(&config, &curate, &augment, &recorder).unwrap();

    let manifest = manifest_of(&outcome.runner_jar);
    assert_eq!(manifest.get(MAIN_CLASS), Some("org.app.Main"));
    assert_eq!(manifest.get("X-Custom"), Some("kept"));
    assert_eq!(recorder.warnings().len(), 1);
}

#[test]
fn test_versioned_entries_mark_multi_release() {
    let ws = Workspace::new();
    ws.publish(
        "org.mr:mr:1.0",
        &[],
        &[("x/Y.class", "8"), ("META-INF/versions/11/x/Y.class", "11")],
    );
    let app = ws.app_with_deps("org.app:greeting:1.0", &["org.mr:mr:1.0"]);
    let curate = curate(&ws.curate_config(&app), &NullReporter).unwrap();
    let augment = ws.augment_outcome();

    let outcome = build_runner_jar(&uber(), &curate, &augment, &NullReporter).unwrap();
    assert_eq!(manifest_of(&outcome.runner_jar).get(MULTI_RELEASE), Some("true"));
}

#[test]
fn test_non_jar_dependencies_are_skipped() {
    let ws = Workspace::new();
    ws.publish("org.lib:core:1.0", &[], &[("core/Core.class", "core")]);
    ws.publish("org.bom:platform:1.0", &["org.lib:core:1.0"], &[]);
    let app = ws.app_jar(
        "org.app:greeting:1.0",
        "<dependencies><dependency><groupId>org.bom</groupId><artifactId>platform</artifactId>\
         <version>1.0</version><type>pom</type></dependency></dependencies>",
    );
    let curate = curate(&ws.curate_config(&app), &NullReporter).unwrap();
    let augment = ws.augment_outcome();

    let outcome =
        build_runner_jar(&RunnerJarConfig::default(), &curate, &augment, &NullReporter).unwrap();
    let lib = outcome.lib_dir.unwrap();
    let copied: Vec<String> = fs::read_dir(&lib)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(copied, ["org.lib.core-1.0.jar"]);
}

#[test]
fn test_missing_augmentation_output_is_fatal() {
    let ws = Workspace::new();
    let app = ws.app_with_deps("org.app:greeting:1.0", &[]);
    let curate = curate(&ws.curate_config(&app), &NullReporter).unwrap();
    let augment = AugmentOutcome::new(
        ws.path("augment/wiring"),
        ws.path("augment/classes"),
        ws.path("augment/transformed"),
    );

    assert!(matches!(
        build_runner_jar(&RunnerJarConfig::default(), &curate, &augment, &NullReporter),
        Err(AppCreatorError::MissingInput { .. })
    ));
    assert!(!ws.path("target/greeting-1.0-runner.jar").exists());
}
