//! End-to-end scenarios driving the engine through portable /bin/sh
//! recipes in a scratch workspace.

use std::path::Path;

use maek::{Maek, MaekOptions};
use tempfile::TempDir;

fn engine(dir: &TempDir) -> Maek {
    Maek::new(MaekOptions {
        root: dir.path().to_path_buf(),
        ..MaekOptions::default()
    })
    .unwrap()
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn write(dir: &TempDir, name: &str, contents: &str) {
    std::fs::write(dir.path().join(name), contents).unwrap();
}

fn read(dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).unwrap()
}

/// How many times a `>> name` logging recipe step ran.
fn runs(dir: &TempDir, name: &str) -> usize {
    match std::fs::read_to_string(dir.path().join(name)) {
        Ok(log) => log.lines().count(),
        Err(_) => 0,
    }
}

fn cache(dir: &TempDir) -> serde_json::Map<String, serde_json::Value> {
    let raw = std::fs::read(dir.path().join("maek-cache.json")).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

#[tokio::test]
async fn a_clean_build_runs_everything_and_a_rerun_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "alpha\n");

    let maek = engine(&dir);
    maek.rule(
        ["a.txt"],
        ["src.txt"],
        vec![sh("cat src.txt > a.txt"), sh("echo ran >> a.log")],
    )
    .unwrap();
    maek.rule(
        ["b.txt"],
        ["a.txt"],
        vec![sh("cat a.txt > b.txt && echo ran >> b.log")],
    )
    .unwrap();
    maek.rule([":all"], ["b.txt"], vec![]).unwrap();

    assert!(maek.update([":all"]).await.unwrap());
    assert_eq!(read(&dir, "b.txt"), "alpha\n");
    assert_eq!(runs(&dir, "a.log"), 1);
    assert_eq!(runs(&dir, "b.log"), 1);

    // Nothing changed on disk, so the second pass is all cache hits.
    assert!(maek.update([":all"]).await.unwrap());
    assert_eq!(runs(&dir, "a.log"), 1);
    assert_eq!(runs(&dir, "b.log"), 1);
}

#[tokio::test]
async fn changing_an_input_rebuilds_its_dependents_and_nothing_else() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "x.txt", "x1\n");
    write(&dir, "y.txt", "y1\n");

    let maek = engine(&dir);
    maek.rule(
        ["x.out"],
        ["x.txt"],
        vec![sh("cat x.txt > x.out && echo ran >> x.log")],
    )
    .unwrap();
    maek.rule(
        ["y.out"],
        ["y.txt"],
        vec![sh("cat y.txt > y.out && echo ran >> y.log")],
    )
    .unwrap();
    maek.rule(
        ["sum.txt"],
        ["x.out", "y.out"],
        vec![sh("cat x.out y.out > sum.txt && echo ran >> sum.log")],
    )
    .unwrap();

    assert!(maek.update(["sum.txt"]).await.unwrap());
    assert_eq!(read(&dir, "sum.txt"), "x1\ny1\n");

    write(&dir, "x.txt", "x2\n");
    assert!(maek.update(["sum.txt"]).await.unwrap());

    assert_eq!(read(&dir, "sum.txt"), "x2\ny1\n");
    assert_eq!(runs(&dir, "x.log"), 2);
    assert_eq!(runs(&dir, "y.log"), 1);
    assert_eq!(runs(&dir, "sum.log"), 2);
}

#[tokio::test]
async fn a_shared_dependency_runs_at_most_once_per_update() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "base.txt", "base\n");

    let maek = engine(&dir);
    maek.rule(
        ["base.out"],
        ["base.txt"],
        vec![sh("cat base.txt > base.out && echo ran >> base.log")],
    )
    .unwrap();
    maek.rule(
        ["left.txt"],
        ["base.out"],
        vec![sh("cat base.out > left.txt")],
    )
    .unwrap();
    maek.rule(
        ["right.txt"],
        ["base.out"],
        vec![sh("cat base.out > right.txt")],
    )
    .unwrap();
    maek.rule([":all"], ["left.txt", "right.txt"], vec![]).unwrap();

    assert!(maek.update([":all"]).await.unwrap());
    assert_eq!(runs(&dir, "base.log"), 1);
}

#[tokio::test]
async fn a_prerequisite_finishes_before_its_dependent_starts() {
    let dir = tempfile::tempdir().unwrap();

    let maek = engine(&dir);
    maek.rule(
        ["slow.txt"],
        Vec::<String>::new(),
        vec![sh("sleep 1 && echo done > slow.txt")],
    )
    .unwrap();
    // `cat` fails unless the slow prerequisite has fully finished.
    maek.rule(
        ["fast.txt"],
        ["slow.txt"],
        vec![sh("cat slow.txt > fast.txt")],
    )
    .unwrap();

    assert!(maek.update(["fast.txt"]).await.unwrap());
    assert_eq!(read(&dir, "fast.txt"), "done\n");
}

#[tokio::test]
async fn an_unknown_abstract_target_fails_the_update() {
    let dir = tempfile::tempdir().unwrap();
    let maek = engine(&dir);
    assert!(!maek.update([":dist"]).await.unwrap());
}

#[tokio::test]
async fn a_missing_source_file_fails_the_update() {
    let dir = tempfile::tempdir().unwrap();
    let maek = engine(&dir);
    maek.rule(["out.txt"], ["nope.txt"], vec![sh("true")])
        .unwrap();
    assert!(!maek.update(["out.txt"]).await.unwrap());
    assert!(!maek.update(["also-missing.txt"]).await.unwrap());
}

#[tokio::test]
async fn one_failing_task_does_not_stop_independent_siblings() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "fine\n");

    let maek = engine(&dir);
    maek.rule(
        ["good.txt"],
        ["src.txt"],
        vec![sh("cat src.txt > good.txt && echo ran >> good.log")],
    )
    .unwrap();
    maek.rule(["bad.txt"], Vec::<String>::new(), vec![sh("exit 3")])
        .unwrap();
    maek.rule([":all"], ["good.txt", "bad.txt"], vec![]).unwrap();

    assert!(!maek.update([":all"]).await.unwrap());
    assert_eq!(runs(&dir, "good.log"), 1);

    let entries = cache(&dir);
    assert!(entries.contains_key("good.txt"));
    assert!(!entries.contains_key("bad.txt"));
}

#[tokio::test]
async fn a_dependent_of_a_failed_task_never_runs() {
    let dir = tempfile::tempdir().unwrap();

    let maek = engine(&dir);
    maek.rule(["bad.txt"], Vec::<String>::new(), vec![sh("exit 1")])
        .unwrap();
    maek.rule(
        ["dep.txt"],
        ["bad.txt"],
        vec![sh("echo ran >> dep.log && cp bad.txt dep.txt")],
    )
    .unwrap();

    assert!(!maek.update(["dep.txt"]).await.unwrap());
    assert_eq!(runs(&dir, "dep.log"), 0);
}

#[tokio::test]
async fn a_task_that_fails_drops_its_previous_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "good\n");

    let maek = engine(&dir);
    maek.rule(
        ["out.txt"],
        ["src.txt"],
        vec![sh("grep -q good src.txt && cp src.txt out.txt")],
    )
    .unwrap();

    assert!(maek.update(["out.txt"]).await.unwrap());
    assert!(cache(&dir).contains_key("out.txt"));

    // The changed input forces a re-run, and the re-run fails.
    write(&dir, "src.txt", "broken\n");
    assert!(!maek.update(["out.txt"]).await.unwrap());
    assert!(!cache(&dir).contains_key("out.txt"));
}

#[tokio::test]
async fn abstract_targets_never_get_a_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "x\n");

    let maek = engine(&dir);
    maek.rule(["out.txt"], ["src.txt"], vec![sh("cp src.txt out.txt")])
        .unwrap();
    maek.rule([":all"], ["out.txt"], vec![]).unwrap();

    assert!(maek.update([":all"]).await.unwrap());

    let entries = cache(&dir);
    assert!(entries.contains_key("out.txt"));
    assert!(!entries.contains_key(":all"));
}

#[tokio::test]
async fn a_changed_recipe_invalidates_the_cache_entry() {
    let dir = tempfile::tempdir().unwrap();

    {
        let maek = engine(&dir);
        maek.rule(
            ["out.txt"],
            Vec::<String>::new(),
            vec![sh("echo one > out.txt")],
        )
        .unwrap();
        assert!(maek.update(["out.txt"]).await.unwrap());
        assert_eq!(read(&dir, "out.txt"), "one\n");
    }

    // A fresh engine with a different recipe for the same target: the
    // command line is part of the key, so the entry no longer matches.
    {
        let maek = engine(&dir);
        maek.rule(
            ["out.txt"],
            Vec::<String>::new(),
            vec![sh("echo two > out.txt")],
        )
        .unwrap();
        assert!(maek.update(["out.txt"]).await.unwrap());
        assert_eq!(read(&dir, "out.txt"), "two\n");
    }
}

#[tokio::test]
async fn stale_cache_entries_for_unknown_targets_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "x\n");
    write(
        &dir,
        "maek-cache.json",
        r#"{ "long-gone.txt": ["stale"] }"#,
    );

    let maek = engine(&dir);
    maek.rule(["out.txt"], ["src.txt"], vec![sh("cp src.txt out.txt")])
        .unwrap();
    assert!(maek.update(["out.txt"]).await.unwrap());

    let entries = cache(&dir);
    assert!(entries.contains_key("out.txt"));
    assert!(!entries.contains_key("long-gone.txt"));
}

#[tokio::test]
async fn a_corrupt_cache_file_is_a_fresh_start_not_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "x\n");
    write(&dir, "maek-cache.json", "not json at all");

    let maek = engine(&dir);
    maek.rule(["out.txt"], ["src.txt"], vec![sh("cp src.txt out.txt")])
        .unwrap();
    assert!(maek.update(["out.txt"]).await.unwrap());
    assert_eq!(read(&dir, "out.txt"), "x\n");
}

#[tokio::test]
async fn outputs_in_subdirectories_are_probed_relative_to_the_root() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "src.txt", "deep\n");

    let maek = engine(&dir);
    maek.rule(
        ["out/deep.txt"],
        ["src.txt"],
        vec![sh("mkdir -p out && cp src.txt out/deep.txt")],
    )
    .unwrap();

    assert!(maek.update(["out/deep.txt"]).await.unwrap());
    assert!(Path::new(&dir.path().join("out/deep.txt")).exists());
}
