//! End-to-end tests for feature-branch resolution: partial feature
//! branches, whitelist filtering, and unknown whitelist entries.

mod common;

use common::*;

#[test]
fn test_partial_feature_branch_combines_feature_and_defaults() {
    let (world, meta) = standard_world();
    world.add_branch(
        &world.repo_path("a"),
        "feat-x",
        &[("feature.txt", "feature work\n")],
    );
    let ws = world.workspace("ws");

    run_monomaker(&meta, &ws, &[]).code(0);

    let mono = ws.join("monorepo");
    let mut mono_branches = branches(&mono);
    mono_branches.sort();
    assert_eq!(mono_branches, vec!["dev", "feat-x", "main"]);

    // a contributes its feature branch, everyone else their default.
    assert_eq!(
        subtree_entries(&mono, "feat-x", "a"),
        tree_entries(&world.repo_path("a"), "feat-x")
    );
    assert_eq!(file_at(&mono, "feat-x", "a/feature.txt"), "feature work");
    assert_eq!(
        subtree_entries(&mono, "feat-x", "b"),
        tree_entries(&world.repo_path("b"), "dev")
    );
    assert_eq!(file_at(&mono, "feat-x", "README.md"), "meta readme");

    // The plan records who fell back.
    let report = read_report(&ws);
    let resolved = records_of(&report["resolutions"], "branch_resolved");
    let feat_x = resolved
        .iter()
        .find(|r| r["branch"] == "feat-x")
        .expect("feat-x resolution");
    let entries = feat_x["plan"]["entries"].as_array().unwrap();
    let entry = |repo: &str| {
        entries
            .iter()
            .find(|e| e["repo"] == repo)
            .unwrap_or_else(|| panic!("plan entry for {repo}"))
    };
    assert_eq!(entry("meta")["fell_back"], true);
    assert_eq!(entry("meta")["branch_used"], "main");
    assert_eq!(entry("a")["fell_back"], false);
    assert_eq!(entry("a")["branch_used"], "feat-x");
    assert_eq!(entry("b")["fell_back"], true);
    assert_eq!(entry("b")["branch_used"], "dev");
}

#[test]
fn test_whitelist_filters_feature_branches() {
    let (world, meta) = standard_world();
    world.add_branch(&world.repo_path("a"), "feat-x", &[("x.txt", "x\n")]);
    world.add_branch(&world.repo_path("b"), "feat-y", &[("y.txt", "y\n")]);
    common::write_file(world.path(), "whitelist.json", r#"["feat-x"]"#);
    let ws = world.workspace("ws");

    run_monomaker(
        &meta,
        &ws,
        &[
            "--branches-whitelist",
            world.path().join("whitelist.json").to_str().unwrap(),
        ],
    )
    .code(0);

    let mono = ws.join("monorepo");
    let mut mono_branches = branches(&mono);
    mono_branches.sort();
    // feat-y is filtered out; the defaults are always materialized.
    assert_eq!(mono_branches, vec!["dev", "feat-x", "main"]);

    let report = read_report(&ws);
    // A filtered branch is not an anomaly: no skip record for feat-y.
    assert!(records_of(&report["resolutions"], "skip").is_empty());
    let applied = records_of(&report["resolutions"], "whitelist_applied");
    assert_eq!(applied.len(), 1);
    let effective = applied[0]["effective"].as_array().unwrap();
    assert_eq!(effective.len(), 3);
}

#[test]
fn test_whitelist_unknown_branch_is_recorded_as_skip() {
    let (world, meta) = standard_world();
    common::write_file(world.path(), "whitelist.json", r#"["ghost"]"#);
    let ws = world.workspace("ws");

    run_monomaker(
        &meta,
        &ws,
        &[
            "--branches-whitelist",
            world.path().join("whitelist.json").to_str().unwrap(),
        ],
    )
    .code(0);

    let mono = ws.join("monorepo");
    let mut mono_branches = branches(&mono);
    mono_branches.sort();
    assert_eq!(mono_branches, vec!["dev", "main"]);

    let report = read_report(&ws);
    let skips = records_of(&report["resolutions"], "skip");
    assert_eq!(skips.len(), 1);
    assert_eq!(skips[0]["branch"], "ghost");
    assert_eq!(skips[0]["reason"], "unknown-branch");
}

#[test]
fn test_whitelist_duplicates_are_ignored() {
    let (world, meta) = standard_world();
    world.add_branch(&world.repo_path("a"), "feat-x", &[("x.txt", "x\n")]);
    common::write_file(world.path(), "whitelist.json", r#"["feat-x", "feat-x"]"#);
    let ws = world.workspace("ws");

    run_monomaker(
        &meta,
        &ws,
        &[
            "--branches-whitelist",
            world.path().join("whitelist.json").to_str().unwrap(),
        ],
    )
    .code(0);

    let report = read_report(&ws);
    let resolved = records_of(&report["resolutions"], "branch_resolved");
    let feat_x_count = resolved.iter().filter(|r| r["branch"] == "feat-x").count();
    assert_eq!(feat_x_count, 1);
}
