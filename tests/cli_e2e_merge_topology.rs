//! End-to-end tests for merge-preserving synthesis: meta-repo merge commits
//! are replayed on the monorepo branch, unless flattening is requested.

mod common;

use common::*;

/// Build the standard world plus a meta feature branch `feat-m` that merges
/// a side branch, so `main..feat-m` contains a merge commit.
fn world_with_meta_merge() -> (World, std::path::PathBuf) {
    let (world, meta) = standard_world();

    git(&meta, &["checkout", "-b", "feat-m"]);
    write_file(&meta, "m.txt", "feature work\n");
    commit_all(&meta, "feat-m work");

    git(&meta, &["checkout", "-b", "side", "main"]);
    write_file(&meta, "s.txt", "side work\n");
    commit_all(&meta, "side work");

    git(&meta, &["checkout", "feat-m"]);
    git(&meta, &["merge", "--no-ff", "-m", "merge side into feat-m", "side"]);
    git(&meta, &["checkout", "main"]);

    (world, meta)
}

#[test]
fn test_meta_merge_topology_is_replayed() {
    let (world, meta) = world_with_meta_merge();
    let ws = world.workspace("ws");

    run_monomaker(&meta, &ws, &[]).code(0);

    let mono = ws.join("monorepo");
    let mut mono_branches = branches(&mono);
    mono_branches.sort();
    assert_eq!(mono_branches, vec!["dev", "feat-m", "main", "side"]);

    // The branch carries both sides' content...
    assert_eq!(file_at(&mono, "feat-m", "m.txt"), "feature work");
    assert_eq!(file_at(&mono, "feat-m", "s.txt"), "side work");
    assert_eq!(
        subtree_entries(&mono, "feat-m", "a"),
        tree_entries(&world.repo_path("a"), "main")
    );

    // ...and a replay commit mirroring the meta-repo merge.
    let subjects = git(&mono, &["log", "--format=%s", "feat-m"]);
    assert!(
        subjects.contains("replay meta-repo merge"),
        "expected a replay commit in:\n{subjects}"
    );
}

#[test]
fn test_flatten_merges_skips_topology_replay() {
    let (world, meta) = world_with_meta_merge();
    let ws = world.workspace("ws");

    run_monomaker(&meta, &ws, &["--flatten-merges"]).code(0);

    let mono = ws.join("monorepo");

    // Content is identical, topology is not reproduced.
    assert_eq!(file_at(&mono, "feat-m", "m.txt"), "feature work");
    assert_eq!(file_at(&mono, "feat-m", "s.txt"), "side work");
    let subjects = git(&mono, &["log", "--format=%s", "feat-m"]);
    assert!(!subjects.contains("replay meta-repo merge"));
}

#[test]
fn test_branch_without_meta_merges_stays_linear() {
    let (world, meta) = standard_world();
    world.add_branch(&world.repo_path("a"), "feat-x", &[("x.txt", "x\n")]);
    let ws = world.workspace("ws");

    run_monomaker(&meta, &ws, &[]).code(0);

    let mono = ws.join("monorepo");
    let subjects = git(&mono, &["log", "--format=%s", "feat-x"]);
    assert!(!subjects.contains("replay meta-repo merge"));
}
