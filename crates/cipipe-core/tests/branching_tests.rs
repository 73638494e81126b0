use cipipe_core::{artifacts, ArtifactSet, InMemoryTraceStore, Pipeline, TraceStore};

#[test]
fn branch_independence_after_fork() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryTraceStore::new(dir.path());
    let inputs = artifacts! { "videos" => ["a.isxd"] };

    let mut main = Pipeline::new(&inputs, store.clone(), Some("main")).unwrap();
    main.step("S1", |_| Ok(artifacts! { "videos" => ["1.isxd"] }))
        .unwrap()
        .step("S2", |_| Ok(artifacts! { "videos" => ["2.isxd"] }))
        .unwrap()
        .step("S3", |_| Ok(artifacts! { "videos" => ["3.isxd"] }))
        .unwrap();

    let mut alt = main.branch("alt").unwrap();
    let doc = store.read_trace().unwrap();
    assert_eq!(doc.branch("alt").unwrap().len(), 3);
    assert_eq!(doc.branch("alt"), doc.branch("main"));

    alt.step("S4", |_| Ok(ArtifactSet::new())).unwrap();
    assert_eq!(store.read_trace().unwrap().branch_len("main"), 3);
    assert_eq!(alt.trace().unwrap().len(), 4);

    // un pipeline reanudado sobre "main" no ve el step de "alt"
    let resumed_main = Pipeline::new(&inputs, store.clone(), Some("main")).unwrap();
    assert!(!resumed_main.is_completed("S4"));
    assert_eq!(resumed_main.branches().unwrap(), vec!["main".to_string(), "alt".to_string()]);
}

#[test]
fn branches_never_share_step_folders() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryTraceStore::new(dir.path());
    let inputs = artifacts! { "videos" => ["a.isxd"] };

    let mut main = Pipeline::new(&inputs, store.clone(), None).unwrap();
    main.step("S1", |_| Ok(ArtifactSet::new())).unwrap();
    let mut alt = main.branch("alt").unwrap();

    main.step("S2", |_| Ok(ArtifactSet::new())).unwrap();
    alt.step("S2", |_| Ok(ArtifactSet::new())).unwrap();

    assert!(dir.path().join("branch 1 - step 2 - S2").is_dir());
    assert!(dir.path().join("alt - step 2 - S2").is_dir());
}
