#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Snapshot commit lifecycle, derived predicates and reach-through collections

mod common;

use common::{create_test_deployment, create_test_snapshot, new_store, FaultyStore};
use deploysnap_core::errors::ExErrorKind;
use deploysnap_core::model::{AttribType, DeploymentSlot, SnapshotStatus};
use deploysnap_core::ops::lifecycle::{
    attrib_types, attribs, begin_commit, create_snapshot, is_active, is_committed, is_proposed,
    mark_applied, mark_failed, nodes, queue_snapshot, NewSnapshot,
};
use deploysnap_core::ops::role_order::add_role;
use deploysnap_core::{ElementOrder, MemoryStore, SnapshotStore};
use proptest::prelude::*;

#[test]
fn test_create_snapshot_starts_created() {
    let mut store = new_store();
    let deployment = create_test_deployment(&mut store, "prod");

    let snapshot = create_snapshot(
        &mut store,
        NewSnapshot {
            name: "proposal".into(),
            description: Some("first cut".into()),
            deployment_id: Some(deployment.id.clone()),
            barclamp_id: Some("nova".into()),
            element_order: Some(ElementOrder::from(vec![vec!["a", "b"], vec!["c"]])),
        },
    )
    .unwrap();

    let stored = store.get_snapshot(&snapshot.id).unwrap();
    assert_eq!(stored.status(), SnapshotStatus::Created);
    assert_eq!(stored.failed_reason(), None);
    assert_eq!(stored.deployment_id.as_deref(), Some(deployment.id.as_str()));
    assert_eq!(stored.element_order.as_deref(), Some(r#"[["a","b"],["c"]]"#));
}

#[test]
fn test_create_snapshot_rejects_blank_name() {
    let mut store = new_store();
    let err = create_snapshot(
        &mut store,
        NewSnapshot {
            name: "   ".into(),
            ..Default::default()
        },
    )
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ValidationFailure);
    assert!(store.list_snapshots(None).unwrap().is_empty());
}

#[test]
fn test_create_snapshot_name_unique_per_deployment() {
    let mut store = new_store();
    let prod = create_test_deployment(&mut store, "prod");
    let staging = create_test_deployment(&mut store, "staging");
    create_test_snapshot(&mut store, "proposal", Some(&prod.id), None);

    let same_deployment = create_snapshot(
        &mut store,
        NewSnapshot {
            name: "proposal".into(),
            deployment_id: Some(prod.id.clone()),
            ..Default::default()
        },
    );
    assert_eq!(
        same_deployment.unwrap_err().kind(),
        ExErrorKind::ValidationFailure
    );

    // Other deployments and templates are free to reuse the name
    create_test_snapshot(&mut store, "proposal", Some(&staging.id), None);
    create_test_snapshot(&mut store, "proposal", None, None);
    create_test_snapshot(&mut store, "proposal", None, None);
}

#[test]
fn test_history_failure_fails_the_transition() {
    let mut inner = new_store();
    let snapshot = create_test_snapshot(&mut inner, "base", None, None);
    let mut store = FaultyStore::new(inner);
    store.fail_jig_events = true;

    let err = queue_snapshot(&mut store, &snapshot.id).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert_eq!(err.op(), Some("queue_snapshot"));
    assert!(store.list_jig_events(&snapshot.id).unwrap().is_empty());
}

#[test]
fn test_failed_commit_can_be_retried() {
    let mut store = new_store();
    let snapshot = create_test_snapshot(&mut store, "base", None, None);

    queue_snapshot(&mut store, &snapshot.id).unwrap();
    begin_commit(&mut store, &snapshot.id).unwrap();
    let failed = mark_failed(&mut store, &snapshot.id, "chef run timed out").unwrap();
    assert_eq!(failed.status(), SnapshotStatus::Failed);
    assert_eq!(failed.failed_reason(), Some("chef run timed out"));

    let requeued = queue_snapshot(&mut store, &snapshot.id).unwrap();
    assert_eq!(requeued.status(), SnapshotStatus::Queued);
    assert_eq!(requeued.failed_reason(), None);

    begin_commit(&mut store, &snapshot.id).unwrap();
    let applied = mark_applied(&mut store, &snapshot.id).unwrap();
    assert_eq!(applied.status(), SnapshotStatus::Applied);
    assert_eq!(applied.failed_reason(), None);
    assert_eq!(store.list_jig_events(&snapshot.id).unwrap().len(), 6);
}

#[test]
fn test_applied_is_terminal() {
    let mut store = new_store();
    let snapshot = create_test_snapshot(&mut store, "base", None, None);
    queue_snapshot(&mut store, &snapshot.id).unwrap();
    begin_commit(&mut store, &snapshot.id).unwrap();
    mark_applied(&mut store, &snapshot.id).unwrap();

    assert_eq!(
        queue_snapshot(&mut store, &snapshot.id).unwrap_err().kind(),
        ExErrorKind::InvalidTransition
    );
    assert_eq!(
        mark_failed(&mut store, &snapshot.id, "late").unwrap_err().kind(),
        ExErrorKind::InvalidTransition
    );
}

#[test]
fn test_transition_on_unknown_snapshot_is_not_found() {
    let mut store = new_store();
    let err = queue_snapshot(&mut store, "missing").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.op(), Some("queue_snapshot"));
}

#[test]
fn test_predicates_follow_deployment_slots() {
    let mut store = new_store();
    let mut deployment = create_test_deployment(&mut store, "prod");
    let active = create_test_snapshot(&mut store, "active", Some(&deployment.id), None);
    let committed = create_test_snapshot(&mut store, "committed", Some(&deployment.id), None);
    let proposed = create_test_snapshot(&mut store, "proposed", Some(&deployment.id), None);

    deployment.point(DeploymentSlot::Active, Some(active.id.clone()));
    deployment.point(DeploymentSlot::Committed, Some(committed.id.clone()));
    deployment.point(DeploymentSlot::Proposed, Some(proposed.id.clone()));
    store.save_deployment(&deployment).unwrap();

    for (snapshot, expected) in [
        (&active, (true, false, false)),
        (&committed, (false, true, false)),
        (&proposed, (false, false, true)),
    ] {
        let flags = (
            is_active(&store, snapshot).unwrap(),
            is_committed(&store, snapshot).unwrap(),
            is_proposed(&store, snapshot).unwrap(),
        );
        assert_eq!(flags, expected, "flags for {}", snapshot.name);
    }
}

#[test]
fn test_predicates_false_when_slot_points_elsewhere() {
    let mut store = new_store();
    let deployment = create_test_deployment(&mut store, "prod");
    let snapshot = create_test_snapshot(&mut store, "idle", Some(&deployment.id), None);

    assert!(!is_active(&store, &snapshot).unwrap());
    assert!(!is_committed(&store, &snapshot).unwrap());
    assert!(!is_proposed(&store, &snapshot).unwrap());
}

#[test]
fn test_reach_through_collections() {
    let mut store = new_store();
    let snapshot = create_test_snapshot(&mut store, "base", None, None);
    let web = add_role(&mut store, &snapshot, "web").unwrap();
    let db = add_role(&mut store, &snapshot, "db").unwrap();
    store.bind_node(&web.id, "n2").unwrap();
    store.bind_node(&web.id, "n1").unwrap();
    store.bind_node(&db.id, "n1").unwrap();
    store
        .add_attrib(&web.id, &AttribType::new("port"), None, "base")
        .unwrap();
    store
        .add_attrib(&db.id, &AttribType::new("port"), Some("n1"), "base")
        .unwrap();
    store
        .add_attrib(&db.id, &AttribType::new("disk"), None, "base")
        .unwrap();

    assert_eq!(
        nodes(&store, &snapshot.id).unwrap(),
        vec!["n1".to_string(), "n2".to_string()]
    );
    assert_eq!(attribs(&store, &snapshot.id).unwrap().len(), 3);
    assert_eq!(
        attrib_types(&store, &snapshot.id).unwrap(),
        vec!["disk".to_string(), "port".to_string()]
    );
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Queue,
    Begin,
    Apply,
    Fail,
}

fn apply(store: &mut MemoryStore, id: &str, step: Step) -> bool {
    let result = match step {
        Step::Queue => queue_snapshot(store, id),
        Step::Begin => begin_commit(store, id),
        Step::Apply => mark_applied(store, id),
        Step::Fail => mark_failed(store, id, "failed"),
    };
    match result {
        Ok(_) => true,
        Err(err) => {
            assert_eq!(err.kind(), ExErrorKind::InvalidTransition);
            false
        }
    }
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Queue),
        Just(Step::Begin),
        Just(Step::Apply),
        Just(Step::Fail),
    ]
}

proptest! {
    #[test]
    fn prop_only_allowed_edges_are_taken(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let mut store = new_store();
        let snapshot = create_test_snapshot(&mut store, "prop", None, None);

        let mut current = SnapshotStatus::Created;
        let mut accepted = 0;
        for step in steps {
            let before = store.get_snapshot(&snapshot.id).unwrap();
            if apply(&mut store, &snapshot.id, step) {
                let after = store.get_snapshot(&snapshot.id).unwrap();
                prop_assert!(current.can_transition_to(after.status()));
                current = after.status();
                accepted += 1;
            } else {
                prop_assert_eq!(store.get_snapshot(&snapshot.id).unwrap(), before);
            }

            let stored = store.get_snapshot(&snapshot.id).unwrap();
            prop_assert_eq!(stored.status(), current);
            prop_assert_eq!(
                stored.failed_reason().is_some(),
                current == SnapshotStatus::Failed
            );
        }

        prop_assert_eq!(store.list_jig_events(&snapshot.id).unwrap().len(), accepted);
    }
}
