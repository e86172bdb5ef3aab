use std::sync::Arc;
use std::thread;

use chrono::Utc;
use golden_config_core::error::ComplianceError;
use golden_config_core::grouping::HashGroupingEngine;
use golden_config_core::logging::LogContext;
use golden_config_core::storage::{queries, ComplianceStore, ConfigCompliance, StoreSnapshot};
use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::json;
use uuid::Uuid;

fn record(device_id: Uuid, rule_id: Uuid, feature_id: Uuid, actual: &str, compliant: bool) -> ConfigCompliance {
    ConfigCompliance {
        id: Uuid::new_v4(),
        device_id,
        device_name: format!("dev-{device_id}"),
        rule_id,
        feature_id,
        compliance: compliant,
        compliance_int: u8::from(compliant),
        ordered: false,
        actual: json!(actual),
        intended: json!("ntp server 10.0.0.1"),
        missing: json!(""),
        extra: json!(""),
        remediation: json!(""),
        last_updated: Utc::now(),
    }
}

fn save(store: &ComplianceStore, record: ConfigCompliance) {
    let ctx = LogContext::new("run-it");
    store
        .transaction(|tx| {
            let saved = tx.upsert_compliance(record);
            HashGroupingEngine::record(tx, &saved, &ctx);
            Ok(())
        })
        .unwrap();
}

#[test]
fn concurrent_writers_create_one_group() {
    let store = Arc::new(ComplianceStore::new());
    let (rule, feature) = (Uuid::new_v4(), Uuid::new_v4());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || save(&store, record(Uuid::new_v4(), rule, feature, "ntp server 9.9.9.9", false)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let groups = store.groups();
    assert_eq!(groups.len(), 1);
    let summaries = HashGroupingEngine::new(&store).groups_with_multiple_devices();
    assert_eq!(summaries[0].device_count, 16);
}

#[test]
fn bulk_delete_with_unknown_group_is_atomic() {
    let store = ComplianceStore::new();
    let (rule, feature) = (Uuid::new_v4(), Uuid::new_v4());
    save(&store, record(Uuid::new_v4(), rule, feature, "a", false));
    save(&store, record(Uuid::new_v4(), rule, feature, "b", false));
    let before = store.snapshot();
    let known = before.groups[0].id;
    let unknown = Uuid::new_v4();

    let engine = HashGroupingEngine::new(&store);
    let err = engine
        .bulk_delete_groups(&[known, unknown], &LogContext::new("run-it"))
        .unwrap_err();

    assert!(matches!(err, ComplianceError::GroupingIntegrity { ref missing } if missing == &vec![unknown]));
    assert!(err.to_string().contains(&unknown.to_string()));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn bulk_delete_compliance_removes_everything_derived() {
    let store = ComplianceStore::new();
    let (rule, feature) = (Uuid::new_v4(), Uuid::new_v4());
    save(&store, record(Uuid::new_v4(), rule, feature, "a", false));
    save(&store, record(Uuid::new_v4(), rule, feature, "a", false));
    let ids: Vec<Uuid> = store.compliance_records().iter().map(|r| r.id).collect();

    let engine = HashGroupingEngine::new(&store);
    assert_eq!(engine.bulk_delete_compliance(&ids, &LogContext::new("run-it")).unwrap(), 2);
    assert_eq!(store.snapshot(), StoreSnapshot::default());
}

#[test]
fn delete_device_cleans_every_rule() {
    let store = ComplianceStore::new();
    let device = Uuid::new_v4();
    let feature = Uuid::new_v4();
    let (rule_a, rule_b) = (Uuid::new_v4(), Uuid::new_v4());
    save(&store, record(device, rule_a, feature, "a", false));
    save(&store, record(device, rule_b, feature, "b", false));
    save(&store, record(Uuid::new_v4(), rule_a, feature, "a", false));

    let engine = HashGroupingEngine::new(&store);
    assert_eq!(engine.delete_device(device, &LogContext::new("run-it")).unwrap(), 2);

    let groups = store.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].rule_id, rule_a);
    assert_eq!(engine.orphan_count(), 0);
}

#[test]
fn sql_statements_cover_grouping_lifecycle() {
    let names: Vec<&str> = queries::all_statements().iter().map(|(name, _)| *name).collect();
    assert!(names.contains(&"group_get_or_create"));
    assert!(names.contains(&"orphan_cleanup"));
    assert!(queries::build_device_ids_for_hash_group().contains("r.feature_id = $1"));
}

#[derive(Debug, Clone)]
enum Op {
    Save { device: usize, rule: usize, content: usize, compliant: bool },
    Delete { device: usize, rule: usize },
    DeleteDevice { device: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..2usize, 0..3usize, any::<bool>()).prop_map(|(device, rule, content, compliant)| Op::Save {
            device,
            rule,
            content,
            compliant
        }),
        (0..4usize, 0..2usize).prop_map(|(device, rule)| Op::Delete { device, rule }),
        (0..4usize).prop_map(|device| Op::DeleteDevice { device }),
    ]
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn no_orphan_groups_after_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let store = ComplianceStore::new();
        let engine = HashGroupingEngine::new(&store);
        let ctx = LogContext::new("run-prop");
        let devices: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let rules: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let feature = Uuid::new_v4();

        for op in ops {
            match op {
                Op::Save { device, rule, content, compliant } => {
                    let actual = format!("ntp server 9.9.9.{content}");
                    save(&store, record(devices[device], rules[rule], feature, &actual, compliant));
                }
                Op::Delete { device, rule } => {
                    engine.delete_compliance(devices[device], rules[rule], &ctx).unwrap();
                }
                Op::DeleteDevice { device } => {
                    engine.delete_device(devices[device], &ctx).unwrap();
                }
            }
            prop_assert_eq!(engine.orphan_count(), 0);

            let snapshot = store.snapshot();
            prop_assert_eq!(snapshot.hashes.len(), snapshot.compliance.len() * 2);
            for hash in &snapshot.hashes {
                let owner = snapshot
                    .compliance
                    .iter()
                    .find(|c| c.device_id == hash.device_id && c.rule_id == hash.rule_id);
                prop_assert!(owner.is_some());
                let owner = owner.unwrap();
                prop_assert_eq!(hash.config_group.is_some(), !owner.compliance && hash.config_type.as_str() == "actual");
            }
        }
    }
}
