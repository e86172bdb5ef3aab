//! In-process compliance store.
//!
//! Holds the compliance, hash and grouping tables behind one lock, with a
//! unique index on each table's natural key. All writes happen inside
//! `transaction`, which records an undo log and rolls back when the closure
//! returns an error, so a failed device evaluation leaves nothing behind.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::rules::model::ComplianceRule;

use super::models::{ConfigCompliance, ConfigComplianceHash, ConfigHashGrouping, ConfigKind, RuleRecord};

pub type ComplianceKey = (Uuid, Uuid);
pub type HashKey = (Uuid, Uuid, ConfigKind);
pub type GroupKey = (Uuid, String);

/// Serializable copy of every table, ordered for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub compliance: Vec<ConfigCompliance>,
    #[serde(default)]
    pub hashes: Vec<ConfigComplianceHash>,
    #[serde(default)]
    pub groups: Vec<ConfigHashGrouping>,
}

#[derive(Debug, Default)]
struct Tables {
    rules: HashMap<Uuid, RuleRecord>,
    compliance: HashMap<ComplianceKey, ConfigCompliance>,
    hashes: HashMap<HashKey, ConfigComplianceHash>,
    hash_ids: HashMap<Uuid, HashKey>,
    groups: HashMap<GroupKey, ConfigHashGrouping>,
    group_ids: HashMap<Uuid, GroupKey>,
}

impl Tables {
    fn put_compliance(&mut self, key: ComplianceKey, value: Option<ConfigCompliance>) -> Option<ConfigCompliance> {
        match value {
            Some(record) => self.compliance.insert(key, record),
            None => self.compliance.remove(&key),
        }
    }

    fn put_hash(&mut self, key: HashKey, value: Option<ConfigComplianceHash>) -> Option<ConfigComplianceHash> {
        let previous = match value {
            Some(record) => {
                self.hash_ids.insert(record.id, key);
                self.hashes.insert(key, record)
            }
            None => self.hashes.remove(&key),
        };
        if let Some(prev) = &previous {
            if self.hashes.get(&key).map(|h| h.id) != Some(prev.id) {
                self.hash_ids.remove(&prev.id);
            }
        }
        previous
    }

    fn put_group(&mut self, key: GroupKey, value: Option<ConfigHashGrouping>) -> Option<ConfigHashGrouping> {
        let previous = match value {
            Some(group) => {
                self.group_ids.insert(group.id, key.clone());
                self.groups.insert(key.clone(), group)
            }
            None => self.groups.remove(&key),
        };
        if let Some(prev) = &previous {
            if self.groups.get(&key).map(|g| g.id) != Some(prev.id) {
                self.group_ids.remove(&prev.id);
            }
        }
        previous
    }
}

enum Undo {
    Compliance(ComplianceKey, Option<ConfigCompliance>),
    Hash(HashKey, Option<ConfigComplianceHash>),
    Group(GroupKey, Option<ConfigHashGrouping>),
}

/// Mutable view of the tables for the duration of one transaction.
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    undo: Vec<Undo>,
}

impl Transaction<'_> {
    // ---- compliance ----

    pub fn compliance(&self, device_id: Uuid, rule_id: Uuid) -> Option<&ConfigCompliance> {
        self.tables.compliance.get(&(device_id, rule_id))
    }

    pub fn compliance_by_id(&self, id: Uuid) -> Option<&ConfigCompliance> {
        self.tables.compliance.values().find(|c| c.id == id)
    }

    pub fn compliance_keys(&self) -> Vec<ComplianceKey> {
        let mut keys: Vec<ComplianceKey> = self.tables.compliance.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Insert or overwrite the record for (device, rule). An existing
    /// record keeps its id.
    pub fn upsert_compliance(&mut self, mut record: ConfigCompliance) -> ConfigCompliance {
        let key = record.key();
        if let Some(existing) = self.tables.compliance.get(&key) {
            record.id = existing.id;
        }
        let previous = self.tables.put_compliance(key, Some(record.clone()));
        self.undo.push(Undo::Compliance(key, previous));
        record
    }

    pub fn delete_compliance(&mut self, device_id: Uuid, rule_id: Uuid) -> Option<ConfigCompliance> {
        let key = (device_id, rule_id);
        let previous = self.tables.put_compliance(key, None)?;
        self.undo.push(Undo::Compliance(key, Some(previous.clone())));
        Some(previous)
    }

    // ---- hashes ----

    pub fn hash(&self, key: &HashKey) -> Option<&ConfigComplianceHash> {
        self.tables.hashes.get(key)
    }

    pub fn hash_by_id(&self, id: Uuid) -> Option<&ConfigComplianceHash> {
        self.tables.hash_ids.get(&id).and_then(|key| self.tables.hashes.get(key))
    }

    pub fn hash_keys(&self) -> Vec<HashKey> {
        let mut keys: Vec<HashKey> = self.tables.hashes.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Insert or update the hash record for (device, rule, kind), keeping the
    /// id of an existing record.
    pub fn upsert_hash(
        &mut self,
        device_id: Uuid,
        rule_id: Uuid,
        config_type: ConfigKind,
        config_hash: &str,
        config_group: Option<Uuid>,
    ) -> ConfigComplianceHash {
        let key = (device_id, rule_id, config_type);
        let id = self
            .tables
            .hashes
            .get(&key)
            .map(|h| h.id)
            .unwrap_or_else(Uuid::new_v4);
        let record = ConfigComplianceHash {
            id,
            device_id,
            rule_id,
            config_type,
            config_hash: config_hash.to_string(),
            config_group,
        };
        let previous = self.tables.put_hash(key, Some(record.clone()));
        self.undo.push(Undo::Hash(key, previous));
        record
    }

    pub fn delete_hash(&mut self, key: &HashKey) -> Option<ConfigComplianceHash> {
        let previous = self.tables.put_hash(*key, None)?;
        self.undo.push(Undo::Hash(*key, Some(previous.clone())));
        Some(previous)
    }

    /// Hash records linked to a group.
    pub fn members(&self, group_id: Uuid) -> Vec<ConfigComplianceHash> {
        let mut members: Vec<ConfigComplianceHash> = self
            .tables
            .hashes
            .values()
            .filter(|h| h.config_group == Some(group_id))
            .cloned()
            .collect();
        members.sort_by_key(|h| h.natural_key());
        members
    }

    // ---- groups ----

    pub fn group(&self, rule_id: Uuid, config_hash: &str) -> Option<&ConfigHashGrouping> {
        self.tables.groups.get(&(rule_id, config_hash.to_string()))
    }

    pub fn group_by_id(&self, id: Uuid) -> Option<&ConfigHashGrouping> {
        self.tables.group_ids.get(&id).and_then(|key| self.tables.groups.get(key))
    }

    pub fn groups(&self) -> Vec<ConfigHashGrouping> {
        let mut groups: Vec<ConfigHashGrouping> = self.tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| (a.rule_id, &a.config_hash).cmp(&(b.rule_id, &b.config_hash)));
        groups
    }

    pub fn groups_for_rule(&self, rule_id: Uuid) -> Vec<ConfigHashGrouping> {
        self.groups().into_iter().filter(|g| g.rule_id == rule_id).collect()
    }

    /// Find the group for (rule, hash) or create it. The bool is true when
    /// the group was created.
    pub fn get_or_create_group(
        &mut self,
        rule_id: Uuid,
        config_hash: &str,
        config_content: &Value,
    ) -> (ConfigHashGrouping, bool) {
        let key = (rule_id, config_hash.to_string());
        if let Some(existing) = self.tables.groups.get(&key) {
            return (existing.clone(), false);
        }
        let group = ConfigHashGrouping {
            id: Uuid::new_v4(),
            rule_id,
            config_hash: config_hash.to_string(),
            config_content: config_content.clone(),
        };
        let previous = self.tables.put_group(key.clone(), Some(group.clone()));
        self.undo.push(Undo::Group(key, previous));
        (group, true)
    }

    pub fn delete_group(&mut self, id: Uuid) -> Option<ConfigHashGrouping> {
        let key = self.tables.group_ids.get(&id)?.clone();
        let previous = self.tables.put_group(key.clone(), None)?;
        self.undo.push(Undo::Group(key, Some(previous.clone())));
        Some(previous)
    }

    // ---- rules ----

    pub fn rule(&self, rule_id: Uuid) -> Option<&RuleRecord> {
        self.tables.rules.get(&rule_id)
    }

    /// Rules of a feature, known from registration or from stored records.
    pub fn rules_for_feature(&self, feature_id: Uuid) -> Vec<Uuid> {
        let mut rules: Vec<Uuid> = self
            .tables
            .rules
            .values()
            .filter(|r| r.feature_id == feature_id)
            .map(|r| r.rule_id)
            .chain(
                self.tables
                    .compliance
                    .values()
                    .filter(|c| c.feature_id == feature_id)
                    .map(|c| c.rule_id),
            )
            .collect();
        rules.sort();
        rules.dedup();
        rules
    }

    /// Feature of a rule, from registration or from stored records.
    pub fn feature_of(&self, rule_id: Uuid) -> Option<Uuid> {
        self.tables
            .rules
            .get(&rule_id)
            .map(|r| r.feature_id)
            .or_else(|| {
                self.tables
                    .compliance
                    .values()
                    .find(|c| c.rule_id == rule_id)
                    .map(|c| c.feature_id)
            })
    }

    fn rollback(&mut self) {
        let undo = std::mem::take(&mut self.undo);
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Compliance(key, value) => {
                    self.tables.put_compliance(key, value);
                }
                Undo::Hash(key, value) => {
                    self.tables.put_hash(key, value);
                }
                Undo::Group(key, value) => {
                    self.tables.put_group(key, value);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ComplianceStore {
    tables: Mutex<Tables>,
}

impl ComplianceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut tables = Tables::default();
        for rule in snapshot.rules {
            tables.rules.insert(rule.rule_id, rule);
        }
        for record in snapshot.compliance {
            tables.put_compliance(record.key(), Some(record));
        }
        for hash in snapshot.hashes {
            tables.put_hash(hash.natural_key(), Some(hash));
        }
        for group in snapshot.groups {
            tables.put_group((group.rule_id, group.config_hash.clone()), Some(group));
        }
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.lock();

        let mut rules: Vec<RuleRecord> = tables.rules.values().cloned().collect();
        rules.sort_by_key(|r| r.rule_id);
        let mut compliance: Vec<ConfigCompliance> = tables.compliance.values().cloned().collect();
        compliance.sort_by_key(|c| c.key());
        let mut hashes: Vec<ConfigComplianceHash> = tables.hashes.values().cloned().collect();
        hashes.sort_by_key(|h| h.natural_key());
        let mut groups: Vec<ConfigHashGrouping> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| (a.rule_id, &a.config_hash).cmp(&(b.rule_id, &b.config_hash)));

        StoreSnapshot {
            rules,
            compliance,
            hashes,
            groups,
        }
    }

    /// Record which feature each rule belongs to.
    pub fn register_rules(&self, rules: &[ComplianceRule]) {
        let mut tables = self.tables.lock();
        for rule in rules {
            tables.rules.insert(rule.id, RuleRecord::from(rule));
        }
    }

    /// Run `f` atomically. On error every write made by `f` is undone.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.lock();
        let mut tx = Transaction {
            tables: &mut tables,
            undo: Vec::new(),
        };
        let result = f(&mut tx);
        if result.is_err() {
            tx.rollback();
        }
        result
    }

    /// Run a read-only query under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Transaction<'_>) -> T) -> T {
        let mut tables = self.tables.lock();
        let tx = Transaction {
            tables: &mut tables,
            undo: Vec::new(),
        };
        f(&tx)
    }

    pub fn compliance(&self, device_id: Uuid, rule_id: Uuid) -> Option<ConfigCompliance> {
        self.read(|tx| tx.compliance(device_id, rule_id).cloned())
    }

    pub fn compliance_records(&self) -> Vec<ConfigCompliance> {
        self.snapshot().compliance
    }

    pub fn hash_records(&self) -> Vec<ConfigComplianceHash> {
        self.snapshot().hashes
    }

    pub fn groups(&self) -> Vec<ConfigHashGrouping> {
        self.read(|tx| tx.groups())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComplianceError;
    use chrono::Utc;
    use serde_json::json;

    fn record(device_id: Uuid, rule_id: Uuid) -> ConfigCompliance {
        ConfigCompliance {
            id: Uuid::new_v4(),
            device_id,
            device_name: "r1".to_string(),
            rule_id,
            feature_id: Uuid::new_v4(),
            compliance: false,
            compliance_int: 0,
            ordered: false,
            actual: json!("ntp server 1"),
            intended: json!("ntp server 2"),
            missing: json!("ntp server 2"),
            extra: json!("ntp server 1"),
            remediation: json!(""),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_keeps_id() {
        let store = ComplianceStore::new();
        let (device, rule) = (Uuid::new_v4(), Uuid::new_v4());
        let first = store.transaction(|tx| Ok(tx.upsert_compliance(record(device, rule)))).unwrap();
        let second = store.transaction(|tx| Ok(tx.upsert_compliance(record(device, rule)))).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.compliance_records().len(), 1);
    }

    #[test]
    fn test_error_rolls_back_every_write() {
        let store = ComplianceStore::new();
        let (device, rule) = (Uuid::new_v4(), Uuid::new_v4());

        let result: Result<()> = store.transaction(|tx| {
            tx.upsert_compliance(record(device, rule));
            let (group, _) = tx.get_or_create_group(rule, "abc", &json!("x"));
            tx.upsert_hash(device, rule, ConfigKind::Actual, "abc", Some(group.id));
            Err(ComplianceError::InvalidSettings("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.snapshot(), StoreSnapshot::default());
    }

    #[test]
    fn test_rollback_restores_overwritten_rows() {
        let store = ComplianceStore::new();
        let (device, rule) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .transaction(|tx| {
                tx.upsert_hash(device, rule, ConfigKind::Actual, "old", None);
                Ok(())
            })
            .unwrap();
        let before = store.snapshot();

        let _ = store.transaction(|tx| -> Result<()> {
            tx.upsert_hash(device, rule, ConfigKind::Actual, "new", None);
            tx.delete_hash(&(device, rule, ConfigKind::Actual));
            Err(ComplianceError::InvalidSettings("boom".to_string()))
        });

        assert_eq!(store.snapshot(), before);
        let id = before.hashes[0].id;
        assert!(store.read(|tx| tx.hash_by_id(id).is_some()));
    }

    #[test]
    fn test_group_unique_per_rule_and_hash() {
        let store = ComplianceStore::new();
        let rule = Uuid::new_v4();
        let (a, created_a) = store
            .transaction(|tx| Ok(tx.get_or_create_group(rule, "h1", &json!({}))))
            .unwrap();
        let (b, created_b) = store
            .transaction(|tx| Ok(tx.get_or_create_group(rule, "h1", &json!({}))))
            .unwrap();
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a.id, b.id);
        assert_eq!(store.groups().len(), 1);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let store = ComplianceStore::new();
        let (device, rule) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .transaction(|tx| {
                tx.upsert_compliance(record(device, rule));
                let (group, _) = tx.get_or_create_group(rule, "h", &json!({"a": [1, {"b": 2}]}));
                tx.upsert_hash(device, rule, ConfigKind::Actual, "h", Some(group.id));
                Ok(())
            })
            .unwrap();

        let snapshot = store.snapshot();
        let text = serde_json::to_string(&snapshot).unwrap();
        let restored: StoreSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(ComplianceStore::from_snapshot(restored).snapshot(), snapshot);
    }
}
