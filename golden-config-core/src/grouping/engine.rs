//! Hash grouping engine.
//!
//! Maintains the derived hash and group tables from compliance records.
//! Each side of a record is fingerprinted; the actual side of a
//! non-compliant record joins the group for (rule, hash), created on first
//! sight. Groups left without members are removed, scoped to the rule that
//! changed.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::error::{ComplianceError, Result};
use crate::logging::structured::LogContext;
use crate::normalize::compute_config_hash;
use crate::storage::models::{ConfigCompliance, ConfigHashGrouping, ConfigKind, HashGroupSummary};
use crate::storage::store::{ComplianceStore, Transaction};
use crate::{log_debug, log_info};

/// Result of recording one compliance row in the grouping tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLink {
    pub actual_hash: String,
    pub intended_hash: String,
    pub group: Option<Uuid>,
    pub group_created: bool,
}

pub struct HashGroupingEngine<'a> {
    store: &'a ComplianceStore,
}

impl<'a> HashGroupingEngine<'a> {
    pub fn new(store: &'a ComplianceStore) -> Self {
        Self { store }
    }

    /// Hash both sides of `record` and link the actual side when it is
    /// non-compliant. Idempotent for an unchanged record.
    pub fn record(tx: &mut Transaction<'_>, record: &ConfigCompliance, ctx: &LogContext) -> HashLink {
        let actual_hash = compute_config_hash(&record.actual);
        let intended_hash = compute_config_hash(&record.intended);

        let (group, group_created) = if record.compliance {
            (None, false)
        } else {
            let (group, created) = tx.get_or_create_group(record.rule_id, &actual_hash, &record.actual);
            if created {
                log_info!(
                    ctx,
                    "HASH_GROUP_CREATED",
                    group = group.id.to_string(),
                    hash = &actual_hash[..12]
                );
            }
            (Some(group.id), created)
        };

        tx.upsert_hash(record.device_id, record.rule_id, ConfigKind::Actual, &actual_hash, group);
        tx.upsert_hash(record.device_id, record.rule_id, ConfigKind::Intended, &intended_hash, None);

        if let Some(group) = group {
            log_debug!(ctx, "HASH_GROUP_LINKED", group = group.to_string());
        }

        // the device may have left its previous group
        Self::cleanup_orphans(tx, record.rule_id, ctx);

        HashLink {
            actual_hash,
            intended_hash,
            group,
            group_created,
        }
    }

    /// Delete the rule's groups that no hash record links to.
    pub fn cleanup_orphans(tx: &mut Transaction<'_>, rule_id: Uuid, ctx: &LogContext) -> usize {
        let orphans: Vec<Uuid> = tx
            .groups_for_rule(rule_id)
            .into_iter()
            .filter(|g| tx.members(g.id).is_empty())
            .map(|g| g.id)
            .collect();

        for id in &orphans {
            tx.delete_group(*id);
            log_info!(ctx, "HASH_GROUP_ORPHAN_REMOVED", group = id.to_string());
        }
        orphans.len()
    }

    /// Delete both hash sides for each (device, rule) pair, then clean up the
    /// affected rules' groups.
    fn delete_hashes_for(tx: &mut Transaction<'_>, pairs: &BTreeSet<(Uuid, Uuid)>, ctx: &LogContext) -> usize {
        let mut deleted = 0;
        for (device_id, rule_id) in pairs {
            for kind in ConfigKind::BOTH {
                if tx.delete_hash(&(*device_id, *rule_id, kind)).is_some() {
                    deleted += 1;
                }
            }
        }
        let rules: BTreeSet<Uuid> = pairs.iter().map(|(_, rule)| *rule).collect();
        for rule_id in rules {
            Self::cleanup_orphans(tx, rule_id, ctx);
        }
        if deleted > 0 {
            log_info!(ctx, "HASH_RECORDS_DELETED", count = deleted, pairs = pairs.len());
        }
        deleted
    }

    /// Delete one compliance record with its hashes. Returns false when no
    /// record existed.
    pub fn delete_compliance(&self, device_id: Uuid, rule_id: Uuid, ctx: &LogContext) -> Result<bool> {
        self.store.transaction(|tx| {
            let existed = tx.delete_compliance(device_id, rule_id).is_some();
            Self::delete_hashes_for(tx, &BTreeSet::from([(device_id, rule_id)]), ctx);
            Ok(existed)
        })
    }

    /// Delete every compliance record of a device.
    pub fn delete_device(&self, device_id: Uuid, ctx: &LogContext) -> Result<usize> {
        self.delete_matching(|(device, _)| *device == device_id, ctx)
    }

    /// Delete every compliance record of a rule.
    pub fn delete_rule(&self, rule_id: Uuid, ctx: &LogContext) -> Result<usize> {
        self.delete_matching(|(_, rule)| *rule == rule_id, ctx)
    }

    fn delete_matching(&self, keep: impl Fn(&(Uuid, Uuid)) -> bool, ctx: &LogContext) -> Result<usize> {
        self.store.transaction(|tx| {
            let mut pairs: BTreeSet<(Uuid, Uuid)> = tx.compliance_keys().into_iter().filter(&keep).collect();
            pairs.extend(
                tx.hash_keys()
                    .into_iter()
                    .map(|(device, rule, _)| (device, rule))
                    .filter(&keep),
            );
            let mut removed = 0;
            for (device_id, rule_id) in &pairs {
                if tx.delete_compliance(*device_id, *rule_id).is_some() {
                    removed += 1;
                }
            }
            Self::delete_hashes_for(tx, &pairs, ctx);
            Ok(removed)
        })
    }

    /// Delete compliance records by id. Fails without deleting anything when
    /// any id is unknown.
    pub fn bulk_delete_compliance(&self, ids: &[Uuid], ctx: &LogContext) -> Result<usize> {
        self.store.transaction(|tx| {
            let mut pairs = BTreeSet::new();
            let mut missing = Vec::new();
            for id in ids {
                match tx.compliance_by_id(*id) {
                    Some(record) => {
                        pairs.insert(record.key());
                    }
                    None => missing.push(*id),
                }
            }
            if !missing.is_empty() {
                return Err(ComplianceError::GroupingIntegrity { missing });
            }
            for (device_id, rule_id) in &pairs {
                tx.delete_compliance(*device_id, *rule_id);
            }
            Self::delete_hashes_for(tx, &pairs, ctx);
            Ok(pairs.len())
        })
    }

    /// Delete hash records by id. Both sides of each referenced
    /// (device, rule) pair go together.
    pub fn bulk_delete_hashes(&self, ids: &[Uuid], ctx: &LogContext) -> Result<usize> {
        self.store.transaction(|tx| {
            let mut pairs = BTreeSet::new();
            let mut missing = Vec::new();
            for id in ids {
                match tx.hash_by_id(*id) {
                    Some(hash) => {
                        pairs.insert((hash.device_id, hash.rule_id));
                    }
                    None => missing.push(*id),
                }
            }
            if !missing.is_empty() {
                return Err(ComplianceError::GroupingIntegrity { missing });
            }
            Ok(Self::delete_hashes_for(tx, &pairs, ctx))
        })
    }

    /// Delete groups by id together with both hash sides of every member.
    /// Compliance records are kept.
    pub fn bulk_delete_groups(&self, ids: &[Uuid], ctx: &LogContext) -> Result<usize> {
        self.store.transaction(|tx| {
            let mut pairs = BTreeSet::new();
            let mut missing = Vec::new();
            for id in ids {
                if tx.group_by_id(*id).is_none() {
                    missing.push(*id);
                    continue;
                }
                pairs.extend(tx.members(*id).into_iter().map(|h| (h.device_id, h.rule_id)));
            }
            if !missing.is_empty() {
                return Err(ComplianceError::GroupingIntegrity { missing });
            }
            Self::delete_hashes_for(tx, &pairs, ctx);
            // member-less groups are already gone after orphan cleanup
            let groups: BTreeSet<Uuid> = ids.iter().copied().collect();
            for id in &groups {
                tx.delete_group(*id);
            }
            Ok(groups.len())
        })
    }

    /// Every group with its member count.
    pub fn group_summaries(&self) -> Vec<HashGroupSummary> {
        self.store.read(|tx| {
            tx.groups()
                .into_iter()
                .map(|group| summarize(tx, group))
                .collect()
        })
    }

    /// Groups shared by more than one device, largest first.
    pub fn groups_with_multiple_devices(&self) -> Vec<HashGroupSummary> {
        let mut groups: Vec<HashGroupSummary> = self
            .group_summaries()
            .into_iter()
            .filter(|s| s.device_count > 1)
            .collect();
        groups.sort_by(|a, b| {
            b.device_count
                .cmp(&a.device_count)
                .then_with(|| a.group.config_hash.cmp(&b.group.config_hash))
        });
        groups
    }

    /// Devices linked to the group with `config_hash` under any rule of the
    /// feature. An empty list means no device currently shares that hash.
    pub fn device_ids_for_hash_group(&self, feature_id: Uuid, config_hash: &str) -> Result<Vec<Uuid>> {
        self.store.read(|tx| {
            let rules = tx.rules_for_feature(feature_id);
            if rules.is_empty() {
                return Err(ComplianceError::FeatureNotFound { feature_id });
            }
            let devices: BTreeSet<Uuid> = rules
                .iter()
                .filter_map(|rule| tx.group(*rule, config_hash).map(|g| g.id))
                .flat_map(|group| tx.members(group))
                .map(|h| h.device_id)
                .collect();
            Ok(devices.into_iter().collect())
        })
    }

    /// Drop the derived tables and re-derive them from compliance records.
    /// Returns the number of records replayed.
    pub fn rebuild(&self, ctx: &LogContext) -> Result<usize> {
        self.store.transaction(|tx| {
            for key in tx.hash_keys() {
                tx.delete_hash(&key);
            }
            for group in tx.groups() {
                tx.delete_group(group.id);
            }
            let keys = tx.compliance_keys();
            for (device_id, rule_id) in &keys {
                if let Some(record) = tx.compliance(*device_id, *rule_id).cloned() {
                    Self::record(tx, &record, ctx);
                }
            }
            log_info!(ctx, "HASH_INDEX_REBUILT", records = keys.len());
            Ok(keys.len())
        })
    }

    /// Groups with no linked hash record. Zero after every operation.
    pub fn orphan_count(&self) -> usize {
        self.store
            .read(|tx| tx.groups().into_iter().filter(|g| tx.members(g.id).is_empty()).count())
    }

    /// Group member counts keyed by group id.
    pub fn member_counts(&self) -> BTreeMap<Uuid, usize> {
        self.group_summaries()
            .into_iter()
            .map(|s| (s.group.id, s.device_count))
            .collect()
    }
}

fn summarize(tx: &Transaction<'_>, group: ConfigHashGrouping) -> HashGroupSummary {
    let device_count = tx
        .members(group.id)
        .into_iter()
        .map(|h| h.device_id)
        .collect::<BTreeSet<_>>()
        .len();
    let (feature_id, feature_name, feature_slug) = match tx.rule(group.rule_id) {
        Some(rule) => (rule.feature_id, rule.feature_name.clone(), rule.feature_slug.clone()),
        None => (
            tx.feature_of(group.rule_id).unwrap_or_default(),
            String::new(),
            String::new(),
        ),
    };
    HashGroupSummary {
        group,
        feature_id,
        feature_name,
        feature_slug,
        device_count,
    }
}
