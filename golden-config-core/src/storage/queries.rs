//! SQL query builders.
//!
//! PostgreSQL statements equivalent to the in-process store, for hosts that
//! persist compliance and grouping rows themselves. Execution is handled by
//! the host; every statement is parameterised.

const COMPLIANCE_TABLE: &str = "nautobot_golden_config_configcompliance";
const HASH_TABLE: &str = "nautobot_golden_config_configcompliancehash";
const GROUP_TABLE: &str = "nautobot_golden_config_confighashgrouping";
const RULE_TABLE: &str = "nautobot_golden_config_compliancerule";

/// Columns of the compliance table, in placeholder order.
pub fn get_compliance_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("id", "$1"),
        ("device_id", "$2"),
        ("rule_id", "$3"),
        ("compliance", "$4"),
        ("compliance_int", "$5"),
        ("ordered", "$6"),
        // JSON payloads
        ("actual", "$7"),
        ("intended", "$8"),
        ("missing", "$9"),
        ("extra", "$10"),
        ("remediation", "$11"),
        ("last_updated", "$12"),
    ]
}

/// Upsert keyed by (device_id, rule_id). The row id survives an update.
pub fn build_compliance_upsert() -> String {
    let columns = get_compliance_columns();
    let col_names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<&str> = columns.iter().map(|(_, ph)| *ph).collect();
    let updates: Vec<String> = col_names
        .iter()
        .filter(|name| !matches!(**name, "id" | "device_id" | "rule_id"))
        .map(|name| format!("{name} = EXCLUDED.{name}"))
        .collect();

    format!(
        "INSERT INTO {COMPLIANCE_TABLE} ({}) VALUES ({}) ON CONFLICT (device_id, rule_id) DO UPDATE SET {} RETURNING id",
        col_names.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

/// Upsert of one side's hash keyed by (device_id, rule_id, config_type).
pub fn build_hash_upsert() -> String {
    format!(
        "INSERT INTO {HASH_TABLE} (id, device_id, rule_id, config_type, config_hash, config_group_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (device_id, rule_id, config_type) \
         DO UPDATE SET config_hash = EXCLUDED.config_hash, config_group_id = EXCLUDED.config_group_id \
         RETURNING id"
    )
}

/// Atomic find-or-create of the group for (rule_id, config_hash).
///
/// The no-op update makes `RETURNING` yield the existing row on conflict, so
/// concurrent writers for the same hash all receive the same id.
pub fn build_group_get_or_create() -> String {
    format!(
        "INSERT INTO {GROUP_TABLE} (id, rule_id, config_hash, config_content) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (rule_id, config_hash) \
         DO UPDATE SET config_hash = EXCLUDED.config_hash \
         RETURNING id, (xmax = 0) AS created"
    )
}

/// Delete both hash sides of every listed (device_id, rule_id) pair.
/// `$1` and `$2` are parallel uuid arrays.
pub fn build_hash_delete_for_records() -> String {
    format!(
        "DELETE FROM {HASH_TABLE} h \
         USING unnest($1::uuid[], $2::uuid[]) AS k(device_id, rule_id) \
         WHERE h.device_id = k.device_id AND h.rule_id = k.rule_id"
    )
}

/// Delete groups of one rule that no hash record links to.
pub fn build_orphan_cleanup() -> String {
    format!(
        "DELETE FROM {GROUP_TABLE} g \
         WHERE g.rule_id = $1 \
         AND NOT EXISTS (SELECT 1 FROM {HASH_TABLE} h WHERE h.config_group_id = g.id) \
         RETURNING g.id"
    )
}

/// Groups linked to more than one device, with their member count.
pub fn build_multi_device_groups() -> String {
    format!(
        "SELECT g.id, g.rule_id, g.config_hash, g.config_content, COUNT(DISTINCT h.device_id) AS device_count \
         FROM {GROUP_TABLE} g \
         JOIN {HASH_TABLE} h ON h.config_group_id = g.id \
         GROUP BY g.id, g.rule_id, g.config_hash, g.config_content \
         HAVING COUNT(DISTINCT h.device_id) > 1 \
         ORDER BY device_count DESC, g.config_hash"
    )
}

/// Non-compliant device ids sharing `$2` (hash) for any rule of feature `$1`.
pub fn build_device_ids_for_hash_group() -> String {
    format!(
        "SELECT DISTINCT h.device_id \
         FROM {HASH_TABLE} h \
         JOIN {GROUP_TABLE} g ON h.config_group_id = g.id \
         JOIN {RULE_TABLE} r ON g.rule_id = r.id \
         WHERE r.feature_id = $1 AND g.config_hash = $2 \
         ORDER BY h.device_id"
    )
}

/// Every statement by name, as handed to the host.
pub fn all_statements() -> Vec<(&'static str, String)> {
    vec![
        ("compliance_upsert", build_compliance_upsert()),
        ("hash_upsert", build_hash_upsert()),
        ("group_get_or_create", build_group_get_or_create()),
        ("hash_delete_for_records", build_hash_delete_for_records()),
        ("orphan_cleanup", build_orphan_cleanup()),
        ("multi_device_groups", build_multi_device_groups()),
        ("device_ids_for_hash_group", build_device_ids_for_hash_group()),
    ]
}
