use criterion::{black_box, criterion_group, criterion_main, Criterion};
use golden_config_core::compliance::{evaluate_rule, structural_diff, CustomRegistry};
use golden_config_core::normalize::compute_config_hash;
use golden_config_core::pipeline::DeviceContext;
use golden_config_core::rules::{ComplianceFeature, ComplianceRule, ConfigType, IndexedRule};
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn build_config(interfaces: usize, drift_every: usize) -> String {
    let mut out = String::from("hostname bench\n");
    for i in 0..interfaces {
        out.push_str(&format!("interface GigabitEthernet0/{i}\n"));
        out.push_str(&format!(" description link-{i}\n"));
        if drift_every > 0 && i % drift_every == 0 {
            out.push_str(" shutdown\n");
        }
        out.push_str(" mtu 9000\n");
    }
    for i in 0..8 {
        out.push_str(&format!("ntp server 10.0.0.{i}\n"));
    }
    out
}

fn build_document(keys: usize, drift: bool) -> Value {
    let mut map = Map::new();
    for i in 0..keys {
        let value = if drift && i % 10 == 0 { json!("drift") } else { json!(i) };
        map.insert(format!("key-{i:05}"), json!({"value": value, "members": [i, i + 1, i + 2]}));
    }
    Value::Object(map)
}

fn rule(config_type: ConfigType, match_config: &str) -> IndexedRule {
    IndexedRule::new(ComplianceRule {
        id: Uuid::new_v4(),
        feature: ComplianceFeature {
            id: Uuid::new_v4(),
            name: "bench".to_string(),
            slug: "bench".to_string(),
            description: String::new(),
        },
        platform: "cisco_ios".to_string(),
        description: String::new(),
        config_ordered: false,
        config_remediation: false,
        match_config: match_config.to_string(),
        config_type,
        custom_compliance: false,
    })
    .expect("rule")
}

fn device() -> DeviceContext {
    DeviceContext {
        run_id: "run-bench".to_string(),
        device_id: Uuid::new_v4(),
        device_name: "bench-1".to_string(),
        platform: "cisco_ios".to_string(),
        evaluated_at: chrono::Utc::now(),
    }
}

fn bench_cli(c: &mut Criterion) {
    let actual = build_config(2_000, 7);
    let intended = build_config(2_000, 0);
    let cli = rule(ConfigType::Cli, "interface\nntp");
    let hier = rule(
        ConfigType::HierConfig,
        "- match_rules:\n    - startswith: interface\n- match_rules:\n    - startswith: ntp\n",
    );
    let ctx = device();
    let registry = CustomRegistry::new();

    c.bench_function("cli_sections_2000_interfaces", |b| {
        b.iter(|| evaluate_rule(black_box(&cli), &actual, &intended, &ctx, &registry).expect("cli"))
    });
    c.bench_function("hier_lineage_2000_interfaces", |b| {
        b.iter(|| evaluate_rule(black_box(&hier), &actual, &intended, &ctx, &registry).expect("hier"))
    });
}

fn bench_json(c: &mut Criterion) {
    let actual = build_document(5_000, true);
    let intended = build_document(5_000, false);

    c.bench_function("structural_diff_5000_keys", |b| {
        b.iter(|| structural_diff(black_box(&actual), black_box(&intended), false))
    });
    c.bench_function("config_hash_5000_keys", |b| b.iter(|| compute_config_hash(black_box(&actual))));
}

criterion_group!(benches, bench_cli, bench_json);
criterion_main!(benches);
