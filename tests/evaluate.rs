//! Alert evaluation against route configurations loaded from disk.

use axe::config::loader;
use axe::display::TreeRenderer;
use axe::routing::evaluator::evaluate;
use axe::routing::{Labels, RouteEvaluator, RouteTree};

mod common;
use common::Fixture;

const CONFIG: &str = r#"
route:
  receiver: default
  group_by: [alertname]
  routes:
    - receiver: email
      match:
        severity: critical
      continue: true
    - receiver: slack
      match_re:
        job: ".*web.*"
    - receiver: pagerduty
      matchers:
        - environment = production
        - team =~ "ops|sre"
receivers:
  - name: default
  - name: email
  - name: slack
  - name: pagerduty
"#;

fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_evaluate_with_json_alert() {
    let fixture = Fixture::new();
    let config = fixture.write("alertmanager.yaml", CONFIG);
    let alert = fixture.write(
        "alert.json",
        r#"{"alertname": "HighLatency", "severity": "critical", "job": "frontend-web"}"#,
    );

    let route = loader::load_route(&config).unwrap();
    let alert = loader::load_alert(&alert).unwrap();
    assert_eq!(evaluate(&route, &alert).unwrap(), ["email", "slack"]);
}

#[test]
fn test_evaluate_with_yaml_alert_and_numeric_labels() {
    let fixture = Fixture::new();
    let config = fixture.write("alertmanager.yaml", CONFIG);
    let alert = fixture.write(
        "alert.yaml",
        "environment: production\nteam: sre\nshard: 3\n",
    );

    let route = loader::load_route(&config).unwrap();
    let alert = loader::load_alert(&alert).unwrap();
    assert_eq!(alert.get("shard").map(String::as_str), Some("3"));

    let tree = RouteTree::from_value(&route).unwrap();
    let receivers = RouteEvaluator::new(&tree).evaluate(&alert);
    assert_eq!(receivers, ["pagerduty"]);
}

#[test]
fn test_unmatched_alert_falls_back_to_root() {
    let fixture = Fixture::new();
    let config = fixture.write("alertmanager.yaml", CONFIG);

    let route = loader::load_route(&config).unwrap();
    let tree = RouteTree::from_value(&route).unwrap();
    let receivers = RouteEvaluator::new(&tree).evaluate(&labels(&[("severity", "info")]));
    assert_eq!(receivers, ["default"]);
}

#[test]
fn test_stopping_child_suppresses_root_receiver() {
    let route: serde_yaml::Value = serde_yaml::from_str(
        r#"
receiver: default
continue: false
routes:
  - receiver: ops
    match: {team: ops}
"#,
    )
    .unwrap();

    assert_eq!(evaluate(&route, &labels(&[("team", "ops")])).unwrap(), ["ops"]);
    assert_eq!(evaluate(&route, &labels(&[("team", "dev")])).unwrap(), ["default"]);
}

#[test]
fn test_missing_route_key_is_an_error() {
    let fixture = Fixture::new();
    let config = fixture.write("alertmanager.yaml", "receivers: [{name: a}]\n");

    let err = loader::load_route(&config).unwrap_err();
    assert!(err.to_string().contains("no 'route' configuration found"));
}

#[test]
fn test_tree_renders_loaded_configuration() {
    let fixture = Fixture::new();
    let config = fixture.write("alertmanager.yaml", CONFIG);

    let route = loader::load_route(&config).unwrap();
    let tree = RouteTree::from_value(&route).unwrap();
    let out = TreeRenderer::new(false).render(&tree);

    assert!(out.starts_with("Alertmanager Route Tree\n└── default\n"));
    assert!(out.contains("severity = critical"));
    assert!(out.contains("job =~ .*web.*"));
    assert!(out.contains("team =~ \"ops|sre\""));
}

#[test]
fn test_numeric_literals_match_across_route_and_alert() {
    let fixture = Fixture::new();
    let config = fixture.write(
        "alertmanager.yaml",
        r#"
route:
  receiver: d
  routes:
    - receiver: v
      match: {version: 1.0}
    - receiver: c
      match: {code: 500}
"#,
    );
    let float_alert = fixture.write("float.yaml", "version: 1.0\n");
    let int_alert = fixture.write("int.json", r#"{"code": 500}"#);

    let route = loader::load_route(&config).unwrap();
    let by_float = loader::load_alert(&float_alert).unwrap();
    assert_eq!(by_float.get("version").map(String::as_str), Some("1.0"));
    assert_eq!(evaluate(&route, &by_float).unwrap(), ["v"]);
    assert_eq!(evaluate(&route, &labels(&[("version", "1.0")])).unwrap(), ["v"]);

    let by_int = loader::load_alert(&int_alert).unwrap();
    assert_eq!(evaluate(&route, &by_int).unwrap(), ["c"]);
}

#[test]
fn test_null_constraint_only_disables_its_route() {
    let route: serde_yaml::Value = serde_yaml::from_str(
        r#"
receiver: default
routes:
  - receiver: broken
    match: {team: }
  - receiver: ops
    match: {team: ops}
"#,
    )
    .unwrap();

    assert_eq!(evaluate(&route, &Labels::new()).unwrap(), ["default"]);
    assert_eq!(evaluate(&route, &labels(&[("team", "ops")])).unwrap(), ["ops"]);
}
