use graph_lens::model::{MetaValue, NormalizeWarning};
use graph_lens::{GraphError, GraphModel, NormalizeOptions};
use pretty_assertions::assert_eq;

#[test]
fn loose_payload_becomes_canonical() {
    let raw = r##"{
        "nodes": [
            {"id": 1, "name": "First", "group": "svc", "val": 12, "metadata": {"owner": "ops"}},
            {"id": "2", "type": "svc", "size": -4, "color": "#0f0"},
            {"label": "no id"},
            {"id": "2", "label": "duplicate"}
        ],
        "links": [
            {"source": 1, "target": "2", "value": 3},
            {"source": {"id": "2"}, "target": "ghost"},
            {"source": "2", "target": "2", "weight": -1}
        ]
    }"##;

    let normalized = GraphModel::from_json_str(raw, NormalizeOptions::default()).unwrap();
    let model = &normalized.model;

    assert_eq!(model.node_count(), 2);
    let first = model.node("1").unwrap();
    assert_eq!(first.label, "First");
    assert_eq!(first.kind, "svc");
    assert_eq!(first.size, 12.0);
    assert_eq!(first.metadata.get("owner"), Some(&MetaValue::Text("ops".to_owned())));

    let second = model.node("2").unwrap();
    assert_eq!(second.label, "2");
    assert_eq!(second.size, graph_lens::model::DEFAULT_NODE_SIZE);
    assert_eq!(second.color, graph_lens::model::Rgb::new(0, 255, 0));

    assert_eq!(model.edge_count(), 2);
    assert_eq!(model.edges[0].id, "1->2#0");
    assert_eq!(model.edges[0].weight, 3.0);
    assert_eq!(model.edges[1].weight, 0.0);
    assert!(model.edges[1].is_self_loop());

    assert!(normalized
        .warnings
        .iter()
        .any(|warning| matches!(warning, NormalizeWarning::DuplicateNodeId { id } if id == "2")));
    assert!(normalized
        .warnings
        .iter()
        .any(|warning| matches!(warning, NormalizeWarning::DanglingEdge { target, .. } if target == "ghost")));
}

#[test]
fn self_loops_can_be_disallowed() {
    let raw = r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "a"}]}"#;
    let normalized = GraphModel::from_json_str(
        raw,
        NormalizeOptions {
            allow_self_loops: false,
        },
    )
    .unwrap();
    assert_eq!(normalized.model.edge_count(), 0);
}

#[test]
fn wrong_shapes_are_malformed() {
    for raw in [
        "not json",
        "[]",
        r#"{"edges": []}"#,
        r#"{"nodes": {"a": 1}}"#,
        r#"{"nodes": [], "edges": 7}"#,
    ] {
        let result = GraphModel::from_json_str(raw, NormalizeOptions::default());
        assert!(
            matches!(result, Err(GraphError::MalformedDataset(_))),
            "{raw} should be rejected"
        );
    }
}
