use stackscope_core::{Resource, Stack};
use stackscope_graph::{
    assemble, layout, EdgeKind, ExpansionState, GraphMode, GraphSession, LayoutConfig, Point,
    RankDirection, RenderOutcome,
};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

/// A small two-tier deployment: a network stack and an app stack, each a
/// tree under its own root, with values flowing between them.
fn deployment() -> Vec<Resource> {
    vec![
        Resource::new("net::vpc", "aws:ec2/vpc:Vpc").with_output("vpcId", "vpc-0a1b2c3"),
        Resource::new("net::subnet-a", "aws:ec2/subnet:Subnet")
            .with_parent("net::vpc")
            .with_input("vpcId", "vpc-0a1b2c3")
            .with_output("subnetId", "subnet-1a2b3c4"),
        Resource::new("net::subnet-b", "aws:ec2/subnet:Subnet")
            .with_parent("net::vpc")
            .with_input("vpcId", "vpc-0a1b2c3")
            .with_output("subnetId", "subnet-5d6e7f8"),
        Resource::new("app::cluster", "aws:ecs/cluster:Cluster")
            .with_output("arn", "arn:aws:ecs:us-east-1:1:cluster/app"),
        Resource::new("app::service", "aws:ecs/service:Service")
            .with_parent("app::cluster")
            .with_input("cluster", "arn:aws:ecs:us-east-1:1:cluster/app")
            .with_input("subnet", "subnet-1a2b3c4")
            .with_output("url", "https://app.example.com"),
        Resource::new("app::check", "aws:route53/healthCheck:HealthCheck")
            .with_parent("app::service")
            .with_input("target", "https://app.example.com"),
    ]
}

fn ids<'a>(nodes: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    nodes.map(str::to_string).collect()
}

#[test]
fn structural_counts_match_resources() {
    let resources = deployment();
    let graph = assemble(
        &resources,
        GraphMode::Structural,
        &ExpansionState::all_expanded(&resources),
    );

    let with_parent = resources.iter().filter(|r| r.parent_id().is_some()).count();
    assert_eq!(graph.node_count(), resources.len());
    assert_eq!(graph.edge_count(), with_parent);
    assert!(graph.edges().all(|e| e.kind == EdgeKind::Contains));
}

#[test]
fn dependency_edges_run_provider_to_consumer() {
    let resources = deployment();
    let graph = assemble(&resources, GraphMode::Dependency, &ExpansionState::none());

    let pairs: BTreeSet<(String, String)> = graph
        .edges()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();

    assert!(pairs.contains(&("net::vpc".to_string(), "net::subnet-a".to_string())));
    assert!(pairs.contains(&("net::subnet-a".to_string(), "app::service".to_string())));
    assert!(pairs.contains(&("app::cluster".to_string(), "app::service".to_string())));
    assert!(pairs.contains(&("app::service".to_string(), "app::check".to_string())));
    assert!(!pairs.contains(&("app::service".to_string(), "net::subnet-a".to_string())));
    assert_eq!(pairs.len(), 5);
}

#[test]
fn visibility_follows_expanded_ancestors() {
    let resources = deployment();
    let parents: HashMap<&str, &str> = resources
        .iter()
        .filter_map(|r| r.parent_id().map(|p| (r.id.as_str(), p)))
        .collect();

    let states = [
        ExpansionState::none(),
        ExpansionState::from_ids(["net::vpc"]),
        ExpansionState::from_ids(["app::cluster"]),
        ExpansionState::from_ids(["app::cluster", "app::service"]),
        ExpansionState::from_ids(["app::service"]),
        ExpansionState::all_expanded(&resources),
    ];

    for state in &states {
        let graph = assemble(&resources, GraphMode::Structural, state);
        for resource in &resources {
            let mut ancestors_expanded = true;
            let mut current = resource.id.as_str();
            while let Some(&parent) = parents.get(current) {
                ancestors_expanded &= state.is_expanded(parent);
                current = parent;
            }
            assert_eq!(
                graph.contains(&resource.id),
                ancestors_expanded,
                "{} with {:?}",
                resource.id,
                state
            );
        }
    }
}

#[test]
fn collapse_and_expand_example() {
    let resources = vec![
        Resource::new("a", "t"),
        Resource::new("a/b", "t").with_parent("a"),
    ];

    let collapsed = assemble(&resources, GraphMode::Structural, &ExpansionState::none());
    assert_eq!(ids(collapsed.nodes().map(|n| n.id.as_str())), ids(["a"].into_iter()));
    assert_eq!(collapsed.edge_count(), 0);

    let expanded = assemble(
        &resources,
        GraphMode::Structural,
        &ExpansionState::from_ids(["a"]),
    );
    assert_eq!(
        ids(expanded.nodes().map(|n| n.id.as_str())),
        ids(["a", "a/b"].into_iter())
    );
    let edge = expanded.edges().next().unwrap();
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("a", "a/b"));
}

#[test]
fn layout_is_idempotent() {
    let resources = deployment();
    let graph = assemble(&resources, GraphMode::Dependency, &ExpansionState::none());
    let (nodes, edges) = graph.into_parts();

    for direction in ["LR", "RL", "TB", "BT"] {
        let config = LayoutConfig::for_mode(GraphMode::Dependency)
            .with_direction(direction.parse::<RankDirection>().unwrap());
        let first = serde_json::to_vec(&layout(&nodes, &edges, &config).unwrap()).unwrap();
        let second = serde_json::to_vec(&layout(&nodes, &edges, &config).unwrap()).unwrap();
        assert_eq!(first, second, "direction {}", direction);
    }
}

#[test]
fn same_rank_nodes_keep_spacing() {
    let mut resources = vec![Resource::new("root", "t")];
    for i in 0..20 {
        resources.push(Resource::new(format!("child{}", i), "t").with_parent("root"));
        for j in 0..(i % 4) {
            resources.push(
                Resource::new(format!("leaf{}-{}", i, j), "t").with_parent(format!("child{}", i)),
            );
        }
    }

    for direction in [RankDirection::LeftRight, RankDirection::TopBottom] {
        let config = LayoutConfig::default().with_direction(direction);
        let session = GraphSession::new(resources.clone()).with_layout_config(config.clone());
        let RenderOutcome::Ready(result) = session.render() else {
            panic!("layout failed");
        };

        // (rank axis, cross axis)
        let axes = |p: &Point| match direction {
            RankDirection::LeftRight => (p.x, p.y),
            _ => (p.y, p.x),
        };

        for (i, a) in result.nodes.iter().enumerate() {
            for b in &result.nodes[i + 1..] {
                let (a_rank, a_cross) = axes(&a.position);
                let (b_rank, b_cross) = axes(&b.position);
                if a_rank == b_rank {
                    let gap = (a_cross - b_cross).abs();
                    assert!(gap + 1e-6 >= config.node_spacing, "{} / {}", a.id, b.id);
                }
            }
        }
    }
}

#[test]
fn disjoint_trees_form_separate_clusters() {
    let resources = vec![
        Resource::new("left", "t"),
        Resource::new("left/1", "t").with_parent("left"),
        Resource::new("left/2", "t").with_parent("left"),
        Resource::new("right", "t"),
        Resource::new("right/1", "t").with_parent("right"),
    ];
    let session = GraphSession::new(resources);
    let RenderOutcome::Ready(result) = session.render() else {
        panic!("layout failed");
    };
    assert_eq!(result.components, 2);

    let config = session.layout_config();
    let span = |prefix: &str| {
        let ys: Vec<f64> = result
            .nodes
            .iter()
            .filter(|n| n.id.starts_with(prefix))
            .map(|n| n.position.y)
            .collect();
        let top = ys.iter().copied().fold(f64::MAX, f64::min);
        let bottom = ys.iter().copied().fold(f64::MIN, f64::max) + config.node_height;
        (top, bottom)
    };

    let (left_top, left_bottom) = span("left");
    let (right_top, right_bottom) = span("right");
    assert!(left_bottom <= right_top || right_bottom <= left_top);
}

#[test]
fn checkpoint_to_render() {
    let checkpoint = r#"{
        "version": 3,
        "checkpoint": {
            "stack": "dev",
            "latest": {
                "resources": [
                    {
                        "urn": "urn:pulumi:dev::shop::pulumi:pulumi:Stack::shop-dev",
                        "type": "pulumi:pulumi:Stack",
                        "outputs": {"endpoint": "https://shop.example.com"}
                    },
                    {
                        "urn": "urn:pulumi:dev::shop::aws:s3/bucket:Bucket::assets",
                        "type": "aws:s3/bucket:Bucket",
                        "parent": "urn:pulumi:dev::shop::pulumi:pulumi:Stack::shop-dev",
                        "outputs": {"arn": "arn:aws:s3:::shop-assets"}
                    },
                    {
                        "urn": "urn:pulumi:dev::shop::aws:cloudfront/distribution:Distribution::cdn",
                        "type": "aws:cloudfront/distribution:Distribution",
                        "parent": "urn:pulumi:dev::shop::pulumi:pulumi:Stack::shop-dev",
                        "inputs": {"origin": "arn:aws:s3:::shop-assets"},
                        "outputs": null
                    },
                    {"type": "broken:record"}
                ]
            }
        }
    }"#;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(checkpoint.as_bytes()).unwrap();

    let stack = Stack::load(&path).unwrap();
    assert_eq!(stack.name, "dev");
    assert_eq!(stack.resources.len(), 3);
    assert_eq!(stack.outputs["endpoint"], "https://shop.example.com");

    let mut session = GraphSession::new(stack.resources);
    let RenderOutcome::Ready(structural) = session.render() else {
        panic!("layout failed");
    };
    assert_eq!(structural.nodes.len(), 3);
    assert_eq!(structural.edges.len(), 2);

    session.set_mode(GraphMode::Dependency);
    let RenderOutcome::Ready(dependency) = session.render() else {
        panic!("layout failed");
    };
    assert_eq!(dependency.edges.len(), 1);
    let edge = &dependency.edges[0];
    assert!(edge.source.ends_with("::assets"));
    assert!(edge.target.ends_with("::cdn"));
    assert_eq!(
        edge.tooltip_lines(),
        vec!["cdn.origin depends on assets.arn (arn:aws:s3:::shop-assets)".to_string()]
    );
}
