use stackscope_core::Resource;
use stackscope_graph::{infer_dependencies, Heuristic};
use std::time::{Duration, Instant};

const RESOURCES: usize = 500;
const OUTPUTS: usize = 20;
const REFERENCES: usize = 5;

/// A ring of resources where each reads a few outputs of the next one.
fn ring() -> Vec<Resource> {
    (0..RESOURCES)
        .map(|i| {
            let next = (i + 1) % RESOURCES;
            let mut resource = Resource::new(format!("res{}", i), "aws:svc/res:Res");
            for k in 0..OUTPUTS {
                resource = resource.with_output(
                    format!("out{}", k),
                    format!("arn:aws:svc:::res-{}-out{}", i, k),
                );
            }
            for k in 0..REFERENCES {
                resource = resource.with_input(
                    format!("ref{}", k),
                    format!("arn:aws:svc:::res-{}-out{}", next, k),
                );
            }
            for k in REFERENCES..OUTPUTS {
                resource = resource.with_input(format!("setting{}", k), format!("plain value {}", k));
            }
            resource
        })
        .collect()
}

#[test]
fn inference_scales_to_hundreds_of_resources() {
    let resources = ring();

    let started = Instant::now();
    let deps = infer_dependencies(&resources);
    let elapsed = started.elapsed();

    assert_eq!(deps.len(), RESOURCES);
    for (i, dep) in deps.iter().enumerate() {
        assert_eq!(dep.from, format!("res{}", i));
        assert_eq!(dep.to, format!("res{}", (i + 1) % RESOURCES));
        assert_eq!(dep.matches.len(), REFERENCES);
        assert!(dep.matches.iter().all(|m| m.heuristic == Heuristic::Arn));
    }
    assert!(
        elapsed < Duration::from_secs(1),
        "inference took {:?}",
        elapsed
    );
}
