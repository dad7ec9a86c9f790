//! CLI command implementations.

use crate::config::Config;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use stackscope_core::{list_projects, load_stack, Resource, Stack};
use stackscope_graph::{GraphEdge, GraphMode, GraphSession, RankDirection, RenderOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Settings shared by every command.
pub struct Context {
    pub config: Config,
    pub state_dir: PathBuf,
}

impl Context {
    /// Loads the config from `root`; an explicit state directory wins over
    /// the configured one.
    pub fn load(root: &Path, state_dir: Option<PathBuf>) -> Result<Self> {
        let config = Config::load(root)?;
        let state_dir = state_dir.unwrap_or_else(|| config.state_dir.clone());
        debug!("Using state directory {}", state_dir.display());
        Ok(Self { config, state_dir })
    }

    /// Opens a stack given as a checkpoint path or `project/stack`.
    pub fn open_stack(&self, target: &str) -> Result<Stack> {
        let path = Path::new(target);
        if path.is_file() || path.extension().map_or(false, |ext| ext == "json") {
            return Ok(Stack::load(path)?);
        }

        match target.split_once('/') {
            Some((project, stack)) if !project.is_empty() && !stack.is_empty() => {
                Ok(load_stack(&self.state_dir, project, stack)?)
            }
            _ => Err(format!(
                "'{}' is neither a checkpoint file nor a project/stack name",
                target
            )
            .into()),
        }
    }
}

/// Finds a resource by id, falling back to a unique display name.
fn find_resource<'a>(stack: &'a Stack, query: &str) -> Result<&'a Resource> {
    if let Some(resource) = stack.resource(query) {
        return Ok(resource);
    }

    match stack.find_by_name(query).as_slice() {
        [resource] => Ok(*resource),
        [] => Err(format!("Resource '{}' not found in stack {}", query, stack.name).into()),
        matches => {
            let ids: Vec<&str> = matches.iter().map(|r| r.id.as_str()).collect();
            Err(format!("'{}' is ambiguous, use one of:\n  {}", query, ids.join("\n  ")).into())
        }
    }
}

/// Initialize Stackscope in a directory.
pub fn init(path: &Path) -> Result<()> {
    let config_path = Config::path(path);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    Config::default().save(path)?;

    println!("{} Initialized Stackscope in {}", "✓".green(), path.display());
    println!(
        "  Edit {} to point at your state directory",
        config_path.display().to_string().cyan()
    );

    Ok(())
}

/// List projects and stacks in the state directory.
pub fn projects(ctx: &Context) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Scanning {}...", ctx.state_dir.display()));

    let projects = list_projects(&ctx.state_dir);
    spinner.finish_and_clear();
    let projects = projects?;

    if projects.is_empty() {
        println!("No stacks found under {}", ctx.state_dir.display());
        return Ok(());
    }

    for project in &projects {
        println!("{}", project.name.cyan().bold());
        for stack in &project.stacks {
            let updated = stack.last_updated.with_timezone(&chrono::Local);
            println!(
                "  {} {}",
                stack.name,
                format!("(updated {})", updated.format("%Y-%m-%d %H:%M")).dimmed()
            );
        }
    }

    Ok(())
}

/// Options for the graph command.
pub struct GraphOptions {
    pub mode: GraphMode,
    pub collapse: Vec<String>,
    pub direction: Option<RankDirection>,
    pub output: Option<PathBuf>,
}

/// Emit the positioned graph as JSON.
pub fn graph(ctx: &Context, target: &str, options: GraphOptions) -> Result<()> {
    let stack = ctx.open_stack(target)?;

    let mut layout = ctx.config.layout_for(options.mode);
    if let Some(direction) = options.direction {
        layout.direction = direction;
    }

    let mut session = GraphSession::new(stack.resources.clone()).with_layout_config(layout);
    session.set_mode(options.mode);

    for query in &options.collapse {
        let id = find_resource(&stack, query)?.id.clone();
        if session.expansion().is_expanded(&id) {
            session.toggle(&id);
        }
    }

    let outcome = session.render();
    let json = serde_json::to_string_pretty(&outcome)?;

    match &outcome {
        RenderOutcome::Empty => eprintln!("{} Stack {} has no resources", "⚠".yellow(), stack.name),
        RenderOutcome::Fallback { message } => eprintln!("{} {}", "⚠".yellow(), message),
        RenderOutcome::Ready(result) => {
            if options.output.is_some() {
                let stats = session.graph().stats();
                println!(
                    "{} Laid out {} nodes and {} edges in {} ranks ({:.0}x{:.0})",
                    "✓".green(),
                    stats.node_count.to_string().cyan(),
                    stats.edge_count.to_string().cyan(),
                    result.ranks,
                    result.width,
                    result.height
                );
                println!("  {} root nodes", stats.roots);
            }
        }
    }

    match options.output {
        Some(path) => {
            fs::write(&path, json)?;
            println!("{} Exported to {}", "✓".green(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Print inferred dependencies.
pub fn deps(ctx: &Context, target: &str, json_output: bool) -> Result<()> {
    let stack = ctx.open_stack(target)?;
    let session = GraphSession::new(stack.resources);
    let dependencies = session.dependencies();

    if json_output {
        println!("{}", serde_json::to_string_pretty(dependencies)?);
        return Ok(());
    }

    if dependencies.is_empty() {
        println!("No dependencies inferred in {}", stack.name);
        return Ok(());
    }

    println!(
        "Found {} dependencies in {}:\n",
        dependencies.len(),
        stack.name.cyan()
    );

    for dependency in dependencies {
        let edge = GraphEdge::data_flow(dependency);
        println!(
            "  {} {} {} {}",
            stackscope_core::display_name(&edge.source).cyan(),
            "→".dimmed(),
            stackscope_core::display_name(&edge.target).cyan(),
            format!("[{}]", edge.label()).dimmed()
        );
        for line in edge.tooltip_lines() {
            println!("    {}", line.dimmed());
        }
    }

    Ok(())
}

/// Show one resource and its neighbors.
pub fn inspect(ctx: &Context, target: &str, query: &str) -> Result<()> {
    let stack = ctx.open_stack(target)?;
    let resource = find_resource(&stack, query)?.clone();
    let session = GraphSession::new(stack.resources.clone());

    println!("{}", resource.display_name().cyan().bold());
    println!("  {} {}", "urn:".dimmed(), resource.id);
    println!("  {} {}", "type:".dimmed(), resource.kind);
    if let Some(cloud_id) = &resource.cloud_id {
        println!("  {} {}", "id:".dimmed(), cloud_id);
    }
    if let Some(parent) = resource.parent_id() {
        println!("  {} {}", "parent:".dimmed(), stackscope_core::display_name(parent));
    }
    if let Some(created) = resource.created {
        println!("  {} {}", "created:".dimmed(), created.to_rfc3339());
    }
    if let Some(modified) = resource.modified {
        println!("  {} {}", "modified:".dimmed(), modified.to_rfc3339());
    }

    let children: Vec<&str> = stack
        .resources
        .iter()
        .filter(|r| r.parent_id() == Some(resource.id.as_str()))
        .map(|r| r.display_name())
        .collect();
    print_list("Children", &children);

    let dependencies = session.dependencies();
    let providers: Vec<&str> = dependencies
        .iter()
        .filter(|d| d.from == resource.id)
        .map(|d| stackscope_core::display_name(&d.to))
        .collect();
    let consumers: Vec<&str> = dependencies
        .iter()
        .filter(|d| d.to == resource.id)
        .map(|d| stackscope_core::display_name(&d.from))
        .collect();
    print_list("Depends on", &providers);
    print_list("Used by", &consumers);

    print_values("Inputs", &resource.inputs);
    print_values("Outputs", &resource.outputs);

    Ok(())
}

/// Print the stack's exported outputs.
pub fn outputs(ctx: &Context, target: &str) -> Result<()> {
    let stack = ctx.open_stack(target)?;

    if stack.outputs.is_empty() {
        println!("Stack {} exports no outputs", stack.name);
        return Ok(());
    }

    print_values(&format!("Outputs of {}", stack.name), &stack.outputs);
    Ok(())
}

fn print_list(title: &str, items: &[&str]) {
    if items.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, items.len());
    for item in items {
        println!("  • {}", item);
    }
}

fn print_values(title: &str, values: &serde_json::Map<String, Value>) {
    if values.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for (key, value) in values {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("  {} = {}", key.yellow(), rendered);
    }
}
