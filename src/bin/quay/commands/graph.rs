//! `quay graph` command

use anyhow::{Context, Result};

use crate::cli::{GraphArgs, GraphFormat};
use quay::builder::BuildPlan;
use quay::ops::quay_build::{select_graph, target_platforms};
use quay::ops::{load, LoadOptions};
use quay::util::GlobalContext;

pub fn execute(args: GraphArgs, ctx: &GlobalContext, load_opts: &LoadOptions) -> Result<()> {
    let session = load(ctx, load_opts)?;
    let graph = select_graph(&session, &args.targets, args.no_tests)?;

    match args.format {
        GraphFormat::Dot => print!("{}", graph.to_dot()),
        GraphFormat::List => {
            for id in graph.topo_sort()? {
                let Some(node) = graph.node(id) else {
                    continue;
                };
                let mut flags = vec![node.kind.to_string()];
                if node.platform_specific {
                    flags.push("native".to_string());
                }
                if node.prebuilt {
                    flags.push("prebuilt".to_string());
                }
                if node.test {
                    flags.push("test".to_string());
                }
                println!("{} [{}]", id, flags.join(", "));
                for (dep, kind) in graph.dependencies(id) {
                    println!("    {} ({})", dep, kind);
                }
                for lib in &node.libraries {
                    println!("    {} (library)", lib);
                }
            }
        }
        GraphFormat::Plan => {
            let platforms = target_platforms(&args.platforms)?;
            let plan = BuildPlan::new(&graph, &session.global, &session.workspace, &platforms)?;
            let path = session.workspace.plan_path();
            plan.save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{}", plan.to_json()?);
        }
    }
    Ok(())
}
