//! CLI front end: loads an OBJ mesh, builds either a k-d tree or a BVH over
//! it per the resolved [`spatial_accel::config::BuildConfig`], and writes the
//! result through [`spatial_accel::ooc`].

use std::process::ExitCode;

use clap::Parser;

use spatial_accel::cli::{Cli, StructureKind};
use spatial_accel::error::BspResult;
use spatial_accel::{bvh, kdtree, ooc, scene};

fn run(cli: Cli) -> BspResult<()> {
    let config = cli.resolve_config()?;
    let triangles = scene::load_triangles(&cli.input)?;

    match cli.structure {
        StructureKind::Kdtree => {
            let bounds = triangles
                .iter()
                .map(spatial_accel::triangle::Triangle::aabb)
                .fold(spatial_accel::aabb::Aabb::empty(), |acc, b| acc.union(&b));
            let tree = kdtree::build(&triangles, bounds, config.to_kd_config())?;
            ooc::write_tree(&cli.output, &tree.nodes, &tree.indices, &tree.stats)?;
            log::info!("wrote k-d tree to {}", cli.output.display());
        }
        StructureKind::Bvh => {
            let tree = bvh::build(&triangles, bvh::BvhBuilderConfig::default());
            ooc::write_tree(&cli.output, &tree.nodes, &tree.indices, &tree.stats)?;
            log::info!("wrote BVH to {}", cli.output.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
