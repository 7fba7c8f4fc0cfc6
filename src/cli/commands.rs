//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command, plus the config-driven
//! scene assembly the `build` command runs.

use std::path::Path;

use log::info;

use crate::config::RigConfig;
use crate::error::Result;
use crate::layers::{self, DeformStackExtension, LayerCtor};
use crate::rig::{ChainRecipe, Rig, RigBuilder, Unit};
use crate::scene::{AttrValue, NodeKind, SceneGraph};

/// Assemble the bind scene from a config and run the full two-phase build.
///
/// This is the one place configuration meets the framework: joints and
/// source geometry are created first, then every chain runs its Joint phase,
/// then every chain runs its Rig phase with the layer-stack extension
/// installed.
pub fn build_from_config(config: &RigConfig) -> Result<Rig> {
    config.validate()?;
    let mut rig = Rig::new(&config.name);

    // bind skeleton
    let skeleton = rig.create_group("skeleton_grp", rig.setup_group());
    for chain in &config.chains {
        let mut parent = skeleton;
        for joint in &chain.joints {
            let node = rig
                .scene
                .create_node(NodeKind::Joint, &joint.name, Some(parent));
            rig.scene
                .set_attr(node, "translate", AttrValue::Vec3(joint.translate));
            parent = node;
        }
    }

    // source geometry
    let mut builder = RigBuilder::new(rig);
    if let Some(geometry) = &config.geometry {
        let source = builder
            .rig
            .create_group(&geometry.group, builder.rig.model_group());
        let meshes = builder.rig.create_group("meshes_grp", source);
        for mesh in &geometry.meshes {
            builder
                .rig
                .scene
                .create_node(NodeKind::Mesh, mesh, Some(meshes));
        }
        if !geometry.tweak_meshes.is_empty() {
            let tweak = builder.rig.create_group("tweak_grp", source);
            for mesh in &geometry.tweak_meshes {
                builder
                    .rig
                    .scene
                    .create_node(NodeKind::Mesh, mesh, Some(tweak));
            }
        }
        builder.ctx.deform_source = Some(source);
    }

    if !config.layers.is_empty() {
        let ctors: Vec<LayerCtor> = config
            .layers
            .iter()
            .filter_map(|name| layers::layer_ctor(name))
            .collect();
        builder.install(Box::new(DeformStackExtension::new(ctors)))?;
    }

    let mut recipes = Vec::with_capacity(config.chains.len());
    for chain in &config.chains {
        let names = chain.joints.iter().map(|j| j.name.clone()).collect();
        recipes.push(ChainRecipe::new(&chain.base, chain.position()?, names));
    }

    // every Joint phase completes before any Rig phase starts
    for recipe in &mut recipes {
        builder.run_joint_phase(recipe)?;
    }
    for recipe in &mut recipes {
        builder.run_rig_phase(recipe)?;
    }

    Ok(builder.finish())
}

/// Build a rig from a config file and save the scene.
pub fn build(config_path: &Path, output: &Path) -> Result<()> {
    info!("building rig from: {}", config_path.display());

    let config = RigConfig::from_file(config_path)?;
    let rig = build_from_config(&config)?;
    rig.scene.save(output)?;

    println!("Rig built: {}", config.name);
    println!("  nodes: {}", rig.scene.len());
    println!("  connections: {}", rig.scene.connections().len());
    println!("  saved to: {}", output.display());
    Ok(())
}

/// Print a saved scene's hierarchy and its Units.
pub fn inspect(scene_path: &Path) -> Result<()> {
    info!("inspecting scene: {}", scene_path.display());

    let scene = SceneGraph::load(scene_path)?;

    println!("Hierarchy:");
    for id in scene.node_ids() {
        if scene.parent(id).is_none() && scene.kind(id) == NodeKind::Transform {
            print_tree(&scene, id, 1);
        }
    }

    println!("Units:");
    for id in scene.node_ids() {
        if scene.kind(id) != NodeKind::Network || scene.attr(id, "unitType").is_none() {
            continue;
        }
        let unit = Unit::from_node(id);
        let setup = if unit.is_setup(&scene).unwrap_or(false) {
            "setup"
        } else {
            "pending"
        };
        println!("  {} [{}]", scene.name(id), setup);
        for role in unit.declared_roles(&scene).unwrap_or_default() {
            match unit.members(&scene, &role) {
                Ok(members) => {
                    let names: Vec<&str> = members.iter().map(|m| scene.name(*m)).collect();
                    println!("    {}: {}", role, names.join(", "));
                }
                Err(_) => println!("    {}: <unregistered>", role),
            }
        }
    }
    Ok(())
}

fn print_tree(scene: &SceneGraph, node: crate::scene::NodeId, depth: usize) {
    println!("{}{}", "  ".repeat(depth), scene.name(node));
    for child in scene.children(node) {
        print_tree(scene, *child, depth + 1);
    }
}
