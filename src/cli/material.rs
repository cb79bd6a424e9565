//! Study material commands

use anyhow::Result;

use studysync::materials::{MaterialKind, MaterialLibrary, NewMaterial, StudyMaterial};

use super::AppContext;

pub fn material_add_command(
    ctx: &AppContext,
    title: &str,
    url: &str,
    kind: &str,
    description: &str,
    subject: Option<&str>,
    group_id: Option<String>,
) -> Result<()> {
    let kind: MaterialKind = kind.parse()?;
    let subject_id = match subject {
        Some(key) => Some(ctx.find_subject(&ctx.study(), key)?.id),
        None => None,
    };

    let library = MaterialLibrary::new(ctx.db.clone());
    let material = library.add_material(
        ctx.user(),
        NewMaterial {
            title: title.to_string(),
            description: description.to_string(),
            kind,
            url: url.to_string(),
            subject_id,
            group_id,
        },
    )?;
    println!("Added {} {} ({})", material.kind, material.title, material.id);
    Ok(())
}

pub fn material_list_command(ctx: &AppContext, group_id: Option<&str>) -> Result<()> {
    let library = MaterialLibrary::new(ctx.db.clone());
    let materials = match group_id {
        Some(group_id) => library.group_materials(ctx.user(), group_id)?,
        None => library.list_materials(ctx.user())?,
    };
    if materials.is_empty() {
        println!("No materials yet. Add one with: studysync material add <title> <url>");
        return Ok(());
    }

    println!("Materials ({}):\n", materials.len());
    for material in &materials {
        print_material(ctx, material);
    }
    Ok(())
}

fn print_material(ctx: &AppContext, material: &StudyMaterial) {
    let author = if material.user_id == ctx.user() {
        String::new()
    } else {
        format!(" by {}", material.user_id)
    };
    println!(
        "  [{}] {}{} - {} useful",
        material.kind, material.title, author, material.useful_count
    );
    println!("    {}", material.url);
    if !material.description.is_empty() {
        println!("    {}", material.description);
    }
    println!("    id: {}", material.id);
}

pub fn material_delete_command(ctx: &AppContext, material_id: &str) -> Result<()> {
    MaterialLibrary::new(ctx.db.clone()).delete_material(ctx.user(), material_id)?;
    println!("Deleted material {material_id}");
    Ok(())
}

pub fn material_useful_command(ctx: &AppContext, material_id: &str) -> Result<()> {
    let count = MaterialLibrary::new(ctx.db.clone()).mark_useful(ctx.user(), material_id)?;
    println!("Marked useful ({count} total)");
    Ok(())
}

pub fn material_share_command(ctx: &AppContext, material_id: &str, group_id: &str) -> Result<()> {
    let material =
        MaterialLibrary::new(ctx.db.clone()).share_to_group(ctx.user(), material_id, group_id)?;
    println!("Shared {} with group {group_id}", material.title);
    Ok(())
}
