// src/bake/export.rs
//! Bake + write: the two PNG rasters and the `.vat.ron` record.

use bevy::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::{bake, settings::BakeSettings, validate, BakeError, VatTexture};
use crate::asset::{AssetRefs, BakedAnimationAsset};
use crate::clip::BakeSelection;
use crate::rig::AnimatedSource;

/// A freshly exported asset and where its files went.
#[derive(Clone, Debug)]
pub struct CreatedAsset {
    pub asset: BakedAnimationAsset,
    pub position_path: PathBuf,
    pub normal_path: PathBuf,
    pub record_path: PathBuf,
}

/// Validate, bake, and write `<name>_Positions.png`, `<name>_Normals.png` and
/// `<name>_VA.vat.ron` into the output folder. Nothing is written when
/// validation fails.
pub fn create_baked_asset<S: AnimatedSource>(
    source: &S,
    selection: &BakeSelection,
    settings: &BakeSettings,
) -> Result<CreatedAsset, ExportError> {
    validate(source, selection)?;
    let material = settings
        .material
        .clone()
        .ok_or_else(|| BakeError::MissingMaterial(source.name().to_string()))?;

    let output = bake(source, selection)?;

    let folder = settings.output_folder.as_path();
    if !folder.as_os_str().is_empty() && !folder.exists() {
        fs::create_dir_all(folder)?;
    }

    let stem = settings.safe_file_name();
    let position_file = format!("{stem}_Positions.png");
    let normal_file = format!("{stem}_Normals.png");
    let record_file = format!("{stem}_VA.vat.ron");

    let position_path = folder.join(&position_file);
    let normal_path = folder.join(&normal_file);
    let record_path = folder.join(&record_file);

    write_png(&output.position, &position_path)?;
    write_png(&output.normal, &normal_path)?;

    let refs = AssetRefs {
        mesh: settings.mesh.clone(),
        material,
        position_texture: settings.asset_path(&position_file),
        normal_texture: settings.asset_path(&normal_file),
    };
    let asset = BakedAnimationAsset::from_bake(&output, refs, settings.shader_clip_slots);
    fs::write(&record_path, asset.to_ron_string()?)?;

    info!(
        "Exported '{}' -> {} ({} entries)",
        source.name(),
        record_path.display(),
        asset.entries().len()
    );
    Ok(CreatedAsset { asset, position_path, normal_path, record_path })
}

fn write_png(texture: &VatTexture, path: &Path) -> Result<(), ExportError> {
    texture.to_rgba_image().save(path)?;
    debug!("Wrote {}x{} texture {}", texture.width(), texture.height(), path.display());
    Ok(())
}

// ---------- Errors ----------

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Bake(#[from] BakeError),
    #[error("I/O while exporting: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("RON serialize failed: {0}")]
    Ron(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::fixtures::arm_rig;

    fn settings_in(dir: &Path) -> BakeSettings {
        BakeSettings {
            output_name: "Arm/Rig".into(),
            output_folder: dir.join("out"),
            mesh: "models/arm.glb#Mesh0".into(),
            material: Some("materials/vat_arm".into()),
            ..Default::default()
        }
    }

    #[test]
    fn writes_textures_and_record() {
        let tmp = tempfile::tempdir().unwrap();
        let rig = arm_rig();
        let sel = BakeSelection::from_source(&rig);

        let created = create_baked_asset(&rig, &sel, &settings_in(tmp.path())).unwrap();
        assert!(created.record_path.ends_with("Arm_Rig_VA.vat.ron"));
        assert!(created.position_path.exists() && created.normal_path.exists());
        assert_eq!(created.asset.position_texture(), "vat/Arm_Rig_Positions.png");

        let png = image::open(&created.position_path).unwrap().to_rgba8();
        assert_eq!(png.dimensions(), (4, sel.layout().height()));

        let record = fs::read(&created.record_path).unwrap();
        let back = BakedAnimationAsset::from_ron_bytes(&record).unwrap();
        assert_eq!(back.entries(), created.asset.entries());
        assert_eq!(back.material(), "materials/vat_arm");
        assert_eq!(back.vertex_count(), 4);
    }

    #[test]
    fn reloaded_pngs_match_gpu_images() {
        let tmp = tempfile::tempdir().unwrap();
        let rig = arm_rig();
        let sel = BakeSelection::from_source(&rig);
        let created = create_baked_asset(&rig, &sel, &settings_in(tmp.path())).unwrap();
        let out = bake(&rig, &sel).unwrap();

        let position = image::open(&created.position_path).unwrap().to_rgba8().into_raw();
        let normal = image::open(&created.normal_path).unwrap().to_rgba8().into_raw();
        assert_eq!(out.position.to_image().data, Some(position.clone()));
        assert_eq!(out.normal.to_image().data, Some(normal));

        // First scanline is the first baked frame of the first entry.
        let row_bytes = 4 * out.position.width() as usize;
        let first_row: Vec<u8> = out.position.pixels()[..4].iter().flatten().copied().collect();
        assert_eq!(created.asset.entries()[0].start_row, 0);
        assert_eq!(&position[..row_bytes], first_row.as_slice());
    }

    #[test]
    fn missing_material_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let rig = arm_rig();
        let sel = BakeSelection::from_source(&rig);
        let settings = BakeSettings { material: None, ..settings_in(tmp.path()) };

        let err = create_baked_asset(&rig, &sel, &settings).unwrap_err();
        assert!(matches!(err, ExportError::Bake(BakeError::MissingMaterial(_))));
        assert!(!tmp.path().join("out").exists());
    }
}
