use crate::core::preset::Preset;
use crate::errors::AppError;
use log::debug;
use std::path::{Path, PathBuf};

pub const RAW_IMAGES_DIR: &str = "raw_images";
pub const ANNOTATED_IMAGES_DIR: &str = "annotated_images";
const RAW_IMAGE_PREFIX: &str = "preset_";

/// Replaces characters that cannot appear in a single path component.
pub fn sanitize_preset_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// `preset_007_Main_Floor.jpg`
pub fn raw_image_file_name(preset: &Preset) -> String {
    format!(
        "{}{:03}_{}.jpg",
        RAW_IMAGE_PREFIX,
        preset.number,
        sanitize_preset_name(&preset.name)
    )
}

/// `Main_Floor_7.jpg`. Never starts with the raw prefix, so both can share a tree.
pub fn annotated_image_file_name(preset_number: u16, preset_name: &str) -> String {
    format!("{}_{}.jpg", sanitize_preset_name(preset_name), preset_number)
}

/// Recovers `(number, name)` from a `preset_<number>_<name>.<ext>` file name.
/// Underscores in the name come back as spaces.
pub fn parse_raw_image_file_name(file_name: &str) -> Option<(u16, String)> {
    let rest = file_name.strip_prefix(RAW_IMAGE_PREFIX)?;
    let stem = match rest.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => rest,
    };
    let (number_part, name_part) = stem.split_once('_')?;
    let number = number_part.parse::<u16>().ok()?;
    if name_part.is_empty() {
        return None;
    }
    Some((number, name_part.replace('_', " ")))
}

pub fn ensure_output_directory(dir_path: &Path) -> Result<PathBuf, AppError> {
    if !dir_path.exists() {
        debug!("Output directory '{}' does not exist, attempting to create it.", dir_path.display());
        std::fs::create_dir_all(dir_path).map_err(|e| {
            AppError::Io(format!(
                "Failed to create output directory '{}': {}",
                dir_path.display(),
                e
            ))
        })?;
    } else if !dir_path.is_dir() {
        return Err(AppError::Io(format!(
            "Output path '{}' exists but is not a directory.",
            dir_path.display()
        )));
    }
    Ok(dir_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_name_pads_number_and_sanitizes() {
        let preset = Preset::new(7, "Main Floor/East");
        assert_eq!(raw_image_file_name(&preset), "preset_007_Main_Floor_East.jpg");
    }

    #[test]
    fn annotated_name_differs_from_raw_name() {
        let preset = Preset::new(2, "Main");
        let raw = raw_image_file_name(&preset);
        let annotated = annotated_image_file_name(preset.number, &preset.name);
        assert_eq!(annotated, "Main_2.jpg");
        assert_ne!(raw, annotated);
    }

    #[test]
    fn parse_recovers_number_and_spaced_name() {
        assert_eq!(
            parse_raw_image_file_name("preset_012_Left_Balcony.jpg"),
            Some((12, "Left Balcony".to_string()))
        );
        assert_eq!(
            parse_raw_image_file_name(&raw_image_file_name(&Preset::new(256, "Stage"))),
            Some((256, "Stage".to_string()))
        );
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(parse_raw_image_file_name("Main_2.jpg"), None);
        assert_eq!(parse_raw_image_file_name("preset_abc_Main.jpg"), None);
        assert_eq!(parse_raw_image_file_name("preset_003.jpg"), None);
        assert_eq!(parse_raw_image_file_name("preset_003_.jpg"), None);
    }

    #[test]
    fn ensure_output_directory_creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let created = ensure_output_directory(&nested).unwrap();
        assert!(created.is_dir());

        let file = tmp.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(ensure_output_directory(&file).is_err());
    }
}
