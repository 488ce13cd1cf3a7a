//! Platform-specific asset locations
//!
//! Mirrors where each platform's runtime asset loader looks for a resource:
//! density-bucketed `drawable-*` folders on Android, `@Nx` suffixed files
//! under the server location on iOS.

use super::AssetDescriptor;
use crate::config::Platform;
use crate::error::SplitError;

const ANDROID_DENSITIES: &[(f64, &str)] = &[
    (0.75, "ldpi"),
    (1.0, "mdpi"),
    (1.5, "hdpi"),
    (2.0, "xhdpi"),
    (3.0, "xxhdpi"),
    (4.0, "xxxhdpi"),
];

/// Relative output paths for every scale an asset declares
pub fn resolve_asset_paths(
    asset: &AssetDescriptor,
    platform: Platform,
) -> Result<Vec<String>, SplitError> {
    match platform {
        Platform::Android => android_paths(asset),
        Platform::Ios => Ok(ios_paths(asset)),
    }
}

fn android_paths(asset: &AssetDescriptor) -> Result<Vec<String>, SplitError> {
    let identifier = android_resource_identifier(asset);
    asset
        .scale_values()
        .map(|scale| {
            let suffix = android_density_suffix(scale).ok_or_else(|| SplitError::UnsupportedScale {
                scale,
                asset: format!("{}/{}.{}", asset.base_path(), asset.name, asset.file_type),
            })?;
            Ok(format!("drawable-{}/{}.{}", suffix, identifier, asset.file_type))
        })
        .collect()
}

fn android_density_suffix(scale: f64) -> Option<&'static str> {
    ANDROID_DENSITIES
        .iter()
        .find(|(density, _)| *density == scale)
        .map(|(_, suffix)| *suffix)
}

/// Flattened Android resource name: folder and name joined, lower-cased,
/// separators folded to `_`, anything outside `[a-z0-9_]` dropped and a
/// leading `assets_` removed
pub fn android_resource_identifier(asset: &AssetDescriptor) -> String {
    let joined = format!("{}/{}", asset.base_path(), asset.name).to_lowercase();
    let flattened: String = joined
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    match flattened.strip_prefix("assets_") {
        Some(rest) => rest.to_string(),
        None => flattened,
    }
}

fn ios_paths(asset: &AssetDescriptor) -> Vec<String> {
    asset
        .scale_values()
        .map(|scale| {
            let suffix = if scale == 1.0 {
                String::new()
            } else {
                format!("@{}x", format_scale(scale))
            };
            let file_name = format!("{}{}.{}", asset.name, suffix, asset.file_type);
            match asset.base_path() {
                "" => file_name,
                folder => format!("{}/{}", folder.trim_end_matches('/'), file_name),
            }
        })
        .collect()
}

/// Render a scale the way it appears in file names: `2`, `1.5`, `0.75`
pub fn format_scale(scale: f64) -> String {
    if scale.fract() == 0.0 {
        format!("{}", scale as i64)
    } else {
        format!("{}", scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::sample_descriptor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_android_drawable_paths() {
        let asset = sample_descriptor(&["1", "1.5", "2", "3"]);
        assert_eq!(
            resolve_asset_paths(&asset, Platform::Android).unwrap(),
            vec![
                "drawable-mdpi/src_assets_naruto.jpeg",
                "drawable-hdpi/src_assets_naruto.jpeg",
                "drawable-xhdpi/src_assets_naruto.jpeg",
                "drawable-xxhdpi/src_assets_naruto.jpeg",
            ]
        );
    }

    #[test]
    fn test_android_three_scales() {
        let asset = sample_descriptor(&["1", "2", "3"]);
        let paths = resolve_asset_paths(&asset, Platform::Android).unwrap();
        let folders: Vec<&str> = paths.iter().map(|p| p.split('/').next().unwrap()).collect();
        assert_eq!(folders, vec!["drawable-mdpi", "drawable-xhdpi", "drawable-xxhdpi"]);
    }

    #[test]
    fn test_android_unsupported_scale() {
        let asset = sample_descriptor(&["1", "2.5"]);
        let err = resolve_asset_paths(&asset, Platform::Android).unwrap_err();
        assert!(matches!(err, SplitError::UnsupportedScale { scale, .. } if scale == 2.5));
    }

    #[test]
    fn test_android_identifier_strips_illegal_chars() {
        let mut asset = sample_descriptor(&["1"]);
        asset.server_location = "/assets/My-Images/icons".to_string();
        asset.name = "Back Arrow".to_string();
        assert_eq!(android_resource_identifier(&asset), "myimages_icons_backarrow");

        asset.server_location = "/img".to_string();
        assert_eq!(android_resource_identifier(&asset), "img_backarrow");
    }

    #[test]
    fn test_ios_paths() {
        let asset = sample_descriptor(&["1", "2", "3"]);
        assert_eq!(
            resolve_asset_paths(&asset, Platform::Ios).unwrap(),
            vec![
                "assets/src/assets/naruto.jpeg",
                "assets/src/assets/naruto@2x.jpeg",
                "assets/src/assets/naruto@3x.jpeg",
            ]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let asset = sample_descriptor(&["0.75", "4"]);
        let first = resolve_asset_paths(&asset, Platform::Android).unwrap();
        let _ = resolve_asset_paths(&asset, Platform::Ios).unwrap();
        assert_eq!(first, resolve_asset_paths(&asset, Platform::Android).unwrap());
        assert_eq!(first[0], "drawable-ldpi/src_assets_naruto.jpeg");
    }

    #[test]
    fn test_format_scale() {
        assert_eq!(format_scale(2.0), "2");
        assert_eq!(format_scale(1.5), "1.5");
        assert_eq!(format_scale(0.75), "0.75");
    }
}
