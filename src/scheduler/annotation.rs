//! Provenance tagging for NetCDF outputs.

use chrono::{SecondsFormat, Utc};
use std::path::Path;

/// Global attribute the provenance text is appended to
pub const HISTORY_ATTRIBUTE: &str = "patternflow_history";

/// The module providing `ncatted`
pub const ANNOTATION_MODULE: &str = "nco";

/// Build the provenance line recorded for a command: `<timestamp> <user>: <command>`
pub fn build_annotation(command: &[String]) -> String {
    format!(
        "{} {}: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        whoami::username(),
        command.join(" ")
    )
}

pub fn is_netcdf(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|ext| ext.to_str()),
        Some("nc") | Some("NC")
    )
}

/// The `ncatted` invocation that appends `annotation` to the history attribute of `out_file`
pub fn annotate_command(annotation: &str, out_file: &str) -> Vec<String> {
    vec![
        "ncatted".to_string(),
        "-O".to_string(),
        "-a".to_string(),
        format!("{HISTORY_ATTRIBUTE},global,a,c,\"{annotation}\""),
        out_file.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netcdf_detection() {
        assert!(is_netcdf("/out/tas_MIROC5.nc"));
        assert!(is_netcdf("/out/TAS.NC"));
        assert!(!is_netcdf("/out/plot.png"));
        assert!(!is_netcdf("/out/nc"));
    }

    #[test]
    fn test_annotate_command_shape() {
        let cmd = annotate_command("note", "/out/a.nc");
        assert_eq!(
            cmd,
            vec!["ncatted", "-O", "-a", "patternflow_history,global,a,c,\"note\"", "/out/a.nc"]
        );
    }

    #[test]
    fn test_annotation_contains_command() {
        let text = build_annotation(&["cdo".to_string(), "timmean".to_string()]);
        assert!(text.ends_with(": cdo timmean"));
    }
}
