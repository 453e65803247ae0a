//! The `diagram_metadata.txt` provenance sidecar.
//!
//! The generation timestamp lives only here so that the diagram files
//! themselves stay byte-identical across runs.

use std::{fmt, fs, io, path::Path};

use chrono::{DateTime, Utc};

use infragram_core::render::{OutputFormat, Preset};
use infragram_parser::{error::FileDiagnostics, loader::SourceRoot};

use crate::relations::POLICY_VERSION;

/// File name of the sidecar inside the output directory.
pub const METADATA_FILE: &str = "diagram_metadata.txt";

/// Everything recorded about one run.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceRoot>,
    pub resources: usize,
    pub nodes: usize,
    pub edges: usize,
    pub views: Vec<String>,
    pub formats: Vec<OutputFormat>,
    pub dpi: u32,
    pub preset: Preset,
    /// `file:line: message` for every recovered parse problem.
    pub warnings: Vec<String>,
}

impl RunMetadata {
    /// One warning line per diagnostic.
    pub fn warning_lines(diagnostics: &[FileDiagnostics]) -> Vec<String> {
        diagnostics
            .iter()
            .flat_map(|file| {
                file.error().diagnostics().iter().map(move |diagnostic| {
                    let line = file
                        .line(diagnostic)
                        .map(|line| format!(":{line}"))
                        .unwrap_or_default();
                    format!("{}{line}: {}", file.path().display(), diagnostic.message())
                })
            })
            .collect()
    }

    /// Write the sidecar into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> io::Result<()> {
        fs::write(output_dir.join(METADATA_FILE), self.to_string())
    }
}

impl fmt::Display for RunMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Infrastructure Diagram Metadata")?;
        writeln!(f, "===============================")?;
        writeln!(f, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;

        writeln!(f, "Source directories:")?;
        for source in &self.sources {
            writeln!(f, "  - {} ({})", source.path().display(), source.tier())?;
        }
        writeln!(f)?;

        writeln!(f, "Resources: {}", self.resources)?;
        writeln!(f, "Nodes: {}", self.nodes)?;
        writeln!(f, "Edges: {}", self.edges)?;
        writeln!(f, "Relationship policy: v{POLICY_VERSION}")?;
        writeln!(f)?;

        writeln!(f, "Views: {}", self.views.join(", "))?;
        let formats: Vec<String> = self.formats.iter().map(ToString::to_string).collect();
        writeln!(f, "Formats: {}", formats.join(", "))?;
        writeln!(f, "DPI: {}", self.dpi)?;
        writeln!(f, "Preset: {}", self.preset)?;

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Parse warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_sidecar_contents() {
        let metadata = RunMetadata {
            generated_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            sources: vec![
                SourceRoot::infrastructure("infra"),
                SourceRoot::runtime("client"),
            ],
            resources: 7,
            nodes: 6,
            edges: 4,
            views: vec!["main".into(), "detailed".into()],
            formats: vec![OutputFormat::Dot, OutputFormat::Svg],
            dpi: 300,
            preset: Preset::Medium,
            warnings: vec!["main.tf:5: unclosed block".into()],
        };

        let dir = TempDir::new().unwrap();
        metadata.write(dir.path()).unwrap();
        let text = fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();

        assert!(text.contains("Generated: 2026-03-01 12:30:00 UTC"));
        assert!(text.contains("  - infra (infrastructure)"));
        assert!(text.contains("  - client (runtime_provisioned)"));
        assert!(text.contains("Nodes: 6"));
        assert!(text.contains("Views: main, detailed"));
        assert!(text.contains("Formats: dot, svg"));
        assert!(text.contains("Preset: medium"));
        assert!(text.contains("main.tf:5: unclosed block"));
    }
}
