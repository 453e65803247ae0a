use std::{fs, path::Path};

use infragram::{
    Infragram, InfragramError, RunRequest, RunStatus, SourceRoot,
    conditional::ConditionalState,
    config::{AppConfig, RenderSettings},
    diagram::DiagramModel,
    export::{self, Exporter},
    metadata::METADATA_FILE,
    relationship::RelationshipKind,
    view::{ViewSelection, builtin_views},
};
use infragram_core::render::OutputFormat;
use tempfile::TempDir;

const FIVE_NODES_FOUR_EDGES: &str = r#"
resource "aws_route53_record" "api" {
  name    = "api.example.com"
  records = [aws_lb.main.dns_name]
}

resource "aws_lb" "main" {
  internal = false
}

resource "aws_lb_target_group" "allocator" {
  port = 5000
}

resource "aws_lb_target_group_attachment" "allocator" {
  target_group_arn = aws_lb_target_group.allocator.arn
  target_id        = aws_instance.allocator.id
}

resource "aws_instance" "allocator" {
  instance_type = "t3.large"
  depends_on    = [aws_lb_target_group.allocator]
}
"#;

/// Produces fixed bytes, standing in for a raster backend.
struct StaticExporter(OutputFormat);

impl Exporter for StaticExporter {
    fn format(&self) -> OutputFormat {
        self.0
    }

    fn export(&self, _model: &DiagramModel) -> Result<Vec<u8>, export::Error> {
        Ok(b"rendered".to_vec())
    }
}

struct FailingExporter(OutputFormat);

impl Exporter for FailingExporter {
    fn format(&self) -> OutputFormat {
        self.0
    }

    fn export(&self, _model: &DiagramModel) -> Result<Vec<u8>, export::Error> {
        Err(export::Error::Backend("dot: command not found".to_string()))
    }
}

fn source_dir(text: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.tf"), text).unwrap();
    dir
}

fn detailed_model(infragram: &Infragram, dir: &Path) -> DiagramModel {
    let analysis = infragram
        .analyze(&[SourceRoot::infrastructure(dir)], false)
        .unwrap();
    let detailed = builtin_views().into_iter().find(|v| v.name() == "detailed").unwrap();
    analysis.builder().build(&detailed).unwrap()
}

#[cfg(feature = "graphviz")]
fn all_formats() -> AppConfig {
    AppConfig::default().with_render(RenderSettings::default().with_formats(OutputFormat::all()))
}

#[test]
fn test_single_resource_without_condition() {
    let dir = source_dir("resource \"aws_s3_bucket\" \"artifacts\" {\n  bucket = \"artifacts\"\n}\n");
    let infragram = Infragram::new(AppConfig::default()).unwrap();

    let model = detailed_model(&infragram, dir.path());

    assert_eq!(model.nodes().len(), 1);
    assert!(model.edges().is_empty());
    assert_eq!(model.nodes()[0].state(), ConditionalState::Always);
}

#[test]
fn test_reference_yields_one_edge() {
    let dir = source_dir(
        r#"
resource "aws_instance" "allocator" {
  iam_instance_profile = aws_iam_instance_profile.allocator.name
}

resource "aws_iam_instance_profile" "allocator" {
  name = "allocator-profile"
}
"#,
    );
    let infragram = Infragram::new(AppConfig::default()).unwrap();

    let model = detailed_model(&infragram, dir.path());

    assert_eq!(model.edges().len(), 1);
    let edge = &model.edges()[0];
    assert_eq!(edge.source().to_string(), "aws_instance.allocator");
    assert_eq!(edge.target().to_string(), "aws_iam_instance_profile.allocator");
    assert_eq!(edge.kind(), RelationshipKind::Identity);
}

#[test]
fn test_malformed_block_is_recovered() {
    let dir = source_dir(
        r#"resource "aws_lb" "main" {
  internal = false
}

resource "aws_lb_target_group" "broken" {
  health_check {
    path = "/health"

resource "aws_route53_record" "api" {
  records = [aws_lb.main.dns_name]
}
"#,
    );
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(AppConfig::default()).unwrap();
    let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path())
        .with_views(ViewSelection::Named("detailed".into()));

    let report = infragram.run(&request).unwrap();

    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.diagnostics().len(), 1);
    assert!(report.failures().is_empty());

    let svg = fs::read_to_string(output.path().join("detailed.svg")).unwrap();
    assert!(svg.contains("aws_lb.main"));
    assert!(svg.contains("aws_route53_record.api"));
    assert!(!svg.contains("broken"));

    let metadata = fs::read_to_string(output.path().join(METADATA_FILE)).unwrap();
    assert!(metadata.contains("main.tf:5"));
}

#[cfg(feature = "graphviz")]
#[test]
fn test_all_formats_produce_non_empty_files() {
    let dir = source_dir(FIVE_NODES_FOUR_EDGES);
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(all_formats())
        .unwrap()
        .with_exporter(Box::new(StaticExporter(OutputFormat::Png)))
        .with_exporter(Box::new(StaticExporter(OutputFormat::Pdf)));

    let model = detailed_model(&infragram, dir.path());
    assert_eq!(model.nodes().len(), 5);
    assert_eq!(model.edges().len(), 4);

    let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path())
        .with_views(ViewSelection::Named("detailed".into()));
    let report = infragram.run(&request).unwrap();

    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(report.outputs().len(), OutputFormat::all().len());
    for format in OutputFormat::all() {
        let path = output.path().join(format!("detailed.{}", format.extension()));
        assert!(fs::metadata(&path).unwrap().len() > 0, "{} is empty", path.display());
    }
}

#[test]
fn test_one_failing_format_is_partial_success() {
    let dir = source_dir(FIVE_NODES_FOUR_EDGES);
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(
        AppConfig::default().with_render(RenderSettings::default().with_formats(vec![
            OutputFormat::Dot,
            OutputFormat::Svg,
            OutputFormat::Pdf,
        ])),
    )
    .unwrap()
    .with_exporter(Box::new(FailingExporter(OutputFormat::Pdf)));

    let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path())
        .with_views(ViewSelection::Named("detailed".into()));
    let report = infragram.run(&request).unwrap();

    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.outputs().len(), 2);
    assert!(matches!(
        report.failures(),
        [InfragramError::Render { format: OutputFormat::Pdf, .. }]
    ));
    assert!(output.path().join("detailed.dot").exists());
    assert!(output.path().join("detailed.svg").exists());
    assert!(!output.path().join("detailed.pdf").exists());
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = source_dir(FIVE_NODES_FOUR_EDGES);
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let infragram = Infragram::new(AppConfig::default().with_render(
        RenderSettings::default().with_formats(vec![OutputFormat::Dot, OutputFormat::Svg]),
    ))
    .unwrap();

    for output in [&first, &second] {
        let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path())
            .with_views(ViewSelection::All);
        assert_eq!(infragram.run(&request).unwrap().status(), RunStatus::Success);
    }

    for view in builtin_views() {
        for extension in ["dot", "svg"] {
            let name = format!("{}.{extension}", view.name());
            assert_eq!(
                fs::read(first.path().join(&name)).unwrap(),
                fs::read(second.path().join(&name)).unwrap(),
                "{name} differs"
            );
        }
    }
}

#[test]
fn test_missing_source_is_fatal() {
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(AppConfig::default()).unwrap();
    let request = RunRequest::new(
        vec![SourceRoot::infrastructure(output.path().join("missing"))],
        output.path(),
    );

    let err = infragram.run(&request).unwrap_err();
    assert!(matches!(err, InfragramError::ConfigNotFound(_)));
}

#[test]
fn test_cycle_is_fatal() {
    let dir = source_dir("locals {\n  a = local.b\n  b = local.a\n}\n");
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(AppConfig::default()).unwrap();
    let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path());

    let err = infragram.run(&request).unwrap_err();
    assert!(matches!(err, InfragramError::CyclicReference(_)));
}

#[test]
fn test_unknown_view_is_a_config_error() {
    let dir = source_dir(FIVE_NODES_FOUR_EDGES);
    let output = TempDir::new().unwrap();
    let infragram = Infragram::new(AppConfig::default()).unwrap();
    let request = RunRequest::new(vec![SourceRoot::infrastructure(dir.path())], output.path())
        .with_views(ViewSelection::Named("nope".into()));

    assert!(matches!(
        infragram.run(&request).unwrap_err(),
        InfragramError::Config(_)
    ));
}
