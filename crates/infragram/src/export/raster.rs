//! PNG and PDF export through the Graphviz `dot` executable.

use graphviz_rust::{
    cmd::{CommandArg, Format},
    exec_dot,
};
use log::{debug, error};

use infragram_core::{diagram::DiagramModel, render::OutputFormat};

use super::{Error, Exporter, dot};

/// Lays out the DOT description of a model with Graphviz and returns the
/// rendered bytes.
pub struct RasterExporter {
    format: OutputFormat,
}

impl RasterExporter {
    /// An exporter for `format`, which should be [`OutputFormat::Png`] or
    /// [`OutputFormat::Pdf`].
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn backend_format(&self) -> Result<Format, Error> {
        match self.format {
            OutputFormat::Png => Ok(Format::Png),
            OutputFormat::Pdf => Ok(Format::Pdf),
            other => Err(Error::Render(format!(
                "{other} is not produced by the Graphviz backend"
            ))),
        }
    }
}

impl Exporter for RasterExporter {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn export(&self, model: &DiagramModel) -> Result<Vec<u8>, Error> {
        let format = self.backend_format()?;
        let text = dot::to_dot(model);
        debug!(format = self.format.to_string(), bytes = text.len(); "Running Graphviz");

        let args = vec![
            CommandArg::Format(format),
            CommandArg::Custom(format!("-Gdpi={}", model.config().dpi())),
        ];
        exec_dot(text, args).map_err(|err| {
            error!(format = self.format.to_string(), err:err; "Graphviz failed");
            Error::Backend(format!("failed to run Graphviz `dot`: {err}"))
        })
    }
}
