//! Templated file destination
//!
//! Renders a template with the address bound to `ip` and writes the result
//! to an output file or an injected writer. The template is read and
//! rendered before the output is touched, so a broken template never
//! truncates an existing output file.
//!
//! Templates use Jinja syntax:
//!
//! ```text
//! server {
//!     listen {{ ip }}:443;
//! }
//! ```

use minijinja::{Environment, UndefinedBehavior, context};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::Instrument;

use crate::error::UpdateError;

/// Where rendered output goes
pub enum FileOutput {
    /// Overwrite this file on every update
    Path(PathBuf),
    /// Write into an already open sink
    Writer(Mutex<Box<dyn Write + Send>>),
}

impl FileOutput {
    /// Wrap an arbitrary writer
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        FileOutput::Writer(Mutex::new(Box::new(writer)))
    }

    fn describe(&self) -> String {
        match self {
            FileOutput::Path(path) => path.display().to_string(),
            FileOutput::Writer(_) => "<writer>".to_string(),
        }
    }
}

impl fmt::Debug for FileOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileOutput::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Renders a template into a file
#[derive(Debug)]
pub struct FileDestination {
    name: String,
    template: PathBuf,
    output: FileOutput,
    span: tracing::Span,
}

impl FileDestination {
    /// Render `template` into the file at `output`
    pub fn new(template: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::with_output(template, FileOutput::Path(output.into()))
    }

    /// Render `template` into an explicit output
    pub fn with_output(template: impl Into<PathBuf>, output: FileOutput) -> Self {
        let template = template.into();
        let name = format!("file updater ({})", output.describe());
        let span = tracing::info_span!("destination", name = %name);
        Self {
            name,
            template,
            output,
            span,
        }
    }

    /// Replace the logging span used by this destination
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Human-readable identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template for `address` and write it out
    pub async fn update(&self, address: &str) -> Result<(), UpdateError> {
        self.render_and_write(address)
            .instrument(self.span.clone())
            .await
    }

    async fn render_and_write(&self, address: &str) -> Result<(), UpdateError> {
        let rendered = self.render(address).await?;

        match &self.output {
            FileOutput::Path(path) => {
                fs::write(path, rendered.as_bytes())
                    .await
                    .map_err(|source| UpdateError::Output {
                        target: path.display().to_string(),
                        source,
                    })?;
            }
            FileOutput::Writer(writer) => {
                let output_error = |source| UpdateError::Output {
                    target: self.output.describe(),
                    source,
                };
                let mut writer = writer
                    .lock()
                    .map_err(|_| output_error(std::io::Error::other("writer lock poisoned")))?;
                writer
                    .write_all(rendered.as_bytes())
                    .and_then(|()| writer.flush())
                    .map_err(output_error)?;
            }
        }

        tracing::debug!("wrote {} bytes to {}", rendered.len(), self.output.describe());
        Ok(())
    }

    async fn render(&self, address: &str) -> Result<String, UpdateError> {
        let template_error = |message: String| UpdateError::Template {
            path: self.template.clone(),
            message,
        };

        let source = fs::read_to_string(&self.template)
            .await
            .map_err(|e| template_error(e.to_string()))?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(&source, context! { ip => address })
            .map_err(|e| template_error(e.to_string()))
    }
}
