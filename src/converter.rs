//! Markdown to target-format conversion
//!
//! The exporter hands Markdown to a [`DocumentConverter`], and asks it for
//! Markdown when a tiddler is written in HTML. Two backends ship with the
//! crate: [`PandocConverter`] drives the `pandoc` executable,
//! [`BuiltinConverter`] writes Markdown and HTML without any external tool.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output format of an export. Serialized as its [`name`](OutputFormat::name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Pdf,
    Docx,
    Latex,
    Epub,
    /// Any other pandoc writer, kept verbatim
    Other(String),
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" | "gfm" => OutputFormat::Markdown,
            "html" | "htm" => OutputFormat::Html,
            "pdf" => OutputFormat::Pdf,
            "docx" => OutputFormat::Docx,
            "latex" | "tex" => OutputFormat::Latex,
            "epub" => OutputFormat::Epub,
            _ => OutputFormat::Other(name.trim().to_string()),
        }
    }

    /// Format implied by the extension of `path`
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(OutputFormat::from_name)
    }

    pub fn name(&self) -> &str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Latex => "latex",
            OutputFormat::Epub => "epub",
            OutputFormat::Other(name) => name,
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            OutputFormat::Latex => "tex",
            other => other.name(),
        }
    }

    /// pandoc writer name; PDF has none, pandoc picks it from the output path
    pub fn pandoc_writer(&self) -> Option<&str> {
        match self {
            OutputFormat::Pdf => None,
            OutputFormat::Markdown => Some("markdown"),
            other => Some(other.name()),
        }
    }

    /// Output goes through LaTeX, whose input encodings reject most
    /// characters beyond Latin-1
    pub fn is_latex_based(&self) -> bool {
        matches!(self, OutputFormat::Pdf)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.name().to_string()
    }
}

impl From<String> for OutputFormat {
    fn from(name: String) -> Self {
        OutputFormat::from_name(&name)
    }
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("could not run `{program}`: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("conversion to {format} was rejected ({status}): {stderr}")]
    Rejected {
        format: OutputFormat,
        status: String,
        stderr: String,
    },
    /// The converter cannot write (or, for HTML tiddlers, read) this format
    #[error("format {0} is not supported by this converter")]
    Unsupported(OutputFormat),
    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a Markdown document into the bytes of the requested format.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, markdown: &str, format: &OutputFormat) -> Result<Vec<u8>, ConversionError>;

    /// Markdown rendition of an HTML tiddler body. Converters that cannot
    /// read HTML keep the default, which reports the format as unsupported.
    fn html_to_markdown(&self, html: &str) -> Result<String, ConversionError> {
        let _ = html;
        Err(ConversionError::Unsupported(OutputFormat::Html))
    }
}

/// Converter backed by the `pandoc` executable
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments appended to every pandoc invocation, e.g. `--toc`
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn base_command(&self, reader: &str, writer: Option<&str>) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-f").arg(reader);
        if let Some(writer) = writer {
            command.arg("-t").arg(writer);
        }
        command.stdin(Stdio::piped()).stderr(Stdio::piped());
        command
    }

    fn command(&self, format: &OutputFormat, output: &Path) -> Command {
        let mut command = self.base_command("markdown", format.pandoc_writer());
        command
            .arg("-o")
            .arg(output)
            .args(&self.extra_args)
            .stdout(Stdio::null());
        command
    }

    /// HTML on stdin, Markdown on stdout. The extra arguments are meant for
    /// the final document and are left out.
    fn html_command(&self) -> Command {
        let mut command = self.base_command("html", Some("markdown"));
        command.stdout(Stdio::piped());
        command
    }

    /// Feed `input` to `command` and wait for it. A non-zero exit becomes
    /// [`ConversionError::Rejected`] carrying pandoc's stderr.
    fn run(
        &self,
        mut command: Command,
        input: &str,
        format: &OutputFormat,
    ) -> Result<Output, ConversionError> {
        let mut child = command
            .spawn()
            .map_err(|source| ConversionError::ToolUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(input.as_bytes()) {
                // pandoc quit before reading everything; its status tells why
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                written => written?,
            }
        }
        let finished = child.wait_with_output()?;

        if !finished.status.success() {
            return Err(ConversionError::Rejected {
                format: format.clone(),
                status: finished.status.to_string(),
                stderr: String::from_utf8_lossy(&finished.stderr).trim().to_string(),
            });
        }
        Ok(finished)
    }
}

impl DocumentConverter for PandocConverter {
    fn convert(&self, markdown: &str, format: &OutputFormat) -> Result<Vec<u8>, ConversionError> {
        let output = tempfile::Builder::new()
            .prefix("tw5md-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;

        self.run(self.command(format, output.path()), markdown, format)?;
        log::trace!("pandoc produced {} for {} byte(s) of markdown", format, markdown.len());
        Ok(std::fs::read(output.path())?)
    }

    fn html_to_markdown(&self, html: &str) -> Result<String, ConversionError> {
        let finished = self.run(self.html_command(), html, &OutputFormat::Markdown)?;
        Ok(String::from_utf8_lossy(&finished.stdout).into_owned())
    }
}

/// In-process converter: Markdown is passed through, HTML is rendered with
/// pulldown-cmark. Every other format is unsupported, and so is reading
/// HTML tiddlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl BuiltinConverter {
    pub fn new() -> Self {
        Self
    }

    fn render_html(markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_MATH);
        let parser = Parser::new_ext(markdown, options);
        let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut rendered, parser);
        rendered
    }
}

impl DocumentConverter for BuiltinConverter {
    fn convert(&self, markdown: &str, format: &OutputFormat) -> Result<Vec<u8>, ConversionError> {
        match format {
            OutputFormat::Markdown => Ok(markdown.as_bytes().to_vec()),
            OutputFormat::Html => Ok(Self::render_html(markdown).into_bytes()),
            other => Err(ConversionError::Unsupported(other.clone())),
        }
    }
}
