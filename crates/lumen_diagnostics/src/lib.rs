pub mod diagnostic_report;
pub mod message;

use colored::*;
use lumen_type::file::SourceMap;

use diagnostic_report::{Diagnostic, Severity};

/// Render a diagnostic as plain text against the sources it points into.
///
/// Output shape:
/// ```text
/// Error[A0091]: <message>
///   --> <file>:<line>:<column>
/// ```
pub fn render(
  diagnostic: &Diagnostic,
  source_map: &SourceMap,
) -> String {
  let mut out = String::new();

  let header = match diagnostic.severity {
    Severity::Info => format!("{}[{}]", "Info".blue().bold(), diagnostic.error_code.blue()),
    Severity::Warning => format!("{}[{}]", "Warning".yellow().bold(), diagnostic.error_code.yellow()),
    Severity::Error => format!("{}[{}]", "Error".red().bold(), diagnostic.error_code.red().bold()),
    Severity::Hint => format!("{}[{}]", "Hint".cyan().bold(), diagnostic.error_code.cyan()),
  };
  out.push_str(&format!("{}: {}\n", header, diagnostic.message.bold()));

  let (line, column) = source_map.line_col(&diagnostic.primary_span.file, diagnostic.primary_span.start);
  let file = source_map.get(&diagnostic.primary_span.file);
  out.push_str(&format!("  {} {}:{}:{}\n", "-->".blue().bold(), file.path.display(), line, column));

  for label in &diagnostic.labels {
    let (line, column) = source_map.line_col(&label.span.file, label.span.start);
    out.push_str(&format!("  label: {} ({}:{})\n", label.message, line, column));
  }

  for note in &diagnostic.notes {
    out.push_str(&format!("  note: {}\n", note));
  }

  out
}
