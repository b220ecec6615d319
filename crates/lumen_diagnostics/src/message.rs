use std::fmt;

use lumen_type::span::Span;

use super::diagnostic_report::{Diagnostic, Severity};

/// The message catalog for user-visible findings. Variants carry everything
/// needed to format the message and place it in source.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticMessage {
  /// A call transferred a function argument (or the receiver) to another
  /// isolation domain. Arguments must stay usable by the caller.
  ArgumentRegionConsumed {
    span: Span,
  },

  /// Primary report at a transfer site whose region is later accessed.
  ConsumptionYieldsRace {
    span: Span,
    /// How many access sites are reported alongside this message.
    num_displayed: usize,
    /// How many further access sites exist but are not shown.
    num_hidden: usize,
  },

  /// Secondary report at one access site of a transferred region.
  PossibleRacyAccessSite {
    span: Span,
  },
}

impl fmt::Display for DiagnosticMessage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      DiagnosticMessage::ArgumentRegionConsumed { .. } => {
        write!(f, "Call transfers a function argument to another isolation domain")
      },
      DiagnosticMessage::ConsumptionYieldsRace {
        num_displayed,
        num_hidden,
        ..
      } => {
        let plural = if *num_displayed == 1 { "site" } else { "sites" };
        if *num_hidden > 0 {
          write!(
            f,
            "Transferring this value risks a data race at {} access {} ({} more hidden)",
            num_displayed, plural, num_hidden
          )
        } else {
          write!(
            f,
            "Transferring this value risks a data race at {} access {}",
            num_displayed, plural
          )
        }
      },
      DiagnosticMessage::PossibleRacyAccessSite { .. } => {
        write!(f, "Access site that may race with the transfer")
      },
    }
  }
}

impl DiagnosticMessage {
  pub fn primary_span(&self) -> Span {
    match self {
      DiagnosticMessage::ArgumentRegionConsumed { span }
      | DiagnosticMessage::ConsumptionYieldsRace { span, .. }
      | DiagnosticMessage::PossibleRacyAccessSite { span } => span.clone(),
    }
  }

  pub fn code(&self) -> String {
    match self {
      DiagnosticMessage::ArgumentRegionConsumed { .. } => "A0090",
      DiagnosticMessage::ConsumptionYieldsRace { .. } => "A0091",
      DiagnosticMessage::PossibleRacyAccessSite { .. } => "A0092",
    }
    .to_string()
  }

  fn level(&self) -> Severity {
    match self {
      DiagnosticMessage::ArgumentRegionConsumed { .. } | DiagnosticMessage::ConsumptionYieldsRace { .. } => {
        Severity::Error
      },
      DiagnosticMessage::PossibleRacyAccessSite { .. } => Severity::Hint,
    }
  }

  pub fn report(&self) -> Diagnostic {
    Diagnostic::new(self.level(), self.to_string(), self.code(), self.primary_span())
  }
}
