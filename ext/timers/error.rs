// Copyright 2018-2026 the Deno authors. MIT license.

use deno_error::JsErrorBox;
use deno_error::JsErrorClass;

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum TimerError {
  #[class(type)]
  #[error("Timer delay must be a number, received NaN")]
  InvalidDelay,
  #[class(type)]
  #[error(
    "Timer handler is a string, but string evaluation is not available in this context"
  )]
  SourceTextUnsupported,
  #[class(inherit)]
  #[error(transparent)]
  Eval(JsErrorBox),
}

impl From<TimerError> for JsErrorBox {
  fn from(value: TimerError) -> Self {
    JsErrorBox::from_err(value)
  }
}

/// Receives exceptions thrown by timer callbacks.
pub trait ExceptionReporter {
  fn report(&self, error: JsErrorBox);
}

/// Logs uncaught exceptions through the `log` facade.
#[derive(Debug, Default)]
pub struct LogExceptionReporter;

impl ExceptionReporter for LogExceptionReporter {
  fn report(&self, error: JsErrorBox) {
    log::error!("Uncaught {}: {}", error.get_class(), error.get_message());
  }
}
