use metrics::counter;

use super::{InternalEvent, error_stage, error_type};

/// A template failed to render and its slot fell back to a default.
pub struct TemplateRenderingError<'a> {
    pub field: Option<&'a str>,
    pub error: &'a crate::template::TemplateRenderingError,
}

impl InternalEvent for TemplateRenderingError<'_> {
    fn emit(self) {
        let mut msg = "Failed to render template".to_owned();
        if let Some(field) = self.field {
            use std::fmt::Write;
            _ = write!(msg, " for \"{field}\"");
        }
        msg.push('.');

        warn!(
            message = %msg,
            error = %self.error,
            error_type = error_type::TEMPLATE_FAILED,
            stage = error_stage::PROCESSING,
        );
        counter!(
            "component_errors_total",
            "error_type" => error_type::TEMPLATE_FAILED,
            "stage" => error_stage::PROCESSING,
        )
        .increment(1);
    }
}
