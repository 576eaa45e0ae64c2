use metrics::counter;

use super::{InternalEvent, error_stage, error_type};

#[derive(Debug)]
pub struct EventsReceived {
    pub count: usize,
    pub byte_size: usize,
}

impl InternalEvent for EventsReceived {
    fn emit(self) {
        trace!(
            message = "Events received.",
            count = self.count,
            byte_size = self.byte_size,
        );
        counter!("component_received_events_total").increment(self.count as u64);
        counter!("component_received_event_bytes_total").increment(self.byte_size as u64);
    }
}

#[derive(Debug)]
pub struct ComponentEventsDropped<'a> {
    pub count: usize,
    pub reason: &'a str,
}

impl InternalEvent for ComponentEventsDropped<'_> {
    fn emit(self) {
        debug!(
            message = "Events dropped.",
            count = self.count,
            reason = self.reason,
        );
        counter!("component_discarded_events_total").increment(self.count as u64);
    }
}

#[derive(Debug)]
pub struct DecoderFramingError<E> {
    pub error: E,
}

impl<E: std::fmt::Display> InternalEvent for DecoderFramingError<E> {
    fn emit(self) {
        error!(
            message = "Failed framing bytes.",
            error = %self.error,
            error_code = "decoder_frame",
            error_type = error_type::PARSER_FAILED,
            stage = error_stage::RECEIVING,
        );
        counter!(
            "component_errors_total",
            "error_code" => "decoder_frame",
            "error_type" => error_type::PARSER_FAILED,
            "stage" => error_stage::RECEIVING,
        )
        .increment(1);
    }
}

#[derive(Debug)]
pub struct DecoderDeserializeError<'a> {
    pub error: &'a crate::Error,
}

impl InternalEvent for DecoderDeserializeError<'_> {
    fn emit(self) {
        const DESERIALIZE_REASON: &str = "Failed deserializing frame.";
        warn!(
            message = DESERIALIZE_REASON,
            error = %self.error,
            error_code = "decoder_deserialize",
            error_type = error_type::PARSER_FAILED,
            stage = error_stage::PROCESSING,
        );
        counter!(
            "component_errors_total",
            "error_code" => "decoder_deserialize",
            "error_type" => error_type::PARSER_FAILED,
            "stage" => error_stage::PROCESSING,
        )
        .increment(1);
        emit!(ComponentEventsDropped {
            count: 1,
            reason: DESERIALIZE_REASON,
        });
    }
}

#[derive(Debug)]
pub struct LeefExtensionPairSkipped<'a> {
    pub pair: &'a str,
}

impl InternalEvent for LeefExtensionPairSkipped<'_> {
    fn emit(self) {
        debug!(
            message = "Skipping LEEF extension text without a key.",
            pair = self.pair,
        );
        counter!("leef_extension_pairs_skipped_total").increment(1);
    }
}

#[derive(Debug)]
pub struct EncoderSerializeError<'a, E> {
    pub error: &'a E,
}

impl<E: std::fmt::Display> InternalEvent for EncoderSerializeError<'_, E> {
    fn emit(self) {
        const SERIALIZE_REASON: &str = "Failed serializing frame.";
        error!(
            message = SERIALIZE_REASON,
            error = %self.error,
            error_code = "encoder_serialize",
            error_type = error_type::ENCODER_FAILED,
            stage = error_stage::SENDING,
        );
        counter!(
            "component_errors_total",
            "error_code" => "encoder_serialize",
            "error_type" => error_type::ENCODER_FAILED,
            "stage" => error_stage::SENDING,
        )
        .increment(1);
        emit!(ComponentEventsDropped {
            count: 1,
            reason: SERIALIZE_REASON,
        });
    }
}

#[derive(Debug)]
pub struct EncoderInputParseError<'a, E> {
    pub error: &'a E,
}

impl<E: std::fmt::Display> InternalEvent for EncoderInputParseError<'_, E> {
    fn emit(self) {
        const PARSE_REASON: &str = "Failed parsing input line as a JSON object.";
        warn!(
            message = PARSE_REASON,
            error = %self.error,
            error_code = "encoder_input_parse",
            error_type = error_type::PARSER_FAILED,
            stage = error_stage::RECEIVING,
        );
        counter!(
            "component_errors_total",
            "error_code" => "encoder_input_parse",
            "error_type" => error_type::PARSER_FAILED,
            "stage" => error_stage::RECEIVING,
        )
        .increment(1);
        emit!(ComponentEventsDropped {
            count: 1,
            reason: PARSE_REASON,
        });
    }
}

#[derive(Debug)]
pub struct OutputWriteError<'a, E> {
    pub error: &'a E,
}

impl<E: std::fmt::Display> InternalEvent for OutputWriteError<'_, E> {
    fn emit(self) {
        error!(
            message = "Failed writing bytes.",
            error = %self.error,
            error_type = error_type::IO_FAILED,
            stage = error_stage::SENDING,
        );
        counter!(
            "component_errors_total",
            "error_type" => error_type::IO_FAILED,
            "stage" => error_stage::SENDING,
        )
        .increment(1);
    }
}
