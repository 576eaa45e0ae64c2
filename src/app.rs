//! The `leef` command: stdin to stdout conversion in either direction.

use bytes::{BufMut, BytesMut};
use futures::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter},
    runtime,
};
use tokio_util::codec::{Encoder, FramedRead};

use crate::{
    cli::{Opts, SubCommand},
    config::Config,
    decoding::{Decoder, NewlineDelimitedDecoder},
    encoding::LeefSerializer,
    event::LogEvent,
    internal_events::{
        DecoderFramingError, EncoderInputParseError, EncoderSerializeError, OutputWriteError,
    },
    trace,
};

/// A parsed command line together with the configuration it names.
#[derive(Debug)]
pub struct Application {
    sub_command: SubCommand,
    config: Config,
}

impl Application {
    /// Parses the command line, installs logging and loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the exit code to terminate with when the arguments or the
    /// configuration are invalid, or when help or version output was requested.
    pub fn prepare() -> Result<Self, exitcode::ExitCode> {
        let opts = Opts::get_matches().map_err(|error| {
            // Printing to stdout/err can itself fail; ignore it.
            _ = error.print();
            if error.use_stderr() {
                exitcode::USAGE
            } else {
                exitcode::OK
            }
        })?;

        Self::prepare_from_opts(opts)
    }

    /// Installs logging and loads the configuration named by `opts`.
    ///
    /// # Errors
    ///
    /// Returns [`exitcode::CONFIG`] if the configuration cannot be loaded.
    pub fn prepare_from_opts(opts: Opts) -> Result<Self, exitcode::ExitCode> {
        let levels = trace::levels(opts.log_level());
        trace::init(&levels);

        let config = match &opts.root.config {
            Some(path) => Config::load(path).map_err(|error| {
                error!(message = "Failed to load configuration.", %error);
                exitcode::CONFIG
            })?,
            None => Config::default(),
        };

        debug!(message = "Configuration loaded.", sub_command = ?opts.sub_command);

        Ok(Self {
            sub_command: opts.sub_command,
            config,
        })
    }

    /// Runs the selected conversion over stdin and stdout to completion.
    pub fn run(self) -> exitcode::ExitCode {
        let runtime = match runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(error) => {
                error!(message = "Failed to start runtime.", %error);
                return exitcode::OSERR;
            }
        };

        let result = match self.sub_command {
            SubCommand::Decode => {
                let decoder = self.config.build_decoder();
                runtime.block_on(decode(&decoder, tokio::io::stdin(), tokio::io::stdout()))
            }
            SubCommand::Encode => {
                let serializer = match self.config.build_serializer() {
                    Ok(serializer) => serializer,
                    Err(error) => {
                        error!(message = "Invalid encoding configuration.", %error);
                        return exitcode::CONFIG;
                    }
                };
                let framer = NewlineDelimitedDecoder::new_with_max_length(
                    self.config.decoding.max_length,
                );
                runtime.block_on(encode(
                    framer,
                    serializer,
                    tokio::io::stdin(),
                    tokio::io::stdout(),
                ))
            }
        };

        match result {
            Ok(()) => exitcode::OK,
            Err(error) => {
                error!(message = "Conversion stopped.", %error);
                exitcode::IOERR
            }
        }
    }
}

async fn write_output<W: AsyncWrite + Unpin>(
    output: &mut W,
    buffer: &mut BytesMut,
) -> std::io::Result<()> {
    let result = output.write_all(buffer).await;
    buffer.clear();
    result.inspect_err(|error| emit!(OutputWriteError { error }))
}

/// Decodes LEEF lines from `input` and writes one JSON object per event to `output`.
///
/// Lines that fail to parse are reported and skipped.
///
/// # Errors
///
/// Fails when reading `input` or writing `output` fails.
pub async fn decode<R, W>(decoder: &Decoder, input: R, output: W) -> crate::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(input, decoder.framer().clone());
    let mut output = BufWriter::new(output);
    let mut buffer = BytesMut::new();

    while let Some(frame) = frames.next().await {
        let frame = frame.inspect_err(|error| emit!(DecoderFramingError { error }))?;

        // Parse failures are already reported by the decoder.
        let Ok((events, _)) = decoder.deserializer_parse(frame) else {
            continue;
        };

        for event in events {
            buffer.extend_from_slice(&crate::serde::json::to_bytes(&event)?);
            buffer.put_u8(b'\n');
        }
        write_output(&mut output, &mut buffer).await?;
    }

    output.flush().await?;
    Ok(())
}

/// Encodes JSON objects read line by line from `input` as LEEF lines written to `output`.
///
/// Lines that are not JSON objects and events that fail to encode are reported
/// and skipped.
///
/// # Errors
///
/// Fails when reading `input` or writing `output` fails.
pub async fn encode<R, W>(
    framer: NewlineDelimitedDecoder,
    mut serializer: LeefSerializer,
    input: R,
    output: W,
) -> crate::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(input, framer);
    let mut output = BufWriter::new(output);
    let mut buffer = BytesMut::new();

    while let Some(line) = lines.next().await {
        let line = line.inspect_err(|error| emit!(DecoderFramingError { error }))?;

        let log = match serde_json::from_slice::<serde_json::Value>(&line)
            .map_err(crate::Error::from)
            .and_then(LogEvent::try_from)
        {
            Ok(log) => log,
            Err(error) => {
                emit!(EncoderInputParseError { error: &error });
                continue;
            }
        };

        if let Err(error) = serializer.encode(log, &mut buffer) {
            emit!(EncoderSerializeError { error: &error });
            continue;
        }
        write_output(&mut output, &mut buffer).await?;
    }

    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use similar_asserts::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::encoding::{LeefSerializerConfig, LeefSerializerOptions};

    async fn run_decode(input: &str) -> String {
        let mut output = Vec::new();
        decode(&Decoder::default(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    async fn run_encode(fields: &[&str], input: &str) -> String {
        let serializer = LeefSerializerConfig::new(LeefSerializerOptions {
            fields: fields.iter().map(|field| (*field).to_owned()).collect(),
            ..Default::default()
        })
        .build()
        .unwrap();

        let mut output = Vec::new();
        encode(
            NewlineDelimitedDecoder::new(),
            serializer,
            input.as_bytes(),
            &mut output,
        )
        .await
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn decode_skips_malformed_lines() {
        let output = run_decode(indoc! {"
            LEEF:1.0|V|P|1.0|E|a=1
            garbage
            host LEEF:1.0|V|P|2.0|F
        "})
        .await;

        assert_eq!(
            output,
            concat!(
                r#"{"leef_device_version":"1.0","leef_eventid":"E","leef_ext":{"a":"1"},"leef_product":"P","leef_vendor":"V","leef_version":"1.0"}"#,
                "\n",
                r#"{"leef_device_version":"2.0","leef_eventid":"F","leef_ext":{},"leef_product":"P","leef_vendor":"V","leef_version":"1.0","syslog":"host"}"#,
                "\n",
            )
        );
        assert!(logs_contain("Failed deserializing frame."));
    }

    #[tokio::test]
    #[traced_test]
    async fn encode_skips_non_objects() {
        let output = run_encode(
            &["a"],
            indoc! {r#"
                {"a": "x"}
                [1, 2]
                not json
                {"a": 2}
            "#},
        )
        .await;

        assert_eq!(
            output,
            "LEEF:1.0|Elastic|Logstash|2.3.3|Logstash|a=x\nLEEF:1.0|Elastic|Logstash|2.3.3|Logstash|a=2\n"
        );
        assert!(logs_contain("Failed parsing input line as a JSON object."));
    }

    #[tokio::test]
    async fn encode_then_decode() {
        let encoded = run_encode(&["user", "msg"], r#"{"user": "j.doe", "msg": "hi there"}"#).await;
        let decoded = run_decode(&encoded).await;

        // Pairs are joined with a tab, which the decoder does not split on.
        assert_eq!(
            decoded,
            "{\"leef_device_version\":\"2.3.3\",\"leef_eventid\":\"Logstash\",\"leef_ext\":{\"user\":\"j.doe\\tmsg=hi there\"},\"leef_product\":\"Logstash\",\"leef_vendor\":\"Elastic\",\"leef_version\":\"1.0\"}\n"
        );
    }
}
