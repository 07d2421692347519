use bytes::Bytes;
use gbalance_protocol::gemini::generate_content::GenerateContentResponse;
use gbalance_protocol::sse::{DONE_SENTINEL, DataLineDecoder, frame_data, frame_data_crlf};

use crate::generate_content::openai_chat_completions2gemini::stream::OpenAIChunkBuilder;

/// One incremental unit of generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub delta_text: String,
    pub is_final: bool,
}

/// How transcoded records are framed for the caller.
#[derive(Debug, Clone)]
pub enum StreamFraming {
    /// `chat.completion.chunk` records, a final `stop` chunk, then `[DONE]`.
    OpenAI(OpenAIChunkBuilder),
    /// Upstream records re-framed one-for-one; end of stream is connection close.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TranscoderState {
    AwaitingLine,
    Closed,
}

struct Decoded {
    event: StreamEvent,
    payload: String,
}

/// Re-frames an upstream `data:` stream for the caller.
///
/// Each parsed upstream record yields exactly one caller record; records that
/// fail to parse are dropped. `finish` emits the terminal record once, `abort`
/// closes without one.
#[derive(Debug)]
pub struct StreamTranscoder {
    decoder: DataLineDecoder,
    framing: StreamFraming,
    state: TranscoderState,
}

impl StreamTranscoder {
    pub fn new(framing: StreamFraming) -> Self {
        Self {
            decoder: DataLineDecoder::new(),
            framing,
            state: TranscoderState::AwaitingLine,
        }
    }

    pub fn openai(model: impl Into<String>) -> Self {
        Self::new(StreamFraming::OpenAI(OpenAIChunkBuilder::new(model)))
    }

    pub fn native() -> Self {
        Self::new(StreamFraming::Native)
    }

    pub fn is_closed(&self) -> bool {
        self.state == TranscoderState::Closed
    }

    /// Feeds one upstream read; returns caller-framed records.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.push_decoded(chunk)
            .into_iter()
            .filter_map(|decoded| self.frame(&decoded))
            .collect()
    }

    /// Flushes any unterminated line, then the terminal record and sentinel.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut out: Vec<Bytes> = self
            .finish_decoded()
            .into_iter()
            .filter_map(|decoded| self.frame(&decoded))
            .collect();
        if let StreamFraming::OpenAI(_) = self.framing {
            if !out.is_empty() {
                out.push(frame_data(DONE_SENTINEL));
            }
        }
        out
    }

    /// Closes after an upstream failure. Nothing further is emitted.
    pub fn abort(&mut self) {
        self.state = TranscoderState::Closed;
    }

    pub fn push_events(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.push_decoded(chunk)
            .into_iter()
            .map(|decoded| decoded.event)
            .collect()
    }

    pub fn finish_events(&mut self) -> Vec<StreamEvent> {
        self.finish_decoded()
            .into_iter()
            .map(|decoded| decoded.event)
            .collect()
    }

    fn push_decoded(&mut self, chunk: &[u8]) -> Vec<Decoded> {
        if self.is_closed() {
            return Vec::new();
        }
        let payloads = self.decoder.push_bytes(chunk);
        payloads.into_iter().filter_map(parse_payload).collect()
    }

    fn finish_decoded(&mut self) -> Vec<Decoded> {
        if self.is_closed() {
            return Vec::new();
        }
        let mut decoded: Vec<Decoded> = self
            .decoder
            .finish()
            .into_iter()
            .filter_map(parse_payload)
            .collect();
        decoded.push(Decoded {
            event: StreamEvent {
                delta_text: String::new(),
                is_final: true,
            },
            payload: String::new(),
        });
        self.state = TranscoderState::Closed;
        decoded
    }

    fn frame(&self, decoded: &Decoded) -> Option<Bytes> {
        match &self.framing {
            StreamFraming::OpenAI(builder) => {
                let chunk = if decoded.event.is_final {
                    builder.finish()
                } else {
                    builder.delta(decoded.event.delta_text.as_str())
                };
                serde_json::to_string(&chunk)
                    .ok()
                    .map(|json| frame_data(&json))
            }
            StreamFraming::Native => {
                if decoded.event.is_final {
                    None
                } else {
                    Some(frame_data_crlf(&decoded.payload))
                }
            }
        }
    }
}

fn parse_payload(payload: String) -> Option<Decoded> {
    let response: GenerateContentResponse = serde_json::from_str(&payload).ok()?;
    let delta_text = response.first_text().unwrap_or_default().to_string();
    Some(Decoded {
        event: StreamEvent {
            delta_text,
            is_final: false,
        },
        payload,
    })
}
