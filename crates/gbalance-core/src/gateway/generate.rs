use bytes::Bytes;
use gbalance_common::GatewayConfig;
use gbalance_protocol::gemini::generate_content::{
    GenerateContentRequestBody, GenerateContentResponse,
};
use gbalance_protocol::openai::create_chat_completions::CreateChatCompletionRequestBody;
use gbalance_provider_core::{
    HttpMethod, UpstreamBody, UpstreamFailure, UpstreamHttpRequest, generate_content_url,
};
use gbalance_transform::{
    ModelResolver, StreamTranscoder, from_native, from_openai, to_native, to_openai,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::context::RequestContext;
use super::{Gateway, GatewayResponse, GenerateCall, InboundRequest, Stage};
use crate::auth::authenticate;
use crate::error::GatewayError;

const DOWNSTREAM_STREAM_BUFFER: usize = 32;

enum DecodedBody {
    Native(GenerateContentRequestBody),
    OpenAI(CreateChatCompletionRequestBody),
}

enum StreamEnd {
    Completed,
    Aborted(UpstreamFailure),
    Cancelled,
}

impl Gateway {
    pub async fn generate(&self, call: GenerateCall) -> Result<GatewayResponse, GatewayError> {
        let config = self.config.load();
        let mut ctx = RequestContext::new(call.trace_id);
        info!(
            event = "downstream_received",
            trace_id = %ctx.trace_id,
            protocol = ?call.request.protocol()
        );

        match self.run_generate(&config, &mut ctx, call).await {
            Ok(GatewayResponse::Json(body)) => {
                ctx.enter(Stage::Done);
                info!(
                    event = "downstream_responded",
                    trace_id = %ctx.trace_id,
                    model = %ctx.model,
                    status = 200,
                    elapsed_ms = ctx.elapsed_ms(),
                    is_stream = false
                );
                self.telemetry.emit(ctx.outcome(true, 200, None)).await;
                Ok(GatewayResponse::Json(body))
            }
            // The stream task reports its own outcome when it ends.
            Ok(stream) => Ok(stream),
            Err(err) => {
                let status = err.status().as_u16();
                warn!(
                    event = "downstream_responded",
                    trace_id = %ctx.trace_id,
                    model = %ctx.model,
                    stage = ctx.stage.as_str(),
                    status,
                    error = %err,
                    elapsed_ms = ctx.elapsed_ms(),
                    is_stream = ctx.is_stream
                );
                self.telemetry
                    .emit(ctx.outcome(false, status, Some(err.to_string())))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_generate(
        &self,
        config: &GatewayConfig,
        ctx: &mut RequestContext,
        call: GenerateCall,
    ) -> Result<GatewayResponse, GatewayError> {
        ctx.enter(Stage::Authenticating);
        authenticate(config, call.token.as_ref())?;

        ctx.enter(Stage::ResolvingModel);
        let (raw_model, stream, body) = decode_body(call.request)?;
        ctx.model = raw_model;
        ctx.is_stream = stream;
        let resolver = ModelResolver::new(config);
        let descriptor = resolver.resolve(&ctx.model);
        check_model_id(&descriptor.base_id)?;

        ctx.enter(Stage::SelectingKey);
        let credential = self.pool.select().await?;
        ctx.credential = Some(credential.clone());

        ctx.enter(Stage::TranslatingRequest);
        let openai = matches!(body, DecodedBody::OpenAI(_));
        let mut canonical = match body {
            DecodedBody::Native(body) => from_native(body)?,
            DecodedBody::OpenAI(body) => from_openai(body)?,
        };
        resolver.prepare(&descriptor, &mut canonical);
        let payload = serde_json::to_vec(&canonical)
            .map_err(|err| GatewayError::TranscodeFailure(err.to_string()))?;
        let url = generate_content_url(
            &config.base_url,
            &descriptor.base_id,
            credential.value(),
            stream,
        )
        .map_err(|err| GatewayError::TranscodeFailure(err.to_string()))?;

        ctx.enter(Stage::CallingUpstream);
        let request = UpstreamHttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(Bytes::from(payload)),
            is_stream: stream,
        };
        let response = match self.call_upstream(config, request).await {
            Ok(response) => response,
            Err(failure) => {
                self.pool
                    .record_outcome(&credential, false, Some(&ctx.model))
                    .await;
                return Err(failure.into());
            }
        };
        self.pool
            .record_outcome(&credential, true, Some(&ctx.model))
            .await;

        ctx.enter(Stage::TranslatingResponse);
        if stream {
            let transcoder = if openai {
                StreamTranscoder::openai(ctx.model.clone())
            } else {
                StreamTranscoder::native()
            };
            let rx = self.spawn_stream(ctx.clone(), transcoder, response.body);
            return Ok(GatewayResponse::EventStream(rx));
        }

        let body = collect_body(response.body).await?;
        if !openai {
            return Ok(GatewayResponse::Json(to_native(body)));
        }
        let upstream: GenerateContentResponse = serde_json::from_slice(&body).map_err(|err| {
            GatewayError::TranscodeFailure(format!("invalid upstream response: {err}"))
        })?;
        let completion = to_openai(&upstream, &ctx.model);
        let encoded = serde_json::to_vec(&completion)
            .map_err(|err| GatewayError::TranscodeFailure(err.to_string()))?;
        Ok(GatewayResponse::Json(Bytes::from(encoded)))
    }

    fn spawn_stream(
        &self,
        mut ctx: RequestContext,
        mut transcoder: StreamTranscoder,
        body: UpstreamBody,
    ) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel::<Bytes>(DOWNSTREAM_STREAM_BUFFER);
        let telemetry = self.telemetry.clone();

        tokio::spawn(async move {
            let end = pump_stream(&mut transcoder, body, &tx).await;
            ctx.enter(Stage::Done);
            let outcome = match end {
                StreamEnd::Completed => {
                    info!(
                        event = "downstream_stream_finished",
                        trace_id = %ctx.trace_id,
                        model = %ctx.model,
                        elapsed_ms = ctx.elapsed_ms()
                    );
                    ctx.outcome(true, 200, None)
                }
                StreamEnd::Cancelled => {
                    info!(
                        event = "downstream_stream_cancelled",
                        trace_id = %ctx.trace_id,
                        model = %ctx.model,
                        elapsed_ms = ctx.elapsed_ms()
                    );
                    ctx.outcome(true, 200, Some("caller disconnected".to_string()))
                }
                StreamEnd::Aborted(failure) => {
                    warn!(
                        event = "downstream_stream_aborted",
                        trace_id = %ctx.trace_id,
                        model = %ctx.model,
                        error = %failure,
                        elapsed_ms = ctx.elapsed_ms()
                    );
                    ctx.outcome(false, 200, Some(failure.detail()))
                }
            };
            telemetry.emit(outcome).await;
        });

        rx
    }
}

fn decode_body(request: InboundRequest) -> Result<(String, bool, DecodedBody), GatewayError> {
    match request {
        InboundRequest::Native {
            model,
            stream,
            body,
        } => {
            let decoded: GenerateContentRequestBody = serde_json::from_slice(&body)
                .map_err(|err| GatewayError::MissingContent(format!("invalid request body: {err}")))?;
            Ok((model, stream, DecodedBody::Native(decoded)))
        }
        InboundRequest::OpenAI { body } => {
            let decoded: CreateChatCompletionRequestBody = serde_json::from_slice(&body)
                .map_err(|err| GatewayError::MissingContent(format!("invalid request body: {err}")))?;
            if decoded.model.trim().is_empty() {
                return Err(GatewayError::MissingContent("model is required".to_string()));
            }
            let model = decoded.model.clone();
            let stream = decoded.is_stream();
            Ok((model, stream, DecodedBody::OpenAI(decoded)))
        }
    }
}

/// The base id becomes one segment of the upstream URL path, so it may only
/// hold characters that need no escaping there.
fn check_model_id(base_id: &str) -> Result<(), GatewayError> {
    let plain = base_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'));
    if base_id.is_empty() || !plain || base_id.starts_with('.') {
        return Err(GatewayError::MissingContent(format!(
            "invalid model id {base_id:?}"
        )));
    }
    Ok(())
}

/// Drains a body the upstream sent as a stream into one buffer.
pub(super) async fn collect_body(body: UpstreamBody) -> Result<Bytes, GatewayError> {
    match body {
        UpstreamBody::Bytes(bytes) => Ok(bytes),
        UpstreamBody::Stream(mut rx) => {
            let mut buffer = Vec::new();
            while let Some(chunk) = rx.recv().await {
                buffer.extend_from_slice(&chunk?);
            }
            Ok(Bytes::from(buffer))
        }
    }
}

async fn pump_stream(
    transcoder: &mut StreamTranscoder,
    body: UpstreamBody,
    tx: &mpsc::Sender<Bytes>,
) -> StreamEnd {
    match body {
        UpstreamBody::Bytes(bytes) => {
            let mut frames = transcoder.push(&bytes);
            frames.extend(transcoder.finish());
            forward(frames, tx).await
        }
        // Returning drops `rx`, which ends the upstream pump and its connection.
        UpstreamBody::Stream(mut rx) => loop {
            let item = tokio::select! {
                item = rx.recv() => item,
                _ = tx.closed() => return StreamEnd::Cancelled,
            };
            match item {
                Some(Ok(chunk)) => {
                    if let StreamEnd::Cancelled = forward(transcoder.push(&chunk), tx).await {
                        return StreamEnd::Cancelled;
                    }
                }
                Some(Err(failure)) => {
                    transcoder.abort();
                    return StreamEnd::Aborted(failure);
                }
                None => return forward(transcoder.finish(), tx).await,
            }
        },
    }
}

async fn forward(frames: Vec<Bytes>, tx: &mpsc::Sender<Bytes>) -> StreamEnd {
    for frame in frames {
        if tx.send(frame).await.is_err() {
            return StreamEnd::Cancelled;
        }
    }
    StreamEnd::Completed
}
