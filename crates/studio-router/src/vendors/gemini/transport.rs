//! JSON request/response mapping for the Gemini REST API.

use serde_json::{Value, json};

use crate::backend::{ImageOutput, LongRunningOperation, OperationError};
use crate::config::{ImageConfig, TextConfig, VideoConfig};
use crate::content::{InputPart, MediaKind, MediaRef, Message};
use crate::errors::BackendError;
use crate::model::BackendId;

const PRECONDITION_SIGNAL: &str = "FAILED_PRECONDITION";

pub(crate) fn part_json(part: &InputPart) -> Option<Value> {
    match part {
        InputPart::Text(text) if text.trim().is_empty() => None,
        InputPart::Text(text) => Some(json!({ "text": text })),
        InputPart::Media(media) => Some(json!({
            "inlineData": {
                "mimeType": media.mime_type(),
                "data": media.base64(),
            }
        })),
    }
}

pub(crate) fn text_request_body(messages: &[Message], config: &TextConfig) -> Value {
    let contents: Vec<Value> = messages
        .iter()
        .map(|message| {
            let parts: Vec<Value> = message.parts.iter().filter_map(part_json).collect();
            json!({ "role": message.role.as_str(), "parts": parts })
        })
        .collect();
    let mut body = json!({ "contents": contents });
    if let Some(system) = config
        .system_instruction
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if let Some(temperature) = config.temperature {
        body["generationConfig"] = json!({ "temperature": temperature });
    }
    body
}

pub(crate) fn edit_request_body(parts: &[InputPart], config: &ImageConfig) -> Value {
    let parts: Vec<Value> = parts.iter().filter_map(part_json).collect();
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "responseModalities": config.response_modalities },
        "safetySettings": config.safety_settings,
    })
}

pub(crate) fn imagen_request_body(prompt: &str) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": { "sampleCount": 1 },
    })
}

pub(crate) fn video_request_body(
    prompt: &str,
    base: Option<&MediaRef>,
    config: &VideoConfig,
) -> Value {
    let mut instance = json!({ "prompt": prompt });
    if let Some(media) = base {
        let field = match media.kind() {
            MediaKind::Video => "video",
            _ => "image",
        };
        instance[field] = json!({
            "bytesBase64Encoded": media.base64(),
            "mimeType": media.mime_type(),
        });
    }
    json!({
        "instances": [instance],
        "parameters": {
            "durationSeconds": config.duration_seconds,
            "aspectRatio": config.aspect_ratio,
        },
    })
}

fn candidate_parts(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Why a response carried no usable content, if the backend said.
fn empty_reason(value: &Value) -> Option<String> {
    value
        .pointer("/promptFeedback/blockReason")
        .or_else(|| value.pointer("/candidates/0/finishReason"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

pub(crate) fn extract_text(backend: &BackendId, value: &Value) -> Result<String, BackendError> {
    let text: String = candidate_parts(value)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        let reason = empty_reason(value).unwrap_or_else(|| "no candidates".to_string());
        return Err(BackendError::protocol(
            backend.clone(),
            format!("response contained no text ({reason})"),
        ));
    }
    Ok(text)
}

pub(crate) fn extract_inline_image(
    backend: &BackendId,
    value: &Value,
) -> Result<ImageOutput, BackendError> {
    let mut refusal = Vec::new();
    for part in candidate_parts(value) {
        if let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) {
            let mime = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
            let media = MediaRef::from_base64(mime, data).map_err(|e| {
                BackendError::protocol(backend.clone(), format!("invalid inline image: {e}"))
            })?;
            return Ok(ImageOutput::Media(media));
        }
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            refusal.push(text.trim().to_string());
        }
    }
    let reason = empty_reason(value).or_else(|| {
        let text = refusal.join(" ");
        (!text.trim().is_empty()).then_some(text)
    });
    Ok(ImageOutput::Empty { reason })
}

pub(crate) fn extract_imagen_prediction(
    backend: &BackendId,
    value: &Value,
) -> Result<ImageOutput, BackendError> {
    let predictions = value
        .get("predictions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for prediction in predictions {
        if let Some(data) = prediction.get("bytesBase64Encoded").and_then(Value::as_str) {
            let mime = prediction
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            let media = MediaRef::from_base64(mime, data).map_err(|e| {
                BackendError::protocol(backend.clone(), format!("invalid prediction image: {e}"))
            })?;
            return Ok(ImageOutput::Media(media));
        }
    }
    let reason = predictions
        .iter()
        .find_map(|p| p.get("raiFilteredReason").and_then(Value::as_str))
        .map(ToOwned::to_owned);
    Ok(ImageOutput::Empty { reason })
}

pub(crate) fn parse_operation(
    backend: &BackendId,
    value: &Value,
) -> Result<LongRunningOperation, BackendError> {
    let id = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| BackendError::protocol(backend.clone(), "operation response has no name"))?;
    let mut operation = LongRunningOperation::pending(id);
    operation.done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    operation.error = value.get("error").map(|error| OperationError {
        code: error.get("code").and_then(Value::as_i64),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("operation failed")
            .to_string(),
    });
    let samples = value.pointer("/response/generateVideoResponse");
    operation.output_ref = samples
        .and_then(|r| r.pointer("/generatedSamples/0/video/uri"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    if operation.done && operation.error.is_none() && operation.output_ref.is_none() {
        let filtered: Vec<&str> = samples
            .and_then(|r| r.get("raiMediaFilteredReasons"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();
        if !filtered.is_empty() {
            operation.error = Some(OperationError {
                code: None,
                message: filtered.join("; "),
            });
        }
    }
    Ok(operation)
}

/// Maps a non-success HTTP response to a typed error.
///
/// `FAILED_PRECONDITION` in the status or message marks the error transient.
pub(crate) fn map_error_response(backend: &BackendId, status: u16, body: &str) -> BackendError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| body.trim().to_string());
    let rpc_status = error
        .and_then(|e| e.get("status"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if rpc_status == PRECONDITION_SIGNAL || message.contains(PRECONDITION_SIGNAL) {
        return BackendError::precondition_failed(backend.clone(), message);
    }
    BackendError::provider(
        backend.clone(),
        format!("request failed with status {status}: {message}"),
        Some(status),
    )
}

/// Appends `key=<api_key>` to a download URI.
pub(crate) fn with_api_key(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}key={api_key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Role;

    fn gemini() -> BackendId {
        BackendId::new("gemini")
    }

    #[test]
    fn text_body_maps_roles_and_options() {
        let messages = vec![
            Message::text(Role::User, "hi"),
            Message::text(Role::Model, "hello"),
            Message::text(Role::User, "title?"),
        ];
        let config = TextConfig::default()
            .temperature(0.3)
            .system_instruction("be brief");
        let body = text_request_body(&messages, &config);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "title?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap_or_default();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn edit_body_has_inline_parts_modalities_and_safety() {
        let media = MediaRef::new("image/png", vec![1u8, 2, 3]).expect("media");
        let parts = vec![InputPart::Text("make it blue".into()), InputPart::Media(media)];
        let body = edit_request_body(&parts, &ImageConfig::default());
        let sent = &body["contents"][0]["parts"];
        assert_eq!(sent[0]["text"], "make it blue");
        assert_eq!(sent[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(sent[1]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["TEXT", "IMAGE"]));
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn video_body_carries_base_image_and_parameters() {
        let media = MediaRef::new("image/jpeg", vec![9u8]).expect("media");
        let body = video_request_body("make it move", Some(&media), &VideoConfig::default());
        assert_eq!(body["instances"][0]["prompt"], "make it move");
        assert_eq!(body["instances"][0]["image"]["mimeType"], "image/jpeg");
        assert_eq!(body["parameters"], json!({"durationSeconds": 5, "aspectRatio": "16:9"}));
    }

    #[test]
    fn extracts_text_and_reports_blocked_prompt() {
        let ok = json!({"candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]});
        assert_eq!(extract_text(&gemini(), &ok).expect("text"), "Hello");
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = extract_text(&gemini(), &blocked).expect_err("blocked");
        assert!(matches!(
            err,
            BackendError::Protocol { ref message, .. } if message.contains("SAFETY")
        ));
    }

    #[test]
    fn inline_image_or_empty_with_reason() {
        let ok = json!({"candidates": [{"content": {"parts": [
            {"text": "Here you go"},
            {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
        ]}}]});
        let out = extract_inline_image(&gemini(), &ok).expect("image");
        assert!(matches!(out, ImageOutput::Media(ref m) if m.data().to_vec() == vec![1u8, 2, 3]));

        let refused = json!({
            "candidates": [{"content": {"parts": [{"text": "I can't help with that."}]}}]
        });
        assert_eq!(
            extract_inline_image(&gemini(), &refused).expect("empty"),
            ImageOutput::Empty { reason: Some("I can't help with that.".into()) }
        );
    }

    #[test]
    fn imagen_prediction_and_filtered_result() {
        let ok = json!({"predictions": [{"bytesBase64Encoded": "AQID", "mimeType": "image/png"}]});
        assert!(matches!(
            extract_imagen_prediction(&gemini(), &ok).expect("image"),
            ImageOutput::Media(_)
        ));
        let filtered = json!({"predictions": [{"raiFilteredReason": "blocked by filter"}]});
        assert_eq!(
            extract_imagen_prediction(&gemini(), &filtered).expect("empty"),
            ImageOutput::Empty { reason: Some("blocked by filter".into()) }
        );
        assert_eq!(
            extract_imagen_prediction(&gemini(), &json!({})).expect("empty"),
            ImageOutput::Empty { reason: None }
        );
    }

    #[test]
    fn parses_operation_states() {
        let pending =
            parse_operation(&gemini(), &json!({"name": "models/veo/operations/1"})).expect("op");
        assert!(!pending.done);

        let done = parse_operation(
            &gemini(),
            &json!({
                "name": "models/veo/operations/1",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [
                    {"video": {"uri": "https://files.example/v1/files/abc:download?alt=media"}}
                ]}}
            }),
        )
        .expect("op");
        assert_eq!(
            done.output_ref.as_deref(),
            Some("https://files.example/v1/files/abc:download?alt=media")
        );

        let failed = parse_operation(
            &gemini(),
            &json!({"name": "op", "done": true, "error": {"code": 3, "message": "bad image"}}),
        )
        .expect("op");
        assert_eq!(
            failed.error,
            Some(OperationError {
                code: Some(3),
                message: "bad image".into()
            })
        );

        let filtered = parse_operation(
            &gemini(),
            &json!({"name": "op", "done": true, "response": {"generateVideoResponse": {
                "raiMediaFilteredReasons": ["celebrity likeness"]
            }}}),
        )
        .expect("op");
        assert_eq!(filtered.error.map(|e| e.message), Some("celebrity likeness".into()));

        assert!(parse_operation(&gemini(), &json!({"done": true})).is_err());
    }

    #[test]
    fn precondition_failures_are_transient() {
        let body = json!({"error": {
            "code": 400,
            "message": "User location is not supported",
            "status": "FAILED_PRECONDITION"
        }})
        .to_string();
        assert!(map_error_response(&gemini(), 400, &body).is_transient());
        let in_message = r#"{"error": {"code": 400, "message": "FAILED_PRECONDITION: retry"}}"#;
        assert!(map_error_response(&gemini(), 400, in_message).is_transient());

        let denied = json!({"error": {
            "message": "API key not valid",
            "status": "PERMISSION_DENIED"
        }});
        let fatal = map_error_response(&gemini(), 403, &denied.to_string());
        assert!(matches!(
            fatal,
            BackendError::Provider { status_code: Some(403), ref message, .. }
                if message.contains("API key not valid")
        ));
        assert!(matches!(
            map_error_response(&gemini(), 502, "Bad Gateway"),
            BackendError::Provider { .. }
        ));
    }

    #[test]
    fn api_key_is_appended_with_right_separator() {
        assert_eq!(with_api_key("https://x/f", "k"), "https://x/f?key=k");
        assert_eq!(with_api_key("https://x/f?alt=media", "k"), "https://x/f?alt=media&key=k");
    }
}
