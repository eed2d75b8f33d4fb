//! Parses server messages into a sequence of typed [`TranscribeAction`]s.
//!
//! Pure and synchronous: no I/O, no async. Unknown action types and unknown
//! annotation kinds are fatal (§4.5) rather than silently dropped, since a
//! silently-dropped action would desync the local document from the
//! server's view of it.

use crate::domain::models::{Annotation, AnnotationKind, IntentStatus, TranscribeAction};
use crate::error::DecodeError;
use serde::Deserialize;
use serde_json::Value;

pub struct MessageDecoder;

#[derive(Deserialize)]
struct WireMessage {
    actions: Vec<WireAction>,
}

#[derive(Deserialize)]
struct WireAction {
    id: String,
    index: u64,
    #[serde(rename = "type")]
    action_type: String,
    parameters: Value,
}

impl MessageDecoder {
    /// Decodes a complete server message. Order of `actions` in the message
    /// is preserved in the returned sequence.
    pub fn decode(text: &str) -> Result<Vec<TranscribeAction>, DecodeError> {
        let message: WireMessage = serde_json::from_str(text)?;
        message
            .actions
            .into_iter()
            .map(Self::decode_action)
            .collect()
    }

    fn decode_action(action: WireAction) -> Result<TranscribeAction, DecodeError> {
        let WireAction {
            id,
            index,
            action_type,
            parameters,
        } = action;

        match action_type.as_str() {
            "replace_text" => {
                let start = field_usize(&parameters, &action_type, "start")?;
                let end = field_usize(&parameters, &action_type, "end")?;
                let text = field_str(&parameters, &action_type, "text")?;
                Ok(TranscribeAction::ReplaceText {
                    id,
                    index,
                    start,
                    end,
                    text,
                })
            }
            "add_annotation" => Ok(TranscribeAction::AddAnnotation {
                id,
                index,
                annotation: Self::decode_annotation(&parameters)?,
            }),
            "update_annotation" => Ok(TranscribeAction::UpdateAnnotation {
                id,
                index,
                annotation: Self::decode_annotation(&parameters)?,
            }),
            "remove_annotation" => {
                let annotation_id = field_str(&parameters, &action_type, "annotation_id")?;
                Ok(TranscribeAction::RemoveAnnotation {
                    id,
                    index,
                    annotation_id,
                })
            }
            other => Err(DecodeError::UnknownActionType(other.to_string())),
        }
    }

    fn decode_annotation(parameters: &Value) -> Result<Annotation, DecodeError> {
        let id = field_str(parameters, "annotation", "id")?;
        let start = field_usize(parameters, "annotation", "start")?;
        let end = field_usize(parameters, "annotation", "end")?;
        let kind = field_str(parameters, "annotation", "kind")?;

        let kind = match kind.as_str() {
            "TranscriptionTentative" => AnnotationKind::TranscriptionTentative,
            "Intent" => {
                let status = field_str(parameters, "annotation.Intent", "status")?;
                let status = match status.as_str() {
                    "Pending" => IntentStatus::Pending,
                    "Recognized" => IntentStatus::Recognized,
                    other => {
                        return Err(DecodeError::UnknownAnnotationKind(format!(
                            "Intent.status={other}"
                        )))
                    }
                };
                AnnotationKind::Intent { status }
            }
            "Entity" => {
                let entity_type = field_str(parameters, "annotation.Entity", "entity_type")?;
                let text = field_str(parameters, "annotation.Entity", "text")?;
                AnnotationKind::Entity { entity_type, text }
            }
            other => return Err(DecodeError::UnknownAnnotationKind(other.to_string())),
        };

        Ok(Annotation {
            id,
            start,
            end,
            kind,
        })
    }
}

fn field_str(value: &Value, path: &str, key: &str) -> Result<String, DecodeError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DecodeError::MissingField(format!("{path}.{key}")))
}

fn field_usize(value: &Value, path: &str, key: &str) -> Result<usize, DecodeError> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| DecodeError::MissingField(format!("{path}.{key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_replace_text() {
        let text = r#"{"actions":[{"id":"0","index":0,"type":"replace_text","parameters":{"start":0,"end":0,"text":"Attendi"}}]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(
            actions,
            vec![TranscribeAction::ReplaceText {
                id: "0".into(),
                index: 0,
                start: 0,
                end: 0,
                text: "Attendi".into(),
            }]
        );
    }

    #[test]
    fn decodes_add_annotation_tentative() {
        let text = r#"{"actions":[{"id":"a1","index":1,"type":"add_annotation","parameters":{"id":"1A","start":0,"end":0,"kind":"TranscriptionTentative"}}]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(
            actions,
            vec![TranscribeAction::AddAnnotation {
                id: "a1".into(),
                index: 1,
                annotation: Annotation {
                    id: "1A".into(),
                    start: 0,
                    end: 0,
                    kind: AnnotationKind::TranscriptionTentative,
                },
            }]
        );
    }

    #[test]
    fn decodes_add_annotation_intent() {
        let text = r#"{"actions":[{"id":"a5","index":5,"type":"add_annotation","parameters":{"id":"5A","start":1,"end":5,"kind":"Intent","status":"Pending"}}]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(
            actions,
            vec![TranscribeAction::AddAnnotation {
                id: "a5".into(),
                index: 5,
                annotation: Annotation {
                    id: "5A".into(),
                    start: 1,
                    end: 5,
                    kind: AnnotationKind::Intent {
                        status: IntentStatus::Pending,
                    },
                },
            }]
        );
    }

    #[test]
    fn decodes_add_annotation_entity() {
        let text = r#"{"actions":[{"id":"a2","index":2,"type":"add_annotation","parameters":{"id":"2A","start":0,"end":4,"kind":"Entity","entity_type":"Name","text":"Jan"}}]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(
            actions,
            vec![TranscribeAction::AddAnnotation {
                id: "a2".into(),
                index: 2,
                annotation: Annotation {
                    id: "2A".into(),
                    start: 0,
                    end: 4,
                    kind: AnnotationKind::Entity {
                        entity_type: "Name".into(),
                        text: "Jan".into(),
                    },
                },
            }]
        );
    }

    #[test]
    fn decodes_remove_annotation() {
        let text = r#"{"actions":[{"id":"r3","index":4,"type":"remove_annotation","parameters":{"annotation_id":"3A"}}]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(
            actions,
            vec![TranscribeAction::RemoveAnnotation {
                id: "r3".into(),
                index: 4,
                annotation_id: "3A".into(),
            }]
        );
    }

    #[test]
    fn preserves_action_order_within_a_message() {
        let text = r#"{"actions":[
            {"id":"0","index":0,"type":"replace_text","parameters":{"start":0,"end":0,"text":"Attendi"}},
            {"id":"r","index":1,"type":"remove_annotation","parameters":{"annotation_id":"x"}}
        ]}"#;
        let actions = MessageDecoder::decode(text).unwrap();
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], TranscribeAction::ReplaceText { .. }));
        assert!(matches!(actions[1], TranscribeAction::RemoveAnnotation { .. }));
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let text = r#"{"actions":[{"id":"0","index":0,"type":"replace_text","parameters":{"start":0,"text":"x"}}]}"#;
        let result = MessageDecoder::decode(text);
        assert!(matches!(result, Err(DecodeError::MissingField(ref f)) if f.ends_with(".end")));
    }

    #[test]
    fn unknown_action_type_is_fatal() {
        let text = r#"{"actions":[{"id":"0","index":0,"type":"reticulate_splines","parameters":{}}]}"#;
        let result = MessageDecoder::decode(text);
        assert!(matches!(result, Err(DecodeError::UnknownActionType(ref t)) if t == "reticulate_splines"));
    }

    #[test]
    fn unknown_annotation_kind_is_fatal() {
        let text = r#"{"actions":[{"id":"a1","index":1,"type":"add_annotation","parameters":{"id":"1A","start":0,"end":0,"kind":"Sentiment"}}]}"#;
        let result = MessageDecoder::decode(text);
        assert!(matches!(result, Err(DecodeError::UnknownAnnotationKind(ref k)) if k == "Sentiment"));
    }

    #[test]
    fn invalid_json_is_fatal() {
        let result = MessageDecoder::decode("{not json");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn empty_actions_array_decodes_to_empty_sequence() {
        let actions = MessageDecoder::decode(r#"{"actions":[]}"#).unwrap();
        assert!(actions.is_empty());
    }
}
