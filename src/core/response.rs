//! Parsing of the model's free-text reply.
//!
//! The model is asked for plain text and answers with prose around a fenced
//! block labelled `json`. Everything here is pure so it can be tested without
//! a network round trip.

use crate::domain::model::{BoundingBox, Detection};
use crate::utils::error::{ExtractError, Result};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Text between the first "```json" marker and the next "```"
///
/// An unterminated block runs to the end of the text.
pub fn fenced_json(text: &str) -> Result<&str> {
    let start = text
        .find(JSON_FENCE)
        .map(|index| index + JSON_FENCE.len())
        .ok_or_else(ExtractError::no_json_block)?;

    let rest = &text[start..];
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Ok(&rest[..end])
}

pub fn parse_detections(payload: &str) -> Result<Vec<Detection>> {
    Ok(serde_json::from_str(payload)?)
}

/// Convert a model reply into normalized boxes, keeping the model's order
pub fn parse_response(text: &str) -> Result<Vec<BoundingBox>> {
    if text.is_empty() {
        tracing::warn!("No response from model");
        return Ok(Vec::new());
    }

    let payload = fenced_json(text)?;
    let detections = parse_detections(payload)?;
    tracing::debug!("Parsed {} detections", detections.len());

    Ok(detections.iter().map(Detection::to_bounding_box).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_parse_response_example() {
        let text = "Here you go:\n```json\n[{\"box_2d\":[100,200,300,400],\"label\":\"tissue\"}]\n```\nDone.";

        let boxes = parse_response(text).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_close(boxes[0].x, 0.2);
        assert_close(boxes[0].y, 0.1);
        assert_close(boxes[0].width, 0.2);
        assert_close(boxes[0].height, 0.2);
        assert_eq!(boxes[0].label, "tissue");
    }

    #[test]
    fn test_empty_response_is_empty_list() {
        assert!(parse_response("").unwrap().is_empty());
    }

    #[test]
    fn test_missing_fence_is_format_error() {
        let err = parse_response("[{\"box_2d\":[1,2,3,4],\"label\":\"text\"}]").unwrap_err();
        assert!(matches!(err, ExtractError::ResponseFormatError { .. }));

        let err = parse_response("```\n[]\n```").unwrap_err();
        assert!(matches!(err, ExtractError::ResponseFormatError { .. }));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = parse_response("```json\n[{\"box_2d\": [1, 2, 3,\n```").unwrap_err();
        assert!(matches!(err, ExtractError::SerializationError(_)));
    }

    #[test]
    fn test_missing_field_is_serialization_error() {
        let err = parse_response("```json\n[{\"box_2d\": [1, 2, 3, 4]}]\n```").unwrap_err();
        assert!(matches!(err, ExtractError::SerializationError(_)));
    }

    #[test]
    fn test_fenced_json_takes_first_block() {
        let text = "```json\n[1]\n```\ntext\n```json\n[2]\n```";
        assert_eq!(fenced_json(text).unwrap(), "\n[1]\n");
    }

    #[test]
    fn test_fenced_json_unterminated_block() {
        assert_eq!(fenced_json("```json\n[]").unwrap(), "\n[]");
    }

    #[test]
    fn test_order_preserved_without_truncation() {
        let entries: Vec<String> = (0..25)
            .map(|i| {
                let end = i + 10;
                format!("{{\"box_2d\":[{i},{i},{end},{end}],\"label\":\"item{i}\"}}")
            })
            .collect();
        let text = format!("```json\n[{}]\n```", entries.join(","));

        let boxes = parse_response(&text).unwrap();
        assert_eq!(boxes.len(), 25);
        for (i, bbox) in boxes.iter().enumerate() {
            assert_eq!(bbox.label, format!("item{}", i));
        }
    }
}
