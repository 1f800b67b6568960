use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::EmbedError;

/// Face-encoding service response.
#[derive(Debug, Deserialize)]
pub(crate) struct EncodeResponse {
    #[serde(default)]
    pub(crate) faces: Vec<FaceData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FaceData {
    pub(crate) embedding: Vec<f64>,
    /// `[top, right, bottom, left]` in pixels.
    #[serde(default)]
    pub(crate) location: Option<[i64; 4]>,
}

/// Upload one image to `{base_url}/encode` and decode the face list.
pub(crate) async fn call_encode_api(
    client: &Client,
    api_key: &str,
    base_url: &str,
    model: &str,
    image: &[u8],
) -> Result<EncodeResponse, EmbedError> {
    let url = format!("{base_url}/encode");

    let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name("image");
    let mut form = reqwest::multipart::Form::new().part("file", part);
    if !model.is_empty() {
        form = form.text("model", model.to_string());
    }

    let mut req = client.post(&url).multipart(form);
    if !api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {api_key}"));
    }

    let resp = req
        .send()
        .await
        .map_err(|e| EmbedError::Api(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(status_error(status, body));
    }

    resp.json()
        .await
        .map_err(|e| EmbedError::Api(e.to_string()))
}

/// Map a non-2xx encoder response to an error.
/// Client-side rejections mean the image itself was unusable.
pub(crate) fn status_error(status: StatusCode, body: String) -> EmbedError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => EmbedError::InvalidImage(body),
        _ => EmbedError::Api(format!("HTTP {status}: {body}")),
    }
}

/// Pick the first reported face and check its dimension.
pub(crate) fn first_face(resp: EncodeResponse, dim: usize) -> Result<Vec<f32>, EmbedError> {
    let face = resp
        .faces
        .into_iter()
        .next()
        .ok_or(EmbedError::NoFaceDetected)?;

    if face.embedding.len() != dim {
        return Err(EmbedError::DimensionMismatch {
            expected: dim,
            got: face.embedding.len(),
        });
    }

    // float64 -> f32 conversion.
    Ok(face.embedding.iter().map(|&v| v as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> EncodeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn first_face_wins() {
        let resp = parse(
            r#"{"faces":[
                {"embedding":[0.1,0.2,0.3],"location":[10,50,60,5]},
                {"embedding":[0.9,0.8,0.7]}
            ]}"#,
        );
        assert_eq!(resp.faces[0].location, Some([10, 50, 60, 5]));
        let emb = first_face(resp, 3).unwrap();
        assert_eq!(emb, vec![0.1f32, 0.2, 0.3]);
    }

    #[test]
    fn empty_faces_is_no_face() {
        let resp = parse(r#"{"faces":[]}"#);
        assert!(matches!(first_face(resp, 3), Err(EmbedError::NoFaceDetected)));

        let resp = parse("{}");
        assert!(matches!(first_face(resp, 3), Err(EmbedError::NoFaceDetected)));
    }

    #[test]
    fn wrong_dimension_rejected() {
        let resp = parse(r#"{"faces":[{"embedding":[0.1,0.2]}]}"#);
        match first_face(resp, 128) {
            Err(EmbedError::DimensionMismatch { expected, got }) => {
                assert_eq!(expected, 128);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn client_errors_mean_invalid_image() {
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "cannot decode".into()),
            EmbedError::InvalidImage(msg) if msg == "cannot decode"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, String::new()),
            EmbedError::InvalidImage(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream".into()),
            EmbedError::Api(msg) if msg.contains("502")
        ));
    }
}
