use serde::{Deserialize, Deserializer, Serialize};

/// Identity and display metadata for one piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub service: String,
}

/// Wire wrapper returned by every read endpoint: `{ "success": .., "response": .. }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(deserialize_with = "success_flag")]
    pub success: bool,
    pub response: T,
}

// The backend writes a JSON bool; older deployments wrote the flag as a string.
fn success_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag { Bool(bool), Text(String) }

    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

/// Pull the human readable message out of an error body, if it is an envelope.
pub(crate) fn envelope_message(body: &[u8]) -> Option<String> {
    let env: Envelope<serde_json::Value> = serde_json::from_slice(body).ok()?;
    response_message(&env.response)
}

/// Failure envelopes carry a plain string; anything else is rendered as JSON.
pub(crate) fn response_message(response: &serde_json::Value) -> Option<String> {
    match response {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
