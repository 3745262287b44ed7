use chrono::Utc;
use hmac::{Hmac, Mac};
use rocket::data::{self, Data, FromData, ToByteUnit};
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::Request;
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v0";
const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
const SIGNATURE_HEADER: &str = "X-Slack-Signature";

/// Requests older (or newer) than this are treated as replays.
pub const MAX_AGE_SECS: i64 = 60 * 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("request timestamp is too old")]
    Stale,
    #[error("malformed timestamp or signature")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
    #[error("could not read request body: {0}")]
    Body(String),
    #[error("no signing secret configured")]
    Unconfigured,
}

/// Managed state holding the app's signing secret.
pub struct SigningSecret(pub String);

/// Checks a Slack request signature (`v0=<hex hmac-sha256>`) over
/// `v0:{timestamp}:{body}`.
pub fn verify(
    secret: &str,
    timestamp: &str,
    signature: &str,
    body: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let sent_at: i64 = timestamp.trim().parse().map_err(|_| SignatureError::Malformed)?;
    if now.abs_diff(sent_at) > MAX_AGE_SECS as u64 {
        return Err(SignatureError::Stale);
    }

    let digest = signature
        .strip_prefix("v0=")
        .and_then(decode_hex)
        .ok_or(SignatureError::Malformed)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(format!("{}:{}:", VERSION, timestamp).as_bytes());
    mac.update(body.as_bytes());
    mac.verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// A request body that carried a valid Slack signature.
pub struct SlackRequest(pub String);

#[rocket::async_trait]
impl<'r> FromData<'r> for SlackRequest {
    type Error = SignatureError;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let secret = match req.rocket().state::<SigningSecret>() {
            Some(secret) => secret,
            None => return Outcome::Error((Status::InternalServerError, SignatureError::Unconfigured)),
        };

        let body = match data.open(64.kibibytes()).into_string().await {
            Ok(body) if body.is_complete() => body.into_inner(),
            Ok(_) => {
                return Outcome::Error((
                    Status::PayloadTooLarge,
                    SignatureError::Body("payload too large".to_string()),
                ))
            }
            Err(e) => return Outcome::Error((Status::BadRequest, SignatureError::Body(e.to_string()))),
        };

        let headers = req.headers();
        let result = match (headers.get_one(TIMESTAMP_HEADER), headers.get_one(SIGNATURE_HEADER)) {
            (Some(timestamp), Some(signature)) => {
                verify(&secret.0, timestamp, signature, &body, Utc::now().timestamp())
            }
            (None, _) => Err(SignatureError::MissingHeader(TIMESTAMP_HEADER)),
            (_, None) => Err(SignatureError::MissingHeader(SIGNATURE_HEADER)),
        };

        match result {
            Ok(()) => Outcome::Success(SlackRequest(body)),
            Err(e) => {
                warn!(uri = %req.uri(), error = %e, "rejected unsigned slack request");
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}
