use serde::Deserialize;

use crate::errors::HookscanError;
use crate::models::ScanRequest;

/// What the validator decided to do with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition {
    /// A push we should scan.
    Scan(ScanRequest),
    /// An event type we acknowledge but do not scan (ping etc).
    Ignored { event: String },
}

/// The subset of the provider's push payload we consume.
#[derive(Debug, Deserialize)]
struct PushEvent {
    repository: Option<Repository>,
    /// Commit SHA after the push.
    after: Option<String>,
    /// Full ref name, e.g. "refs/heads/main".
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: Option<String>,
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: Option<String>,
    /// Present instead of `login` on some payload shapes.
    name: Option<String>,
}

/// Parse an authenticated delivery into a pipeline request. Signature
/// verification has already happened; nothing here performs I/O.
pub fn parse_event(
    event: Option<&str>,
    delivery_id: Option<&str>,
    body: &[u8],
) -> Result<EventDisposition, HookscanError> {
    let event = event
        .ok_or_else(|| HookscanError::MalformedPayload("missing event type header".into()))?;

    if event != "push" {
        return Ok(EventDisposition::Ignored {
            event: event.to_string(),
        });
    }

    let delivery_id = delivery_id
        .filter(|d| !d.is_empty())
        .ok_or_else(|| HookscanError::MalformedPayload("missing delivery id header".into()))?;

    let payload: PushEvent = serde_json::from_slice(body)
        .map_err(|e| HookscanError::MalformedPayload(format!("invalid JSON body: {}", e)))?;

    let repository = payload
        .repository
        .ok_or_else(|| HookscanError::MalformedPayload("missing repository object".into()))?;
    let repo = repository
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| HookscanError::MalformedPayload("missing repository name".into()))?;
    let owner = repository
        .owner
        .and_then(|o| o.login.or(o.name))
        .filter(|o| !o.is_empty())
        .ok_or_else(|| HookscanError::MalformedPayload("missing repository owner".into()))?;

    let reference = resolve_reference(payload.after.as_deref(), payload.git_ref.as_deref())
        .ok_or_else(|| HookscanError::MalformedPayload("missing commit reference".into()))?;

    validate_identifier("owner", &owner, false)?;
    validate_identifier("repository", &repo, false)?;
    validate_identifier("reference", &reference, true)?;

    Ok(EventDisposition::Scan(ScanRequest {
        owner,
        repo,
        reference,
        delivery_id: delivery_id.to_string(),
    }))
}

/// Prefer the pushed commit SHA; fall back to the branch name. An all-zero
/// `after` means the ref was deleted and carries no tree to scan.
fn resolve_reference(after: Option<&str>, git_ref: Option<&str>) -> Option<String> {
    match after {
        Some(sha) if !sha.is_empty() && !sha.chars().all(|c| c == '0') => {
            return Some(sha.to_string());
        }
        _ => {}
    }
    git_ref
        .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
        .filter(|r| !r.is_empty())
}

/// Request-derived strings end up in provider URLs and filesystem paths, so
/// they are held to a strict allowlist. Rejects traversal sequences outright.
fn validate_identifier(
    field: &'static str,
    value: &str,
    allow_slash: bool,
) -> Result<(), HookscanError> {
    if value.len() > 256 {
        return Err(HookscanError::MalformedPayload(format!("{} is too long", field)));
    }
    if value.starts_with('-') || value.starts_with('.') {
        return Err(HookscanError::MalformedPayload(format!(
            "{} has a forbidden leading character",
            field
        )));
    }
    if value.contains("..") {
        return Err(HookscanError::MalformedPayload(format!(
            "{} contains a traversal sequence",
            field
        )));
    }
    let ok = value.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || (allow_slash && c == '/')
    });
    if !ok {
        return Err(HookscanError::MalformedPayload(format!(
            "{} contains forbidden characters",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_body(owner: &str, repo: &str, after: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "ref": "refs/heads/main",
            "after": after,
            "repository": {
                "name": repo,
                "owner": { "login": owner }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_push_event_parses() {
        let body = push_body("acme", "widget", "abc123");
        let disposition = parse_event(Some("push"), Some("d-1"), &body).unwrap();
        match disposition {
            EventDisposition::Scan(req) => {
                assert_eq!(req.owner, "acme");
                assert_eq!(req.repo, "widget");
                assert_eq!(req.reference, "abc123");
                assert_eq!(req.delivery_id, "d-1");
            }
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_event_is_ignored_not_error() {
        let disposition = parse_event(Some("ping"), Some("d-1"), b"{}").unwrap();
        assert_eq!(
            disposition,
            EventDisposition::Ignored { event: "ping".into() }
        );
    }

    #[test]
    fn test_missing_owner_is_malformed() {
        let body = serde_json::to_vec(&serde_json::json!({
            "after": "abc123",
            "repository": { "name": "widget" }
        }))
        .unwrap();
        let err = parse_event(Some("push"), Some("d-1"), &body).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn test_missing_delivery_id_is_malformed() {
        let body = push_body("acme", "widget", "abc123");
        let err = parse_event(Some("push"), None, &body).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_event(Some("push"), Some("d-1"), b"not json").unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn test_deleted_branch_falls_back_to_ref_name() {
        let body = push_body("acme", "widget", "0000000000000000000000000000000000000000");
        match parse_event(Some("push"), Some("d-1"), &body).unwrap() {
            EventDisposition::Scan(req) => assert_eq!(req.reference, "main"),
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_owner_with_traversal_rejected() {
        let body = push_body("../../etc", "widget", "abc123");
        let err = parse_event(Some("push"), Some("d-1"), &body).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn test_owner_with_shell_metacharacters_rejected() {
        let body = push_body("acme; rm -rf /", "widget", "abc123");
        let err = parse_event(Some("push"), Some("d-1"), &body).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn test_reference_may_contain_slash() {
        let body = serde_json::to_vec(&serde_json::json!({
            "ref": "refs/heads/feature/login",
            "repository": { "name": "widget", "owner": { "login": "acme" } }
        }))
        .unwrap();
        match parse_event(Some("push"), Some("d-1"), &body).unwrap() {
            EventDisposition::Scan(req) => assert_eq!(req.reference, "feature/login"),
            other => panic!("expected scan, got {:?}", other),
        }
    }
}
