//! Device identity used to name backup artifacts.

use super::DeviceSession;
use crate::groups::{IdentityPolicy, UPTIME_COMMAND};
use crate::utils::SessionError;

const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Discover the identity of the device behind `session`.
pub fn resolve_identity<S>(session: &mut S, policy: IdentityPolicy) -> Result<String, SessionError>
where
    S: DeviceSession + ?Sized,
{
    let raw = match policy {
        IdentityPolicy::UptimeToken => {
            let output = session.send(UPTIME_COMMAND)?;
            output.split_whitespace().next().unwrap_or_default().to_string()
        }
        IdentityPolicy::PromptStrip => strip_privilege_marker(&session.prompt()?).to_string(),
    };

    let identity = sanitize_identity(&raw);
    if identity.is_empty() {
        return Err(SessionError::Protocol(format!(
            "could not derive a hostname from {:?}",
            raw
        )));
    }
    Ok(identity)
}

/// Drop one trailing `#` or `>` from a prompt.
pub fn strip_privilege_marker(prompt: &str) -> &str {
    let prompt = prompt.trim();
    prompt
        .strip_suffix('#')
        .or_else(|| prompt.strip_suffix('>'))
        .unwrap_or(prompt)
}

/// Make a hostname usable as a single file name component.
pub fn sanitize_identity(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_control() || c.is_whitespace() || UNSAFE_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    replaced.trim_matches(|c| c == '.' || c == '_').to_string()
}
