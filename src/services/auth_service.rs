//! Caller identification from request headers.

use axum::http::HeaderMap;
use tracing::debug;

use crate::{dao::models::EventId, error::ServiceError, state::SharedState};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
pub const HOST_LOGIN_HEADER: &str = "x-host-login";
pub const HOST_PASSWORD_HEADER: &str = "x-host-password";
pub const EVENT_ID_HEADER: &str = "x-event-id";

/// Host acting on one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostContext {
    pub event_id: EventId,
    /// Allowed to manage QR codes.
    pub superhost: bool,
    /// An administrator acting as this event's host.
    pub impersonated: bool,
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Admin,
    Host(HostContext),
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identify the caller; `Unauthorized` when no credential matches.
pub async fn authenticate(state: &SharedState, headers: &HeaderMap) -> Result<Caller, ServiceError> {
    if let Some(token) = header(headers, ADMIN_TOKEN_HEADER) {
        return match state.config().admin_token.as_deref() {
            Some(expected) if expected == token => match header(headers, EVENT_ID_HEADER) {
                Some(raw) => {
                    let event_id: EventId = raw.parse().map_err(|_| {
                        ServiceError::InvalidInput(format!("invalid `X-Event-Id` header `{raw}`"))
                    })?;
                    if !state.event_exists(event_id) {
                        return Err(ServiceError::NotFound(format!(
                            "event {event_id} does not exist"
                        )));
                    }
                    debug!(event_id, "admin acting as host");
                    Ok(Caller::Host(HostContext {
                        event_id,
                        superhost: true,
                        impersonated: true,
                    }))
                }
                None => Ok(Caller::Admin),
            },
            _ => Err(ServiceError::Unauthorized("invalid admin token".into())),
        };
    }

    let (Some(login), Some(password)) = (
        header(headers, HOST_LOGIN_HEADER),
        header(headers, HOST_PASSWORD_HEADER),
    ) else {
        return Err(ServiceError::Unauthorized(
            "missing `X-Admin-Token` or `X-Host-Login`/`X-Host-Password` headers".into(),
        ));
    };

    for event_id in state.event_ids() {
        let matched = state
            .read_event(event_id, |event| {
                (event.record.login == login && event.record.password == password)
                    .then_some(event.record.superhost)
            })
            .await?;
        if let Some(superhost) = matched {
            return Ok(Caller::Host(HostContext {
                event_id,
                superhost,
                impersonated: false,
            }));
        }
    }
    Err(ServiceError::Unauthorized("invalid host credentials".into()))
}

/// Require an administrator.
pub async fn require_admin(state: &SharedState, headers: &HeaderMap) -> Result<(), ServiceError> {
    match authenticate(state, headers).await? {
        Caller::Admin => Ok(()),
        Caller::Host(_) => Err(ServiceError::Forbidden("administrator role required".into())),
    }
}

/// Require a host (or an impersonating administrator).
pub async fn require_host(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<HostContext, ServiceError> {
    match authenticate(state, headers).await? {
        Caller::Host(host) => Ok(host),
        Caller::Admin => Err(ServiceError::Forbidden(
            "host role required; send `X-Event-Id` to act as a host".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::state::tests::test_state;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[tokio::test]
    async fn host_credentials_resolve_their_event() {
        let (state, _) = test_state().await;
        let caller = authenticate(
            &state,
            &headers(&[(HOST_LOGIN_HEADER, "host1"), (HOST_PASSWORD_HEADER, "password1")]),
        )
        .await
        .unwrap();
        assert_eq!(
            caller,
            Caller::Host(HostContext {
                event_id: 1,
                superhost: false,
                impersonated: false
            })
        );
    }

    #[tokio::test]
    async fn admin_may_impersonate_a_host() {
        let (state, _) = test_state().await;
        let host = require_host(
            &state,
            &headers(&[(ADMIN_TOKEN_HEADER, "admin-secret"), (EVENT_ID_HEADER, "1")]),
        )
        .await
        .unwrap();
        assert!(host.impersonated && host.superhost);
    }

    #[tokio::test]
    async fn missing_or_wrong_credentials_are_rejected() {
        let (state, _) = test_state().await;
        assert!(matches!(
            authenticate(&state, &HeaderMap::new()).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&state, &headers(&[(ADMIN_TOKEN_HEADER, "nope")])).await,
            Err(ServiceError::Unauthorized(_))
        ));
        let host_on_admin = require_admin(
            &state,
            &headers(&[(HOST_LOGIN_HEADER, "host1"), (HOST_PASSWORD_HEADER, "password1")]),
        )
        .await;
        assert!(matches!(host_on_admin, Err(ServiceError::Forbidden(_))));
    }
}
