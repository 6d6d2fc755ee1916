//! Conversions between connector errors, reqwest errors and the domain error.

use medcode_domain::MedCodeError;
use reqwest::Error as HttpError;

use super::ConnectorError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ConnectorError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for ConnectorError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();

        if err.is_timeout() {
            return ConnectorError::Timeout(message);
        }
        if err.is_builder() {
            return ConnectorError::Config(format!("invalid HTTP request: {message}"));
        }
        if err.is_decode() || err.is_body() {
            return ConnectorError::Decode(message);
        }
        if let Some(status) = err.status() {
            return ConnectorError::upstream(status.as_u16(), message);
        }

        ConnectorError::Transport(format!("HTTP request failed: {message}"))
    }
}

/* -------------------------------------------------------------------------- */
/* ConnectorError → MedCodeError */
/* -------------------------------------------------------------------------- */

impl From<ConnectorError> for MedCodeError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Auth(msg) => MedCodeError::Auth(msg),
            ConnectorError::Transport(msg) => MedCodeError::Network(msg),
            ConnectorError::Timeout(msg) => MedCodeError::Network(format!("timeout: {msg}")),
            ConnectorError::Upstream { status, body } => MedCodeError::Upstream { status, body },
            ConnectorError::Decode(msg) => MedCodeError::Serialization(msg),
            ConnectorError::Config(msg) => MedCodeError::Config(msg),
            ConnectorError::InvalidInput(msg) => MedCodeError::InvalidInput(msg),
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_status_and_body() {
        let err: MedCodeError = ConnectorError::upstream(502, "bad gateway").into();
        assert_eq!(err, MedCodeError::Upstream { status: 502, body: "bad gateway".into() });
    }

    #[test]
    fn transport_and_timeout_become_network_errors() {
        let err: MedCodeError = ConnectorError::Transport("refused".into()).into();
        assert!(matches!(err, MedCodeError::Network(_)));

        let err: MedCodeError = ConnectorError::Timeout("45s".into()).into();
        assert!(matches!(err, MedCodeError::Network(msg) if msg.contains("timeout")));
    }

    #[test]
    fn auth_stays_auth() {
        let err: MedCodeError = ConnectorError::Auth("401".into()).into();
        assert!(matches!(err, MedCodeError::Auth(_)));
    }
}
