//! Service-wide error type.
//!
//! The broker never sees anything but `allow`/`deny` — every error kind
//! here collapses to the literal string `"deny"` at the HTTP boundary
//! (see `api::broker_controller`). What differs per kind is the log
//! level and the structured context attached for operators, not the
//! response body.

use derive_more::{Display, Error};
use log::Level;
use serde::Serialize;
use serde_json::to_string as to_json_string;
use std::collections::BTreeMap;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Literal body the broker's HTTP auth backend plugin expects on any failure.
pub const DENY_BODY: &str = "deny";

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ErrorEnvelope {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

/// The five error kinds the pipeline can produce. All of them are
/// handled identically by the HTTP layer; the variant only decides the
/// log level and the operator-facing message.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "{message}")]
    MalformedRequest {
        message: String,
        #[error(ignore)]
        context: ErrorContext,
    },
    #[display(fmt = "{message}")]
    UnknownIdentity {
        message: String,
        #[error(ignore)]
        context: ErrorContext,
    },
    #[display(fmt = "{message}")]
    BadCredential {
        message: String,
        #[error(ignore)]
        context: ErrorContext,
    },
    #[display(fmt = "{message}")]
    DataSourceUnavailable {
        message: String,
        #[error(ignore)]
        context: ErrorContext,
    },
    #[display(fmt = "{message}")]
    PolicyDeny {
        message: String,
        #[error(ignore)]
        context: ErrorContext,
    },
}

impl ServiceError {
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn unknown_identity(message: impl Into<String>) -> Self {
        Self::UnknownIdentity {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn bad_credential(message: impl Into<String>) -> Self {
        Self::BadCredential {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn data_source_unavailable(message: impl Into<String>) -> Self {
        Self::DataSourceUnavailable {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn policy_deny(message: impl Into<String>) -> Self {
        Self::PolicyDeny {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_context(mut self, updater: impl FnOnce(ErrorContext) -> ErrorContext) -> Self {
        match &mut self {
            Self::MalformedRequest { context, .. }
            | Self::UnknownIdentity { context, .. }
            | Self::BadCredential { context, .. }
            | Self::DataSourceUnavailable { context, .. }
            | Self::PolicyDeny { context, .. } => {
                let current = std::mem::take(context);
                *context = updater(current);
            }
        }
        self
    }

    pub fn with_correlation_id(self, id: impl Into<String>) -> Self {
        self.with_context(|ctx| ctx.with_correlation_id(id))
    }

    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        self.with_context(|ctx| ctx.with_detail(detail))
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::MalformedRequest { context, .. }
            | Self::UnknownIdentity { context, .. }
            | Self::BadCredential { context, .. }
            | Self::DataSourceUnavailable { context, .. }
            | Self::PolicyDeny { context, .. } => context,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest { .. } => "malformed_request",
            Self::UnknownIdentity { .. } => "unknown_identity",
            Self::BadCredential { .. } => "bad_credential",
            Self::DataSourceUnavailable { .. } => "data_source_unavailable",
            Self::PolicyDeny { .. } => "policy_deny",
        }
    }

    /// Log level: bad_credential/policy_deny at info, data_source_unavailable
    /// at error, malformed_request at warning,
    /// unknown_identity treated like bad_credential (it is the other
    /// half of the same "authentication failed" outcome the resolver
    /// deliberately does not distinguish for callers).
    fn default_log_level(&self) -> Level {
        match self {
            Self::DataSourceUnavailable { .. } => Level::Error,
            Self::MalformedRequest { .. } => Level::Warn,
            Self::UnknownIdentity { .. } | Self::BadCredential { .. } | Self::PolicyDeny { .. } => {
                Level::Info
            }
        }
    }

    /// Log the error at its default level as a single structured JSON
    /// line, then return the broker-visible body. The response body
    /// never carries `kind`, `detail`, or `correlation_id` — only this
    /// log line does.
    pub fn log_and_deny(&self) -> &'static str {
        let level = self.default_log_level();
        let context = self.context();
        let envelope = ErrorEnvelope {
            kind: self.kind(),
            message: self.to_string(),
            detail: context.detail.clone(),
            correlation_id: context.correlation_id.clone(),
            metadata: context.metadata.clone(),
        };
        let payload = to_json_string(&envelope).unwrap_or_else(|_| envelope.message.clone());
        match level {
            Level::Error => log::error!(target: "service_error", "{}", payload),
            Level::Warn => log::warn!(target: "service_error", "{}", payload),
            Level::Info => log::info!(target: "service_error", "{}", payload),
            Level::Debug | Level::Trace => log::debug!(target: "service_error", "{}", payload),
        }
        DENY_BODY
    }
}
