//! `IdentityResolver`: turns the `/user` endpoint's
//! `(username, password)` pair into a `Principal`, trying certificate,
//! API-token, then component-credential resolution in that order. Any
//! other case is a `ServiceError` the caller collapses to `deny`.

use crate::datasource::repository::AuthDataSource;
use crate::error::ServiceError;
use crate::identity::principal::Principal;
use crate::identity::token::TokenVerifier;

/// Verify a component secret against its stored one-way hash, trying
/// bcrypt first when the hash carries the `$2` bcrypt prefix and falling
/// back to Argon2 otherwise.
fn verify_secret_hybrid(stored_hash: &str, provided_secret: &str) -> bool {
    if stored_hash.starts_with("$2") {
        bcrypt::verify(provided_secret, stored_hash).unwrap_or(false)
    } else {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};
        PasswordHash::new(stored_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(provided_secret.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

pub struct IdentityResolver<'a> {
    data_source: &'a dyn AuthDataSource,
    token_verifier: &'a TokenVerifier,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(data_source: &'a dyn AuthDataSource, token_verifier: &'a TokenVerifier) -> Self {
        Self {
            data_source,
            token_verifier,
        }
    }

    /// Resolve `(login, password)` to a `Principal`. The three
    /// strategies are tried in order and the first applicable one
    /// decides the outcome; the resolver never reports which strategy
    /// was tried or why the others didn't apply.
    pub fn resolve(&self, login: &str, password: &str) -> Result<Principal, ServiceError> {
        if let Some((cn, org_id)) = split_cert_subject(login) {
            return self.resolve_certificate(cn, org_id);
        }

        if TokenVerifier::looks_like_token(password) {
            return self.resolve_token(login, password);
        }

        self.resolve_component(login, password)
    }

    fn resolve_certificate(&self, cn: &str, org_id: &str) -> Result<Principal, ServiceError> {
        let user = self
            .data_source
            .lookup_user(cn, org_id)
            .map_err(|err| ServiceError::data_source_unavailable(err.to_string()))?
            .ok_or_else(|| ServiceError::unknown_identity("no such user in organization"))?;

        Ok(Principal::User(user))
    }

    fn resolve_token(&self, login: &str, token: &str) -> Result<Principal, ServiceError> {
        let verified = self
            .token_verifier
            .verify(token)
            .map_err(|_| ServiceError::bad_credential("token verification failed"))?;

        if verified.login != login {
            return Err(ServiceError::bad_credential("token login does not match username"));
        }

        let user = self
            .data_source
            .lookup_user(&verified.login, &verified.org_id)
            .map_err(|err| ServiceError::data_source_unavailable(err.to_string()))?
            .ok_or_else(|| ServiceError::unknown_identity("token identity not found"))?;

        Ok(Principal::User(user))
    }

    fn resolve_component(&self, login: &str, secret: &str) -> Result<Principal, ServiceError> {
        let component = self
            .data_source
            .lookup_component(login)
            .map_err(|err| ServiceError::data_source_unavailable(err.to_string()))?
            .ok_or_else(|| ServiceError::unknown_identity("no such component"))?;

        if verify_secret_hybrid(&component.secret_hash, secret) {
            Ok(Principal::Component(component))
        } else {
            Err(ServiceError::bad_credential("component secret mismatch"))
        }
    }

    /// Re-derive the `Principal` behind a bare `username` field, with no
    /// credential to check. `/vhost`, `/resource`, and `/topic` only carry
    /// the username the broker already authenticated in an earlier
    /// `/user` call — there is no password or token to verify a second
    /// time, so this repeats only the identity-shape half of `resolve`:
    /// certificate-derived `"<cn>@<o>"` logins split and look up the
    /// user; anything else is looked up as a component login.
    pub fn resolve_known(&self, login: &str) -> Result<Principal, ServiceError> {
        if let Some((cn, org_id)) = split_cert_subject(login) {
            return self.resolve_certificate(cn, org_id);
        }

        let component = self
            .data_source
            .lookup_component(login)
            .map_err(|err| ServiceError::data_source_unavailable(err.to_string()))?
            .ok_or_else(|| ServiceError::unknown_identity("no such component"))?;

        Ok(Principal::Component(component))
    }
}

/// Recognize a client-certificate-derived login of the form `"<cn>@<o>"`.
/// A login with no `@`, or with an empty `cn`/`o`, is not
/// certificate-derived.
fn split_cert_subject(login: &str) -> Option<(&str, &str)> {
    let (cn, org_id) = login.split_once('@')?;
    if cn.is_empty() || org_id.is_empty() {
        return None;
    }
    Some((cn, org_id))
}
