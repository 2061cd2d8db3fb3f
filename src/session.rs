//! Session builder (C5): password and policy session construction/teardown.
//!
//! Modeled as the sum type the spec's design notes call for (§9): a password
//! session is nothing but an authorization value that gets attached to a
//! target handle via `tr_set_auth` at the point of use, while a policy
//! session is a real TPM-allocated handle that must be explicitly flushed.
//! `destroy` is total over the enum, so callers never need to special-case
//! "does this session need releasing".

use tss_esapi::constants::SessionType;
use tss_esapi::handles::{ObjectHandle, SessionHandle};
use tss_esapi::interface_types::algorithm::HashingAlgorithm;
use tss_esapi::interface_types::session_handles::{AuthSession, PolicySession};
use tss_esapi::structures::{Auth, Nonce, SymmetricDefinition};
use tss_esapi::Context;

use crate::algorithm::HashAlg;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Used only to compute the digest that will be stored in an object's
    /// `authPolicy`; cannot authorize a real command.
    Trial,
    /// Used at unseal time to actually satisfy an object's policy.
    Real,
}

/// A logical session handle (§3 "Session descriptor").
pub enum Session {
    /// Carries the authorization bytes inline; applied with `tr_set_auth`,
    /// never round-trips through `StartAuthSession`.
    Password(Auth),
    /// A TPM-allocated policy session that must be released on every exit
    /// path via [`Session::destroy`].
    Policy {
        esapi: AuthSession,
        algorithm: HashAlg,
    },
}

impl Session {
    /// Builds a password session carrying `secret` (possibly empty).
    pub fn new_password(secret: &[u8]) -> Result<Session> {
        let auth = Auth::try_from(secret.to_vec()).map_err(|e| Error::tpm("Auth", e))?;
        Ok(Session::Password(auth))
    }

    /// The raw authorization value, for callers that need it directly (for
    /// example as the `userAuth` sensitive value of a freshly created
    /// object rather than as a command session).
    pub fn password_auth(&self) -> Option<Auth> {
        match self {
            Session::Password(auth) => Some(auth.clone()),
            Session::Policy { .. } => None,
        }
    }

    /// Calls `StartAuthSession` with null salt, null symmetric, and a
    /// caller-side nonce of length `digest_size(algorithm)` filled with
    /// zeros (§4.5).
    pub fn new_policy(ctx: &mut Context, kind: PolicyKind, algorithm: HashAlg) -> Result<Session> {
        let digest_size = algorithm.digest_size()? as usize;
        let nonce = Nonce::try_from(vec![0u8; digest_size]).map_err(|e| Error::tpm("Nonce", e))?;
        let hash_alg: HashingAlgorithm = algorithm.to_hashing_algorithm()?;
        let session_type = match kind {
            PolicyKind::Trial => SessionType::Trial,
            PolicyKind::Real => SessionType::Policy,
        };

        let esapi = ctx
            .start_auth_session(
                None,
                None,
                Some(nonce),
                session_type,
                SymmetricDefinition::Null,
                hash_alg,
            )
            .map_err(|e| Error::tpm("StartAuthSession", e))?
            .expect("StartAuthSession returns a session for Trial/Policy session types");

        Ok(Session::Policy { esapi, algorithm })
    }

    /// The underlying `PolicySession` handle, usable with `PolicyPCR`,
    /// `PolicyPassword`, and `PolicyGetDigest` regardless of whether this is
    /// a trial or a real session.
    pub fn policy_session(&self) -> Option<PolicySession> {
        match self {
            Session::Policy {
                esapi: AuthSession::PolicySession(p),
                ..
            } => Some(*p),
            Session::Policy {
                esapi: AuthSession::TrialSession(t),
                ..
            } => Some(PolicySession::from(*t)),
            _ => None,
        }
    }

    pub fn algorithm(&self) -> Option<HashAlg> {
        match self {
            Session::Policy { algorithm, .. } => Some(*algorithm),
            Session::Password(_) => None,
        }
    }

    /// The session value to hand `Context::execute_with_session`. Password
    /// authorization itself is not carried here — it travels with the
    /// target object handle via [`Session::apply_auth`] — this only selects
    /// which session kind ESAPI attaches to the next command.
    pub fn esapi_session(&self) -> AuthSession {
        match self {
            Session::Password(_) => AuthSession::Password,
            Session::Policy { esapi, .. } => *esapi,
        }
    }

    /// For a password session, sets `target`'s authorization value via
    /// `TR_SetAuth`. No-op for policy sessions, whose authorization is
    /// satisfied by the accumulated policy digest instead.
    pub fn apply_auth(&self, ctx: &mut Context, target: ObjectHandle) -> Result<()> {
        if let Session::Password(auth) = self {
            ctx.tr_set_auth(target, auth.clone())
                .map_err(|e| Error::tpm("TrSetAuth", e))?;
        }
        Ok(())
    }

    /// `FlushContext` on policy sessions; no-op on password sessions (§3
    /// invariant: every policy session acquired is released on every exit
    /// path).
    pub fn destroy(self, ctx: &mut Context) -> Result<()> {
        let handle: SessionHandle = match self {
            Session::Password(_) => return Ok(()),
            Session::Policy {
                esapi: AuthSession::PolicySession(p),
                ..
            } => p.into(),
            Session::Policy {
                esapi: AuthSession::TrialSession(t),
                ..
            } => t.into(),
            Session::Policy {
                esapi: AuthSession::HmacSession(h),
                ..
            } => h.into(),
        };
        ctx.flush_context(handle.into())
            .map_err(|e| Error::tpm("FlushContext", e))
    }
}
