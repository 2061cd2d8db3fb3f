//! Object factory (C7): RSA primary key and KEYEDHASH sealed-object
//! templates, and the create/load/persist sequences built on top of them.
//!
//! Templates follow the teacher's `PublicBuilder`/`ObjectAttributesBuilder`
//! idiom, generalized per §3's invariants: the primary key is always
//! `{fixedTPM, fixedParent, restricted, decrypt, userWithAuth,
//! sensitiveDataOrigin}` with `noDA` set from the option store; the
//! passphrase object clears `{sign, restricted, decrypt}` and always clears
//! `sensitiveDataOrigin`, since `create_passphrase` always supplies the
//! sealed payload itself (literal bytes or a random draw) rather than asking
//! the TPM to generate it, matching the original's `set_public`.

use tss_esapi::attributes::ObjectAttributesBuilder;
use tss_esapi::interface_types::algorithm::{HashingAlgorithm, PublicAlgorithm};
use tss_esapi::interface_types::key_bits::RsaKeyBits;
use tss_esapi::interface_types::resource_handles::Hierarchy;
use tss_esapi::structures::{
    Digest, KeyedHashScheme, PublicBuilder, PublicKeyedHashParameters, PublicRsaParametersBuilder,
    RsaExponent, RsaScheme, SensitiveData, SymmetricDefinitionObject,
};
use tss_esapi::Context;

use crate::algorithm::{HashAlg, DEFAULT_POLICY_DIGEST_ALG};
use crate::capability;
use crate::error::{AuthSlot, Error, Result};
use crate::options::OptionStore;
use crate::persist;
use crate::policy;
use crate::prompt::SecretPrompter;
use crate::retry;
use crate::session::{PolicyKind, Session};

/// Resolves the policy `nameAlg` and, if a PCR bank was requested, compiles
/// a trial policy digest bound to it. `None` means no PCR policy: `nameAlg`
/// falls back to [`DEFAULT_POLICY_DIGEST_ALG`] (§9's compatibility note).
fn compile_policy(
    ctx: &mut Context,
    pcr_bank_alg: Option<HashAlg>,
) -> Result<(HashAlg, Option<Digest>)> {
    match pcr_bank_alg {
        None => Ok((DEFAULT_POLICY_DIGEST_ALG, None)),
        Some(requested) => {
            let bank = capability::resolve_pcr_bank(ctx, requested)?;
            let trial = Session::new_policy(ctx, PolicyKind::Trial, bank)?;
            let digest = policy::compile(ctx, &trial, bank);
            trial.destroy(ctx)?;
            Ok((bank, Some(digest?)))
        }
    }
}

fn primary_key_template(name_alg: HashAlg, auth_policy: Option<Digest>, no_da: bool) -> Result<tss_esapi::structures::Public> {
    let hashing_algorithm: HashingAlgorithm = name_alg.to_hashing_algorithm()?;

    let mut attrs = ObjectAttributesBuilder::new()
        .with_fixed_tpm(true)
        .with_fixed_parent(true)
        .with_sensitive_data_origin(true)
        .with_user_with_auth(true)
        .with_restricted(true)
        .with_decrypt(true);
    if no_da {
        attrs = attrs.with_no_da(true);
    }
    let attrs = attrs.build().map_err(|e| Error::tpm("ObjectAttributes", e))?;

    let rsa_params = PublicRsaParametersBuilder::new()
        .with_symmetric(SymmetricDefinitionObject::AES_128_CFB)
        .with_scheme(RsaScheme::Null)
        .with_key_bits(RsaKeyBits::Rsa2048)
        .with_exponent(RsaExponent::default())
        .with_is_decryption_key(true)
        .with_is_signing_key(false)
        .with_restricted(true)
        .build()
        .map_err(|e| Error::tpm("RsaParameters", e))?;

    let mut builder = PublicBuilder::new()
        .with_public_algorithm(PublicAlgorithm::Rsa)
        .with_name_hashing_algorithm(hashing_algorithm)
        .with_object_attributes(attrs)
        .with_rsa_parameters(rsa_params)
        .with_rsa_unique_identifier(Digest::default());
    if let Some(policy) = auth_policy {
        builder = builder.with_auth_policy(policy);
    }
    builder.build().map_err(|e| Error::tpm("PublicBuilder", e))
}

fn passphrase_template(
    name_alg: HashAlg,
    auth_policy: Option<Digest>,
    no_da: bool,
) -> Result<tss_esapi::structures::Public> {
    let hashing_algorithm: HashingAlgorithm = name_alg.to_hashing_algorithm()?;

    // `create_passphrase` always hands `Create` a payload (literal bytes or
    // a random draw), so `sensitiveDataOrigin` stays clear; setting it while
    // also supplying sensitive data gets the object rejected with
    // `TPM_RC_ATTRIBUTES`.
    let mut attrs = ObjectAttributesBuilder::new()
        .with_fixed_tpm(true)
        .with_fixed_parent(true)
        .with_user_with_auth(true)
        .with_sign_encrypt(false)
        .with_restricted(false)
        .with_decrypt(false)
        .with_sensitive_data_origin(false);
    if no_da {
        attrs = attrs.with_no_da(true);
    }
    let attrs = attrs.build().map_err(|e| Error::tpm("ObjectAttributes", e))?;

    let mut builder = PublicBuilder::new()
        .with_public_algorithm(PublicAlgorithm::KeyedHash)
        .with_name_hashing_algorithm(hashing_algorithm)
        .with_object_attributes(attrs)
        .with_keyed_hash_parameters(PublicKeyedHashParameters::new(KeyedHashScheme::Null))
        .with_keyed_hash_unique_identifier(Digest::default());
    if let Some(policy) = auth_policy {
        builder = builder.with_auth_policy(policy);
    }
    builder.build().map_err(|e| Error::tpm("PublicBuilder", e))
}

/// `create_primary_key(pcr_bank_alg)` (§4.7). On success the key is
/// persisted at [`PRIMARY_KEY_HANDLE`] and the owner auth used is cached
/// back into the option store.
pub fn create_primary_key(
    ctx: &mut Context,
    options: &mut OptionStore,
    prompter: &mut dyn SecretPrompter,
    pcr_bank_alg: Option<HashAlg>,
) -> Result<()> {
    let (name_alg, auth_policy) = compile_policy(ctx, pcr_bank_alg)?;
    let no_da = options.no_da();
    let template = primary_key_template(name_alg, auth_policy, no_da)?;

    retry::submit(ctx, options, prompter, AuthSlot::Owner, |ctx, options| {
        let owner_session = Session::new_password(options.owner_auth())?;
        owner_session.apply_auth(ctx, persist::owner_handle())?;
        let primary_key_auth = Session::new_password(options.primary_key_secret())?
            .password_auth()
            .expect("new_password always returns Session::Password");

        let primary = ctx
            .execute_with_session(Some(owner_session.esapi_session()), |ctx| {
                ctx.create_primary(
                    Hierarchy::Owner,
                    template.clone(),
                    Some(primary_key_auth),
                    None,
                    None,
                    None,
                )
            })
            .map_err(|e| Error::tpm("CreatePrimary", e))?;

        persist::persist_primary_key(ctx, options, primary.key_handle)?;
        ctx.flush_context(primary.key_handle.into())
            .map_err(|e| Error::tpm("FlushContext", e))?;
        Ok(())
    })?;

    options.set_owner_auth(&options.owner_auth().to_vec());
    Ok(())
}

/// `create_passphrase(bytes, pcr_bank_alg)` (§4.7). When `bytes` is empty,
/// draws 64 random bytes so the sealed-data region is never empty.
pub fn create_passphrase(
    ctx: &mut Context,
    options: &mut OptionStore,
    prompter: &mut dyn SecretPrompter,
    bytes: &[u8],
    pcr_bank_alg: Option<HashAlg>,
) -> Result<()> {
    let (name_alg, auth_policy) = compile_policy(ctx, pcr_bank_alg)?;
    let no_da = options.no_da();

    let payload = if bytes.is_empty() {
        ctx.execute_with_nullauth_session(|ctx| ctx.get_random(64))
            .map_err(|e| Error::tpm("GetRandom", e))?
            .to_vec()
    } else {
        bytes.to_vec()
    };
    let template = passphrase_template(name_alg, auth_policy, no_da)?;

    retry::submit(ctx, options, prompter, AuthSlot::PrimaryKey, |ctx, options| {
        let primary_handle = persist::load_primary_key(ctx, options)?;

        let parent_session = Session::new_password(options.primary_key_secret())?;
        let passphrase_auth = Session::new_password(options.passphrase_secret())?
            .password_auth()
            .expect("new_password always returns Session::Password");
        let sensitive = SensitiveData::try_from(payload.clone()).map_err(|e| Error::tpm("SensitiveData", e))?;

        let created = ctx
            .execute_with_session(Some(parent_session.esapi_session()), |ctx| {
                ctx.create(
                    primary_handle,
                    template.clone(),
                    Some(passphrase_auth),
                    Some(sensitive),
                    None,
                    None,
                )
            })
            .map_err(|e| Error::tpm("Create", e))?;

        let loaded = ctx
            .execute_with_session(Some(parent_session.esapi_session()), |ctx| {
                ctx.load(primary_handle, created.out_private.clone(), created.out_public.clone())
            })
            .map_err(|e| Error::tpm("Load", e))?;

        persist::persist_passphrase(ctx, options, loaded)?;
        ctx.flush_context(loaded.into())
            .map_err(|e| Error::tpm("FlushContext", e))?;
        Ok(())
    })
}
