//! Vault-resolved keys through the file-backed secret store

use depthstore_core::config::keys;
use depthstore_core::secrets::FileSecretStore;
use depthstore_core::{ConnectionSelector, CredentialResolver, ErrorKind};
use depthstore_test_utils::fixture::{IDENTITY_TOKEN, PUBLIC_KEY};
use depthstore_test_utils::{ItemBuilder, StaticTokenCredential, TempVault, TestBacking};
use std::sync::Arc;

fn file_vault_selector(
    backing: &TestBacking,
    vault: &TempVault,
    token: &str,
) -> ConnectionSelector {
    let resolver = CredentialResolver::new(
        Arc::new(FileSecretStore::new()),
        StaticTokenCredential::new(token).identity(),
    );
    let config = backing
        .config
        .clone()
        .set(keys::VAULT_ADDRESS, &vault.address())
        .build_shared();
    ConnectionSelector::new(resolver, backing.provisioner(), config)
}

#[tokio::test]
async fn test_key_vault_scenario_with_file_vault() {
    let backing = TestBacking::new();
    let vault = TempVault::new(&[("CosmosDbConnectionKey", PUBLIC_KEY)], &[IDENTITY_TOKEN]).unwrap();

    let repo = file_vault_selector(&backing, &vault, IDENTITY_TOKEN)
        .connect_vault_key()
        .await
        .unwrap();
    let item = ItemBuilder::milk().build();
    repo.add(&item).await.unwrap();
    assert_eq!(repo.get("1").await.unwrap(), item);
}

#[tokio::test]
async fn test_untrusted_identity_cannot_read_vault() {
    let backing = TestBacking::new();
    let vault = TempVault::new(&[("CosmosDbConnectionKey", PUBLIC_KEY)], &[IDENTITY_TOKEN]).unwrap();

    let err = file_vault_selector(&backing, &vault, "stranger")
        .connect_vault_key()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecretUnavailable);
    assert_eq!(backing.connector.connects(), 0);
}

#[tokio::test]
async fn test_missing_vault_file_is_secret_unavailable() {
    let backing = TestBacking::new();
    let vault = TempVault::new(&[], &[]).unwrap();
    std::fs::remove_file(vault.path()).unwrap();

    let err = file_vault_selector(&backing, &vault, IDENTITY_TOKEN)
        .connect_vault_key()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecretUnavailable);
}

#[tokio::test]
async fn test_vault_holding_wrong_key_is_authentication_rejected() {
    let backing = TestBacking::new();
    let vault = TempVault::new(&[("CosmosDbConnectionKey", "stale-key")], &[]).unwrap();

    let err = file_vault_selector(&backing, &vault, IDENTITY_TOKEN)
        .connect_vault_key()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationRejected);
}

#[tokio::test]
async fn test_vault_is_reread_after_rotation() {
    let backing = TestBacking::new();
    let vault = TempVault::new(&[("CosmosDbConnectionKey", "stale-key")], &[]).unwrap();
    let selector = file_vault_selector(&backing, &vault, IDENTITY_TOKEN);
    assert!(selector.connect_vault_key().await.is_err());

    std::fs::write(
        vault.path(),
        format!("[secrets]\nCosmosDbConnectionKey = \"{PUBLIC_KEY}\"\n"),
    )
    .unwrap();
    selector.connect_vault_key().await.unwrap();
}
