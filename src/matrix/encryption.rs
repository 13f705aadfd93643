//! Matrix client login and end-to-end encryption setup.
//!
//! Warning notifications are sent to rooms that are usually encrypted, so the bot
//! must own a verified device before it can post anything:
//!
//! - **First start**: log in with the password, bootstrap cross-signing, enable
//!   key backup and secret storage protected by the passphrase, then persist the
//!   session.
//! - **Restart**: restore the persisted session and import the secrets from secret
//!   storage with the passphrase.
//!
//! Either way the device must end up verified, otherwise setup fails.

use anyhow::{anyhow, bail};
use log::{debug, info};
use matrix_sdk::{
    Client,
    encryption::{
        BackupDownloadStrategy, EncryptionSettings,
        recovery::{RecoveryError, RecoveryState},
    },
    ruma::{OwnedUserId, api::client::uiaa},
};

use crate::matrix::{UserCredentials, session::MatrixSession};

const DEVICE_DISPLAY_NAME: &str = "nina bot";

/// Builds a client logged in as the bot, with encryption ready.
pub async fn setup_client(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!(
        "setting up matrix client for user {}",
        user_credentials.user_id
    );

    let client = match matrix_session.get_user_session() {
        Some(user_session) => {
            info!("restoring matrix session from disk");
            let client = build_client(user_credentials, matrix_session, false).await?;
            client.restore_session(user_session.clone()).await?;

            client
                .encryption()
                .secret_storage()
                .open_secret_store(&user_credentials.passphrase)
                .await?
                .import_secrets()
                .await?;
            client
        }
        None => login(user_credentials, matrix_session).await?,
    };

    check_encryption(&client).await?;
    info!("matrix client ready");

    Ok(client)
}

async fn build_client(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
    with_encryption_settings: bool,
) -> Result<Client, anyhow::Error> {
    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let mut builder = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(
            matrix_session.get_sqlite_path(),
            Some(&user_credentials.passphrase),
        );

    if with_encryption_settings {
        builder = builder.with_encryption_settings(EncryptionSettings {
            auto_enable_cross_signing: true,
            backup_download_strategy: BackupDownloadStrategy::default(),
            auto_enable_backups: true,
        });
    }

    Ok(builder.build().await?)
}

async fn login(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    let client = build_client(user_credentials, matrix_session, true).await?;
    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;

    client
        .matrix_auth()
        .login_username(user_id, &user_credentials.password)
        .initial_device_display_name(DEVICE_DISPLAY_NAME)
        .send()
        .await?;
    debug!("logged in as {}", user_credentials.user_id);

    bootstrap_cross_signing(&client, user_credentials).await?;
    enable_recovery(&client, user_credentials).await?;

    debug!("recovering secrets");
    client
        .encryption()
        .recovery()
        .recover(&user_credentials.passphrase)
        .await?;

    let user_session = client
        .matrix_auth()
        .session()
        .ok_or_else(|| anyhow!("no user session after login"))?;
    matrix_session.persist_user_session(&user_session).await?;

    Ok(client)
}

async fn bootstrap_cross_signing(
    client: &Client,
    user_credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("setting up cross signing");

    let Err(e) = client
        .encryption()
        .bootstrap_cross_signing_if_needed(None)
        .await
    else {
        debug!("cross signing already set up");
        return Ok(());
    };

    // The server asks to authenticate again with the password
    let Some(response) = e.as_uiaa_response() else {
        return Err(e.into());
    };
    let mut password = uiaa::Password::new(
        uiaa::UserIdentifier::UserIdOrLocalpart(user_credentials.user_id.clone()),
        user_credentials.password.clone(),
    );
    password.session = response.session.clone();

    client
        .encryption()
        .bootstrap_cross_signing(Some(uiaa::AuthData::Password(password)))
        .await?;

    debug!("cross signing set up");
    Ok(())
}

async fn enable_recovery(
    client: &Client,
    user_credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("enabling recovery");

    match client
        .encryption()
        .recovery()
        .enable()
        .with_passphrase(&user_credentials.passphrase)
        .await
    {
        Ok(_) => debug!("recovery enabled"),
        Err(RecoveryError::BackupExistsOnServer) => debug!("recovery already enabled"),
        Err(e) => bail!("error enabling recovery: {:?}", e),
    }

    Ok(())
}

async fn check_encryption(client: &Client) -> Result<(), anyhow::Error> {
    if client.encryption().recovery().state() != RecoveryState::Enabled {
        bail!("recovery is not enabled");
    }

    let device = client
        .encryption()
        .get_own_device()
        .await?
        .ok_or_else(|| anyhow!("own device not found"))?;
    if !device.is_verified() {
        bail!("device is not verified after setting up encryption");
    }

    Ok(())
}
