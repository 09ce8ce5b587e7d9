//! Session authenticator: opens the single logged-in session of a run.

use tracing::{debug, info, warn};

use crate::browser::{
    BrowserLauncher, BrowserSession, LaunchOptions, close_quietly, selectors, urls,
};
use crate::config::BrowserConfig;
use crate::error::AuthError;
use crate::types::Credentials;

/// Log in and return the authenticated session
///
/// Any existing session is cleared first by visiting the logout URL. Each
/// input is cleared before it is filled so autofill leftovers never mix with
/// the submitted values. Success is declared only once the logged-in marker
/// is present; the error marker means [`AuthError::InvalidCredentials`] and
/// seeing neither within `page_timeout` means [`AuthError::Timeout`].
///
/// On failure the session is closed before the error is returned.
pub async fn authenticate(
    launcher: &dyn BrowserLauncher,
    credentials: &Credentials,
    config: &BrowserConfig,
) -> Result<Box<dyn BrowserSession>, AuthError> {
    info!(identity = %credentials.identity, "Logging in");

    let mut session = launcher.launch(&LaunchOptions::fresh(config)).await?;

    match login(session.as_mut(), credentials, config).await {
        Ok(()) => {
            info!(identity = %credentials.identity, "Logged in");
            Ok(session)
        }
        Err(e) => {
            warn!(identity = %credentials.identity, error = %e, "Login failed");
            close_quietly(session.as_mut(), "authenticator").await;
            Err(e)
        }
    }
}

async fn login(
    session: &mut dyn BrowserSession,
    credentials: &Credentials,
    config: &BrowserConfig,
) -> Result<(), AuthError> {
    session.navigate(urls::LOGOUT).await?;
    session.navigate(urls::LOGIN).await?;

    fill(session, selectors::USERNAME_INPUT, &credentials.identity).await?;
    fill(session, selectors::PASSWORD_INPUT, &credentials.secret).await?;

    debug!("Submitting login form");
    session.click(selectors::SUBMIT_BUTTON).await?;

    await_login_marker(session, config).await
}

async fn fill(
    session: &mut dyn BrowserSession,
    selector: &str,
    value: &str,
) -> Result<(), AuthError> {
    session.type_into(selector, "").await?;
    session.type_into(selector, value).await?;
    Ok(())
}

async fn await_login_marker(
    session: &mut dyn BrowserSession,
    config: &BrowserConfig,
) -> Result<(), AuthError> {
    let poll = poll_login_marker(session, config);

    match tokio::time::timeout(config.page_timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::Timeout {
            waited: config.page_timeout,
        }),
    }
}

async fn poll_login_marker(
    session: &mut dyn BrowserSession,
    config: &BrowserConfig,
) -> Result<(), AuthError> {
    loop {
        if session.is_visible(selectors::ERROR_TEXT).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if session.is_visible(selectors::LOGGED_IN).await? {
            return Ok(());
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}
