//! Session commands.

use super::{parse_metadata, CommandResult};
use hostlink_core::{BackendFacade, BackendService};
use std::io::Write;

/// Registers an account, saving its session when one is issued.
pub async fn sign_up<S: BackendService>(
    facade: &BackendFacade<S>,
    email: &str,
    password: &str,
    meta: &[String],
    out: &mut impl Write,
) -> CommandResult {
    let metadata = parse_metadata(meta)?;
    let outcome = facade.sign_up(email, password, metadata).await?;
    if outcome.session.is_some() {
        writeln!(out, "Signed up and signed in as {}", outcome.user.email)?;
    } else {
        writeln!(
            out,
            "Signed up as {}; confirm the email address before signing in",
            outcome.user.email
        )?;
    }
    Ok(())
}

/// Signs in and saves the session.
pub async fn sign_in<S: BackendService>(
    facade: &BackendFacade<S>,
    email: &str,
    password: &str,
    out: &mut impl Write,
) -> CommandResult {
    let session = facade.sign_in(email, password).await?;
    writeln!(out, "Signed in as {}", session.user.email)?;
    Ok(())
}

/// Ends the saved session. Succeeds when nobody is signed in.
pub async fn sign_out<S: BackendService>(
    facade: &BackendFacade<S>,
    out: &mut impl Write,
) -> CommandResult {
    let was_signed_in = facade.session().is_some();
    facade.sign_out().await?;
    if was_signed_in {
        writeln!(out, "Signed out")?;
    } else {
        writeln!(out, "Not signed in")?;
    }
    Ok(())
}

/// Prints the signed-in user as JSON.
pub async fn whoami<S: BackendService>(
    facade: &BackendFacade<S>,
    out: &mut impl Write,
) -> CommandResult {
    match facade.get_current_user().await? {
        Some(user) => writeln!(out, "{}", serde_json::to_string_pretty(&user)?)?,
        None => writeln!(out, "Not signed in")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_testkit::TestBackend;

    #[tokio::test]
    async fn sign_up_then_whoami() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();
        let mut out = Vec::new();

        sign_up(
            &facade,
            "ann@example.com",
            "secret1",
            &["name=Ann".to_string()],
            &mut out,
        )
        .await
        .unwrap();
        whoami(&facade, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Signed up and signed in as ann@example.com\n"));
        assert!(text.contains("\"name\": \"Ann\""));
    }

    #[tokio::test]
    async fn sign_out_without_session() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();
        let mut out = Vec::new();

        sign_out(&facade, &mut out).await.unwrap();
        whoami(&facade, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Not signed in\nNot signed in\n");
    }

    #[tokio::test]
    async fn bad_password_reports_service_message() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();
        let mut out = Vec::new();

        sign_up(&facade, "ann@example.com", "secret1", &[], &mut out)
            .await
            .unwrap();
        let err = sign_in(&facade, "ann@example.com", "wrong-password", &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
