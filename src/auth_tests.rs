//! Tests for the admin session

#[cfg(test)]
mod tests {
    use crate::auth::*;
    use crate::config::SessionFile;
    use crate::navigation::{Navigator, View};
    use crate::testing::FakeAuth;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const EMAIL: &str = "admin@r1movies.test";
    const PASSWORD: &str = "correct-horse";

    fn session() -> (AuthSession, Arc<FakeAuth>) {
        let backend = Arc::new(FakeAuth::with_user(EMAIL, PASSWORD));
        (AuthSession::new(backend.clone(), None), backend)
    }

    fn temp_session_file(name: &str) -> SessionFile {
        let path = std::env::temp_dir().join(format!(
            "r1_auth_{}_{}.json",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        SessionFile::at(path)
    }

    #[test]
    fn test_starts_loading() {
        let (session, _) = session();
        assert_eq!(session.state(), SessionState::Loading);
        assert_eq!(session.principal(), None);
    }

    #[test]
    fn test_sign_in_opens_admin() {
        let (session, _) = session();
        session.restore();
        assert_eq!(session.state(), SessionState::SignedOut);

        let mut nav = Navigator::new();
        nav.navigate(View::Admin, None);
        assert_eq!(nav.resolve(&session.state()), View::Login);

        session.sign_in(EMAIL, PASSWORD).unwrap();
        let principal = session.principal().unwrap();
        assert_eq!(principal.email, EMAIL);

        assert_eq!(nav.resolve(&session.state()), View::Admin);
        nav.navigate(View::Admin, None);
        assert_eq!(nav.resolve(&session.state()), View::Admin);
    }

    #[test]
    fn test_wrong_password_keeps_signed_out() {
        let (session, _) = session();
        session.restore();

        let err = session.sign_in(EMAIL, "wrong-password").unwrap_err();
        assert!(!err.to_string().is_empty());
        assert_eq!(err, AuthError::Rejected("Invalid login credentials".into()));
        assert_eq!(session.principal(), None);
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[test]
    fn test_invalid_input_never_reaches_backend() {
        let (session, backend) = session();

        assert!(matches!(session.sign_in("", PASSWORD), Err(AuthError::Invalid(_))));
        assert!(matches!(session.sign_in("admin", PASSWORD), Err(AuthError::Invalid(_))));
        assert!(matches!(session.sign_in(EMAIL, "12345"), Err(AuthError::Invalid(_))));
        assert!(matches!(session.sign_up(EMAIL, "abc"), Err(AuthError::Invalid(_))));

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials(" admin@x.io ", "secret").is_ok());
        assert_eq!(
            validate_credentials(EMAIL, "short").unwrap_err().to_string(),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_listeners_see_changes_until_unsubscribed() {
        let (session, _) = session();
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = session.subscribe(Arc::new(move |state: &SessionState| {
            sink.lock().unwrap().push(state.is_signed_in());
        }));

        session.sign_in(EMAIL, PASSWORD).unwrap();
        session.sign_out();
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);

        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.sign_in(EMAIL, PASSWORD).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let (session, _) = session();
        let other = session.clone();
        session.sign_in(EMAIL, PASSWORD).unwrap();
        assert!(other.state().is_signed_in());
    }

    #[test]
    fn test_sign_out_is_local_even_if_remote_fails() {
        let (session, backend) = session();
        session.sign_in(EMAIL, PASSWORD).unwrap();
        backend.fail_sign_out.store(true, Ordering::SeqCst);

        session.sign_out();
        assert_eq!(session.state(), SessionState::SignedOut);
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 1);

        // Nothing to revoke the second time
        session.sign_out();
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sign_out_clears_before_remote_logout_returns() {
        let (session, backend) = session();
        session.sign_in(EMAIL, PASSWORD).unwrap();
        backend.hold_sign_out.store(true, Ordering::SeqCst);

        let signing_out = session.clone();
        let worker = std::thread::spawn(move || signing_out.sign_out());
        backend.gate.wait_for(1);

        assert_eq!(session.state(), SessionState::SignedOut);
        assert_eq!(session.principal(), None);

        backend.gate.open();
        worker.join().unwrap();
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[test]
    fn test_refresh_in_flight_does_not_undo_sign_out() {
        let file = temp_session_file("refresh_race");
        let backend = Arc::new(FakeAuth::with_user(EMAIL, PASSWORD));
        let session = AuthSession::new(backend.clone(), Some(file.clone()));
        session.sign_in(EMAIL, PASSWORD).unwrap();
        backend.hold_refresh.store(true, Ordering::SeqCst);

        let refreshing = session.clone();
        let worker = std::thread::spawn(move || refreshing.check_expiry(i64::MAX));
        backend.gate.wait_for(1);

        session.sign_out();
        backend.gate.open();

        assert!(!worker.join().unwrap());
        assert_eq!(session.state(), SessionState::SignedOut);
        assert_eq!(file.load(), None);
    }

    #[test]
    fn test_check_expiry_refreshes() {
        let (session, _) = session();
        session.sign_in(EMAIL, PASSWORD).unwrap();
        let first = session.principal().unwrap();

        assert!(!session.check_expiry(first.expires_at - 1));
        assert!(session.needs_refresh(first.expires_at));
        assert!(session.check_expiry(first.expires_at));

        let fresh = session.principal().unwrap();
        assert_ne!(fresh.access_token, first.access_token);
        assert_eq!(fresh.email, EMAIL);
    }

    #[test]
    fn test_check_expiry_signs_out_when_refused() {
        let (session, backend) = session();
        session.sign_in(EMAIL, PASSWORD).unwrap();
        backend.refuse_refresh.store(true, Ordering::SeqCst);

        assert!(session.check_expiry(i64::MAX));
        assert_eq!(session.state(), SessionState::SignedOut);
        assert!(!session.check_expiry(i64::MAX));
    }

    #[test]
    fn test_restore_from_session_file() {
        let file = temp_session_file("restore");
        let backend = Arc::new(FakeAuth::with_user(EMAIL, PASSWORD));

        let first = AuthSession::new(backend.clone(), Some(file.clone()));
        first.sign_in(EMAIL, PASSWORD).unwrap();
        let principal = first.principal().unwrap();

        let second = AuthSession::new(backend.clone(), Some(file.clone()));
        let state = second.restore_at(principal.expires_at - 10);
        assert_eq!(state, SessionState::SignedIn(principal.clone()));

        // Expired on disk: refreshed instead of verified
        let third = AuthSession::new(backend.clone(), Some(file.clone()));
        let state = third.restore_at(principal.expires_at + 10);
        let restored = state.principal().unwrap();
        assert_ne!(restored.access_token, principal.access_token);

        third.sign_out();
        assert_eq!(file.load(), None);
    }

    #[test]
    fn test_restore_rejected_session_signs_out() {
        let file = temp_session_file("rejected");
        let backend = Arc::new(FakeAuth::with_user(EMAIL, PASSWORD));
        AuthSession::new(backend.clone(), Some(file.clone()))
            .sign_in(EMAIL, PASSWORD)
            .unwrap();

        backend.refuse_verify.store(true, Ordering::SeqCst);
        let session = AuthSession::new(backend, Some(file.clone()));
        assert_eq!(session.restore_at(0), SessionState::SignedOut);
        assert_eq!(file.load(), None);
    }

    #[test]
    fn test_sign_up() {
        let (session, backend) = session();
        session.restore();

        assert_eq!(session.sign_up("new@r1movies.test", "hunter22"), Ok(true));
        assert!(session.state().is_signed_in());

        session.sign_out();
        backend.require_confirmation.store(true, Ordering::SeqCst);
        assert_eq!(session.sign_up("pending@r1movies.test", "hunter22"), Ok(false));
        assert_eq!(session.state(), SessionState::SignedOut);

        let err = session.sign_up(EMAIL, "another-pass").unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[test]
    fn test_listener_runs_once_per_change() {
        let (session, _) = session();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        session.subscribe(Arc::new(move |_: &SessionState| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        session.restore();
        let _ = session.sign_in(EMAIL, "bad-password");
        session.sign_in(EMAIL, PASSWORD).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
