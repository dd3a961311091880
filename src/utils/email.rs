use std::sync::Arc;
use std::thread;

use diesel::insert_into;
use diesel::prelude::*;
use rand::Rng;
use tracing::warn;

use crate::api::common;
use crate::mail::Mailer;
use crate::schema::email_verify_records;
use crate::DbConnection;

/// Verification-code alphabet. Visually ambiguous characters (I/i, L/l,
/// O/o, 0, 1) are left out so codes survive being read off a phone screen.
pub const VERIFY_CODE_CHARS: &[u8] = b"AaBbCcDdEeFfGgHhJjKkMmNnPpQqRrSsTtUuVvWwXxYyZz23456789";

pub const DEFAULT_CODE_LENGTH: usize = 16;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SendType {
    Register,
    Forget,
}

impl SendType {
    pub fn as_str(self) -> &'static str {
        match self {
            SendType::Register => "register",
            SendType::Forget => "forget",
        }
    }

    pub fn parse(value: &str) -> Option<SendType> {
        match value {
            "register" => Some(SendType::Register),
            "forget" => Some(SendType::Forget),
            _ => None,
        }
    }
}

pub fn generate_random_str(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| VERIFY_CODE_CHARS[rng.gen_range(0..VERIFY_CODE_CHARS.len())] as char)
        .collect()
}

/// Subject and body for a verification mail, with the code embedded in the
/// purpose-specific link.
pub fn build_verification_mail(site_url: &str, send_type: SendType, code: &str) -> (String, String) {
    match send_type {
        SendType::Register => (
            "Lighten - Account Activation".to_owned(),
            format!(
                "Click the link below to activate your account: {}/active/{}",
                site_url, code
            ),
        ),
        SendType::Forget => (
            "Lighten - Password Reset".to_owned(),
            format!(
                "Click the link below to reset your password: {}/reset/{}",
                site_url, code
            ),
        ),
    }
}

/// Hands the finished message to the transport on a detached thread. The
/// caller never learns whether delivery worked; failures only show up in
/// the log.
pub fn dispatch(mailer: Arc<dyn Mailer>, to: String, subject: String, body: String) {
    let spawned = thread::Builder::new()
        .name("send email".to_owned())
        .spawn(move || {
            if let Err(error) = mailer.send(&to, &subject, &body) {
                warn!(to = %to, error = %error, "verification email dropped");
            }
        });
    if let Err(error) = spawned {
        warn!(error = %error, "could not spawn email thread");
    }
}

/// Generates a code, persists the verification record, and fires the email
/// without waiting for the transport.
pub fn issue_verification_email(
    connection: &mut DbConnection,
    mailer: Arc<dyn Mailer>,
    site_url: &str,
    code_length: usize,
    email_to: &str,
    send_type: SendType,
) -> Result<(), diesel::result::Error> {
    let code = generate_random_str(code_length);
    insert_into(email_verify_records::table)
        .values((
            email_verify_records::code.eq(&code),
            email_verify_records::email.eq(email_to),
            email_verify_records::send_type.eq(send_type.as_str()),
            email_verify_records::send_time.eq(common::get_current_timestamp()),
        ))
        .execute(connection)?;
    let (subject, body) = build_verification_mail(site_url, send_type, &code);
    dispatch(mailer, email_to.to_owned(), subject, body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::mail::MailError;

    #[test]
    fn test_code_uses_only_unambiguous_chars() {
        for _ in 0..50 {
            let code = generate_random_str(DEFAULT_CODE_LENGTH);
            assert_eq!(code.len(), DEFAULT_CODE_LENGTH);
            for ch in code.chars() {
                assert!(VERIFY_CODE_CHARS.contains(&(ch as u8)));
                assert!(!"IiLlOo01".contains(ch));
            }
        }
    }

    #[test]
    fn test_code_length_is_configurable() {
        assert_eq!(generate_random_str(4).len(), 4);
        assert_eq!(generate_random_str(32).len(), 32);
    }

    #[test]
    fn test_send_type_parses_closed() {
        assert_eq!(SendType::parse("register"), Some(SendType::Register));
        assert_eq!(SendType::parse("forget"), Some(SendType::Forget));
        assert_eq!(SendType::parse("verify"), None);
        assert_eq!(SendType::parse(""), None);
    }

    #[test]
    fn test_register_mail_links_to_activation() {
        let (subject, body) =
            build_verification_mail("http://example.com", SendType::Register, "AbCd234");
        assert!(subject.contains("Activation"));
        assert!(body.contains("http://example.com/active/AbCd234"));
    }

    #[test]
    fn test_forget_mail_links_to_reset() {
        let (subject, body) =
            build_verification_mail("http://example.com", SendType::Forget, "AbCd234");
        assert!(subject.contains("Reset"));
        assert!(body.contains("http://example.com/reset/AbCd234"));
    }

    struct RecordingMailer {
        sent: Mutex<mpsc::Sender<(String, String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
            self.sent
                .lock()
                .unwrap()
                .send((to.to_owned(), subject.to_owned(), body.to_owned()))
                .unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_reaches_the_mailer_off_thread() {
        let (tx, rx) = mpsc::channel();
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(tx),
        });
        dispatch(
            mailer,
            "someone@example.com".to_owned(),
            "subject".to_owned(),
            "body".to_owned(),
        );
        let (to, subject, body) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(to, "someone@example.com");
        assert_eq!(subject, "subject");
        assert_eq!(body, "body");
    }
}
