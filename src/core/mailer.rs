use std::path::Path;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

use crate::config::SmtpConfig;
use crate::error::{Result, SimwatchError};

/// Sends the per-character report email: plain-text body with the diff, the
/// HTML report and the raw simc output as attachments. Transport is local
/// SMTP on port 25 unless relay credentials are configured.
pub struct Mailer {
    smtp: Option<SmtpConfig>,
    dry_run: bool,
    from: Mailbox,
    hostname: String,
}

impl Mailer {
    pub fn new(smtp: Option<SmtpConfig>, dry_run: bool) -> Result<Self> {
        let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
        let from_addr = format!("{}@{}", whoami::username(), hostname);
        let from = Mailbox::new(
            Some("simwatch".to_string()),
            from_addr
                .parse()
                .map_err(|e| SimwatchError::Mail(format!("bad from address {}: {}", from_addr, e)))?,
        );
        Ok(Self {
            smtp,
            dry_run,
            from,
            hostname,
        })
    }

    /// Send the report once per destination address. In dry-run mode each
    /// send is replaced by a log line and no transport call is made.
    pub async fn send_report(
        &self,
        identity: &str,
        addresses: &[String],
        diff: &str,
        html_path: &Path,
        duration: Duration,
        output: &str,
    ) -> Result<()> {
        let subject = format!("simwatch report for {}", identity);
        let html = std::fs::read_to_string(html_path)?;
        for dest in addresses {
            info!("Sending email for character {} to {}", identity, dest);
            if self.dry_run {
                warn!("DRY RUN - not actually sending email");
                continue;
            }
            let message =
                self.build_message(identity, dest, &subject, diff, &html, duration, output)?;
            self.transport()?
                .send(message)
                .await
                .map_err(|e| SimwatchError::Mail(e.to_string()))?;
        }
        debug!("done sending emails for {}", identity);
        Ok(())
    }

    fn build_message(
        &self,
        identity: &str,
        dest: &str,
        subject: &str,
        diff: &str,
        html: &str,
        duration: Duration,
        output: &str,
    ) -> Result<Message> {
        let to: Mailbox = dest
            .parse()
            .map_err(|e| SimwatchError::Mail(format!("bad destination address {}: {}", dest, e)))?;
        let body = report_body(identity, diff, duration, &self.hostname);
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(
                        Attachment::new(format!("{}.html", identity))
                            .body(html.to_string(), ContentType::TEXT_HTML),
                    )
                    .singlepart(
                        Attachment::new(format!("{}_simc_output.txt", identity))
                            .body(output.to_string(), ContentType::TEXT_PLAIN),
                    ),
            )
            .map_err(|e| SimwatchError::Mail(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        match &self.smtp {
            Some(cfg) => Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.relay)
                .map_err(|e| SimwatchError::Mail(e.to_string()))?
                .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
                .build()),
            None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost").build()),
        }
    }
}

fn report_body(identity: &str, diff: &str, duration: Duration, hostname: &str) -> String {
    format!(
        "SimulationCraft was run for {c} due to the following changes:\n\n\
         {diff}\n\n\
         The run was completed in {d} and the HTML report is attached. \
         (Note that you likely need to save the HTML attachment to disk and \
         view it from there; it will not render correctly in most email clients.)\n\n\
         This run was done on {h} at {t} by simwatch v{v}",
        c = identity,
        diff = diff,
        d = format_duration(duration),
        h = hostname,
        t = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        v = env!("CARGO_PKG_VERSION"),
    )
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(83)), "0:01:23");
        assert_eq!(format_duration(Duration::from_secs(3600 + 61)), "1:01:01");
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00:00");
    }

    #[test]
    fn test_report_body_contents() {
        let body = report_body(
            "nameone@realmone",
            "change items.shoulder.armor from 71 to 60",
            Duration::from_secs(90),
            "testhost",
        );
        assert!(body.starts_with(
            "SimulationCraft was run for nameone@realmone due to the following changes:"
        ));
        assert!(body.contains("change items.shoulder.armor from 71 to 60"));
        assert!(body.contains("completed in 0:01:30"));
        assert!(body.contains("on testhost at "));
        assert!(body.contains(concat!("simwatch v", env!("CARGO_PKG_VERSION"))));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("c@r.html");
        std::fs::write(&html, "<html></html>").unwrap();

        let mailer = Mailer::new(None, true).unwrap();
        mailer
            .send_report(
                "c@r",
                &["you@example.com".to_string()],
                "diff text",
                &html,
                Duration::from_secs(1),
                "simc output",
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_build_message_attachments() {
        let mailer = Mailer::new(None, false).unwrap();
        let message = mailer
            .build_message(
                "c@r",
                "you@example.com",
                "simwatch report for c@r",
                "diff",
                "<html></html>",
                Duration::from_secs(5),
                "output",
            )
            .unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("Subject: simwatch report for c@r"));
        assert!(rendered.contains("c@r.html"));
        assert!(rendered.contains("c@r_simc_output.txt"));
    }
}
