use std::{
    fmt::Display,
    io::{BufRead, Write},
    thread,
    time::Duration,
};

use anyhow::{bail, Context};
use log::{info, warn};

use crate::{
    config::Config,
    contacts::{load_contacts, ContactRecord},
    drafter::EmailDrafter,
    mailer::{log_send_error, Mailer},
    send_log::{SendLog, SendStatus},
    units::minutes_and_seconds,
    utils::{preview, truncate_chars},
};

/// Word the user has to type before a production run starts
const CONFIRMATION_WORD: &str = "YES";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub failed: usize,
    /// Rows with an unusable address or already sent
    pub skipped: usize,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sent: {}, Failed: {}, Skipped: {}",
            self.sent, self.failed, self.skipped
        )
    }
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    drafter: EmailDrafter,
    mailer: Mailer,
    send_log: SendLog,
    sleeper: Box<dyn FnMut(Duration)>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, drafter: EmailDrafter, mailer: Mailer, send_log: SendLog) -> Self {
        Self {
            config,
            drafter,
            mailer,
            send_log,
            sleeper: Box::new(thread::sleep),
        }
    }

    /// Replaces the blocking pause between sends
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Drafts one email for a well known company and sends it to the test address
    pub fn run_test(&mut self) -> anyhow::Result<()> {
        info!("TEST MODE");
        let sample = ContactRecord::new(&self.config.test_email, "Test HR", "Google", "HR Manager");
        let draft = self.drafter.draft(&sample, &self.config.candidate);

        println!("Sending test email to: {}", self.config.test_email);
        println!("Subject: {}", draft.subject);
        println!("\n--- Email Preview ---\n{}\n--- End Preview ---\n", draft.body);

        if !self
            .mailer
            .send(&self.config.test_email, &draft.subject, &draft.body)
        {
            bail!("Test email to {} was not sent, check the config", self.config.test_email);
        }
        info!("Test email sent, check the inbox of {}", self.config.test_email);
        Ok(())
    }

    /// One pass over the contact list, at most `daily_limit` rows
    pub fn run_production(
        &mut self,
        resume: bool,
        auto: bool,
        input: &mut dyn BufRead,
    ) -> anyhow::Result<RunSummary> {
        info!("PRODUCTION MODE");
        let mut contacts = load_contacts(&self.config.contacts_path)?;

        if resume {
            info!("Resume mode: skipping previously sent emails");
            contacts.retain(|contact| !self.send_log.is_sent(&contact.email));
            info!("{} emails remaining to send", contacts.len());
        }
        if contacts.is_empty() {
            info!("All emails have already been sent!");
            return Ok(RunSummary::default());
        }

        contacts.truncate(self.config.daily_limit);
        info!(
            "Will send {} emails today (limit: {})",
            contacts.len(),
            self.config.daily_limit
        );

        if auto {
            info!("Auto mode: sending {} emails", contacts.len());
        } else if !confirm(input, contacts.len(), self.config)? {
            info!("Cancelled by user");
            return Ok(RunSummary::default());
        }

        let mut summary = RunSummary::default();
        let total = contacts.len();
        for (idx, contact) in contacts.iter().enumerate() {
            let attempted = self.process(contact, idx, total, &mut summary)?;

            // Skipped rows go straight to the next one
            if attempted && idx + 1 < total {
                let delay = self.config.delay.pick();
                info!("Waiting {} before next email", minutes_and_seconds(delay));
                (self.sleeper)(delay.into());
            }
        }

        info!("SUMMARY {summary}");
        info!("Log saved to: {:?}", self.send_log.path());
        Ok(summary)
    }

    /// Returns true if a send was attempted
    fn process(
        &mut self,
        contact: &ContactRecord,
        idx: usize,
        total: usize,
        summary: &mut RunSummary,
    ) -> anyhow::Result<bool> {
        if !contact.has_valid_email() {
            warn!("Skipping invalid email: {:?}", contact.email);
            summary.skipped += 1;
            return Ok(false);
        }
        if self.send_log.is_sent(&contact.email) {
            info!("Already sent: {}", contact.email);
            summary.skipped += 1;
            return Ok(false);
        }

        info!("[{}/{total}] Processing {contact}", idx + 1);
        let draft = self.drafter.draft(contact, &self.config.candidate);
        info!("Subject: {}", preview(&draft.subject, 60));

        match self
            .mailer
            .try_send(&contact.email, &draft.subject, &draft.body)
        {
            Ok(()) => {
                summary.sent += 1;
                self.send_log
                    .record(&contact.email, SendStatus::Sent, None)?;
                info!("Sent to {} (Total: {})", contact.email, summary.sent);
            }
            Err(e) => {
                log_send_error(&e);
                summary.failed += 1;
                let reason = e.to_string();
                self.send_log.record(
                    &contact.email,
                    SendStatus::Failed,
                    Some(truncate_chars(&reason, 300)),
                )?;
            }
        }
        Ok(true)
    }
}

fn confirm(input: &mut dyn BufRead, count: usize, config: &Config) -> anyhow::Result<bool> {
    print!(
        "About to send {count} emails with a {} delay between each.\nType '{CONFIRMATION_WORD}' to continue: ",
        config.delay
    );
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim_end_matches(['\r', '\n']) == CONFIRMATION_WORD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        completion::CompletionClient,
        config::tests::sample_config,
        mailer::tests::FakeDelivery,
        research::CompanyResearcher,
        send_log::read_entries,
        units::DelayRange,
    };
    use std::{cell::RefCell, fs, io::Cursor, path::Path, rc::Rc};
    use tempfile::TempDir;

    struct Offline;
    impl CompletionClient for Offline {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("offline")
        }
    }

    fn config_in(dir: &Path, contacts_csv: &str, daily_limit: usize) -> Config {
        let contacts_path = dir.join("contacts.csv");
        fs::write(&contacts_path, contacts_csv).unwrap();
        let mut config = sample_config();
        config.contacts_path = contacts_path;
        config.send_log_path = dir.join("sent_log.csv");
        config.daily_limit = daily_limit;
        config.delay = DelayRange {
            min: 0.into(),
            max: 0.into(),
        };
        config
    }

    fn orchestrator<'a>(config: &'a Config, delivery: &FakeDelivery) -> Orchestrator<'a> {
        let drafter = EmailDrafter::new(Box::new(Offline), CompanyResearcher::new(vec![]));
        let mailer = Mailer::new(config, None, Box::new(delivery.clone())).unwrap();
        let send_log = SendLog::open(&config.send_log_path);
        Orchestrator::new(config, drafter, mailer, send_log)
    }

    fn delivered_to(delivery: &FakeDelivery) -> Vec<String> {
        delivery
            .delivered
            .borrow()
            .iter()
            .filter_map(|raw| {
                raw.lines()
                    .find_map(|line| line.strip_prefix("To: ").map(str::to_string))
            })
            .collect()
    }

    fn no_input() -> Cursor<Vec<u8>> {
        Cursor::new(vec![])
    }

    const HEADER: &str = "Email,Name,Company,Title\n";

    #[test]
    fn resume_skips_sent_addresses() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            &format!("{HEADER}a@x.com,Ann,Acme,HR\nb@y.com,Bob,Beta,HR\n"),
            10,
        );
        fs::write(
            &config.send_log_path,
            "email,status,timestamp,error\nA@x.com,sent,2026-01-01T09:00:00.000000,\n",
        )
        .unwrap();
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        // Act
        let summary = orchestrator
            .run_production(true, true, &mut no_input())
            .unwrap();

        // Assert
        assert_eq!(summary, RunSummary { sent: 1, failed: 0, skipped: 0 });
        assert_eq!(delivered_to(&delivery), vec!["b@y.com"]);
    }

    #[test]
    fn daily_cap_limits_processed_rows() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let rows: String = (1..=5).map(|i| format!("c{i}@x.com,C{i},Co{i},HR\n")).collect();
        let config = config_in(dir.path(), &format!("{HEADER}{rows}"), 2);
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        // Act
        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        // Assert
        assert_eq!(summary.sent, 2);
        assert_eq!(delivered_to(&delivery), vec!["c1@x.com", "c2@x.com"]);
        assert_eq!(read_entries(&config.send_log_path).unwrap().len(), 2);
    }

    #[test]
    fn invalid_rows_skipped_without_logging() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            &format!("{HEADER},NoMail,Acme,HR\nnot-an-address,Bad,Acme,HR\nnan,Nan,Acme,HR\nok@x.com,Ok,Acme,HR\n"),
            10,
        );
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        // Act
        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        // Assert
        assert_eq!(summary, RunSummary { sent: 1, failed: 0, skipped: 3 });
        let entries = read_entries(&config.send_log_path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].email, "ok@x.com");
        assert_eq!(entries[0].status, SendStatus::Sent);
    }

    #[test]
    fn no_pause_after_skipped_rows() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let mut config = config_in(
            dir.path(),
            &format!("{HEADER}nan,Nan,Acme,HR\n,Empty,Acme,HR\nbad,Bad,Acme,HR\nok@x.com,Ok,Acme,HR\nlast@y.com,Last,Beta,HR\nnan,Tail,Acme,HR\n"),
            10,
        );
        config.delay = DelayRange {
            min: 7.into(),
            max: 7.into(),
        };
        let pauses = Rc::new(RefCell::new(vec![]));
        let recorded = Rc::clone(&pauses);
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery)
            .with_sleeper(move |delay| recorded.borrow_mut().push(delay));

        // Act
        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        // Assert
        assert_eq!(summary, RunSummary { sent: 2, failed: 0, skipped: 4 });
        assert_eq!(*pauses.borrow(), vec![Duration::from_secs(7); 2]);
    }

    #[test]
    fn failures_logged_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            &format!("{HEADER}bad@x.com,Bad,Acme,HR\ngood@y.com,Good,Beta,HR\n"),
            10,
        );
        let delivery = FakeDelivery {
            fail_for: vec!["bad@x.com".to_string()],
            ..Default::default()
        };
        let mut orchestrator = orchestrator(&config, &delivery);

        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        assert_eq!(summary, RunSummary { sent: 1, failed: 1, skipped: 0 });
        let entries = read_entries(&config.send_log_path).unwrap();
        assert_eq!(entries[0].status, SendStatus::Failed);
        assert!(entries[0].error.as_deref().unwrap().contains("550"));
        assert_eq!(entries[1].status, SendStatus::Sent);
    }

    #[test]
    fn authentication_failure_does_not_abort_run() {
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            &format!("{HEADER}a@x.com,A,Acme,HR\nb@y.com,B,Beta,HR\n"),
            10,
        );
        let delivery = FakeDelivery {
            reject_login: true,
            ..Default::default()
        };
        let mut orchestrator = orchestrator(&config, &delivery);

        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        assert_eq!(summary.failed, 2);
        let entries = read_entries(&config.send_log_path).unwrap();
        assert!(entries[0].error.as_deref().unwrap().starts_with("authentication failed"));
    }

    #[test]
    fn duplicate_rows_sent_once() {
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            &format!("{HEADER}a@x.com,A,Acme,HR\nA@X.COM,A,Acme,HR\n"),
            10,
        );
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        let summary = orchestrator
            .run_production(false, true, &mut no_input())
            .unwrap();

        assert_eq!(summary, RunSummary { sent: 1, failed: 0, skipped: 1 });
    }

    #[test]
    fn confirmation_required() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), &format!("{HEADER}a@x.com,A,Acme,HR\n"), 10);
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        let cancelled = orchestrator
            .run_production(false, false, &mut Cursor::new(b"yes\n".to_vec()))
            .unwrap();
        assert_eq!(cancelled, RunSummary::default());
        assert!(delivered_to(&delivery).is_empty());

        let confirmed = orchestrator
            .run_production(false, false, &mut Cursor::new(b"YES\n".to_vec()))
            .unwrap();
        assert_eq!(confirmed.sent, 1);
    }

    #[test]
    fn everything_sent_already() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), &format!("{HEADER}a@x.com,A,Acme,HR\n"), 10);
        fs::write(
            &config.send_log_path,
            "email,status,timestamp,error\na@x.com,sent,2026-01-01T09:00:00.000000,\n",
        )
        .unwrap();
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        let summary = orchestrator
            .run_production(true, false, &mut no_input())
            .unwrap();

        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn missing_contact_list_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path(), HEADER, 10);
        config.contacts_path = dir.path().join("HR_Contact_List.xlsx");
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        assert!(orchestrator.run_production(false, true, &mut no_input()).is_err());
    }

    #[test]
    fn test_mode_sends_to_test_address_without_logging() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), HEADER, 10);
        let delivery = FakeDelivery::default();
        let mut orchestrator = orchestrator(&config, &delivery);

        orchestrator.run_test().unwrap();

        assert_eq!(delivered_to(&delivery), vec!["me+test@example.com"]);
        assert!(!config.send_log_path.exists());
    }

    #[test]
    fn test_mode_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), HEADER, 10);
        let delivery = FakeDelivery {
            reject_login: true,
            ..Default::default()
        };
        let mut orchestrator = orchestrator(&config, &delivery);

        assert!(orchestrator.run_test().is_err());
    }
}
