//! Terminal rendition of the video-interview screen.
//!
//! Commands arrive one per line on stdin; every notice and every view the
//! screen would render is written as a JSON line.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use rezkrypt_media::{
    ChannelNotifier, InterviewRegistry, MediaSession, Notice, RegistryError, RequestOutcome,
    ScreenView, SimulatedPlatform,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cli::InterviewArgs;
use crate::config::MediaConfig;

const HELP: &[&str] = &[
    "video | v    toggle the camera",
    "audio | a    toggle the microphone",
    "end | e      end the interview and release devices",
    "retry | r    end, then ask for access again",
    "request      ask for camera and microphone access",
    "status | s   print the current view",
    "quit | q     close the screen",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenCommand {
    ToggleVideo,
    ToggleAudio,
    End,
    Retry,
    Request,
    Status,
    Help,
    Quit,
}

impl FromStr for ScreenCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "v" => Ok(ScreenCommand::ToggleVideo),
            "audio" | "a" => Ok(ScreenCommand::ToggleAudio),
            "end" | "e" => Ok(ScreenCommand::End),
            "retry" | "r" => Ok(ScreenCommand::Retry),
            "request" => Ok(ScreenCommand::Request),
            "status" | "s" => Ok(ScreenCommand::Status),
            "help" | "h" | "?" => Ok(ScreenCommand::Help),
            "quit" | "q" | "exit" => Ok(ScreenCommand::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

/// One line of screen output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output {
    Notice(Notice),
    View(ScreenView),
    Error { message: String },
    Help { commands: &'static [&'static str] },
    Closed { screen: String },
}

pub struct InterviewScreen {
    registry: Arc<InterviewRegistry<SimulatedPlatform>>,
    screen: String,
    session: Arc<MediaSession<SimulatedPlatform>>,
    notices: UnboundedReceiver<Notice>,
    requests: JoinSet<RequestOutcome>,
}

impl InterviewScreen {
    /// Open the screen's session and ask for access right away.
    pub fn mount(
        registry: Arc<InterviewRegistry<SimulatedPlatform>>,
        screen: &str,
        notices: UnboundedReceiver<Notice>,
    ) -> Result<Self, RegistryError> {
        let session = registry.open(screen)?;
        let mut mounted = Self {
            registry,
            screen: screen.to_string(),
            session,
            notices,
            requests: JoinSet::new(),
        };
        mounted.spawn_request(false);
        Ok(mounted)
    }

    pub fn session(&self) -> &Arc<MediaSession<SimulatedPlatform>> {
        &self.session
    }

    fn spawn_request(&mut self, retry: bool) {
        let session = self.session.clone();
        self.requests.spawn(async move {
            if retry {
                session.retry().await
            } else {
                session.request_access().await
            }
        });
    }

    pub async fn run<R, W>(mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        info!(screen = %self.screen, session = %self.session.id(), "interview screen mounted");

        loop {
            tokio::select! {
                biased;

                Some(notice) = self.notices.recv() => {
                    emit(out, &Output::Notice(notice)).await?;
                }
                Some(joined) = self.requests.join_next(), if !self.requests.is_empty() => {
                    match joined {
                        Ok(outcome) => debug!(screen = %self.screen, ?outcome, "capture request settled"),
                        Err(e) if e.is_cancelled() => continue,
                        Err(e) => warn!(screen = %self.screen, error = %e, "capture request task failed"),
                    }
                    self.render(out).await?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!(screen = %self.screen, "input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<ScreenCommand>() {
                        Ok(ScreenCommand::Quit) => break,
                        Ok(command) => self.handle(command, out).await?,
                        Err(message) => emit(out, &Output::Error { message }).await?,
                    }
                }
            }
        }

        self.unmount(out).await
    }

    async fn handle<W>(&mut self, command: ScreenCommand, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let toggled = match command {
            ScreenCommand::ToggleVideo => self.session.toggle_video(),
            ScreenCommand::ToggleAudio => self.session.toggle_audio(),
            ScreenCommand::End => {
                self.session.end_session();
                return self.render(out).await;
            }
            // The view follows once the request settles.
            ScreenCommand::Retry => {
                self.spawn_request(true);
                return Ok(());
            }
            ScreenCommand::Request => {
                self.spawn_request(false);
                return Ok(());
            }
            ScreenCommand::Status => return self.render(out).await,
            ScreenCommand::Help => return emit(out, &Output::Help { commands: HELP }).await,
            ScreenCommand::Quit => return Ok(()),
        };

        if let Err(e) = toggled {
            emit(
                out,
                &Output::Error {
                    message: e.to_string(),
                },
            )
            .await?;
        }
        self.render(out).await
    }

    /// Write pending notices, then the current view.
    async fn render<W>(&mut self, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Ok(notice) = self.notices.try_recv() {
            emit(out, &Output::Notice(notice)).await?;
        }
        emit(out, &Output::View(self.session.view())).await
    }

    async fn unmount<W>(mut self, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        self.requests.abort_all();
        while self.requests.join_next().await.is_some() {}

        self.registry.close(&self.screen)?;
        while let Ok(notice) = self.notices.try_recv() {
            emit(out, &Output::Notice(notice)).await?;
        }
        info!(screen = %self.screen, "interview screen closed");
        emit(
            out,
            &Output::Closed {
                screen: self.screen.clone(),
            },
        )
        .await
    }
}

async fn emit<W>(out: &mut W, output: &Output) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(output)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// `rezkrypt interview`
pub async fn run(media: &MediaConfig, args: InterviewArgs) -> Result<()> {
    let platform = media.platform(args.outcome);
    let (notifier, notices) = ChannelNotifier::new();
    let registry = Arc::new(InterviewRegistry::new(
        platform,
        Arc::new(notifier),
        media.session_config(),
    ));

    let screen = InterviewScreen::mount(registry, &args.screen, notices)?;
    let mut stdout = tokio::io::stdout();
    screen.run(tokio::io::stdin(), &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezkrypt_media::{PermissionStatus, SessionConfig, SimulatedOutcome};
    use serde_json::Value;

    fn mount(outcome: SimulatedOutcome) -> (InterviewScreen, Arc<InterviewRegistry<SimulatedPlatform>>) {
        let (notifier, notices) = ChannelNotifier::new();
        let registry = Arc::new(InterviewRegistry::new(
            SimulatedPlatform::new(outcome),
            Arc::new(notifier),
            SessionConfig::default(),
        ));
        let screen = InterviewScreen::mount(registry.clone(), "screen-a", notices).expect("mount");
        (screen, registry)
    }

    /// Wait for the mount-time request so commands see a settled session.
    async fn settle(screen: &mut InterviewScreen) -> RequestOutcome {
        screen
            .requests
            .join_next()
            .await
            .expect("pending request")
            .expect("request task")
    }

    fn parse(out: &[u8]) -> Vec<Value> {
        std::str::from_utf8(out)
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    fn of_type<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
        lines.iter().filter(|l| l["type"] == kind).collect()
    }

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!("v".parse::<ScreenCommand>(), Ok(ScreenCommand::ToggleVideo));
        assert_eq!(" Audio ".parse::<ScreenCommand>(), Ok(ScreenCommand::ToggleAudio));
        assert_eq!("r".parse::<ScreenCommand>(), Ok(ScreenCommand::Retry));
        assert_eq!("request".parse::<ScreenCommand>(), Ok(ScreenCommand::Request));
        assert_eq!("q".parse::<ScreenCommand>(), Ok(ScreenCommand::Quit));
        assert!("dance".parse::<ScreenCommand>().is_err());
    }

    #[tokio::test]
    async fn mount_requests_access_immediately() {
        let (mut screen, registry) = mount(SimulatedOutcome::Grant);
        assert_eq!(registry.len(), 1);
        assert_eq!(settle(&mut screen).await, RequestOutcome::Granted);
        assert_eq!(screen.session().status(), PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn second_mount_of_the_same_screen_is_rejected() {
        let (screen, registry) = mount(SimulatedOutcome::Grant);
        let (_, notices) = ChannelNotifier::new();
        let err = InterviewScreen::mount(registry.clone(), "screen-a", notices)
            .err()
            .expect("duplicate mount");
        assert!(matches!(err, RegistryError::AlreadyOpen(_)));
        drop(screen);
    }

    #[tokio::test]
    async fn toggles_print_notice_then_view() {
        let (mut screen, registry) = mount(SimulatedOutcome::Grant);
        settle(&mut screen).await;
        let session = screen.session().clone();

        let mut out = Vec::new();
        screen
            .run(&b"video\nstatus\nquit\n"[..], &mut out)
            .await
            .expect("run");
        let lines = parse(&out);

        let notices = of_type(&lines, "notice");
        let titles: Vec<&str> = notices
            .iter()
            .filter_map(|n| n["title"].as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Camera and microphone access granted",
                "Camera disabled",
                "Interview ended"
            ]
        );

        let views = of_type(&lines, "view");
        assert_eq!(views[0]["stage"], "camera_off");
        assert_eq!(lines.last().expect("closed line")["type"], "closed");

        assert!(registry.is_empty());
        assert!(!session.holds_tracks());
        assert_eq!(session.status(), PermissionStatus::Pending);
    }

    #[tokio::test]
    async fn toggle_before_grant_reports_an_error() {
        let (mut screen, _registry) = mount(SimulatedOutcome::Refuse);
        settle(&mut screen).await;

        let mut out = Vec::new();
        screen.run(&b"audio\n"[..], &mut out).await.expect("run");
        let lines = parse(&out);

        assert_eq!(of_type(&lines, "error").len(), 1);
        let views = of_type(&lines, "view");
        assert_eq!(views[0]["stage"], "denied");
        assert_eq!(views[0]["controls"]["retry"], true);
        assert_eq!(views[0]["badge"], "Ready to Connect");
    }

    #[tokio::test]
    async fn unknown_commands_do_not_stop_the_screen() {
        let (mut screen, registry) = mount(SimulatedOutcome::Grant);
        settle(&mut screen).await;

        let mut out = Vec::new();
        screen
            .run(&b"dance\nhelp\n\nend\n"[..], &mut out)
            .await
            .expect("run");
        let lines = parse(&out);

        assert_eq!(of_type(&lines, "error").len(), 1);
        assert_eq!(of_type(&lines, "help").len(), 1);
        assert_eq!(of_type(&lines, "view")[0]["stage"], "access_required");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn eof_closes_a_screen_with_a_hanging_request() {
        let (notifier, notices) = ChannelNotifier::new();
        let platform = SimulatedPlatform::gated(SimulatedOutcome::Grant);
        let registry = Arc::new(InterviewRegistry::new(
            platform.clone(),
            Arc::new(notifier),
            SessionConfig::default(),
        ));
        let screen = InterviewScreen::mount(registry.clone(), "screen-b", notices).expect("mount");
        let session = screen.session().clone();
        while platform.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        let mut out = Vec::new();
        screen.run(&b""[..], &mut out).await.expect("run");

        assert!(registry.is_empty());
        assert!(!session.holds_tracks());
        assert!(!session.snapshot().requesting);
        assert_eq!(platform.waiting(), 0, "aborted request left the platform");
        platform.open_gate(1);
        tokio::task::yield_now().await;
        assert_eq!(platform.request_count(), 1);
        assert!(platform.issued_tracks().is_empty());
    }
}
