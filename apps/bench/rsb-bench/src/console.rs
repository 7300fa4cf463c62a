//! Line-oriented console mapping text commands to driver events.
//!
//! ```text
//! link up|down          link-state notification
//! crash | powerup       companion before-shutdown / after-powerup
//! enable <value>        write to the enable attribute
//! suspend | resume      platform power management
//! wheel <n>             wheel event from the companion
//! event <sub> <value>   any event from the companion
//! ack now|never|<ms>    how the peer acknowledges transmits
//! reply <n>|silent|big  how the peer answers configure
//! status                JSON snapshot of the device
//! quit
//! ```

use crate::error::BenchError;
use crate::platform::SimPlatform;

use rsb_core::driver::RsbDriver;
use rsb_core::sim::{AckMode, ConfigureReply};

use common::ErrorLocation;
use models::MotionEvent;

use std::panic::Location;
use std::time::Duration;

use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchCommand {
    LinkUp,
    LinkDown,
    Crash,
    Powerup,
    Enable(String),
    Suspend,
    Resume,
    Event(MotionEvent),
    Ack(AckMode),
    Reply(ConfigureReply),
    Status,
    Help,
    Quit,
}

impl BenchCommand {
    /// Parse one console line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Command`] for unknown commands or bad arguments.
    #[track_caller]
    pub fn parse(line: &str) -> Result<Option<Self>, BenchError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Ok(None),
            ["link", "up"] => Self::LinkUp,
            ["link", "down"] => Self::LinkDown,
            ["crash"] => Self::Crash,
            ["powerup"] => Self::Powerup,
            ["enable", value] => Self::Enable((*value).to_string()),
            ["suspend"] => Self::Suspend,
            ["resume"] => Self::Resume,
            ["wheel", value] => Self::Event(MotionEvent::new(
                MotionEvent::WHEEL_SUB_ID,
                number(value)?,
            )),
            ["event", sub_id, value] => Self::Event(MotionEvent::new(number(sub_id)?, number(value)?)),
            ["ack", "now"] => Self::Ack(AckMode::Immediate),
            ["ack", "never"] => Self::Ack(AckMode::Never),
            ["ack", millis] => Self::Ack(AckMode::Delayed(Duration::from_millis(number(millis)?))),
            ["reply", "silent"] => Self::Reply(ConfigureReply::Silent),
            ["reply", "big"] => Self::Reply(ConfigureReply::Oversized),
            ["reply", value] => Self::Reply(ConfigureReply::Value(number(value)?)),
            ["status"] => Self::Status,
            ["help"] => Self::Help,
            ["quit"] | ["exit"] => Self::Quit,
            _ => {
                return Err(BenchError::Command {
                    message: format!("Unknown command: {}", line.trim()),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };
        Ok(Some(command))
    }
}

#[track_caller]
fn number<T: std::str::FromStr>(word: &str) -> Result<T, BenchError> {
    word.parse().map_err(|_| BenchError::Command {
        message: format!("Not a number: {word}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

const HELP: &str = "link up|down, crash, powerup, enable <n>, suspend, resume, wheel <n>, \
event <sub> <value>, ack now|never|<ms>, reply <n>|silent|big, status, quit";

pub struct Console {
    platform: SimPlatform,
    driver: RsbDriver,
}

impl Console {
    pub fn new(platform: SimPlatform, driver: RsbDriver) -> Self {
        Self { platform, driver }
    }

    pub fn driver(&self) -> &RsbDriver {
        &self.driver
    }

    pub fn platform(&self) -> &SimPlatform {
        &self.platform
    }

    /// Run one command. Returns the text to print, if any.
    pub async fn execute(&self, command: BenchCommand) -> Result<Option<String>, BenchError> {
        let transport = &self.platform.transport;
        match command {
            BenchCommand::LinkUp => transport.link_up(),
            BenchCommand::LinkDown => transport.link_down(),
            BenchCommand::Crash => self.platform.subsystem.before_shutdown(),
            BenchCommand::Powerup => self.platform.subsystem.after_powerup(),
            BenchCommand::Enable(value) => {
                self.driver.attribute().store(&value).map_err(driver_error)?;
            }
            BenchCommand::Suspend => {
                let state = self.driver.suspend().await.map_err(driver_error)?;
                return Ok(Some(format!("suspended: {state}")));
            }
            BenchCommand::Resume => {
                let state = self.driver.resume().await.map_err(driver_error)?;
                return Ok(Some(format!("resumed: {state}")));
            }
            BenchCommand::Event(event) => {
                self.driver
                    .reporter()
                    .send_input(Some(&event))
                    .map_err(driver_error)?;
            }
            BenchCommand::Ack(mode) => transport.set_ack(mode),
            BenchCommand::Reply(reply) => transport.set_configure_reply(reply),
            BenchCommand::Status => {
                let snapshot = self.driver.device().snapshot();
                let json = serde_json::to_string(&snapshot).map_err(|e| BenchError::Bench {
                    message: format!("Failed to serialize status: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                return Ok(Some(json));
            }
            BenchCommand::Help => return Ok(Some(HELP.to_string())),
            BenchCommand::Quit => {}
        }
        Ok(None)
    }

    /// Read commands from `input` until `quit` or end of input.
    ///
    /// Bad commands are reported on `output` and do not stop the loop.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), BenchError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await.map_err(io_error)? {
            let reply = match BenchCommand::parse(&line) {
                Ok(Some(BenchCommand::Quit)) => break,
                Ok(Some(command)) => match self.execute(command).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("{e}");
                        Some(format!("error: {e}"))
                    }
                },
                Ok(None) => None,
                Err(e) => Some(format!("error: {e}")),
            };

            if let Some(reply) = reply {
                output
                    .write_all(format!("{reply}\n").as_bytes())
                    .await
                    .map_err(io_error)?;
                output.flush().await.map_err(io_error)?;
            }
        }

        info!("Console finished");
        Ok(())
    }

    /// Detach the driver.
    pub async fn close(self) {
        let state = self.driver.detach().await;
        info!("Detached in {state}");
    }
}

#[track_caller]
fn driver_error(e: impl std::fmt::Display) -> BenchError {
    BenchError::Driver {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn io_error(e: std::io::Error) -> BenchError {
    BenchError::Bench {
        message: format!("Console I/O failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    }
}
