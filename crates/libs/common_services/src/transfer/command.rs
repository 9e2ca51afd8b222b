use crate::transfer::{
    TransferError, TransferEvent, TransferEventSink, TransferReport, TransferRequest, Transport,
};
use app_state::{RemoteSettings, TransferSettings};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs the `irida-uploader` command line tool against a directory.
///
/// The child is killed when the returned future is dropped, so wrapping a transfer in a
/// timeout really stops it.
pub struct CommandTransport {
    command: String,
    remote: RemoteSettings,
    detail_lines: usize,
}

impl CommandTransport {
    #[must_use]
    pub fn new(settings: &TransferSettings, remote: RemoteSettings) -> Self {
        Self {
            command: settings.command.clone(),
            remote,
            detail_lines: settings.detail_lines,
        }
    }

    /// The tool only reads credentials from a config file.
    fn write_config(&self) -> Result<NamedTempFile, TransferError> {
        let mut file = tempfile::Builder::new()
            .prefix("uploader-")
            .suffix(".conf")
            .tempfile()?;
        let remote = &self.remote;
        writeln!(file, "[Settings]")?;
        writeln!(file, "base_url = {}/api/", remote.base_url)?;
        writeln!(file, "client_id = {}", remote.client_id)?;
        writeln!(file, "client_secret = {}", remote.client_secret)?;
        writeln!(file, "username = {}", remote.username)?;
        writeln!(file, "password = {}", remote.password)?;
        writeln!(file, "timeout = {}", remote.timeout_multiplier)?;
        file.flush()?;
        Ok(file)
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped reading transfer output: {e}");
                    break;
                }
            }
        }
    });
}

#[async_trait]
impl Transport for CommandTransport {
    async fn upload_run(
        &self,
        request: &TransferRequest,
        sink: &dyn TransferEventSink,
    ) -> Result<TransferReport, TransferError> {
        let config = self.write_config()?;

        let mut command = Command::new(&self.command);
        command
            .arg("--config")
            .arg(config.path())
            .arg("--directory")
            .arg(&request.directory)
            .arg("--upload_mode")
            .arg(&request.upload_mode);
        if request.force {
            command.arg("--force");
        }
        if request.continue_partial {
            command.arg("--continue_partial");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| TransferError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx);
        } else {
            drop(tx);
        }

        let mut details = VecDeque::with_capacity(self.detail_lines);
        while let Some(line) = rx.recv().await {
            debug!("[uploader] {line}");
            let event = TransferEvent::from_line(&line);
            if details.len() == self.detail_lines {
                details.pop_front();
            }
            if self.detail_lines > 0 {
                details.push_back(event.message.clone());
            }
            sink.emit(event);
        }

        let status = child.wait().await?;
        // Killed by a signal: no exit code, still a failure.
        let exit_code = status.code().unwrap_or(-1);

        Ok(TransferReport {
            exit_code,
            details: details.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;
    use std::fs;

    fn transport(command: &str) -> CommandTransport {
        CommandTransport::new(
            &TransferSettings {
                command: command.to_owned(),
                upload_mode: "default".to_owned(),
                detail_lines: 2,
            },
            RemoteSettings {
                base_url: "http://irida.local/irida".to_owned(),
                client_id: "uploader".to_owned(),
                client_secret: "secret".to_owned(),
                username: "admin".to_owned(),
                password: "hunter2".to_owned(),
                timeout_multiplier: 10,
                request_timeout_seconds: 30,
            },
        )
    }

    #[test]
    fn config_file_carries_credentials() -> Result<()> {
        let config = transport("irida-uploader").write_config()?;

        let content = fs::read_to_string(config.path())?;

        assert!(content.starts_with("[Settings]\n"));
        assert!(content.contains("base_url = http://irida.local/irida/api/\n"));
        assert!(content.contains("client_id = uploader\n"));
        assert!(content.contains("password = hunter2\n"));
        assert!(content.contains("timeout = 10\n"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_command_is_a_spawn_error() -> Result<()> {
        let request = TransferRequest {
            directory: std::env::temp_dir(),
            force: false,
            continue_partial: false,
            upload_mode: "default".to_owned(),
        };

        let result = transport("definitely-not-an-installed-uploader")
            .upload_run(&request, &crate::transfer::NullSink)
            .await;

        assert!(matches!(result, Err(TransferError::Spawn { .. })));
        Ok(())
    }
}
