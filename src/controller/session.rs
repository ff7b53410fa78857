//! Request loop
//!
//! Reads requests line by line and answers each one as soon as it
//! completes. Core calls are synchronous, so every request runs on the
//! blocking thread pool.

use log::{error, info, warn};
use serde::Serialize;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::controller::protocol::{Greeting, Request, Response};
use crate::error::handlers::handle_error;
use crate::provisioner::Provisioner;

/// Run a single request against the provisioner
pub fn execute<P: Provisioner + ?Sized>(provisioner: &P, request: Request) -> Response {
    match request {
        Request::Provision { id, request } => match provisioner.provision(&request) {
            Ok((volume, state)) => Response::provisioned(id, volume, state),
            Err(e) => {
                handle_error(&e);
                Response::failed(id, &e)
            }
        },
        Request::Delete { id, volume } => match provisioner.delete(&volume) {
            Ok(()) => Response::deleted(id),
            Err(e) => {
                handle_error(&e);
                Response::failed(id, &e)
            }
        },
    }
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(message).map_err(io::Error::other)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

/// Run `request` and turn a panic inside the provisioner into an
/// `internal` answer that still carries the request id.
fn execute_guarded<P: Provisioner + ?Sized>(provisioner: &P, request: Request) -> Response {
    let id = request.id().map(str::to_string);
    match panic::catch_unwind(AssertUnwindSafe(|| execute(provisioner, request))) {
        Ok(response) => response,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "request worker panicked".to_string());
            error!("Request {:?} failed: {}", id, message);
            Response::internal(id, message)
        }
    }
}

/// Strip the line terminator and decode one raw input line
fn decode_line(raw: &[u8]) -> Result<&str, std::str::Utf8Error> {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line)
}

/// Serve requests from `reader` until it is exhausted.
///
/// Returns once every in-flight request has been answered. Only I/O errors
/// on the streams end the loop early.
pub async fn serve<P, R, W>(
    provisioner: Arc<P>,
    greeting: Greeting,
    mut reader: R,
    mut writer: W,
) -> io::Result<()>
where
    P: Provisioner + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(&mut writer, &greeting).await?;
    info!(
        "Provisioner {} ({}) ready for requests",
        greeting.provisioner, greeting.identity
    );

    // Kept across iterations: a cancelled read leaves its partial line here
    let mut buf = Vec::new();
    let mut in_flight: JoinSet<Response> = JoinSet::new();
    let mut reading = true;

    while reading || !in_flight.is_empty() {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf), if reading => {
                if read? == 0 {
                    reading = false;
                } else {
                    match decode_line(&buf) {
                        Ok(line) if line.trim().is_empty() => {}
                        Ok(line) => match serde_json::from_str::<Request>(line) {
                            Ok(request) => {
                                let provisioner = Arc::clone(&provisioner);
                                in_flight.spawn_blocking(move || {
                                    execute_guarded(provisioner.as_ref(), request)
                                });
                            }
                            Err(e) => {
                                warn!("Malformed request [{}]: {}", line, e);
                                let response = Response::malformed(e.to_string());
                                write_line(&mut writer, &response).await?;
                            }
                        },
                        Err(e) => {
                            warn!("Request line is not valid UTF-8: {}", e);
                            let response = Response::malformed(format!("invalid UTF-8: {e}"));
                            write_line(&mut writer, &response).await?;
                        }
                    }
                    buf.clear();
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let response = joined.unwrap_or_else(|e| {
                    error!("Request worker failed: {}", e);
                    Response::internal(None, e.to_string())
                });
                write_line(&mut writer, &response).await?;
            }
        }
    }

    info!("Request stream closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvisionerConfig;
    use crate::controller::protocol::Status;
    use crate::error::ProvisionerError;
    use crate::provisioner::{
        HostPathProvisioner, ProvisionRequest, ProvisioningState, VolumeDescriptor,
    };
    use tempfile::TempDir;

    fn provisioner(mount: &std::path::Path, identity: &str) -> Arc<HostPathProvisioner> {
        Arc::new(HostPathProvisioner::new(Arc::new(ProvisionerConfig::new(
            identity, "/hostPath", mount,
        ))))
    }

    async fn run(provisioner: Arc<HostPathProvisioner>, input: &str) -> Vec<serde_json::Value> {
        let greeting = Greeting::from_config(provisioner.config());
        run_raw(provisioner, greeting, input.as_bytes()).await
    }

    async fn run_raw<P: Provisioner + 'static>(
        provisioner: Arc<P>,
        greeting: Greeting,
        input: &[u8],
    ) -> Vec<serde_json::Value> {
        let mut output = Vec::new();
        serve(provisioner, greeting, input, &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_greeting_then_one_answer_per_request() {
        let mount = TempDir::new().unwrap();
        let input = concat!(
            r#"{"op":"provision","id":"a","request":{"volume_name":"pvc-a","claim":{"namespace":"ns","name":"one"}}}"#,
            "\n\n",
            r#"{"op":"provision","id":"b","request":{"volume_name":"pvc-b","claim":{"namespace":"ns","name":"two","annotations":{"hostpath/location":"shared/${pvcId}"}}}}"#,
            "\n",
        );
        let lines = run(provisioner(mount.path(), "node-a"), input).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["ready"], true);
        assert_eq!(lines[0]["provisioner"], "hostpath");
        assert_eq!(lines[0]["identity"], "node-a");

        let mut answers: Vec<_> = lines[1..].to_vec();
        answers.sort_by_key(|l| l["id"].as_str().unwrap_or_default().to_string());
        assert_eq!(answers[0]["status"], "ok");
        assert_eq!(answers[0]["state"], "Finished");
        assert_eq!(answers[0]["volume"]["host_path"]["path"], "/hostPath/pvc-a");
        assert_eq!(answers[1]["volume"]["host_path"]["path"], "/hostPath/shared/two");
        assert!(mount.path().join("pvc-a").is_dir());
        assert!(mount.path().join("shared/two").is_dir());
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_the_loop() {
        let mount = TempDir::new().unwrap();
        let input = concat!(
            "not json\n",
            r#"{"op":"provision","request":{"volume_name":"pvc-c","claim":{"namespace":"ns","name":"c"}}}"#,
            "\n",
        );
        let lines = run(provisioner(mount.path(), "node-a"), input).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["category"], "request");
        assert_eq!(lines[2]["status"], "ok");
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_the_loop() {
        let mount = TempDir::new().unwrap();
        let provisioner = provisioner(mount.path(), "node-a");
        let greeting = Greeting::from_config(provisioner.config());
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(
            br#"{"op":"provision","id":"z","request":{"volume_name":"pvc-z","claim":{"namespace":"ns","name":"z"}}}"#,
        );
        input.push(b'\n');
        let lines = run_raw(provisioner, greeting, &input).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["category"], "request");
        assert_eq!(lines[2]["id"], "z");
        assert_eq!(lines[2]["status"], "ok");
        assert!(mount.path().join("pvc-z").is_dir());
    }

    #[tokio::test]
    async fn test_crlf_line_endings_are_accepted() {
        let mount = TempDir::new().unwrap();
        let input = concat!(
            r#"{"op":"provision","request":{"volume_name":"pvc-w","claim":{"namespace":"ns","name":"w"}}}"#,
            "\r\n",
        );
        let lines = run(provisioner(mount.path(), "node-a"), input).await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["status"], "ok");
        assert!(mount.path().join("pvc-w").is_dir());
    }

    struct FailingProvisioner;

    impl Provisioner for FailingProvisioner {
        fn provision(
            &self,
            request: &ProvisionRequest,
        ) -> Result<(VolumeDescriptor, ProvisioningState), ProvisionerError> {
            panic!("disk vanished while provisioning {}", request.volume_name);
        }

        fn delete(&self, _volume: &VolumeDescriptor) -> Result<(), ProvisionerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_panic_keeps_the_request_id() {
        let greeting = Greeting {
            ready: true,
            provisioner: "hostpath".into(),
            identity: "node-a".into(),
        };
        let input = concat!(
            r#"{"op":"provision","id":"p","request":{"volume_name":"pvc-p","claim":{"namespace":"ns","name":"p"}}}"#,
            "\n",
        );
        let lines = run_raw(Arc::new(FailingProvisioner), greeting, input.as_bytes()).await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["id"], "p");
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["category"], "internal");
        assert_eq!(lines[1]["retryable"], true);
        assert_eq!(lines[1]["message"], "disk vanished while provisioning pvc-p");
    }

    #[tokio::test]
    async fn test_foreign_delete_is_ignored() {
        let mount = TempDir::new().unwrap();
        std::fs::create_dir(mount.path().join("pvc-x")).unwrap();
        let input = concat!(
            r#"{"op":"delete","id":"d","volume":{"name":"pvc-x","annotations":{"hostpath/provisionerIdentity":"node-b"},"host_path":{"path":"/hostPath/pvc-x"}}}"#,
            "\n",
        );
        let lines = run(provisioner(mount.path(), "node-a"), input).await;

        assert_eq!(lines[1]["id"], "d");
        assert_eq!(lines[1]["status"], "ignored");
        assert!(mount.path().join("pvc-x").is_dir());
    }

    #[test]
    fn test_execute_delete_ok() {
        let mount = TempDir::new().unwrap();
        std::fs::create_dir(mount.path().join("pvc-y")).unwrap();
        let provisioner = provisioner(mount.path(), "node-a");
        let request: Request = serde_json::from_str(
            r#"{"op":"delete","volume":{"name":"pvc-y","annotations":{"hostpath/provisionerIdentity":"node-a"},"host_path":{"path":"/hostPath/pvc-y"}}}"#,
        )
        .unwrap();

        let response = execute(provisioner.as_ref(), request);
        assert_eq!(response.status, Status::Ok);
        assert!(!mount.path().join("pvc-y").exists());
    }
}
